//! Connection and behaviour settings for [`Db`](crate::Db).

use crate::error::{DbError, DbResult};
use std::fmt;

/// What to do with an `UPDATE` or `DELETE` queued without any condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnfilteredWritePolicy {
    /// Queue it silently.
    Allow,
    /// Queue it and log a warning.
    #[default]
    Warn,
    /// Queue it as rejected; it fails with a validation error when its turn comes.
    Error,
}

/// Configuration for [`Db`](crate::Db).
///
/// Every setting has a fixed default, so `DbConfig::default()` connects to
/// `postgres@localhost:5432/postgres` without a password and leaves table names
/// unqualified.
#[derive(Clone)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub dbname: String,
    /// Schema prefixed to every table name. Empty means unqualified.
    pub schema: String,
    pub unfiltered_writes: UnfilteredWritePolicy,
    /// Truncate logged SQL to this many bytes. `None` means no truncation.
    pub max_logged_sql: Option<usize>,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: String::new(),
            dbname: "postgres".to_string(),
            schema: String::new(),
            unfiltered_writes: UnfilteredWritePolicy::default(),
            max_logged_sql: Some(200),
        }
    }
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("dbname", &self.dbname)
            .field("schema", &self.schema)
            .field("unfiltered_writes", &self.unfiltered_writes)
            .field("max_logged_sql", &self.max_logged_sql)
            .finish()
    }
}

impl DbConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read settings from the libpq environment variables.
    ///
    /// `PGHOST`, `PGPORT`, `PGUSER`, `PGPASSWORD`, `PGDATABASE` and
    /// `SQLBATCH_SCHEMA`; unset or empty variables keep their defaults.
    pub fn from_env() -> DbResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> DbResult<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let mut config = Self::default();
        if let Some(host) = var("PGHOST") {
            config.host = host;
        }
        if let Some(port) = var("PGPORT") {
            config.port = port
                .parse()
                .map_err(|_| DbError::validation(format!("PGPORT is not a port number: {port}")))?;
        }
        if let Some(user) = var("PGUSER") {
            config.user = user;
        }
        if let Some(password) = var("PGPASSWORD") {
            config.password = password;
        }
        if let Some(dbname) = var("PGDATABASE") {
            config.dbname = dbname;
        }
        if let Some(schema) = var("SQLBATCH_SCHEMA") {
            config.schema = schema;
        }
        Ok(config)
    }

    /// Set the server host.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the server port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the login role.
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// Set the password.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// Set the database to connect to.
    pub fn dbname(mut self, dbname: impl Into<String>) -> Self {
        self.dbname = dbname.into();
        self
    }

    /// Set the schema used to qualify table names.
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    /// Configure how `UPDATE`/`DELETE` without conditions is handled.
    pub fn unfiltered_writes(mut self, policy: UnfilteredWritePolicy) -> Self {
        self.unfiltered_writes = policy;
        self
    }

    /// Set maximum SQL length to log.
    pub fn max_logged_sql(mut self, len: usize) -> Self {
        self.max_logged_sql = Some(len);
        self
    }

    /// Disable SQL truncation in logs.
    pub fn no_log_truncate(mut self) -> Self {
        self.max_logged_sql = None;
        self
    }

    /// Build the driver configuration.
    pub fn to_pg_config(&self) -> tokio_postgres::Config {
        let mut pg = tokio_postgres::Config::new();
        pg.host(&self.host)
            .port(self.port)
            .user(&self.user)
            .dbname(&self.dbname)
            .application_name("sqlbatch");
        if !self.password.is_empty() {
            pg.password(&self.password);
        }
        pg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults() {
        let config = DbConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 5432);
        assert_eq!(config.user, "postgres");
        assert_eq!(config.password, "");
        assert_eq!(config.schema, "");
        assert_eq!(config.unfiltered_writes, UnfilteredWritePolicy::Warn);
    }

    #[test]
    fn env_overrides_and_empty_vars_keep_defaults() {
        let env: HashMap<&str, &str> = [
            ("PGHOST", "db.internal"),
            ("PGPORT", "6432"),
            ("PGUSER", ""),
            ("SQLBATCH_SCHEMA", "app"),
        ]
        .into_iter()
        .collect();
        let config = DbConfig::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.host, "db.internal");
        assert_eq!(config.port, 6432);
        assert_eq!(config.user, "postgres");
        assert_eq!(config.schema, "app");
    }

    #[test]
    fn env_rejects_bad_port() {
        let err = DbConfig::from_lookup(|k| (k == "PGPORT").then(|| "abc".to_string()));
        assert!(matches!(err, Err(DbError::Validation(_))));
    }

    #[test]
    fn debug_redacts_password() {
        let config = DbConfig::new().password("hunter2");
        assert!(!format!("{config:?}").contains("hunter2"));
    }

    #[test]
    fn pg_config_carries_settings() {
        let pg = DbConfig::new().host("h").port(1).user("u").dbname("d").to_pg_config();
        assert_eq!(pg.get_user(), Some("u"));
        assert_eq!(pg.get_dbname(), Some("d"));
        assert_eq!(pg.get_ports(), &[1]);
        assert_eq!(pg.get_password(), None);
    }
}
