//! [`Connection`] over a single `tokio-postgres` session.

use crate::client::Connection;
use crate::error::{DbError, DbResult};
use crate::row::{ResultSet, Row};
use crate::value::Value;
use tokio::task::JoinHandle;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, Config, NoTls, SimpleQueryMessage};

/// One PostgreSQL session.
///
/// The connection future is driven on a spawned tokio task; the settings are kept
/// so [`Connection::reconnect`] can open an identical session.
pub struct PgConnection {
    client: Client,
    config: Config,
    driver: JoinHandle<()>,
}

impl PgConnection {
    /// Connect with `NoTls` using driver settings.
    pub async fn connect(config: Config) -> DbResult<Self> {
        let (client, driver) = open(&config)
            .await
            .map_err(|e| DbError::Connection(e.to_string()))?;
        Ok(Self {
            client,
            config,
            driver,
        })
    }

    /// Connect with `NoTls` using a PostgreSQL connection URL.
    pub async fn connect_url(database_url: &str) -> DbResult<Self> {
        let config: Config = database_url
            .parse()
            .map_err(|e: tokio_postgres::Error| DbError::Connection(e.to_string()))?;
        Self::connect(config).await
    }

    /// The underlying driver client.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

async fn open(config: &Config) -> Result<(Client, JoinHandle<()>), tokio_postgres::Error> {
    let (client, connection) = config.connect(NoTls).await?;
    let driver = tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::warn!(
                target: "sqlbatch.conn",
                error = %e,
                "postgres connection closed with error"
            );
        }
    });
    Ok((client, driver))
}

impl Drop for PgConnection {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

impl Connection for PgConnection {
    async fn ping(&self) -> DbResult<()> {
        if self.client.is_closed() {
            return Err(DbError::Unavailable("connection closed".to_string()));
        }
        self.client
            .simple_query("SELECT 1")
            .await
            .map_err(|e| DbError::Unavailable(e.to_string()))?;
        Ok(())
    }

    async fn reconnect(&mut self) -> DbResult<()> {
        let (client, driver) = open(&self.config)
            .await
            .map_err(|e| DbError::Connection(e.to_string()))?;
        self.driver.abort();
        self.client = client;
        self.driver = driver;
        Ok(())
    }

    async fn query(&self, sql: &str, params: &[Value]) -> DbResult<ResultSet> {
        let refs: Vec<&(dyn ToSql + Sync)> =
            params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();
        let rows = self
            .client
            .query(sql, &refs)
            .await
            .map_err(DbError::from_db_error)?;
        rows.iter().map(Row::from_pg).collect()
    }

    async fn execute_raw(&self, sql: &str) -> DbResult<ResultSet> {
        let messages = self
            .client
            .simple_query(sql)
            .await
            .map_err(DbError::from_db_error)?;
        Ok(messages
            .iter()
            .filter_map(|m| match m {
                SimpleQueryMessage::Row(row) => Some(Row::from_simple(row)),
                _ => None,
            })
            .collect())
    }

    fn is_closed(&self) -> bool {
        self.client.is_closed()
    }
}
