//! The statement queue and its executor.
//!
//! [`Db`] owns one [`Connection`], an ordered queue of pending [`Statement`]s and
//! the count of statements run so far. Builder calls ([`Db::select`],
//! [`Db::insert`], [`Db::update`], [`Db::delete`], [`Db::queue_raw`]) append to
//! the queue; [`Db::run`] sends the whole queue, in order, and clears it.
//!
//! # Example
//!
//! ```ignore
//! use sqlbatch::{Condition, Db, DbConfig, Value};
//!
//! let mut db = Db::connect(DbConfig::from_env()?.schema("app")).await?;
//!
//! db.insert([("name", Value::from("test")), ("admin", Value::Null)], "users", "")
//!     .select(["id", "name"], "users", [Condition::eq("name", "test")], "ORDER BY id");
//!
//! let results = db.run().await?;
//! assert!(results[0].is_empty()); // INSERT returns no rows
//! for row in &results[1] {
//!     println!("{:?}", row.get("id"));
//! }
//! ```

mod builder;
mod execute;


pub use builder::{Field, IntoTables};

use crate::client::Connection;
use crate::config::DbConfig;
use crate::error::{DbError, DbResult};
use crate::pg_client::PgConnection;
use crate::sql::{split_statements, strip_sql_prefix};
use crate::statement::Statement;

/// Lifecycle of the session owned by a [`Db`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// The last liveness check failed; the next batch tries to reconnect.
    Disconnected,
    Connected,
    /// Reconnecting failed. The builder cannot be used any more.
    Failed,
}

/// Query builder and batch executor over one owned connection.
///
/// `Db` is deliberately not `Clone`: it owns its session, its queue and its
/// transaction state. Open a second `Db` for a second session.
pub struct Db<C: Connection = PgConnection> {
    conn: C,
    config: DbConfig,
    queue: Vec<Statement>,
    executed: u64,
    last_sql: Option<String>,
    state: ConnectionState,
    in_transaction: bool,
}

impl Db<PgConnection> {
    /// Connect to PostgreSQL and verify the server answers.
    ///
    /// Fails with [`DbError::Connection`] if the session cannot be opened and with
    /// [`DbError::Unavailable`] if it does not answer the liveness check.
    pub async fn connect(config: DbConfig) -> DbResult<Self> {
        let conn = PgConnection::connect(config.to_pg_config()).await?;
        Self::with_connection(conn, config).await
    }
}

impl<C: Connection> Db<C> {
    /// Wrap an already-open connection, verifying that it answers.
    pub async fn with_connection(conn: C, config: DbConfig) -> DbResult<Self> {
        if let Err(e) = conn.ping().await {
            return Err(match e {
                DbError::Unavailable(_) => e,
                other => DbError::Unavailable(other.to_string()),
            });
        }
        tracing::debug!(
            target: "sqlbatch.conn",
            host = %config.host,
            dbname = %config.dbname,
            schema = %config.schema,
            "connected"
        );
        Ok(Self {
            conn,
            config,
            queue: Vec::new(),
            executed: 0,
            last_sql: None,
            state: ConnectionState::Connected,
            in_transaction: false,
        })
    }

    /// Get the current configuration.
    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    /// The owned connection.
    pub fn connection(&self) -> &C {
        &self.conn
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether a transaction opened through this builder is still open.
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// Total number of statements handed to batch runs so far.
    pub fn query_count(&self) -> u64 {
        self.executed
    }

    /// The most recently queued builder statement, with values inlined.
    pub fn last_sql(&self) -> Option<&str> {
        self.last_sql.as_deref()
    }

    /// Statements waiting for the next batch, in execution order.
    pub fn pending(&self) -> &[Statement] {
        &self.queue
    }

    /// Drop every pending statement without running it. Returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.queue.len();
        self.queue.clear();
        dropped
    }

    /// Always fails: a `Db` owns its session and cannot be duplicated.
    pub fn try_clone(&self) -> DbResult<Self> {
        Err(DbError::CloneProhibited)
    }

    /// Close the session. Pending statements are discarded.
    pub fn close(self) {
        if !self.queue.is_empty() {
            tracing::warn!(
                target: "sqlbatch.conn",
                pending = self.queue.len(),
                "closing with unexecuted statements"
            );
        }
    }

    /// Start a transaction.
    pub async fn start_transaction(&mut self) -> DbResult<()> {
        if self.in_transaction {
            return Err(DbError::validation("Transaction already in progress"));
        }
        self.single("BEGIN").await?;
        Ok(())
    }

    /// Commit the open transaction.
    pub async fn commit(&mut self) -> DbResult<()> {
        if !self.in_transaction {
            return Err(DbError::validation("No transaction in progress"));
        }
        self.single("COMMIT").await?;
        Ok(())
    }

    /// Roll back the open transaction.
    pub async fn rollback(&mut self) -> DbResult<()> {
        if !self.in_transaction {
            return Err(DbError::validation("No transaction in progress"));
        }
        self.single("ROLLBACK").await?;
        Ok(())
    }

    fn enqueue(&mut self, stmt: Statement) -> &mut Self {
        self.last_sql = Some(stmt.inline_sql());
        tracing::trace!(
            target: "sqlbatch.sql",
            kind = stmt.kind().as_str(),
            position = self.queue.len(),
            "queued"
        );
        self.queue.push(stmt);
        self
    }

    /// Follow transaction control statements sent as text.
    ///
    /// Each `;`-separated statement is applied in order, so the state after
    /// `BEGIN; ...; COMMIT` is closed and after `SELECT 1; BEGIN` is open.
    fn track_transaction(&mut self, sql: &str) {
        for stmt in split_statements(sql) {
            let head = strip_sql_prefix(stmt).to_ascii_uppercase();
            let words: Vec<&str> = head.split_whitespace().take(2).collect();
            match words.as_slice() {
                ["BEGIN", ..] | ["START", "TRANSACTION"] => self.in_transaction = true,
                // ROLLBACK TO SAVEPOINT keeps the transaction open.
                ["ROLLBACK", "TO", ..] => {}
                ["COMMIT" | "END" | "ROLLBACK" | "ABORT", ..] => self.in_transaction = false,
                _ => {}
            }
        }
    }
}
