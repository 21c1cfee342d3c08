//! Batch execution and ad hoc statements.

use super::{ConnectionState, Db};
use crate::client::Connection;
use crate::error::{DbError, DbResult};
use crate::row::ResultSet;
use crate::statement::{Statement, StatementKind};

impl<C: Connection> Db<C> {
    /// Run every pending statement in order. Same as [`Db::run_batch`].
    pub async fn run(&mut self) -> DbResult<Vec<ResultSet>> {
        self.run_batch().await
    }

    /// Run every pending statement in order and return one result set per statement.
    ///
    /// The connection is checked first and reconnected once if it was dropped.
    /// Statements are sent one at a time; the first failure ends the batch with
    /// that error and nothing after it runs. Statements that already ran are not
    /// rolled back. Statements without rows yield an empty result set at their
    /// index.
    ///
    /// Whatever the outcome, the queue is empty afterwards and
    /// [`Db::query_count`] has grown by the number of statements that were queued.
    pub async fn run_batch(&mut self) -> DbResult<Vec<ResultSet>> {
        let queue = std::mem::take(&mut self.queue);
        self.executed += queue.len() as u64;

        self.ensure_connected().await?;

        tracing::debug!(target: "sqlbatch.sql", statements = queue.len(), "batch start");
        let mut results = Vec::with_capacity(queue.len());
        for (index, stmt) in queue.iter().enumerate() {
            results.push(self.execute_statement(index, stmt).await?);
        }
        tracing::debug!(target: "sqlbatch.sql", statements = results.len(), "batch finished");

        Ok(results)
    }

    /// Execute one statement right away, bypassing the queue.
    ///
    /// The text is sent as-is over the simple query protocol. Returns its rows, or
    /// an empty result set for statements that produce none. `BEGIN`, `COMMIT` and
    /// `ROLLBACK` sent this way update [`Db::in_transaction`].
    pub async fn single(&mut self, sql: &str) -> DbResult<ResultSet> {
        if self.state == ConnectionState::Failed {
            return Err(failed());
        }
        tracing::debug!(target: "sqlbatch.sql", sql = %self.truncate_sql(sql), "single");
        let rows = self.conn.execute_raw(sql).await.inspect_err(|e| {
            tracing::error!(target: "sqlbatch.sql", error = %e, "statement failed");
        })?;
        self.track_transaction(sql);
        Ok(rows)
    }

    async fn ensure_connected(&mut self) -> DbResult<()> {
        if self.state == ConnectionState::Failed {
            return Err(failed());
        }

        let liveness = if self.conn.is_closed() {
            Err(DbError::Unavailable("connection closed".to_string()))
        } else {
            self.conn.ping().await
        };
        let cause = match liveness {
            Ok(()) => {
                self.state = ConnectionState::Connected;
                return Ok(());
            }
            Err(e) => e,
        };

        self.state = ConnectionState::Disconnected;
        if self.in_transaction {
            // The server already rolled the transaction back with the old session.
            self.in_transaction = false;
            tracing::warn!(
                target: "sqlbatch.conn",
                error = %cause,
                "connection lost inside a transaction"
            );
            return Err(DbError::Unavailable(format!(
                "connection lost inside a transaction: {cause}"
            )));
        }

        tracing::warn!(target: "sqlbatch.conn", error = %cause, "connection lost, reconnecting");
        match self.conn.reconnect().await {
            Ok(()) => {
                self.state = ConnectionState::Connected;
                tracing::debug!(target: "sqlbatch.conn", "reconnected");
                Ok(())
            }
            Err(e) => {
                self.state = ConnectionState::Failed;
                tracing::error!(target: "sqlbatch.conn", error = %e, "reconnect failed");
                Err(match e {
                    DbError::Unavailable(_) | DbError::Connection(_) => e,
                    other => DbError::Unavailable(other.to_string()),
                })
            }
        }
    }

    async fn execute_statement(&mut self, index: usize, stmt: &Statement) -> DbResult<ResultSet> {
        let kind = stmt.kind();
        if let Some(reason) = stmt.rejection() {
            tracing::error!(
                target: "sqlbatch.sql",
                index,
                kind = kind.as_str(),
                reason,
                "statement rejected"
            );
            return Err(DbError::validation(reason));
        }

        let sql = stmt.sql();
        tracing::debug!(
            target: "sqlbatch.sql",
            index,
            kind = kind.as_str(),
            param_count = stmt.params().len(),
            sql = %self.truncate_sql(&sql),
        );

        let result = match kind {
            StatementKind::Raw => self.conn.execute_raw(&sql).await,
            _ => self.conn.query(&sql, stmt.params()).await,
        };
        match result {
            Ok(rows) => {
                if kind == StatementKind::Raw {
                    self.track_transaction(&sql);
                }
                Ok(rows)
            }
            Err(e) => {
                tracing::error!(
                    target: "sqlbatch.sql",
                    index,
                    kind = kind.as_str(),
                    error = %e,
                    "statement failed"
                );
                Err(e)
            }
        }
    }

    fn truncate_sql(&self, sql: &str) -> String {
        match self.config.max_logged_sql {
            Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)),
            _ => sql.to_string(),
        }
    }
}

fn failed() -> DbError {
    DbError::Unavailable("reconnect failed earlier; open a new connection".to_string())
}

fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

#[cfg(test)]
mod tests {
    use super::truncate_sql_bytes;

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_sql_bytes("SELECT 1", 100), "SELECT 1");
        assert_eq!(truncate_sql_bytes("SELECT 1", 6), "SELECT");
        // 'é' is two bytes; cutting inside it backs off to the boundary.
        assert_eq!(truncate_sql_bytes("é", 1), "");
    }
}
