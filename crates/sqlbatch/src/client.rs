//! The connection seam between the batch executor and a database driver.

use crate::error::DbResult;
use crate::row::ResultSet;
use crate::value::Value;

/// A single database session the executor drives.
///
/// [`PgConnection`](crate::PgConnection) is the production implementation; any
/// other driver (or a test double) can be injected through
/// [`Db::with_connection`](crate::Db::with_connection).
pub trait Connection: Send {
    /// Check that the session is still alive.
    fn ping(&self) -> impl std::future::Future<Output = DbResult<()>> + Send;

    /// Replace a dropped session with a fresh one using the same settings.
    fn reconnect(&mut self) -> impl std::future::Future<Output = DbResult<()>> + Send;

    /// Execute one statement with `$n` placeholders bound to `params`.
    ///
    /// Returns every row the statement produced, or an empty set when it
    /// produces none.
    fn query(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl std::future::Future<Output = DbResult<ResultSet>> + Send;

    /// Execute SQL text as-is, without parameters.
    ///
    /// The text may hold several `;`-separated statements; rows of all of them are
    /// returned in order.
    fn execute_raw(
        &self,
        sql: &str,
    ) -> impl std::future::Future<Output = DbResult<ResultSet>> + Send;

    /// Whether the driver already knows the session is gone.
    ///
    /// The default implementation returns `false`, leaving detection to [`Connection::ping`].
    fn is_closed(&self) -> bool {
        false
    }
}
