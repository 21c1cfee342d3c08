//! Error types for sqlbatch

use thiserror::Error;

/// Result type alias for sqlbatch operations
pub type DbResult<T> = Result<T, DbError>;

/// Code reported when the server does not answer the liveness check.
pub const ERR_UNAVAILABLE: u32 = 6001;
/// Code reported when the initial connection cannot be established.
pub const ERR_CONNECT_ERROR: u32 = 6002;
/// Code reported when a builder is asked to duplicate itself.
pub const ERR_CLONE: u32 = 6003;

/// Error types for database operations
#[derive(Debug, Error)]
pub enum DbError {
    /// The connection could not be established
    #[error("Connect error: {0}")]
    Connection(String),

    /// The server did not answer the liveness check
    #[error("Database server unavailable: {0}")]
    Unavailable(String),

    /// A statement failed on the server or in the driver
    #[error("Query error: {message}")]
    Query {
        message: String,
        /// SQLSTATE reported by the server, if any
        code: Option<String>,
    },

    /// A builder owns its session and cannot be duplicated
    #[error("Clone is not allowed")]
    CloneProhibited,

    /// A statement was rejected before it reached the server
    #[error("Validation error: {0}")]
    Validation(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },
}

impl DbError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a query error without a SQLSTATE
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
            code: None,
        }
    }

    /// Numeric code for the connection-level failures.
    ///
    /// Returns `None` for statement-level errors; use [`DbError::sqlstate`] for those.
    pub fn code(&self) -> Option<u32> {
        match self {
            Self::Unavailable(_) => Some(ERR_UNAVAILABLE),
            Self::Connection(_) => Some(ERR_CONNECT_ERROR),
            Self::CloneProhibited => Some(ERR_CLONE),
            _ => None,
        }
    }

    /// SQLSTATE of a failed statement, if the server reported one
    pub fn sqlstate(&self) -> Option<&str> {
        match self {
            Self::Query { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// Check if this is a statement failure
    pub fn is_query_error(&self) -> bool {
        matches!(self, Self::Query { .. })
    }

    /// Check if the connection was lost or never established
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Unavailable(_))
    }

    /// Map a tokio_postgres error into a [`DbError::Query`] carrying the server message.
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            return Self::Query {
                message: db_err.message().to_string(),
                code: Some(db_err.code().code().to_string()),
            };
        }
        if err.is_closed() {
            return Self::Unavailable(err.to_string());
        }
        Self::query(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_connection_failures() {
        assert_eq!(DbError::Unavailable("x".into()).code(), Some(ERR_UNAVAILABLE));
        assert_eq!(DbError::Connection("x".into()).code(), Some(ERR_CONNECT_ERROR));
        assert_eq!(DbError::CloneProhibited.code(), Some(ERR_CLONE));
        assert_eq!(DbError::query("boom").code(), None);
    }

    #[test]
    fn query_error_exposes_sqlstate() {
        let err = DbError::Query {
            message: "relation \"nope\" does not exist".to_string(),
            code: Some("42P01".to_string()),
        };
        assert!(err.is_query_error());
        assert_eq!(err.sqlstate(), Some("42P01"));
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn display_messages() {
        assert_eq!(DbError::CloneProhibited.to_string(), "Clone is not allowed");
        assert!(
            DbError::decode("price", "unsupported type numeric[]")
                .to_string()
                .contains("'price'")
        );
    }
}
