//! Pending statements held in the batch queue.

use crate::condition::Condition;
use crate::sql::SqlBuf;
use crate::value::Value;

/// The type of SQL operation a statement performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    /// SQL queued verbatim; may contain several `;`-separated statements.
    Raw,
}

impl StatementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StatementKind::Select => "select",
            StatementKind::Insert => "insert",
            StatementKind::Update => "update",
            StatementKind::Delete => "delete",
            StatementKind::Raw => "raw",
        }
    }
}

/// A rendered statement waiting in the queue.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    kind: StatementKind,
    sql: SqlBuf,
    conditions: Vec<Condition>,
    rejected: Option<String>,
}

impl Statement {
    pub(crate) fn built(kind: StatementKind, sql: SqlBuf, conditions: Vec<Condition>) -> Self {
        Self {
            kind,
            sql,
            conditions,
            rejected: None,
        }
    }

    /// A statement queued verbatim.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self {
            kind: StatementKind::Raw,
            sql: SqlBuf::new(sql),
            conditions: Vec::new(),
            rejected: None,
        }
    }

    /// Mark the statement so it fails with a validation error instead of running.
    pub(crate) fn reject(mut self, reason: impl Into<String>) -> Self {
        self.rejected = Some(reason.into());
        self
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    /// SQL text with `$n` placeholders, as sent to the server.
    pub fn sql(&self) -> String {
        self.sql.to_sql()
    }

    /// SQL text with parameters inlined as escaped literals.
    pub fn inline_sql(&self) -> String {
        self.sql.to_inline_sql()
    }

    /// Bound values, in placeholder order.
    pub fn params(&self) -> &[Value] {
        self.sql.params()
    }

    /// The conditions the statement was built from.
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Why the statement will not be sent, if it was rejected when queued.
    pub fn rejection(&self) -> Option<&str> {
        self.rejected.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_statement_keeps_text() {
        let stmt = Statement::raw("SELECT 'a$1'");
        assert_eq!(stmt.sql(), "SELECT 'a$1'");
        assert_eq!(stmt.inline_sql(), "SELECT 'a$1'");
        assert!(stmt.params().is_empty());
        assert_eq!(stmt.kind(), StatementKind::Raw);
    }

    #[test]
    fn rejection_is_recorded() {
        let stmt = Statement::raw("UPDATE t SET").reject("no columns");
        assert_eq!(stmt.rejection(), Some("no columns"));
    }
}
