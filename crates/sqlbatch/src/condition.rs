//! WHERE-clause conditions.
//!
//! A condition is either a structured predicate (`column operator value`, joined to
//! the previous predicate by a [`Combinator`]) or a [`Condition::Custom`] fragment
//! of raw SQL.
//!
//! # Example
//! ```ignore
//! use sqlbatch::{Condition, Op};
//!
//! let conditions = vec![
//!     Condition::eq("status", "active"),
//!     Condition::new("age", Op::Gte, 18).or(),
//!     Condition::custom("AND deleted_at IS NULL"),
//! ];
//! ```

use crate::ident::Ident;
use crate::sql::SqlBuf;
use crate::value::Value;

/// Boolean operator placed between two structured predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    And,
    Or,
}

impl Combinator {
    pub fn as_sql(self) -> &'static str {
        match self {
            Combinator::And => "AND",
            Combinator::Or => "OR",
        }
    }
}

/// Comparison operator of a structured predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// Equal: column = value
    Eq,
    /// Not equal: column != value
    Ne,
    /// Greater than: column > value
    Gt,
    /// Greater than or equal: column >= value
    Gte,
    /// Less than: column < value
    Lt,
    /// Less than or equal: column <= value
    Lte,
    /// LIKE pattern match
    Like,
    /// NOT LIKE pattern match
    NotLike,
    /// Case-insensitive LIKE (PostgreSQL ILIKE)
    Ilike,
    /// NOT ILIKE pattern match
    NotIlike,
    /// IS NULL (value ignored)
    IsNull,
    /// IS NOT NULL (value ignored)
    IsNotNull,
}

impl Op {
    pub fn as_sql(self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::Ne => "!=",
            Op::Gt => ">",
            Op::Gte => ">=",
            Op::Lt => "<",
            Op::Lte => "<=",
            Op::Like => "LIKE",
            Op::NotLike => "NOT LIKE",
            Op::Ilike => "ILIKE",
            Op::NotIlike => "NOT ILIKE",
            Op::IsNull => "IS NULL",
            Op::IsNotNull => "IS NOT NULL",
        }
    }

    /// Whether the operator is followed by a value.
    pub fn takes_value(self) -> bool {
        !matches!(self, Op::IsNull | Op::IsNotNull)
    }
}

/// One WHERE-clause predicate plus the combinator joining it to the previous one.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `column operator value`. The combinator of the first predicate is ignored;
    /// a missing combinator after the first renders as `AND`.
    Predicate {
        combinator: Option<Combinator>,
        column: Ident,
        op: Op,
        value: Value,
    },
    /// Raw SQL appended verbatim.
    ///
    /// # Safety
    /// Be careful with SQL injection when using custom conditions.
    Custom(String),
}

impl Condition {
    /// Create a structured predicate with no combinator.
    pub fn new(column: impl Into<Ident>, op: Op, value: impl Into<Value>) -> Self {
        Condition::Predicate {
            combinator: None,
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    /// Create a structured predicate with an explicit combinator.
    pub fn with(
        combinator: Combinator,
        column: impl Into<Ident>,
        op: Op,
        value: impl Into<Value>,
    ) -> Self {
        Self::new(column, op, value).combine(combinator)
    }

    /// Create a raw SQL condition.
    pub fn custom(sql: impl Into<String>) -> Self {
        Condition::Custom(sql.into())
    }

    /// Set the combinator joining this predicate to the previous one.
    ///
    /// Has no effect on [`Condition::Custom`].
    pub fn combine(mut self, with: Combinator) -> Self {
        if let Condition::Predicate { combinator, .. } = &mut self {
            *combinator = Some(with);
        }
        self
    }

    /// Join to the previous predicate with `AND`.
    pub fn and(self) -> Self {
        self.combine(Combinator::And)
    }

    /// Join to the previous predicate with `OR`.
    pub fn or(self) -> Self {
        self.combine(Combinator::Or)
    }

    // ==================== Convenience constructors ====================

    /// column = value
    pub fn eq(column: impl Into<Ident>, value: impl Into<Value>) -> Self {
        Self::new(column, Op::Eq, value)
    }

    /// column != value
    pub fn ne(column: impl Into<Ident>, value: impl Into<Value>) -> Self {
        Self::new(column, Op::Ne, value)
    }

    /// column > value
    pub fn gt(column: impl Into<Ident>, value: impl Into<Value>) -> Self {
        Self::new(column, Op::Gt, value)
    }

    /// column >= value
    pub fn gte(column: impl Into<Ident>, value: impl Into<Value>) -> Self {
        Self::new(column, Op::Gte, value)
    }

    /// column < value
    pub fn lt(column: impl Into<Ident>, value: impl Into<Value>) -> Self {
        Self::new(column, Op::Lt, value)
    }

    /// column <= value
    pub fn lte(column: impl Into<Ident>, value: impl Into<Value>) -> Self {
        Self::new(column, Op::Lte, value)
    }

    /// column LIKE pattern
    pub fn like(column: impl Into<Ident>, pattern: impl Into<Value>) -> Self {
        Self::new(column, Op::Like, pattern)
    }

    /// column IS NULL
    pub fn is_null(column: impl Into<Ident>) -> Self {
        Self::new(column, Op::IsNull, Value::Null)
    }

    /// column IS NOT NULL
    pub fn is_not_null(column: impl Into<Ident>) -> Self {
        Self::new(column, Op::IsNotNull, Value::Null)
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, Condition::Custom(_))
    }
}

/// Whether rendering `conditions` produces any SQL at all.
pub(crate) fn renders_anything(conditions: &[Condition]) -> bool {
    conditions.iter().any(|c| match c {
        Condition::Predicate { .. } => true,
        Condition::Custom(sql) => !sql.trim().is_empty(),
    })
}

/// Append `conditions` to `sql`, space-separated, without the `WHERE` keyword.
///
/// Only structured predicates count towards the position that decides whether a
/// combinator is emitted; custom fragments carry their own glue.
pub(crate) fn append_conditions(sql: &mut SqlBuf, conditions: &[Condition]) {
    let mut predicates = 0usize;
    let mut first_part = true;
    let mut sep = |sql: &mut SqlBuf| {
        if !std::mem::take(&mut first_part) {
            sql.push(" ");
        }
    };

    for condition in conditions {
        match condition {
            Condition::Custom(raw) => {
                let raw = raw.trim();
                if raw.is_empty() {
                    continue;
                }
                sep(sql);
                sql.push(raw);
            }
            Condition::Predicate {
                combinator,
                column,
                op,
                value,
            } => {
                sep(sql);
                if predicates > 0 {
                    sql.push(combinator.unwrap_or(Combinator::And).as_sql());
                    sql.push(" ");
                }
                sql.push_ident(column);
                sql.push(" ");
                sql.push(op.as_sql());
                if op.takes_value() {
                    sql.push(" ");
                    sql.push_value(value.clone());
                }
                predicates += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(conditions: &[Condition]) -> SqlBuf {
        let mut sql = SqlBuf::empty();
        append_conditions(&mut sql, conditions);
        sql
    }

    #[test]
    fn first_combinator_is_ignored() {
        let sql = render(&[
            Condition::eq("a", 1).or(),
            Condition::eq("b", 2).and(),
            Condition::eq("c", 3).or(),
        ]);
        assert_eq!(sql.to_sql(), "a = $1 AND b = $2 OR c = $3");
        assert_eq!(sql.params().len(), 3);
    }

    #[test]
    fn missing_combinator_defaults_to_and() {
        let sql = render(&[Condition::eq("a", 1), Condition::eq("b", 2)]);
        assert_eq!(sql.to_sql(), "a = $1 AND b = $2");
    }

    #[test]
    fn custom_is_verbatim_and_takes_no_combinator_slot() {
        let sql = render(&[
            Condition::custom("(x = 'it''s' OR y > 3)"),
            Condition::eq("a", 1).or(),
            Condition::custom("AND z IS NOT NULL"),
            Condition::ne("b", "q").or(),
        ]);
        assert_eq!(
            sql.to_sql(),
            "(x = 'it''s' OR y > 3) a = $1 AND z IS NOT NULL OR b != $2"
        );
    }

    #[test]
    fn blank_custom_is_skipped() {
        let sql = render(&[Condition::custom("  "), Condition::eq("a", 1)]);
        assert_eq!(sql.to_sql(), "a = $1");
        assert!(!renders_anything(&[Condition::custom("")]));
        assert!(renders_anything(&[Condition::is_null("a")]));
    }

    #[test]
    fn null_checks_take_no_value() {
        let sql = render(&[Condition::is_null("a"), Condition::is_not_null("b").or()]);
        assert_eq!(sql.to_sql(), "a IS NULL OR b IS NOT NULL");
        assert!(sql.params().is_empty());
    }

    #[test]
    fn raw_and_null_values_are_inlined() {
        let sql = render(&[
            Condition::lt("created_at", Value::raw("NOW()")),
            Condition::eq("deleted_by", Value::Null),
        ]);
        assert_eq!(sql.to_sql(), "created_at < NOW() AND deleted_by = NULL");
        assert!(sql.params().is_empty());
    }

    #[test]
    fn with_sets_combinator() {
        let c = Condition::with(Combinator::Or, "a", Op::Like, "x%");
        assert!(matches!(
            c,
            Condition::Predicate {
                combinator: Some(Combinator::Or),
                op: Op::Like,
                ..
            }
        ));
        assert!(!c.is_custom());
        assert_eq!(Condition::custom("1=1").or(), Condition::custom("1=1"));
    }
}
