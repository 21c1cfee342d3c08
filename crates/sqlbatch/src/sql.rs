//! SQL text assembly with automatic placeholder numbering.
//!
//! [`SqlBuf`] stores SQL pieces and bound values separately and generates
//! `$1, $2, ...` placeholders when rendered, so builders never track indices.
//!
//! ```ignore
//! let mut q = SqlBuf::new("SELECT id FROM users WHERE status = ");
//! q.push_value(Value::from("active"));
//! assert_eq!(q.to_sql(), "SELECT id FROM users WHERE status = $1");
//! ```

use crate::condition::{Condition, append_conditions};
use crate::ident::Ident;
use crate::value::Value;
use std::fmt::Write;

#[derive(Debug, Clone, PartialEq)]
enum SqlPart {
    Raw(String),
    Param,
}

/// A parameter-safe SQL buffer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SqlBuf {
    parts: Vec<SqlPart>,
    params: Vec<Value>,
}

impl SqlBuf {
    /// Create a new buffer with an initial SQL fragment.
    pub fn new(initial_sql: impl Into<String>) -> Self {
        Self {
            parts: vec![SqlPart::Raw(initial_sql.into())],
            params: Vec::new(),
        }
    }

    /// Create an empty buffer.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Append raw SQL (no parameters).
    pub fn push(&mut self, sql: &str) -> &mut Self {
        if sql.is_empty() {
            return self;
        }

        match self.parts.last_mut() {
            Some(SqlPart::Raw(last)) => last.push_str(sql),
            _ => self.parts.push(SqlPart::Raw(sql.to_string())),
        }
        self
    }

    /// Append an identifier, quoted where needed.
    pub fn push_ident(&mut self, ident: &Ident) -> &mut Self {
        let mut s = String::new();
        ident.write_sql(&mut s);
        self.push(&s)
    }

    /// Append a comma-separated identifier list.
    pub fn push_ident_list<'a>(
        &mut self,
        idents: impl IntoIterator<Item = &'a Ident>,
    ) -> &mut Self {
        for (i, ident) in idents.into_iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.push_ident(ident);
        }
        self
    }

    /// Append a value: `NULL` and raw SQL inline, anything else as a placeholder.
    pub fn push_value(&mut self, value: Value) -> &mut Self {
        match value {
            Value::Null => self.push("NULL"),
            Value::Raw(raw) => self.push(&raw),
            bound => {
                self.parts.push(SqlPart::Param);
                self.params.push(bound);
                self
            }
        }
    }

    /// Append WHERE-clause conditions (without the `WHERE` keyword).
    pub fn push_conditions(&mut self, conditions: &[Condition]) -> &mut Self {
        append_conditions(self, conditions);
        self
    }

    /// Append another buffer, consuming it.
    pub fn push_sql(&mut self, mut other: SqlBuf) -> &mut Self {
        self.parts.append(&mut other.parts);
        self.params.append(&mut other.params);
        self
    }

    /// Render SQL with `$1, $2, ...` placeholders.
    pub fn to_sql(&self) -> String {
        let mut idx: usize = 0;
        self.render(|out| {
            idx += 1;
            let _ = write!(out, "${idx}");
        })
    }

    /// Render SQL with every parameter written as an escaped literal.
    ///
    /// Meant for logs and diagnostics; execution always binds parameters.
    pub fn to_inline_sql(&self) -> String {
        let mut params = self.params.iter();
        self.render(|out| {
            if let Some(value) = params.next() {
                out.push_str(&value.to_literal());
            }
        })
    }

    fn render(&self, mut param: impl FnMut(&mut String)) -> String {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                SqlPart::Raw(s) => out.push_str(s),
                SqlPart::Param => param(&mut out),
            }
        }
        out
    }

    /// Bound values, in placeholder order.
    pub fn params(&self) -> &[Value] {
        &self.params
    }
}

/// Strip leading whitespace, SQL comments (`--` and `/* */`), and parentheses
/// from a SQL string to find the first meaningful keyword.
pub(crate) fn strip_sql_prefix(sql: &str) -> &str {
    let mut s = sql;
    loop {
        let before = s;
        s = s.trim_start();
        if s.starts_with("--") {
            if let Some(pos) = s.find('\n') {
                s = &s[pos + 1..];
                continue;
            }
            return "";
        }
        if s.starts_with("/*") {
            if let Some(pos) = s.find("*/") {
                s = &s[pos + 2..];
                continue;
            }
            return "";
        }
        if let Some(rest) = s.strip_prefix('(') {
            s = rest;
            continue;
        }
        if s == before {
            break;
        }
    }
    s
}

/// Split SQL text into its top-level statements.
///
/// `;` inside quoted strings, quoted identifiers, comments and dollar-quoted
/// bodies does not split. Blank pieces are dropped.
pub(crate) fn split_statements(sql: &str) -> Vec<&str> {
    let bytes = sql.as_bytes();
    let mut out = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'\'' | b'"') => {
                // E'...' strings allow backslash escapes.
                let escapes =
                    quote == b'\'' && i > 0 && bytes[i - 1].eq_ignore_ascii_case(&b'e');
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    if escapes && bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                i = sql[i..].find('\n').map_or(bytes.len(), |p| i + p);
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = sql[i + 2..].find("*/").map_or(bytes.len(), |p| i + 2 + p + 1);
            }
            b'$' => {
                let mut j = i + 1;
                while j < bytes.len() && (bytes[j].is_ascii_alphanumeric() || bytes[j] == b'_') {
                    j += 1;
                }
                let is_tag = j < bytes.len()
                    && bytes[j] == b'$'
                    && !bytes.get(i + 1).is_some_and(u8::is_ascii_digit);
                if is_tag {
                    let tag = &sql[i..=j];
                    i = sql[j + 1..]
                        .find(tag)
                        .map_or(bytes.len(), |p| j + p + tag.len());
                }
            }
            b';' => {
                out.push(&sql[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    if start < bytes.len() {
        out.push(&sql[start..]);
    }

    out.retain(|stmt| !stmt.trim().is_empty());
    out
}

/// Whether `keyword` appears in `s` as a whole word, ignoring case.
pub(crate) fn contains_keyword(s: &str, keyword: &str) -> bool {
    s.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '$'))
        .any(|word| word.eq_ignore_ascii_case(keyword))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_placeholders_in_order() {
        let mut q = SqlBuf::new("SELECT * FROM users WHERE a = ");
        q.push_value(Value::Int(1))
            .push(" AND b = ")
            .push_value(Value::from("x"));

        assert_eq!(q.to_sql(), "SELECT * FROM users WHERE a = $1 AND b = $2");
        assert_eq!(q.params().len(), 2);
    }

    #[test]
    fn can_compose_fragments() {
        let mut w = SqlBuf::empty();
        w.push(" WHERE id = ").push_value(Value::Int(42));

        let mut q = SqlBuf::new("SELECT * FROM users");
        q.push_sql(w);

        assert_eq!(q.to_sql(), "SELECT * FROM users WHERE id = $1");
        assert_eq!(q.params(), &[Value::Int(42)]);
    }

    #[test]
    fn inline_rendering_escapes_values() {
        let mut q = SqlBuf::new("SELECT 1 WHERE name = ");
        q.push_value(Value::from("O'Brien"))
            .push(" AND n = ")
            .push_value(Value::Int(3));
        assert_eq!(q.to_inline_sql(), "SELECT 1 WHERE name = 'O''Brien' AND n = 3");
    }

    #[test]
    fn ident_list_renders_commas() {
        let idents = [Ident::parse("id"), Ident::quoted("Name"), Ident::parse("user")];
        let mut q = SqlBuf::empty();
        q.push_ident_list(&idents);
        assert_eq!(q.to_sql(), r#"id, "Name", "user""#);
    }

    #[test]
    fn strip_prefix_skips_comments_and_parens() {
        assert_eq!(strip_sql_prefix("  -- note\n(SELECT 1)"), "SELECT 1)");
        assert_eq!(strip_sql_prefix("/* a */ INSERT"), "INSERT");
        assert_eq!(strip_sql_prefix("-- only a comment"), "");
    }

    #[test]
    fn split_on_top_level_semicolons() {
        assert_eq!(
            split_statements("BEGIN; INSERT INTO t VALUES (1); COMMIT"),
            vec!["BEGIN", " INSERT INTO t VALUES (1)", " COMMIT"]
        );
        assert_eq!(split_statements("SELECT 1;"), vec!["SELECT 1"]);
        assert_eq!(split_statements(" ; ;"), Vec::<&str>::new());
    }

    #[test]
    fn split_ignores_quoted_and_commented_semicolons() {
        assert_eq!(
            split_statements("SELECT 'a;b', \"c;d\"; COMMIT"),
            vec!["SELECT 'a;b', \"c;d\"", " COMMIT"]
        );
        assert_eq!(
            split_statements("SELECT E'it\\'s;'; END"),
            vec!["SELECT E'it\\'s;'", " END"]
        );
        assert_eq!(
            split_statements("SELECT 1 -- x; y\n; /* ; */ COMMIT"),
            vec!["SELECT 1 -- x; y\n", " /* ; */ COMMIT"]
        );
        assert_eq!(
            split_statements("DO $body$ BEGIN; END $body$; SELECT $1"),
            vec!["DO $body$ BEGIN; END $body$", " SELECT $1"]
        );
    }

    #[test]
    fn keyword_must_be_a_whole_word() {
        assert!(contains_keyword("where id > 3", "WHERE"));
        assert!(contains_keyword("RETURNING id WHERE(x)", "WHERE"));
        assert!(!contains_keyword("RETURNING somewhere_id", "WHERE"));
        assert!(!contains_keyword("RETURNING nowhere", "WHERE"));
    }
}
