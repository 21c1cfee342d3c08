//! SQL identifier rendering.
//!
//! [`Ident`] represents a schema, table or column name, supporting dotted
//! notation and quoted segments. Unlike values, identifiers cannot be bound as
//! parameters, so every segment is rendered in a form the server reads back as
//! exactly one name:
//!
//! - unquoted input is folded to lower case, as PostgreSQL does, so `fURL` and
//!   `furl` name the same column; write `"fURL"` to keep the case
//! - lower-case names matching `[a-z_][a-z0-9_$]*` that are not reserved words
//!   are emitted bare
//! - everything else is double-quoted with `"` escaped as `""`
//! - a `*` segment passes through (`*`, `orders.*`)
//!
//! Parsing never fails. A malformed name renders as a quoted identifier the
//! server will reject when the statement runs.

/// A part of a SQL identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentPart {
    /// Name as written by the caller, without surrounding quotes.
    Name(String),
    /// The `*` wildcard.
    Star,
}

/// A SQL identifier (column, table, or schema name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub parts: Vec<IdentPart>,
}

// PostgreSQL reserved key words (SQL Key Words appendix, "reserved" column).
const RESERVED: &[&str] = &[
    "all", "analyse", "analyze", "and", "any", "array", "as", "asc", "asymmetric", "both",
    "case", "cast", "check", "collate", "column", "constraint", "create", "current_catalog",
    "current_date", "current_role", "current_time", "current_timestamp", "current_user",
    "default", "deferrable", "desc", "distinct", "do", "else", "end", "except", "false",
    "fetch", "for", "foreign", "from", "grant", "group", "having", "in", "initially",
    "intersect", "into", "lateral", "leading", "limit", "localtime", "localtimestamp", "not",
    "null", "offset", "on", "only", "or", "order", "placing", "primary", "references",
    "returning", "select", "session_user", "some", "symmetric", "system_user", "table",
    "then", "to", "trailing", "true", "union", "unique", "user", "using", "variadic", "when",
    "where", "window", "with",
];

impl Ident {
    /// Create a single-segment identifier, taken literally (dots included).
    pub fn quoted(name: &str) -> Self {
        Self {
            parts: vec![IdentPart::Name(name.to_string())],
        }
    }

    /// Parse an identifier string.
    ///
    /// - Dotted: `schema.table.column`
    /// - Unquoted segments are folded to lower case: `Users` is `users`
    /// - Quoted: `"CamelCase"."UserTable"` (`""` inside quotes is one `"`)
    /// - Mixed: `public."UserTable".id`
    pub fn parse(s: &str) -> Self {
        let mut parts = Vec::new();
        let mut chars = s.chars().peekable();

        loop {
            let mut name = String::new();
            if chars.peek() == Some(&'"') {
                chars.next();
                while let Some(c) = chars.next() {
                    if c == '"' {
                        if chars.peek() == Some(&'"') {
                            chars.next();
                            name.push('"');
                        } else {
                            break;
                        }
                    } else {
                        name.push(c);
                    }
                }
                // Anything between the closing quote and the next dot belongs to this part.
                while let Some(&c) = chars.peek() {
                    if c == '.' {
                        break;
                    }
                    name.push(c);
                    chars.next();
                }
                parts.push(IdentPart::Name(name));
            } else {
                while let Some(&c) = chars.peek() {
                    if c == '.' {
                        break;
                    }
                    name.push(c);
                    chars.next();
                }
                if name == "*" {
                    parts.push(IdentPart::Star);
                } else {
                    parts.push(IdentPart::Name(name.to_lowercase()));
                }
            }

            match chars.next() {
                Some('.') => continue,
                _ => break,
            }
        }

        Self { parts }
    }

    /// Render the identifier as SQL.
    pub fn to_sql(&self) -> String {
        let mut out = String::new();
        self.write_sql(&mut out);
        out
    }

    pub(crate) fn write_sql(&self, out: &mut String) {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            match part {
                IdentPart::Star => out.push('*'),
                IdentPart::Name(s) if is_bare(s) => out.push_str(s),
                IdentPart::Name(s) => {
                    out.push('"');
                    for ch in s.chars() {
                        match ch {
                            '"' => out.push_str("\"\""),
                            '\0' => {}
                            _ => out.push(ch),
                        }
                    }
                    out.push('"');
                }
            }
        }
    }
}

impl std::fmt::Display for Ident {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_sql())
    }
}

fn is_bare(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first == '_' || first.is_ascii_lowercase())
        && chars.all(|c| c == '_' || c == '$' || c.is_ascii_lowercase() || c.is_ascii_digit())
        && RESERVED.binary_search(&name).is_err()
}

impl From<&str> for Ident {
    fn from(s: &str) -> Self {
        Ident::parse(s)
    }
}

impl From<String> for Ident {
    fn from(s: String) -> Self {
        Ident::parse(&s)
    }
}

impl From<&String> for Ident {
    fn from(s: &String) -> Self {
        Ident::parse(s)
    }
}
