//! Tagged values bound into statements and read back from rows.
//!
//! The caller decides how a value is sent: [`Value::Null`] is the SQL `NULL`
//! keyword, [`Value::Raw`] is spliced into the statement text verbatim, and every
//! other variant travels as a bound parameter. When binding, a value is coerced to
//! the column type the server inferred for its placeholder, so `Value::Text("42")`
//! can be compared against an `integer` column.

use bytes::BytesMut;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use std::error::Error;
use std::fmt;
use std::str::FromStr;
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};

type BoxError = Box<dyn Error + Sync + Send>;

/// A single SQL value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL `NULL`, emitted as the bare keyword.
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// SQL text inserted as-is (e.g. `NOW()`, `DEFAULT`). Never escaped.
    Raw(String),
}

impl Value {
    /// Create a raw SQL expression value.
    ///
    /// # Safety
    /// Be careful with SQL injection when using raw values.
    pub fn raw(sql: impl Into<String>) -> Self {
        Value::Raw(sql.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether this value is carried by a `$n` placeholder.
    pub fn is_bound(&self) -> bool {
        !matches!(self, Value::Null | Value::Raw(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Render the value as a SQL literal, escaping text so it cannot end its
    /// enclosing quotes early.
    pub fn to_literal(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(true) => "TRUE".to_string(),
            Value::Bool(false) => "FALSE".to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) if f.is_nan() => "'NaN'".to_string(),
            Value::Float(f) if f.is_infinite() && *f > 0.0 => "'Infinity'".to_string(),
            Value::Float(f) if f.is_infinite() => "'-Infinity'".to_string(),
            Value::Float(f) => f.to_string(),
            Value::Text(s) => quote_literal(s),
            Value::Raw(s) => s.clone(),
        }
    }
}

/// Quote a string as a PostgreSQL literal.
///
/// Single quotes are doubled. If the input contains a backslash the result uses
/// the `E'...'` form with backslashes doubled, so it reads the same whatever
/// `standard_conforming_strings` is set to. NUL characters are dropped since
/// PostgreSQL text cannot hold them.
pub fn quote_literal(s: &str) -> String {
    let escaped_backslash = s.contains('\\');
    let mut out = String::with_capacity(s.len() + 3);
    if escaped_backslash {
        out.push('E');
    }
    out.push('\'');
    for ch in s.chars() {
        match ch {
            '\'' => out.push_str("''"),
            '\\' => out.push_str("\\\\"),
            '\0' => {}
            _ => out.push(ch),
        }
    }
    out.push('\'');
    out
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_literal())
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Text(s) | Value::Raw(s) => serializer.serialize_str(s),
        }
    }
}

// ==================== Binding ====================

fn is_text_type(ty: &Type) -> bool {
    matches!(*ty, Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN)
        || ty.name() == "citext"
}

fn text_to_sql(s: &str, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    if is_text_type(ty) {
        return s.to_sql(ty, out);
    }
    let t = s.trim();
    match *ty {
        Type::BOOL => match t.to_ascii_lowercase().as_str() {
            "t" | "true" | "y" | "yes" | "on" | "1" => true.to_sql(ty, out),
            "f" | "false" | "n" | "no" | "off" | "0" => false.to_sql(ty, out),
            _ => Err(format!("invalid boolean literal: {t:?}").into()),
        },
        Type::INT2 => i16::from_str(t)?.to_sql(ty, out),
        Type::INT4 => i32::from_str(t)?.to_sql(ty, out),
        Type::INT8 => i64::from_str(t)?.to_sql(ty, out),
        Type::OID => u32::from_str(t)?.to_sql(ty, out),
        Type::FLOAT4 => f32::from_str(t)?.to_sql(ty, out),
        Type::FLOAT8 => f64::from_str(t)?.to_sql(ty, out),
        Type::NUMERIC => Decimal::from_str(t)?.to_sql(ty, out),
        Type::UUID => uuid::Uuid::parse_str(t)?.to_sql(ty, out),
        Type::JSON | Type::JSONB => serde_json::Value::from_str(t)?.to_sql(ty, out),
        Type::DATE => NaiveDate::from_str(t)?.to_sql(ty, out),
        Type::TIME => NaiveTime::from_str(t)?.to_sql(ty, out),
        Type::TIMESTAMP => parse_timestamp(t)?.to_sql(ty, out),
        Type::TIMESTAMPTZ => parse_timestamptz(t)?.to_sql(ty, out),
        _ => s.to_sql_checked(ty, out),
    }
}

fn parse_timestamp(s: &str) -> Result<NaiveDateTime, BoxError> {
    NaiveDateTime::from_str(s)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .map_err(Into::into)
}

fn parse_timestamptz(s: &str) -> Result<DateTime<FixedOffset>, BoxError> {
    DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%#z"))
        .map_err(Into::into)
}

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(b) if is_text_type(ty) => b.to_string().to_sql(ty, out),
            Value::Bool(b) => b.to_sql_checked(ty, out),
            Value::Int(i) => match *ty {
                Type::INT2 => i16::try_from(*i)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*i)?.to_sql(ty, out),
                Type::OID => u32::try_from(*i)?.to_sql(ty, out),
                Type::FLOAT4 => (*i as f32).to_sql(ty, out),
                Type::FLOAT8 => (*i as f64).to_sql(ty, out),
                Type::NUMERIC => Decimal::from(*i).to_sql(ty, out),
                _ if is_text_type(ty) => i.to_string().to_sql(ty, out),
                _ => i.to_sql_checked(ty, out),
            },
            Value::Float(f) => match *ty {
                Type::FLOAT4 => (*f as f32).to_sql(ty, out),
                Type::NUMERIC => Decimal::from_f64_retain(*f)
                    .ok_or_else(|| format!("{f} cannot be represented as numeric"))?
                    .to_sql(ty, out),
                _ if is_text_type(ty) => f.to_string().to_sql(ty, out),
                _ => f.to_sql_checked(ty, out),
            },
            Value::Text(s) => text_to_sql(s, ty, out),
            Value::Raw(s) => Err(format!("raw SQL {s:?} cannot be bound as a parameter").into()),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

// ==================== Conversions ====================

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::Text(s.clone())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Int(i64::from(v))
            }
        })*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Value::Float(f64::from(f))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Text(d.to_string())
    }
}

impl From<uuid::Uuid> for Value {
    fn from(u: uuid::Uuid) -> Self {
        Value::Text(u.to_string())
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Text(d.format("%Y-%m-%d").to_string())
    }
}

impl From<NaiveDateTime> for Value {
    fn from(ts: NaiveDateTime) -> Self {
        Value::Text(ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
    }
}

impl<Tz: chrono::TimeZone> From<DateTime<Tz>> for Value
where
    Tz::Offset: fmt::Display,
{
    fn from(ts: DateTime<Tz>) -> Self {
        Value::Text(ts.to_rfc3339())
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            other => Value::Text(other.to_string()),
        }
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bind(value: &Value, ty: &Type) -> Result<IsNull, BoxError> {
        let mut buf = BytesMut::new();
        value.to_sql_checked(ty, &mut buf)
    }

    #[test]
    fn quote_literal_doubles_quotes() {
        assert_eq!(quote_literal("O'Brien"), "'O''Brien'");
        assert_eq!(quote_literal("'; DROP TABLE t; --"), "'''; DROP TABLE t; --'");
    }

    #[test]
    fn quote_literal_uses_escape_form_for_backslashes() {
        assert_eq!(quote_literal(r"a\'b"), r"E'a\\''b'");
    }

    #[test]
    fn quote_literal_drops_nul() {
        assert_eq!(quote_literal("a\0b"), "'ab'");
    }

    #[test]
    fn literals_by_variant() {
        assert_eq!(Value::Null.to_literal(), "NULL");
        assert_eq!(Value::Bool(true).to_literal(), "TRUE");
        assert_eq!(Value::Int(-7).to_literal(), "-7");
        assert_eq!(Value::Float(1.5).to_literal(), "1.5");
        assert_eq!(Value::Float(f64::NAN).to_literal(), "'NaN'");
        assert_eq!(Value::Text("x".into()).to_literal(), "'x'");
        assert_eq!(Value::raw("NOW()").to_literal(), "NOW()");
    }

    #[test]
    fn option_maps_none_to_null() {
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some("a")), Value::Text("a".into()));
    }

    #[test]
    fn bound_variants() {
        assert!(Value::Int(1).is_bound());
        assert!(Value::from("a").is_bound());
        assert!(!Value::Null.is_bound());
        assert!(!Value::raw("DEFAULT").is_bound());
    }

    #[test]
    fn int_narrows_to_column_type() {
        assert!(bind(&Value::Int(5), &Type::INT4).is_ok());
        assert!(bind(&Value::Int(i64::MAX), &Type::INT4).is_err());
        assert!(bind(&Value::Int(5), &Type::NUMERIC).is_ok());
        assert!(bind(&Value::Int(5), &Type::TEXT).is_ok());
    }

    #[test]
    fn text_coerces_to_column_type() {
        assert!(bind(&Value::from("42"), &Type::INT4).is_ok());
        assert!(bind(&Value::from("forty-two"), &Type::INT4).is_err());
        assert!(bind(&Value::from("t"), &Type::BOOL).is_ok());
        assert!(bind(&Value::from("12.50"), &Type::NUMERIC).is_ok());
        assert!(bind(&Value::from("2024-03-01 10:00:00"), &Type::TIMESTAMP).is_ok());
        assert!(bind(&Value::from("2024-03-01T10:00:00Z"), &Type::TIMESTAMPTZ).is_ok());
        assert!(bind(&Value::from(r#"{"a":1}"#), &Type::JSONB).is_ok());
    }

    #[test]
    fn null_binds_as_null() {
        assert!(matches!(bind(&Value::Null, &Type::INT8), Ok(IsNull::Yes)));
    }

    #[test]
    fn raw_cannot_be_bound() {
        assert!(bind(&Value::raw("NOW()"), &Type::TIMESTAMP).is_err());
    }

    #[test]
    fn serializes_as_plain_json() {
        let json = serde_json::to_string(&vec![
            Value::Null,
            Value::Int(1),
            Value::from("a"),
            Value::Bool(false),
        ])
        .unwrap();
        assert_eq!(json, r#"[null,1,"a",false]"#);
    }
}
