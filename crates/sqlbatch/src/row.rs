//! Result rows as ordered column-name → value maps.

use crate::error::{DbError, DbResult};
use crate::value::Value;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;
use tokio_postgres::types::Type;

/// Rows returned by one statement. Empty for statements that return no rows.
pub type ResultSet = Vec<Row>;

/// One result row. Column order follows the statement's select list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column. A repeated name shadows nothing; [`Row::get`] returns the first.
    pub fn push(&mut self, column: impl Into<String>, value: Value) {
        self.columns.push(column.into());
        self.values.push(value);
    }

    /// Value of the first column named `column`.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.values[i])
    }

    /// Value of the column at `idx`.
    pub fn get_idx(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(String::as_str).zip(self.values.iter())
    }

    /// Columns in order, skipping names already seen.
    fn distinct(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.iter()
            .enumerate()
            .filter(|(i, (column, _))| !self.columns[..*i].iter().any(|c| c == column))
            .map(|(_, entry)| entry)
    }

    /// Convert to a map keyed by column name (later duplicates are dropped).
    pub fn into_map(self) -> BTreeMap<String, Value> {
        let mut map = BTreeMap::new();
        for (column, value) in self.columns.into_iter().zip(self.values) {
            map.entry(column).or_insert(value);
        }
        map
    }

    /// Convert to a JSON object, preserving values' JSON types.
    pub fn to_json(&self) -> serde_json::Value {
        let mut obj = serde_json::Map::new();
        for (column, value) in self.distinct() {
            let v = serde_json::to_value(value).unwrap_or(serde_json::Value::Null);
            obj.insert(column.to_string(), v);
        }
        serde_json::Value::Object(obj)
    }

    /// Build a row from a row returned over the extended protocol.
    pub fn from_pg(row: &tokio_postgres::Row) -> DbResult<Self> {
        let mut out = Row::new();
        for (idx, column) in row.columns().iter().enumerate() {
            let value = decode_column(row, idx, column.type_())
                .map_err(|e| DbError::decode(column.name(), e))?;
            out.push(column.name(), value);
        }
        Ok(out)
    }

    /// Build a row from a simple-protocol row, where every value arrives as text.
    pub fn from_simple(row: &tokio_postgres::SimpleQueryRow) -> Self {
        let mut out = Row::new();
        for (idx, column) in row.columns().iter().enumerate() {
            let value = row
                .get(idx)
                .map_or(Value::Null, |s| Value::Text(s.to_string()));
            out.push(column.name(), value);
        }
        out
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (column, value) in iter {
            row.push(column, value);
        }
        row
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.distinct().count()))?;
        for (column, value) in self.distinct() {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

fn decode_column(row: &tokio_postgres::Row, idx: usize, ty: &Type) -> Result<Value, String> {
    fn get<'a, T: tokio_postgres::types::FromSql<'a>>(
        row: &'a tokio_postgres::Row,
        idx: usize,
    ) -> Result<Option<T>, String> {
        row.try_get::<_, Option<T>>(idx).map_err(|e| e.to_string())
    }

    let value = match *ty {
        Type::BOOL => get::<bool>(row, idx)?.map(Value::Bool),
        Type::CHAR => get::<i8>(row, idx)?.map(Value::from),
        Type::INT2 => get::<i16>(row, idx)?.map(Value::from),
        Type::INT4 => get::<i32>(row, idx)?.map(Value::from),
        Type::INT8 => get::<i64>(row, idx)?.map(Value::Int),
        Type::OID => get::<u32>(row, idx)?.map(Value::from),
        Type::FLOAT4 => get::<f32>(row, idx)?.map(Value::from),
        Type::FLOAT8 => get::<f64>(row, idx)?.map(Value::Float),
        Type::NUMERIC => get::<Decimal>(row, idx)?.map(Value::from),
        Type::UUID => get::<uuid::Uuid>(row, idx)?.map(Value::from),
        Type::JSON | Type::JSONB => get::<serde_json::Value>(row, idx)?
            .map(|v| Value::Text(v.to_string())),
        Type::DATE => get::<NaiveDate>(row, idx)?.map(Value::from),
        Type::TIME => get::<NaiveTime>(row, idx)?.map(|t| Value::Text(t.to_string())),
        Type::TIMESTAMP => get::<NaiveDateTime>(row, idx)?.map(Value::from),
        Type::TIMESTAMPTZ => get::<DateTime<Utc>>(row, idx)?.map(Value::from),
        Type::BYTEA => get::<Vec<u8>>(row, idx)?.map(|b| Value::Text(hex_bytea(&b))),
        _ => match get::<String>(row, idx) {
            Ok(v) => v.map(Value::Text),
            Err(_) => return Err(format!("unsupported column type {}", ty.name())),
        },
    };
    Ok(value.unwrap_or(Value::Null))
}

// Same text form the server uses for bytea_output = hex.
fn hex_bytea(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("\\x");
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Row {
        [
            ("id".to_string(), Value::Int(7)),
            ("name".to_string(), Value::from("ada")),
            ("admin".to_string(), Value::Null),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn lookup_by_name_and_index() {
        let row = sample();
        assert_eq!(row.get("name"), Some(&Value::from("ada")));
        assert_eq!(row.get_idx(0), Some(&Value::Int(7)));
        assert_eq!(row.get("missing"), None);
        assert_eq!(row.columns(), &["id", "name", "admin"]);
    }

    #[test]
    fn first_duplicate_column_wins() {
        let mut row = sample();
        row.push("id", Value::Int(99));
        assert_eq!(row.get("id"), Some(&Value::Int(7)));
        assert_eq!(row.clone().into_map().get("id"), Some(&Value::Int(7)));
        assert_eq!(row.to_json()["id"], serde_json::json!(7));
        assert_eq!(
            serde_json::to_string(&row).unwrap(),
            r#"{"id":7,"name":"ada","admin":null}"#
        );
    }

    #[test]
    fn serializes_in_column_order() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert_eq!(json, r#"{"id":7,"name":"ada","admin":null}"#);
    }

    #[test]
    fn bytea_hex() {
        assert_eq!(hex_bytea(&[0xde, 0xad, 0x01]), "\\xdead01");
    }
}
