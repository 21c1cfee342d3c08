//! Statement builders: each call renders one statement and queues it.

use super::Db;
use crate::client::Connection;
use crate::condition::{Condition, renders_anything};
use crate::config::UnfilteredWritePolicy;
use crate::ident::Ident;
use crate::sql::{SqlBuf, contains_keyword};
use crate::statement::{Statement, StatementKind};
use crate::value::Value;

/// One entry of a SELECT list.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    /// A column name, quoted where needed. `*` and `table.*` are allowed.
    Column(Ident),
    /// A SQL expression emitted verbatim, e.g. `COUNT(*) AS total`.
    Expr(String),
}

impl Field {
    /// Create a raw SQL expression field.
    pub fn expr(sql: impl Into<String>) -> Self {
        Field::Expr(sql.into())
    }
}

impl From<&str> for Field {
    fn from(s: &str) -> Self {
        Field::Column(Ident::parse(s))
    }
}

impl From<&&str> for Field {
    fn from(s: &&str) -> Self {
        Field::Column(Ident::parse(s))
    }
}

impl From<String> for Field {
    fn from(s: String) -> Self {
        Field::Column(Ident::parse(&s))
    }
}

impl From<&String> for Field {
    fn from(s: &String) -> Self {
        Field::Column(Ident::parse(s))
    }
}

impl From<Ident> for Field {
    fn from(ident: Ident) -> Self {
        Field::Column(ident)
    }
}

/// One table or several, for the FROM list of [`Db::select`].
pub trait IntoTables {
    fn into_tables(self) -> Vec<Ident>;
}

impl IntoTables for &str {
    fn into_tables(self) -> Vec<Ident> {
        vec![Ident::parse(self)]
    }
}

impl IntoTables for String {
    fn into_tables(self) -> Vec<Ident> {
        vec![Ident::parse(&self)]
    }
}

impl IntoTables for &String {
    fn into_tables(self) -> Vec<Ident> {
        vec![Ident::parse(self)]
    }
}

impl IntoTables for Ident {
    fn into_tables(self) -> Vec<Ident> {
        vec![self]
    }
}

impl<const N: usize> IntoTables for [&str; N] {
    fn into_tables(self) -> Vec<Ident> {
        self.iter().map(|t| Ident::parse(t)).collect()
    }
}

impl IntoTables for &[&str] {
    fn into_tables(self) -> Vec<Ident> {
        self.iter().map(|t| Ident::parse(t)).collect()
    }
}

impl IntoTables for Vec<&str> {
    fn into_tables(self) -> Vec<Ident> {
        self.into_iter().map(Ident::parse).collect()
    }
}

impl IntoTables for Vec<String> {
    fn into_tables(self) -> Vec<Ident> {
        self.iter().map(|t| Ident::parse(t)).collect()
    }
}

impl<C: Connection> Db<C> {
    /// Queue `SELECT fields FROM tables [WHERE conditions] [extra]`.
    ///
    /// An empty field list selects `*`. Several tables render as a comma-joined
    /// FROM list; an empty condition list omits WHERE.
    ///
    /// ```ignore
    /// db.select(["fURL", "feed_title"], "feeds", [Condition::eq("fID", id)], "LIMIT 1");
    /// ```
    pub fn select<F: Into<Field>>(
        &mut self,
        fields: impl IntoIterator<Item = F>,
        tables: impl IntoTables,
        conditions: impl IntoIterator<Item = Condition>,
        extra: &str,
    ) -> &mut Self {
        let conditions: Vec<Condition> = conditions.into_iter().collect();
        let mut sql = SqlBuf::new("SELECT ");

        let mut any_field = false;
        for (i, field) in fields.into_iter().enumerate() {
            if i > 0 {
                sql.push(", ");
            }
            let field: Field = field.into();
            match field {
                Field::Column(ident) => {
                    sql.push_ident(&ident);
                }
                Field::Expr(expr) => {
                    sql.push(&expr);
                }
            }
            any_field = true;
        }
        if !any_field {
            sql.push("*");
        }

        sql.push(" FROM ");
        let tables: Vec<Ident> = tables
            .into_tables()
            .into_iter()
            .map(|t| self.qualify(t))
            .collect();
        sql.push_ident_list(&tables);

        push_where(&mut sql, &conditions);
        push_extra(&mut sql, extra);
        self.enqueue(Statement::built(StatementKind::Select, sql, conditions))
    }

    /// Queue `INSERT INTO table (columns) VALUES (values) [extra]`.
    ///
    /// Columns keep the iteration order of `fields`. [`Value::Null`] is written as
    /// the `NULL` keyword; an empty field list inserts `DEFAULT VALUES`.
    ///
    /// ```ignore
    /// db.insert([("name", Value::from("test")), ("admin", Value::Null)], "users", "RETURNING id");
    /// ```
    pub fn insert<K, V>(
        &mut self,
        fields: impl IntoIterator<Item = (K, V)>,
        table: impl Into<Ident>,
        extra: &str,
    ) -> &mut Self
    where
        K: Into<Ident>,
        V: Into<Value>,
    {
        let (columns, values): (Vec<Ident>, Vec<Value>) = fields
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .unzip();

        let mut sql = SqlBuf::new("INSERT INTO ");
        sql.push_ident(&self.qualify(table.into()));
        if columns.is_empty() {
            sql.push(" DEFAULT VALUES");
        } else {
            sql.push(" (");
            sql.push_ident_list(&columns);
            sql.push(") VALUES (");
            for (i, value) in values.into_iter().enumerate() {
                if i > 0 {
                    sql.push(", ");
                }
                sql.push_value(value);
            }
            sql.push(")");
        }

        push_extra(&mut sql, extra);
        self.enqueue(Statement::built(StatementKind::Insert, sql, Vec::new()))
    }

    /// Queue `UPDATE table SET column = value, ... [WHERE conditions] [extra]`.
    ///
    /// An empty field list is queued as rejected and fails when the batch reaches it.
    pub fn update<K, V>(
        &mut self,
        fields: impl IntoIterator<Item = (K, V)>,
        table: impl Into<Ident>,
        conditions: impl IntoIterator<Item = Condition>,
        extra: &str,
    ) -> &mut Self
    where
        K: Into<Ident>,
        V: Into<Value>,
    {
        let conditions: Vec<Condition> = conditions.into_iter().collect();
        let table = self.qualify(table.into());

        let mut sql = SqlBuf::new("UPDATE ");
        sql.push_ident(&table);
        sql.push(" SET ");
        let mut any_field = false;
        for (i, (column, value)) in fields.into_iter().enumerate() {
            if i > 0 {
                sql.push(", ");
            }
            let column: Ident = column.into();
            sql.push_ident(&column);
            sql.push(" = ");
            sql.push_value(value.into());
            any_field = true;
        }

        push_where(&mut sql, &conditions);
        push_extra(&mut sql, extra);

        let mut stmt = Statement::built(StatementKind::Update, sql, conditions);
        if !any_field {
            stmt = stmt.reject(format!("UPDATE {table} has no columns to set"));
        } else {
            stmt = self.guard_unfiltered(stmt, &table, extra);
        }
        self.enqueue(stmt)
    }

    /// Queue `DELETE FROM table [WHERE conditions] [extra]`.
    pub fn delete(
        &mut self,
        table: impl Into<Ident>,
        conditions: impl IntoIterator<Item = Condition>,
        extra: &str,
    ) -> &mut Self {
        let conditions: Vec<Condition> = conditions.into_iter().collect();
        let table = self.qualify(table.into());

        let mut sql = SqlBuf::new("DELETE FROM ");
        sql.push_ident(&table);
        push_where(&mut sql, &conditions);
        push_extra(&mut sql, extra);

        let stmt = Statement::built(StatementKind::Delete, sql, conditions);
        let stmt = self.guard_unfiltered(stmt, &table, extra);
        self.enqueue(stmt)
    }

    /// Queue SQL text exactly as given.
    ///
    /// Raw statements run over the simple query protocol, so the text may hold
    /// several `;`-separated statements (e.g. `BEGIN; ...; COMMIT`).
    pub fn queue_raw(&mut self, sql: impl Into<String>) -> &mut Self {
        self.enqueue(Statement::raw(sql))
    }

    /// Prefix a single-part table name with the configured schema.
    fn qualify(&self, table: Ident) -> Ident {
        if self.config.schema.is_empty() || table.parts.len() > 1 {
            return table;
        }
        let mut qualified = Ident::parse(&self.config.schema);
        qualified.parts.extend(table.parts);
        qualified
    }

    fn guard_unfiltered(&self, stmt: Statement, table: &Ident, extra: &str) -> Statement {
        if renders_anything(stmt.conditions()) || contains_keyword(extra, "WHERE") {
            return stmt;
        }
        let kind = stmt.kind().as_str();
        match self.config.unfiltered_writes {
            UnfilteredWritePolicy::Allow => stmt,
            UnfilteredWritePolicy::Warn => {
                tracing::warn!(
                    target: "sqlbatch.sql",
                    kind,
                    table = %table,
                    "statement has no conditions and affects every row"
                );
                stmt
            }
            UnfilteredWritePolicy::Error => {
                stmt.reject(format!("{} on {table} without conditions", kind.to_uppercase()))
            }
        }
    }
}

fn push_where(sql: &mut SqlBuf, conditions: &[Condition]) {
    if renders_anything(conditions) {
        sql.push(" WHERE ");
        sql.push_conditions(conditions);
    }
}

fn push_extra(sql: &mut SqlBuf, extra: &str) {
    let extra = extra.trim();
    if !extra.is_empty() {
        sql.push(" ");
        sql.push(extra);
    }
}
