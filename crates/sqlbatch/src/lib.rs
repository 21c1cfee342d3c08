//! # sqlbatch
//!
//! Queue SQL statements and run them as one ordered batch on a PostgreSQL connection.
//!
//! ## Features
//!
//! - **Structured builders**: `select` / `insert` / `update` / `delete` from fields and conditions
//! - **Bound values**: every [`Value`] except [`Value::Raw`] is sent as a `$n` parameter
//! - **Ordered batches**: statements run one at a time, the first failure stops the batch
//! - **Single reconnect**: a dropped session is reopened once before a batch
//! - **Safe defaults**: UPDATE/DELETE without conditions is logged or rejected
//!
//! ## Example
//!
//! ```ignore
//! use sqlbatch::{Condition, Db, DbConfig, Value};
//!
//! let mut db = Db::connect(DbConfig::from_env()?).await?;
//!
//! db.select(["fURL", "feed_title"], "feeds", [Condition::eq("fID", 7)], "")
//!     .update([("last_checked", Value::raw("now()"))], "feeds", [Condition::eq("fID", 7)], "")
//!     .delete("items", [Condition::eq("fID", 7), Condition::lt("age", 30).or()], "");
//!
//! let results = db.run().await?;
//! let feed = &results[0];
//! ```

pub mod client;
pub mod condition;
pub mod config;
pub mod db;
pub mod error;
pub mod ident;
pub mod pg_client;
pub mod row;
pub mod sql;
pub mod statement;
pub mod value;

pub use client::Connection;
pub use condition::{Combinator, Condition, Op};
pub use config::{DbConfig, UnfilteredWritePolicy};
pub use db::{ConnectionState, Db, Field, IntoTables};
pub use error::{DbError, DbResult, ERR_CLONE, ERR_CONNECT_ERROR, ERR_UNAVAILABLE};
pub use ident::Ident;
pub use pg_client::PgConnection;
pub use row::{ResultSet, Row};
pub use sql::SqlBuf;
pub use statement::{Statement, StatementKind};
pub use value::{Value, quote_literal};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
