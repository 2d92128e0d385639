//! # sqlite-facade-sql
//!
//! Statement layer for `sqlite-facade`: table metadata, entity payloads,
//! equality filters and conflict-aware SQL builders. Nothing here holds a
//! connection; builders produce [`Statement`]s that callers execute.
//!
//! ## Core Types
//!
//! - **[`TableDef`]** / **[`ColumnDef`]**: declared table shape, the single
//!   source of truth for which fields an entity writes
//! - **[`Entity`]**: serde record mapped to a table row
//! - **[`TableRegistry`]**: ordered set of tables for bulk create/drop
//! - **[`Filter`]**: column equality conditions joined with `AND`
//! - **[`Statement`]**: SQL text plus JSON bind values
//! - **[`SequenceName`]**: sequence emulated as a one-row table
//!
//! ## Usage
//!
//! ```
//! use serde_json::json;
//! use sqlite_facade_sql::{ColumnDef, ColumnType, Filter, Row, TableDef, builders};
//!
//! let table = TableDef::new("users")
//!    .with_column(ColumnDef::new("id", ColumnType::Integer).primary_key())
//!    .with_column(ColumnDef::new("email", ColumnType::Text).unique());
//!
//! let mut row = Row::new();
//! row.insert("email".into(), json!("ada@example.com"));
//!
//! let upsert = builders::upsert(&table, &row, &["email"]).unwrap();
//! assert!(upsert.query.contains("ON CONFLICT (\"email\") DO UPDATE"));
//!
//! let select = builders::select(&table, &Filter::new().eq("id", 1), None).unwrap();
//! assert_eq!(select.values, vec![json!(1)]);
//! ```

pub mod builders;
mod decode;
mod entity;
mod error;
mod filter;
mod ident;
mod sequence;
mod statement;
mod table;

use indexmap::IndexMap;
use serde_json::Value as JsonValue;

pub use decode::{decode_row, decode_rows, to_json};
pub use entity::{Entity, TableRegistry};
pub use error::{Error, Result};
pub use filter::Filter;
pub use sequence::SequenceName;
pub use statement::{Statement, bind_value};
pub use table::{ColumnDef, ColumnType, TableDef};

/// Decoded row or write payload: column name → value, in column order.
pub type Row = IndexMap<String, JsonValue>;
