//! Caller-built statements and JSON value binding.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::Sqlite;
use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;

/// SQL text plus positional bind values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
   pub query: String,
   pub values: Vec<JsonValue>,
}

impl Statement {
   pub fn new(query: impl Into<String>) -> Self {
      Self {
         query: query.into(),
         values: Vec::new(),
      }
   }

   /// Append one bind value.
   pub fn bind(mut self, value: impl Into<JsonValue>) -> Self {
      self.values.push(value.into());
      self
   }

   pub fn with_values(mut self, values: Vec<JsonValue>) -> Self {
      self.values = values;
      self
   }

   /// SQLx query with every value bound.
   pub fn to_query(&self) -> Query<'_, Sqlite, SqliteArguments<'_>> {
      self
         .values
         .iter()
         .cloned()
         .fold(sqlx::query(&self.query), bind_value)
   }
}

/// Bind a JSON value to a SQLx query
pub fn bind_value<'a>(
   query: Query<'a, Sqlite, SqliteArguments<'a>>,
   value: JsonValue,
) -> Query<'a, Sqlite, SqliteArguments<'a>> {
   match value {
      JsonValue::Null => query.bind(None::<String>),
      JsonValue::Bool(flag) => query.bind(flag),
      JsonValue::String(text) => query.bind(text),
      JsonValue::Number(number) => {
         // Preserve integer precision by binding as i64 when possible
         if let Some(int_val) = number.as_i64() {
            query.bind(int_val)
         } else if let Some(uint_val) = number.as_u64() {
            // u64 beyond i64::MAX does not fit SQLite's INTEGER
            match i64::try_from(uint_val) {
               Ok(int_val) => query.bind(int_val),
               Err(_) => query.bind(uint_val as f64),
            }
         } else {
            query.bind(number.as_f64().unwrap_or_default())
         }
      }
      // Arrays and objects are stored as JSON text
      other => query.bind(other),
   }
}
