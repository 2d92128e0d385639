//! Table metadata.
//!
//! A [`TableDef`] is the explicit field list of an entity type: column names,
//! declared types, keys and unique constraints. It drives DDL generation,
//! entity payload extraction and filter validation.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::trace;

use crate::ident::{quote_identifier, quote_qualified};
use crate::{Error, Result, Row};

/// Declared column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnType {
   Integer,
   Real,
   Text,
   Boolean,
   /// Stored as RFC 3339 text.
   Timestamp,
   /// Stored as JSON text, decoded back into JSON values.
   Json,
}

impl ColumnType {
   /// Type name used in `CREATE TABLE`.
   pub fn sql_type(self) -> &'static str {
      match self {
         ColumnType::Integer => "INTEGER",
         ColumnType::Real => "REAL",
         ColumnType::Text => "TEXT",
         ColumnType::Boolean => "BOOLEAN",
         ColumnType::Timestamp => "DATETIME",
         ColumnType::Json => "TEXT",
      }
   }

   /// Whether values of this type compare reliably by equality.
   ///
   /// Timestamps and JSON are excluded: their text form depends on formatting.
   pub fn is_scalar(self) -> bool {
      matches!(
         self,
         ColumnType::Integer | ColumnType::Real | ColumnType::Text | ColumnType::Boolean
      )
   }
}

/// A column of a [`TableDef`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
   pub name: String,
   pub column_type: ColumnType,
   pub nullable: bool,
   pub primary_key: bool,
   pub unique: bool,
   /// Raw SQL default expression
   pub default: Option<String>,
}

impl ColumnDef {
   /// A `NOT NULL` column with no key or default.
   pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
      Self {
         name: name.into(),
         column_type,
         nullable: false,
         primary_key: false,
         unique: false,
         default: None,
      }
   }

   pub fn nullable(mut self) -> Self {
      self.nullable = true;
      self
   }

   pub fn primary_key(mut self) -> Self {
      self.primary_key = true;
      self
   }

   pub fn unique(mut self) -> Self {
      self.unique = true;
      self
   }

   /// Raw SQL default, e.g. `CURRENT_TIMESTAMP`.
   pub fn default_sql(mut self, expression: impl Into<String>) -> Self {
      self.default = Some(expression.into());
      self
   }
}

/// Definition of one table.
///
/// ```
/// use sqlite_facade_sql::{ColumnDef, ColumnType, TableDef};
///
/// let users = TableDef::new("users")
///    .with_schema("auth")
///    .with_column(ColumnDef::new("id", ColumnType::Integer).primary_key())
///    .with_column(ColumnDef::new("email", ColumnType::Text).unique())
///    .with_column(ColumnDef::new("created_at", ColumnType::Timestamp).nullable());
///
/// assert_eq!(users.display_name(), "auth.users");
/// assert_eq!(users.primary_key(), vec!["id"]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDef {
   schema: Option<String>,
   name: String,
   columns: Vec<ColumnDef>,
   unique_constraints: Vec<Vec<String>>,
}

impl TableDef {
   pub fn new(name: impl Into<String>) -> Self {
      Self {
         schema: None,
         name: name.into(),
         columns: Vec::new(),
         unique_constraints: Vec::new(),
      }
   }

   /// Place the table in an attached schema.
   pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
      self.schema = Some(schema.into());
      self
   }

   pub fn with_column(mut self, column: ColumnDef) -> Self {
      self.columns.push(column);
      self
   }

   /// Add a multi-column `UNIQUE` constraint.
   pub fn with_unique<I, S>(mut self, columns: I) -> Self
   where
      I: IntoIterator<Item = S>,
      S: Into<String>,
   {
      self
         .unique_constraints
         .push(columns.into_iter().map(Into::into).collect());
      self
   }

   pub fn schema(&self) -> Option<&str> {
      self.schema.as_deref()
   }

   pub fn name(&self) -> &str {
      &self.name
   }

   pub fn columns(&self) -> &[ColumnDef] {
      &self.columns
   }

   pub fn column(&self, name: &str) -> Option<&ColumnDef> {
      self.columns.iter().find(|c| c.name == name)
   }

   /// `schema.table`, unquoted, for messages and logs.
   pub fn display_name(&self) -> String {
      match &self.schema {
         Some(schema) => format!("{}.{}", schema, self.name),
         None => self.name.clone(),
      }
   }

   /// Quoted, schema-qualified name for SQL.
   pub fn qualified_name(&self) -> String {
      quote_qualified(self.schema.as_deref(), &self.name)
   }

   /// Primary key columns in declaration order.
   pub fn primary_key(&self) -> Vec<&str> {
      self
         .columns
         .iter()
         .filter(|c| c.primary_key)
         .map(|c| c.name.as_str())
         .collect()
   }

   pub fn require_primary_key(&self) -> Result<Vec<&str>> {
      let key = self.primary_key();
      if key.is_empty() {
         return Err(Error::MissingPrimaryKey {
            table: self.display_name(),
         });
      }
      Ok(key)
   }

   /// Unique keys other than the primary key: table constraints first, then
   /// unique columns in declaration order.
   pub fn unique_keys(&self) -> Vec<Vec<&str>> {
      let mut keys: Vec<Vec<&str>> = self
         .unique_constraints
         .iter()
         .map(|cols| cols.iter().map(String::as_str).collect())
         .collect();
      keys.extend(
         self
            .columns
            .iter()
            .filter(|c| c.unique)
            .map(|c| vec![c.name.as_str()]),
      );
      keys
   }

   /// Look up a column, failing with [`Error::UnknownColumn`].
   pub fn check_column(&self, name: &str) -> Result<&ColumnDef> {
      self.column(name).ok_or_else(|| Error::UnknownColumn {
         table: self.display_name(),
         column: name.to_string(),
      })
   }

   /// `CREATE TABLE IF NOT EXISTS` for this table.
   pub fn create_sql(&self) -> String {
      let primary_key = self.primary_key();
      let inline_key = primary_key.len() == 1;

      let mut parts: Vec<String> = self
         .columns
         .iter()
         .map(|column| {
            let mut part = format!(
               "{} {}",
               quote_identifier(&column.name),
               column.column_type.sql_type()
            );
            if column.primary_key && inline_key {
               // An INTEGER PRIMARY KEY is the rowid alias, NULL assigns the next id
               if column.column_type != ColumnType::Integer {
                  part.push_str(" NOT NULL");
               }
               part.push_str(" PRIMARY KEY");
            } else if !column.nullable {
               part.push_str(" NOT NULL");
            }
            if column.unique {
               part.push_str(" UNIQUE");
            }
            if let Some(default) = &column.default {
               part.push_str(&format!(" DEFAULT ({default})"));
            }
            part
         })
         .collect();

      if !inline_key && !primary_key.is_empty() {
         parts.push(format!("PRIMARY KEY ({})", quote_list(&primary_key)));
      }

      for constraint in &self.unique_constraints {
         let cols: Vec<&str> = constraint.iter().map(String::as_str).collect();
         parts.push(format!("UNIQUE ({})", quote_list(&cols)));
      }

      format!(
         "CREATE TABLE IF NOT EXISTS {} ({})",
         self.qualified_name(),
         parts.join(", ")
      )
   }

   /// `DROP TABLE IF EXISTS` for this table.
   pub fn drop_sql(&self) -> String {
      format!("DROP TABLE IF EXISTS {}", self.qualified_name())
   }

   /// Extract the payload of `value`: exactly the declared columns present in
   /// its serialized form, in declaration order.
   ///
   /// An unset primary key column (`null`) is left out, so an insert lets
   /// SQLite assign it and a conflict update keeps the existing one.
   pub fn row_from<T: Serialize>(&self, value: &T) -> Result<Row> {
      let JsonValue::Object(mut fields) = serde_json::to_value(value)? else {
         return Err(Error::EntityNotObject {
            table: self.display_name(),
         });
      };

      let mut row = Row::with_capacity(self.columns.len());
      for column in &self.columns {
         match fields.remove(&column.name) {
            Some(JsonValue::Null) if column.primary_key => {}
            Some(value) => {
               row.insert(column.name.clone(), value);
            }
            None => {}
         }
      }
      Ok(row)
   }

   /// Build an entity from a decoded row.
   ///
   /// JSON columns stored as text are parsed back into JSON, and integer
   /// booleans become `true`/`false`.
   pub fn entity_from<T: DeserializeOwned>(&self, mut row: Row) -> Result<T> {
      for column in &self.columns {
         let Some(value) = row.get_mut(&column.name) else {
            continue;
         };
         let replacement = match (column.column_type, &*value) {
            (ColumnType::Json, JsonValue::String(text)) => serde_json::from_str(text)
               .inspect_err(|e| {
                  trace!(
                     "{}.{} holds text that is not JSON: {}",
                     self.display_name(),
                     column.name,
                     e
                  )
               })
               .ok(),
            (ColumnType::Boolean, JsonValue::Number(n)) => {
               Some(JsonValue::Bool(n.as_i64().unwrap_or_default() != 0))
            }
            _ => None,
         };
         if let Some(replacement) = replacement {
            *value = replacement;
         }
      }

      Ok(serde_json::from_value(JsonValue::Object(
         row.into_iter().collect(),
      ))?)
   }
}

pub(crate) fn quote_list(columns: &[&str]) -> String {
   columns
      .iter()
      .map(|c| quote_identifier(c))
      .collect::<Vec<_>>()
      .join(", ")
}
