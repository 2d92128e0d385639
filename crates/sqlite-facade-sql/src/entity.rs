//! Entities and the table registry.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::table::TableDef;
use crate::{Result, Row, Statement};

/// A record type mapped to one table row.
///
/// The table definition is the entity's field list: [`to_row`](Entity::to_row)
/// reads exactly the declared columns from the serialized entity, so extra
/// serialized fields never reach the database.
///
/// ```
/// use std::sync::LazyLock;
///
/// use serde::{Deserialize, Serialize};
/// use sqlite_facade_sql::{ColumnDef, ColumnType, Entity, TableDef};
///
/// static USERS: LazyLock<TableDef> = LazyLock::new(|| {
///    TableDef::new("users")
///       .with_column(ColumnDef::new("id", ColumnType::Integer).primary_key())
///       .with_column(ColumnDef::new("name", ColumnType::Text))
/// });
///
/// #[derive(Serialize, Deserialize)]
/// struct User {
///    id: Option<i64>,
///    name: String,
/// }
///
/// impl Entity for User {
///    fn table() -> &'static TableDef {
///       &USERS
///    }
/// }
///
/// let row = User { id: None, name: "Ada".into() }.to_row().unwrap();
/// assert_eq!(row["name"], "Ada");
/// ```
pub trait Entity: Serialize + DeserializeOwned + Send + Sync {
   /// Table this entity maps to.
   fn table() -> &'static TableDef;

   /// Column payload for writes.
   fn to_row(&self) -> Result<Row> {
      Self::table().row_from(self)
   }

   /// Rebuild an entity from a decoded row.
   fn from_row(row: Row) -> Result<Self> {
      Self::table().entity_from(row)
   }
}

/// Registry of known tables, used to create or drop them all at once.
///
/// Tables are created in registration order and dropped in reverse.
#[derive(Debug, Clone, Default)]
pub struct TableRegistry {
   tables: Vec<&'static TableDef>,
}

impl TableRegistry {
   pub fn new() -> Self {
      Self::default()
   }

   /// Register the table of an entity type.
   pub fn register<E: Entity>(self) -> Self {
      self.register_table(E::table())
   }

   /// Register a table definition. Registering the same table twice is a no-op.
   pub fn register_table(mut self, table: &'static TableDef) -> Self {
      let name = table.qualified_name();
      if !self.tables.iter().any(|t| t.qualified_name() == name) {
         self.tables.push(table);
      }
      self
   }

   pub fn tables(&self) -> &[&'static TableDef] {
      &self.tables
   }

   pub fn is_empty(&self) -> bool {
      self.tables.is_empty()
   }

   pub fn create_statements(&self) -> Vec<Statement> {
      self
         .tables
         .iter()
         .map(|t| Statement::new(t.create_sql()))
         .collect()
   }

   pub fn drop_statements(&self) -> Vec<Statement> {
      self
         .tables
         .iter()
         .rev()
         .map(|t| Statement::new(t.drop_sql()))
         .collect()
   }
}
