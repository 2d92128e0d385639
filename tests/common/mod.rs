#![allow(dead_code)]

use std::sync::{Arc, LazyLock};

use serde::{Deserialize, Serialize};
use sqlite_facade::{
   ColumnDef, ColumnType, DdlManager, Entity, SqliteDatabase, TableDef, TableRegistry,
};
use tempfile::TempDir;
use time::OffsetDateTime;
use time::macros::datetime;

pub static CUSTOMERS: LazyLock<TableDef> = LazyLock::new(|| {
   TableDef::new("customers")
      .with_schema("crm")
      .with_column(ColumnDef::new("id", ColumnType::Integer).primary_key())
      .with_column(ColumnDef::new("email", ColumnType::Text).unique())
      .with_column(ColumnDef::new("name", ColumnType::Text))
      .with_column(ColumnDef::new("vip", ColumnType::Boolean).default_sql("0"))
});

/// No unique key: conflicts come from the composite primary key, lookups use
/// scalar columns.
pub static VISITS: LazyLock<TableDef> = LazyLock::new(|| {
   TableDef::new("visits")
      .with_schema("crm")
      .with_column(ColumnDef::new("id", ColumnType::Integer).primary_key())
      .with_column(ColumnDef::new("customer_id", ColumnType::Integer))
      .with_column(ColumnDef::new("page", ColumnType::Text))
      .with_column(ColumnDef::new("seen_at", ColumnType::Timestamp))
});

/// Natural TEXT key in the main database.
pub static CURRENCIES: LazyLock<TableDef> = LazyLock::new(|| {
   TableDef::new("currencies")
      .with_column(ColumnDef::new("code", ColumnType::Text).primary_key())
      .with_column(ColumnDef::new("name", ColumnType::Text))
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
   pub id: Option<i64>,
   pub email: String,
   pub name: String,
   pub vip: bool,
}

impl Customer {
   pub fn new(email: &str, name: &str) -> Self {
      Self {
         id: None,
         email: email.into(),
         name: name.into(),
         vip: false,
      }
   }

   pub fn with_id(mut self, id: i64) -> Self {
      self.id = Some(id);
      self
   }
}

impl Entity for Customer {
   fn table() -> &'static TableDef {
      &CUSTOMERS
   }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visit {
   pub id: Option<i64>,
   pub customer_id: i64,
   pub page: String,
   #[serde(with = "time::serde::rfc3339")]
   pub seen_at: OffsetDateTime,
}

impl Visit {
   pub fn new(customer_id: i64, page: &str) -> Self {
      Self {
         id: None,
         customer_id,
         page: page.into(),
         seen_at: datetime!(2024-03-01 12:00 UTC),
      }
   }
}

impl Entity for Visit {
   fn table() -> &'static TableDef {
      &VISITS
   }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Currency {
   pub code: String,
   pub name: String,
}

impl Currency {
   pub fn new(code: &str, name: &str) -> Self {
      Self {
         code: code.into(),
         name: name.into(),
      }
   }
}

impl Entity for Currency {
   fn table() -> &'static TableDef {
      &CURRENCIES
   }
}

pub fn registry() -> TableRegistry {
   TableRegistry::new()
      .register::<Customer>()
      .register::<Visit>()
      .register::<Currency>()
}

/// Database with the `crm` schema and every registered table created.
pub async fn create_test_db() -> (Arc<SqliteDatabase>, TempDir) {
   let temp_dir = TempDir::new().expect("Failed to create temp directory");
   let db = SqliteDatabase::connect(temp_dir.path().join("test.db"), None)
      .await
      .expect("Failed to connect to test database");

   let ddl = DdlManager::new(db.clone(), registry());
   ddl.create_schemas(&["crm"]).await.unwrap();
   ddl.create_tables().await.unwrap();

   (db, temp_dir)
}
