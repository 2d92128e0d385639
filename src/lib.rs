//! # sqlite-facade
//!
//! Session-scoped read, write and DDL operations over SQLite.
//!
//! - **[`WriteFacade`]**: owns one [`UnitOfWork`], opened on first use and
//!   reused until committed, rolled back or closed. Any failure closes it.
//! - **[`ReadFacade`]**: every call runs in a fresh read-only unit of work that
//!   is always closed afterwards.
//! - **[`DdlManager`]**: schemas, registered tables, sequences and seed rows.
//!
//! All three share an [`Arc<SqliteDatabase>`](SqliteDatabase) owned by the
//! application.
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::LazyLock;
//!
//! use serde::{Deserialize, Serialize};
//! use sqlite_facade::{
//!    ColumnDef, ColumnType, DdlManager, Entity, Filter, ReadFacade, SqliteDatabase, TableDef,
//!    TableRegistry, WriteFacade,
//! };
//!
//! static USERS: LazyLock<TableDef> = LazyLock::new(|| {
//!    TableDef::new("users")
//!       .with_column(ColumnDef::new("id", ColumnType::Integer).primary_key())
//!       .with_column(ColumnDef::new("email", ColumnType::Text).unique())
//! });
//!
//! #[derive(Serialize, Deserialize)]
//! struct User {
//!    id: Option<i64>,
//!    email: String,
//! }
//!
//! impl Entity for User {
//!    fn table() -> &'static TableDef {
//!       &USERS
//!    }
//! }
//!
//! #[tokio::main]
//! async fn main() -> sqlite_facade::Result<()> {
//!    let db = SqliteDatabase::connect("app.db", None).await?;
//!
//!    let ddl = DdlManager::new(db.clone(), TableRegistry::new().register::<User>());
//!    ddl.create_tables().await?;
//!
//!    let mut writer = WriteFacade::new(db.clone());
//!    let id = writer
//!       .insert_ignore_get_id(&User { id: None, email: "ada@example.com".into() })
//!       .await?;
//!    writer.commit().await?;
//!
//!    let reader = ReadFacade::new(db);
//!    let user: Option<User> = reader.select(&Filter::new().eq("id", id)).await?;
//!    assert!(user.is_some());
//!    Ok(())
//! }
//! ```

mod batch;
mod ddl;
mod error;
mod read;
mod session;
mod write;

pub use batch::{DEFAULT_BATCH_SIZE, RowBatches};
pub use ddl::DdlManager;
pub use error::{Error, Result};
pub use read::ReadFacade;
pub use session::{AccessMode, UnitOfWork, WriteQueryResult};
pub use write::{InsertOutcome, WriteFacade};

pub use sqlite_facade_conn::{SqliteDatabase, SqliteDatabaseConfig};
pub use sqlite_facade_sql::{
   ColumnDef, ColumnType, Entity, Filter, Row, SequenceName, Statement, TableDef, TableRegistry,
};
