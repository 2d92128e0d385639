//! # sqlite-facade-conn
//!
//! Connection manager for `sqlite-facade`, built on SQLx.
//!
//! ## Core Types
//!
//! - **[`SqliteDatabase`]**: database handle with separate read and write pools
//! - **[`SqliteDatabaseConfig`]**: pool and timeout settings
//! - **[`WriteGuard`]**: RAII guard ensuring exclusive write access
//! - **[`Error`]**: error type for connection-level operations
//!
//! ## Architecture
//!
//! - **Dual pools**: read-only pool (default 6 connections) and write pool (1 connection)
//! - **Lazy WAL mode**: Write-Ahead Logging enabled on first write
//! - **Attached schemas**: schemas are attached database files, attached to
//!   every pooled connection on acquisition
//!
//! ## Usage
//!
//! ```no_run
//! use sqlite_facade_conn::SqliteDatabase;
//!
//! #[tokio::main]
//! async fn main() -> sqlite_facade_conn::Result<()> {
//!    let db = SqliteDatabase::connect("app.db", None).await?;
//!    db.create_schema("audit").await?;
//!
//!    let mut tx = db.begin_write().await?;
//!    sqlx::query("CREATE TABLE audit.events (id INTEGER PRIMARY KEY, kind TEXT)")
//!       .execute(&mut *tx)
//!       .await?;
//!    tx.commit().await?;
//!
//!    let rows = sqlx::query("SELECT * FROM audit.events")
//!       .fetch_all(db.read_pool()?)
//!       .await?;
//!    assert!(rows.is_empty());
//!
//!    db.close().await
//! }
//! ```

mod config;
mod database;
mod error;
mod schema;
mod write_guard;

pub use config::SqliteDatabaseConfig;
pub use database::SqliteDatabase;
pub use error::{Error, Result};
pub use write_guard::WriteGuard;
