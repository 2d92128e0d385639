//! Error types for sqlite-facade-conn

use thiserror::Error;

/// Errors that may occur when working with the connection manager
#[derive(Error, Debug)]
pub enum Error {
   /// IO error when accessing database files. Standard library IO errors
   /// are converted to this variant.
   #[error("IO error: {0}")]
   Io(#[from] std::io::Error),

   /// Error from the sqlx library. Standard sqlx errors are converted to this variant
   #[error("Sqlx error: {0}")]
   Sqlx(#[from] sqlx::Error),

   /// Database has been closed and cannot be used
   #[error("Database has been closed")]
   DatabaseClosed,

   /// Schema is already attached, already exists on disk, or is built in
   #[error("schema already exists: {0}")]
   SchemaExists(String),

   /// Schema name is not a plain identifier
   #[error("invalid schema name '{0}': must match [a-zA-Z_][a-zA-Z0-9_]*")]
   InvalidSchemaName(String),
}

impl Error {
   /// Machine-readable error code.
   pub fn error_code(&self) -> &'static str {
      match self {
         Error::Io(_) => "IO_ERROR",
         Error::Sqlx(_) => "SQLX_ERROR",
         Error::DatabaseClosed => "DATABASE_CLOSED",
         Error::SchemaExists(_) => "SCHEMA_EXISTS",
         Error::InvalidSchemaName(_) => "INVALID_SCHEMA_NAME",
      }
   }
}

/// A type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
