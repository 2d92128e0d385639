//! Error types for sqlite-facade

use thiserror::Error;

/// Result type alias for facade operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that may occur while running facade operations.
#[derive(Error, Debug)]
pub enum Error {
   /// Error from SQLx while executing a statement or finalizing a transaction.
   #[error(transparent)]
   Sqlx(#[from] sqlx::Error),

   /// Error from the connection manager.
   #[error(transparent)]
   ConnectionManager(#[from] sqlite_facade_conn::Error),

   /// Error while building a statement or mapping a row.
   #[error(transparent)]
   Statement(#[from] sqlite_facade_sql::Error),

   /// Unit of work was already committed, rolled back or closed.
   #[error("unit of work has already been finalized")]
   UnitOfWorkFinalized,

   /// `start_transaction` was called while a unit of work is open.
   #[error("a transaction is already active in unit of work {0}")]
   TransactionAlreadyActive(String),

   /// Batch size of zero.
   #[error("batch size must be greater than zero")]
   InvalidBatchSize,

   /// An insert was ignored but no row matched the conflict lookup.
   #[error("insert into '{table}' was ignored but no existing row matched the lookup")]
   LookupRowNotFound { table: String },

   /// Row carried no integer primary key value.
   #[error("no integer key returned for '{table}'")]
   MissingGeneratedKey { table: String },

   /// Operation needs a single INTEGER primary key and the table has another.
   #[error("'{table}' has no single integer primary key")]
   NonIntegerKey { table: String },

   /// Generic error for operations that don't fit other categories.
   #[error("{0}")]
   Other(String),
}

impl Error {
   /// Extract a structured error code from the error type.
   ///
   /// Database errors carry the SQLite code as `SQLITE_<code>`.
   pub fn error_code(&self) -> String {
      match self {
         Error::Sqlx(e) => {
            if let Some(code) = e.as_database_error().and_then(|db_err| db_err.code()) {
               return format!("SQLITE_{}", code);
            }
            "SQLX_ERROR".to_string()
         }
         Error::ConnectionManager(e) => e.error_code().to_string(),
         Error::Statement(e) => e.error_code(),
         Error::UnitOfWorkFinalized => "UNIT_OF_WORK_FINALIZED".to_string(),
         Error::TransactionAlreadyActive(_) => "TRANSACTION_ALREADY_ACTIVE".to_string(),
         Error::InvalidBatchSize => "INVALID_BATCH_SIZE".to_string(),
         Error::LookupRowNotFound { .. } => "LOOKUP_ROW_NOT_FOUND".to_string(),
         Error::MissingGeneratedKey { .. } => "MISSING_GENERATED_KEY".to_string(),
         Error::NonIntegerKey { .. } => "NON_INTEGER_KEY".to_string(),
         Error::Other(_) => "ERROR".to_string(),
      }
   }
}
