/// Result type alias for statement-layer operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building statements or mapping rows.
///
/// These never touch the connection manager; they are pure SQL-generation and
/// decoding errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
   /// Error from SQLx while decoding a value.
   #[error(transparent)]
   Sqlx(#[from] sqlx::Error),

   /// Entity could not be serialized to, or deserialized from, a row.
   #[error("serialization error: {0}")]
   Serialization(#[from] serde_json::Error),

   /// SQLite type that cannot be mapped to JSON.
   #[error("unsupported datatype: {0}")]
   UnsupportedDatatype(String),

   /// Identifier contains invalid characters.
   ///
   /// Identifiers must match `[a-zA-Z_][a-zA-Z0-9_]*`.
   #[error("invalid identifier '{name}': must match [a-zA-Z_][a-zA-Z0-9_]*")]
   InvalidIdentifier { name: String },

   /// Column is not declared on the table.
   #[error("table '{table}' has no column '{column}'")]
   UnknownColumn { table: String, column: String },

   /// Operation needs a primary key and the table declares none.
   #[error("table '{table}' has no primary key")]
   MissingPrimaryKey { table: String },

   /// Entity did not serialize to a JSON object.
   #[error("entity for table '{table}' must serialize to an object")]
   EntityNotObject { table: String },

   /// Entity payload has no columns to write.
   #[error("entity for table '{table}' has no column values")]
   EmptyPayload { table: String },

   /// Row in a multi-row statement does not carry the same columns as the first row.
   #[error("row {row} for table '{table}' does not have the same columns as the first row")]
   RowShapeMismatch { table: String, row: usize },

   /// Lookup filter for an ignored insert would match every row.
   #[error("no lookup columns available to find the existing row in '{table}'")]
   EmptyLookupFilter { table: String },

   /// Sequence name is not `name` or `schema.name`.
   #[error("invalid sequence name '{0}': expected 'name' or 'schema.name'")]
   InvalidSequenceName(String),
}

impl Error {
   /// Extract a structured error code from the error type.
   pub fn error_code(&self) -> String {
      match self {
         Error::Sqlx(e) => {
            if let Some(code) = e.as_database_error().and_then(|db_err| db_err.code()) {
               return format!("SQLITE_{}", code);
            }
            "SQLX_ERROR".to_string()
         }
         Error::Serialization(_) => "SERIALIZATION_ERROR".to_string(),
         Error::UnsupportedDatatype(_) => "UNSUPPORTED_DATATYPE".to_string(),
         Error::InvalidIdentifier { .. } => "INVALID_IDENTIFIER".to_string(),
         Error::UnknownColumn { .. } => "UNKNOWN_COLUMN".to_string(),
         Error::MissingPrimaryKey { .. } => "MISSING_PRIMARY_KEY".to_string(),
         Error::EntityNotObject { .. } => "ENTITY_NOT_OBJECT".to_string(),
         Error::EmptyPayload { .. } => "EMPTY_PAYLOAD".to_string(),
         Error::RowShapeMismatch { .. } => "ROW_SHAPE_MISMATCH".to_string(),
         Error::EmptyLookupFilter { .. } => "EMPTY_LOOKUP_FILTER".to_string(),
         Error::InvalidSequenceName(_) => "INVALID_SEQUENCE_NAME".to_string(),
      }
   }
}
