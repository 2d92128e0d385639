//! Attached schema registry.
//!
//! SQLite schemas are per-connection: an `ATTACH` only affects the connection
//! that ran it. The registry remembers every schema created through
//! [`SqliteDatabase::create_schema`](crate::SqliteDatabase::create_schema) and
//! the pool hooks attach whatever a connection is missing before it is handed
//! out.

use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use sqlx::{Row, SqliteConnection};
use tracing::trace;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default)]
pub(crate) struct SchemaRegistry(Arc<RwLock<IndexMap<String, PathBuf>>>);

impl SchemaRegistry {
   pub(crate) fn contains(&self, name: &str) -> bool {
      self.0.read().contains_key(name)
   }

   pub(crate) fn insert(&self, name: &str, path: PathBuf) {
      self.0.write().insert(name.to_string(), path);
   }

   pub(crate) fn names(&self) -> Vec<String> {
      self.0.read().keys().cloned().collect()
   }

   pub(crate) fn paths(&self) -> Vec<PathBuf> {
      self.0.read().values().cloned().collect()
   }

   /// Copy of the registry, taken before any await point.
   pub(crate) fn snapshot(&self) -> Vec<(String, PathBuf)> {
      self
         .0
         .read()
         .iter()
         .map(|(name, path)| (name.clone(), path.clone()))
         .collect()
   }
}

/// Attach every schema in `wanted` that `conn` does not have yet.
pub(crate) async fn attach_missing(
   conn: &mut SqliteConnection,
   wanted: Vec<(String, PathBuf)>,
) -> std::result::Result<(), sqlx::Error> {
   if wanted.is_empty() {
      return Ok(());
   }

   // PRAGMA database_list returns: seq, name, file
   let attached: Vec<String> = sqlx::query("PRAGMA database_list")
      .fetch_all(&mut *conn)
      .await?
      .iter()
      .map(|row| row.try_get::<String, _>("name"))
      .collect::<std::result::Result<_, _>>()?;

   for (name, path) in wanted {
      if attached.iter().any(|a| a == &name) {
         continue;
      }

      trace!("Attaching schema {} from {}", name, path.display());
      let attach = format!("ATTACH DATABASE ?1 AS {}", quote_identifier(&name));
      sqlx::query(&attach)
         .bind(path.to_string_lossy().into_owned())
         .execute(&mut *conn)
         .await?;
   }

   Ok(())
}

/// Schema names must match `[a-zA-Z_][a-zA-Z0-9_]*`.
pub(crate) fn validate_schema_name(name: &str) -> Result<()> {
   let mut chars = name.chars();
   let valid = match chars.next() {
      Some(first) => {
         (first.is_ascii_alphabetic() || first == '_')
            && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
      }
      None => false,
   };

   if valid {
      Ok(())
   } else {
      Err(Error::InvalidSchemaName(name.to_string()))
   }
}

/// Quotes a SQLite identifier.
pub(crate) fn quote_identifier(name: &str) -> String {
   format!("\"{}\"", name.replace('"', "\"\""))
}
