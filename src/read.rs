//! Read facade.

use std::sync::Arc;

use serde_json::Value as JsonValue;
use sqlite_facade_conn::SqliteDatabase;
use sqlite_facade_sql::{Entity, Filter, Row, Statement, builders};
use tracing::{error, warn};

use crate::batch::{DEFAULT_BATCH_SIZE, RowBatches};
use crate::session::UnitOfWork;
use crate::{Error, Result};

/// Stateless reads, each in its own read-only unit of work.
///
/// Every call opens a fresh transaction on the read pool and closes it before
/// returning, on success or failure. Only committed data is visible.
#[derive(Debug, Clone)]
pub struct ReadFacade {
   db: Arc<SqliteDatabase>,
}

impl ReadFacade {
   pub fn new(db: Arc<SqliteDatabase>) -> Self {
      Self { db }
   }

   /// First row matching `filter`.
   ///
   /// Returns `None` when nothing matches and also when the row cannot be
   /// turned into `E`. Query failures are still returned as errors.
   pub async fn select<E: Entity>(&self, filter: &Filter) -> Result<Option<E>> {
      let statement = builders::select(E::table(), filter, Some(1))?;
      let row = self.fetch("select", &statement).await?.into_iter().next();

      Ok(row.and_then(|row| E::from_row(row).ok()))
   }

   /// Every row matching `filter`, in query order.
   pub async fn select_all<E: Entity>(&self, filter: &Filter) -> Result<Vec<E>> {
      let statement = builders::select(E::table(), filter, None)?;
      let rows = self.fetch("select_all", &statement).await?;

      Ok(rows
         .into_iter()
         .map(E::from_row)
         .collect::<sqlite_facade_sql::Result<Vec<_>>>()?)
   }

   /// Single value of the first row.
   ///
   /// `None` if no row matches or the row does not have exactly one column.
   pub async fn scalar(&self, statement: &Statement) -> Result<Option<JsonValue>> {
      let rows = self.fetch("scalar", statement).await?;

      Ok(rows
         .into_iter()
         .next()
         .filter(|row| row.len() == 1)
         .and_then(|row| row.into_values().next()))
   }

   /// Run a caller-built query and return every row.
   pub async fn execute(&self, statement: &Statement) -> Result<Vec<Row>> {
      self.fetch("execute", statement).await
   }

   /// Run a caller-built query and stream its rows in batches.
   ///
   /// `batch_size` defaults to [`DEFAULT_BATCH_SIZE`]. The unit of work stays
   /// open until the stream is exhausted or dropped.
   pub async fn execute_in_batch(
      &self,
      statement: Statement,
      batch_size: Option<usize>,
   ) -> Result<RowBatches> {
      let batch_size = batch_size.unwrap_or(DEFAULT_BATCH_SIZE);
      if batch_size == 0 {
         return Err(Error::InvalidBatchSize);
      }

      let unit = UnitOfWork::begin_read(&self.db).await.inspect_err(|e| {
         error!("execute_in_batch failed to open a unit of work: {}", e);
      })?;

      Ok(RowBatches::spawn(unit, statement, batch_size))
   }

   async fn fetch(&self, operation: &str, statement: &Statement) -> Result<Vec<Row>> {
      let mut unit = UnitOfWork::begin_read(&self.db).await.inspect_err(|e| {
         error!("{} failed to open a unit of work: {}", operation, e);
      })?;
      let id = unit.id();

      let result = unit.fetch_all(statement).await;

      if let Err(close_err) = unit.close().await {
         warn!("Failed to close unit of work {} after {}: {}", id, operation, close_err);
      }

      result.inspect_err(|e| {
         error!("{} failed in unit of work {}: {}", operation, id, e);
      })
   }
}
