//! Unit of work: one open transaction plus the statements staged on it.

use serde::{Deserialize, Serialize};
use sqlite_facade_conn::SqliteDatabase;
use sqlite_facade_sql::{Row, Statement, decode_rows};
use sqlx::{Sqlite, SqliteConnection, Transaction};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::{Error, Result};

/// Result returned from write operations (e.g. INSERT, UPDATE, DELETE).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteQueryResult {
   /// The number of rows affected by the write operation.
   pub rows_affected: u64,
   /// The last inserted row ID (SQLite ROWID).
   ///
   /// Only meaningful for INSERT statements on tables with a ROWID.
   pub last_insert_id: i64,
}

/// Which pool the unit of work runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
   Read,
   Write,
}

/// One transaction on one pooled connection.
///
/// Staged statements are pushed to the database by [`flush`](Self::flush),
/// and before any statement that needs their effects. Dropping a unit of
/// work that was never committed rolls it back.
#[must_use = "if unused, the unit of work is immediately rolled back"]
pub struct UnitOfWork {
   id: Uuid,
   mode: AccessMode,
   tx: Option<Transaction<'static, Sqlite>>,
   pending: Vec<Statement>,
}

impl UnitOfWork {
   /// Open a transaction on the writer. Waits while another write unit of
   /// work holds it.
   pub async fn begin_write(db: &SqliteDatabase) -> Result<Self> {
      let tx = db.begin_write().await?;
      Ok(Self::open(AccessMode::Write, tx))
   }

   /// Open a transaction on the read-only pool.
   pub async fn begin_read(db: &SqliteDatabase) -> Result<Self> {
      let tx = db.begin_read().await?;
      Ok(Self::open(AccessMode::Read, tx))
   }

   fn open(mode: AccessMode, tx: Transaction<'static, Sqlite>) -> Self {
      let id = Uuid::new_v4();
      debug!("Unit of work {} opened ({:?})", id, mode);
      Self {
         id,
         mode,
         tx: Some(tx),
         pending: Vec::new(),
      }
   }

   pub fn id(&self) -> Uuid {
      self.id
   }

   pub fn mode(&self) -> AccessMode {
      self.mode
   }

   pub fn pending(&self) -> usize {
      self.pending.len()
   }

   /// Queue a statement for the next flush.
   pub fn stage(&mut self, statement: Statement) {
      trace!("Unit of work {} staged: {}", self.id, statement.query);
      self.pending.push(statement);
   }

   /// Execute staged statements in order without ending the transaction.
   pub async fn flush(&mut self) -> Result<()> {
      if self.pending.is_empty() {
         return Ok(());
      }

      let id = self.id;
      let pending = std::mem::take(&mut self.pending);
      let count = pending.len();
      let conn = self.connection()?;

      for statement in &pending {
         trace!("Unit of work {} executing: {}", id, statement.query);
         statement.to_query().execute(&mut *conn).await?;
      }

      debug!("Unit of work {} flushed {} statement(s)", id, count);
      Ok(())
   }

   /// Flush, then execute one statement.
   pub async fn execute(&mut self, statement: &Statement) -> Result<WriteQueryResult> {
      self.flush().await?;
      trace!("Unit of work {} executing: {}", self.id, statement.query);

      let result = statement.to_query().execute(self.connection()?).await?;
      Ok(WriteQueryResult {
         rows_affected: result.rows_affected(),
         last_insert_id: result.last_insert_rowid(),
      })
   }

   /// Flush, then run a statement and decode every row.
   pub async fn fetch_all(&mut self, statement: &Statement) -> Result<Vec<Row>> {
      self.flush().await?;
      trace!("Unit of work {} fetching: {}", self.id, statement.query);

      let rows = statement.to_query().fetch_all(self.connection()?).await?;
      Ok(decode_rows(rows)?)
   }

   /// Flush, then run a statement and decode its first row.
   pub async fn fetch_optional(&mut self, statement: &Statement) -> Result<Option<Row>> {
      Ok(self.fetch_all(statement).await?.into_iter().next())
   }

   /// Connection of the open transaction.
   pub(crate) fn connection(&mut self) -> Result<&mut SqliteConnection> {
      self.tx.as_deref_mut().ok_or(Error::UnitOfWorkFinalized)
   }

   /// Flush and commit.
   pub async fn commit(mut self) -> Result<()> {
      self.flush().await?;
      let tx = self.tx.take().ok_or(Error::UnitOfWorkFinalized)?;
      tx.commit().await?;
      debug!("Unit of work {} committed", self.id);
      Ok(())
   }

   /// Discard staged statements and roll back.
   pub async fn rollback(mut self) -> Result<()> {
      self.pending.clear();
      let tx = self.tx.take().ok_or(Error::UnitOfWorkFinalized)?;
      tx.rollback().await?;
      debug!("Unit of work {} rolled back", self.id);
      Ok(())
   }

   /// Release the connection, discarding anything not committed.
   pub async fn close(mut self) -> Result<()> {
      let discarded = self.pending.len();
      self.pending.clear();
      if let Some(tx) = self.tx.take() {
         tx.rollback().await?;
      }
      debug!(
         "Unit of work {} closed ({} staged statement(s) discarded)",
         self.id, discarded
      );
      Ok(())
   }
}

impl Drop for UnitOfWork {
   fn drop(&mut self) {
      // The transaction rolls back when dropped; the connection returns to its pool
      if self.tx.is_some() {
         debug!("Dropping unit of work {} (will auto-rollback)", self.id);
      }
   }
}

impl std::fmt::Debug for UnitOfWork {
   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
      f.debug_struct("UnitOfWork")
         .field("id", &self.id)
         .field("mode", &self.mode)
         .field("open", &self.tx.is_some())
         .field("pending", &self.pending.len())
         .finish()
   }
}
