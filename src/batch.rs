//! Lazy batched reads.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{Stream, TryStreamExt};
use sqlite_facade_sql::{Row, Statement, decode_row};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::session::UnitOfWork;
use crate::{Error, Result};

/// Batch size used when none is given.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Forward-only stream of row batches.
///
/// A background task owns the read unit of work and produces one batch ahead
/// of the consumer. The stream ends after the last row, or after the first
/// error. Dropping it stops the producer and closes the unit of work.
#[must_use = "streams do nothing unless polled"]
pub struct RowBatches {
   rx: mpsc::Receiver<Result<Vec<Row>>>,
   producer: JoinHandle<()>,
}

impl RowBatches {
   pub(crate) fn spawn(unit: UnitOfWork, statement: Statement, batch_size: usize) -> Self {
      let (tx, rx) = mpsc::channel(1);

      let producer = tokio::spawn(async move {
         let mut unit = unit;
         let id = unit.id();

         let outcome = produce(&mut unit, &statement, batch_size, &tx).await;
         if let Err(err) = outcome {
            // Receiver may already be gone
            let _ = tx.send(Err(err)).await;
         }

         if let Err(err) = unit.close().await {
            warn!("Failed to close batch unit of work {}: {}", id, err);
         }
      });

      Self { rx, producer }
   }

   /// Next batch, or `None` once every row has been returned.
   pub async fn next_batch(&mut self) -> Option<Result<Vec<Row>>> {
      self.rx.recv().await
   }
}

async fn produce(
   unit: &mut UnitOfWork,
   statement: &Statement,
   batch_size: usize,
   tx: &mpsc::Sender<Result<Vec<Row>>>,
) -> Result<()> {
   let id = unit.id();
   let conn = unit.connection()?;
   let mut rows = statement.to_query().fetch(conn);

   let mut batch = Vec::with_capacity(batch_size);
   let mut sent = 0usize;

   while let Some(row) = rows.try_next().await? {
      batch.push(decode_row(&row).map_err(Error::from)?);

      if batch.len() == batch_size {
         let full = std::mem::replace(&mut batch, Vec::with_capacity(batch_size));
         if tx.send(Ok(full)).await.is_err() {
            debug!("Batch consumer for unit of work {} went away", id);
            return Ok(());
         }
         sent += 1;
      }
   }

   if !batch.is_empty() && tx.send(Ok(batch)).await.is_ok() {
      sent += 1;
   }

   debug!("Unit of work {} produced {} batch(es)", id, sent);
   Ok(())
}

impl Stream for RowBatches {
   type Item = Result<Vec<Row>>;

   fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
      self.rx.poll_recv(cx)
   }
}

impl Drop for RowBatches {
   fn drop(&mut self) {
      if !self.producer.is_finished() {
         self.producer.abort();
      }
   }
}
