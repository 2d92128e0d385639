//! DDL manager: schemas, tables, sequences and seed data.

use std::sync::Arc;

use sqlite_facade_conn::SqliteDatabase;
use sqlite_facade_sql::{Row, SequenceName, Statement, TableDef, TableRegistry, builders};
use tracing::{debug, error};

use crate::session::UnitOfWork;
use crate::{Error, Result};

/// Issues DDL and seed statements, each call in its own write unit of work.
///
/// Holds nothing but the database handle and the table registry.
#[derive(Debug, Clone)]
pub struct DdlManager {
   db: Arc<SqliteDatabase>,
   registry: TableRegistry,
}

impl DdlManager {
   pub fn new(db: Arc<SqliteDatabase>, registry: TableRegistry) -> Self {
      Self { db, registry }
   }

   pub fn registry(&self) -> &TableRegistry {
      &self.registry
   }

   /// Create each schema. Schemas that already exist are skipped.
   pub async fn create_schemas(&self, names: &[&str]) -> Result<()> {
      for name in names {
         match self.db.create_schema(name).await {
            Ok(()) => debug!("Created schema {}", name),
            Err(sqlite_facade_conn::Error::SchemaExists(_)) => {
               debug!("Schema {} already exists", name);
            }
            Err(e) => {
               error!("create_schemas failed for {}: {}", name, e);
               return Err(e.into());
            }
         }
      }
      Ok(())
   }

   /// Create every registered table, in registration order.
   pub async fn create_tables(&self) -> Result<()> {
      self
         .apply("create_tables", self.registry.create_statements())
         .await
         .map(|_| ())
   }

   /// Drop every registered table, in reverse registration order.
   pub async fn drop_tables(&self) -> Result<()> {
      self
         .apply("drop_tables", self.registry.drop_statements())
         .await
         .map(|_| ())
   }

   /// Create sequences starting at 1 and incrementing by 1.
   ///
   /// Each sequence is committed on its own. Fails on the first one that
   /// already exists; sequences created before it stay.
   pub async fn create_sequences(&self, names: &[&str]) -> Result<()> {
      let sequences = names
         .iter()
         .map(|name| SequenceName::parse(name))
         .collect::<sqlite_facade_sql::Result<Vec<_>>>()?;

      for sequence in sequences {
         self
            .apply("create_sequences", Vec::from(sequence.create_statements(1, 1)))
            .await?;
      }
      Ok(())
   }

   /// Insert literal rows in one transaction. Returns the number inserted.
   pub async fn seed_data(&self, table: &TableDef, rows: &[Row]) -> Result<u64> {
      if rows.is_empty() {
         return Ok(0);
      }

      let statements = rows
         .iter()
         .map(|row| builders::insert(table, row))
         .collect::<sqlite_facade_sql::Result<Vec<_>>>()?;

      let inserted = self.apply("seed_data", statements).await?;
      debug!("Seeded {} row(s) into {}", inserted, table.display_name());
      Ok(inserted)
   }

   /// Execute statements in one write unit of work and commit. Returns total
   /// rows affected.
   async fn apply(&self, operation: &str, statements: Vec<Statement>) -> Result<u64> {
      let result = async {
         let mut unit = UnitOfWork::begin_write(&self.db).await?;
         let mut affected = 0;
         for statement in &statements {
            affected += unit.execute(statement).await?.rows_affected;
         }
         unit.commit().await?;
         Ok::<_, Error>(affected)
      }
      .await;

      result.inspect_err(|e| error!("{} failed: {}", operation, e))
   }
}
