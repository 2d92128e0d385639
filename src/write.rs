//! Write facade.
//!
//! A [`WriteFacade`] owns at most one [`UnitOfWork`]. The first operation
//! opens it, later operations reuse it, and [`commit`](WriteFacade::commit),
//! [`rollback`](WriteFacade::rollback) or [`close`](WriteFacade::close) end
//! it. Any failing operation closes it before returning the error, discarding
//! everything not yet committed.

use std::sync::Arc;

use serde_json::Value as JsonValue;
use sqlite_facade_conn::SqliteDatabase;
use sqlite_facade_sql::{
   ColumnType, Entity, Filter, Row, SequenceName, Statement, TableDef, builders,
};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::session::{UnitOfWork, WriteQueryResult};
use crate::{Error, Result};

/// Outcome of an insert that ignores conflicts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
   /// Row was written; carries its primary key as returned by SQLite.
   ///
   /// A single-column key is the bare value. A composite key is an object
   /// of its columns.
   Inserted(JsonValue),
   /// Insert was ignored because of a conflict.
   Conflicted,
}

impl InsertOutcome {
   /// Key of the inserted row, when it is an integer.
   pub fn id(&self) -> Option<i64> {
      self.key().and_then(JsonValue::as_i64)
   }

   pub fn key(&self) -> Option<&JsonValue> {
      match self {
         InsertOutcome::Inserted(key) => Some(key),
         InsertOutcome::Conflicted => None,
      }
   }

   pub fn is_inserted(&self) -> bool {
      matches!(self, InsertOutcome::Inserted(_))
   }
}

/// Write operations sharing one unit of work until it is finalized.
///
/// # Example
///
/// ```no_run
/// # use std::sync::Arc;
/// # use sqlite_facade::{Filter, WriteFacade};
/// # use sqlite_facade_conn::SqliteDatabase;
/// # async fn example<E: sqlite_facade::Entity>(db: Arc<SqliteDatabase>, entity: E) -> sqlite_facade::Result<()> {
/// let mut writer = WriteFacade::new(db);
/// writer.upsert(&entity).await?;
/// writer.delete::<E>(&Filter::new().eq("id", 7)).await?;
/// writer.commit().await?;
/// # Ok(())
/// # }
/// ```
pub struct WriteFacade {
   db: Arc<SqliteDatabase>,
   unit: Option<UnitOfWork>,
}

impl WriteFacade {
   pub fn new(db: Arc<SqliteDatabase>) -> Self {
      Self { db, unit: None }
   }

   /// Whether a unit of work is open.
   pub fn is_active(&self) -> bool {
      self.unit.is_some()
   }

   /// Id of the open unit of work.
   pub fn session_id(&self) -> Option<Uuid> {
      self.unit.as_ref().map(UnitOfWork::id)
   }

   /// Open a unit of work.
   ///
   /// Fails with [`Error::TransactionAlreadyActive`] if one is already open;
   /// the open one is left as it is.
   pub async fn start_transaction(&mut self) -> Result<()> {
      if let Some(unit) = &self.unit {
         return Err(Error::TransactionAlreadyActive(unit.id().to_string()));
      }

      let result = self.session().await.map(|_| ());
      self.complete("start_transaction", result).await
   }

   /// Stage an INSERT of the entity's payload.
   pub async fn insert<E: Entity>(&mut self, entity: &E) -> Result<()> {
      let result = async {
         let statement = builders::insert(E::table(), &entity.to_row()?)?;
         self.session().await?.stage(statement);
         Ok::<_, Error>(())
      }
      .await;
      self.complete("insert", result).await
   }

   /// Stage one INSERT per entity. Empty input does nothing.
   pub async fn bulk_insert<E: Entity>(&mut self, entities: &[E]) -> Result<()> {
      if entities.is_empty() {
         return Ok(());
      }

      let result = async {
         let statements = entities
            .iter()
            .map(|entity| -> Result<Statement> {
               Ok(builders::insert(E::table(), &entity.to_row()?)?)
            })
            .collect::<Result<Vec<_>>>()?;

         let unit = self.session().await?;
         for statement in statements {
            unit.stage(statement);
         }
         Ok::<_, Error>(())
      }
      .await;
      self.complete("bulk_insert", result).await
   }

   /// Insert, or on primary key conflict overwrite every payload column.
   pub async fn upsert<E: Entity>(&mut self, entity: &E) -> Result<()> {
      let key = match E::table().require_primary_key() {
         Ok(key) => key,
         Err(e) => return self.fail("upsert", e.into()).await,
      };
      self.upsert_rows("upsert", E::table(), entity.to_row(), &key).await
   }

   /// Insert, or on conflict against `index_elements` overwrite every
   /// payload column.
   pub async fn upsert_on<E: Entity>(&mut self, entity: &E, index_elements: &[&str]) -> Result<()> {
      self
         .upsert_rows("upsert_on", E::table(), entity.to_row(), index_elements)
         .await
   }

   async fn upsert_rows(
      &mut self,
      operation: &str,
      table: &TableDef,
      row: sqlite_facade_sql::Result<Row>,
      index_elements: &[&str],
   ) -> Result<()> {
      let result = async {
         let statement = builders::upsert(table, &row?, index_elements)?;
         self.session().await?.stage(statement);
         Ok::<_, Error>(())
      }
      .await;
      self.complete(operation, result).await
   }

   /// Insert unless it conflicts. Conflicts are not errors.
   pub async fn insert_ignore<E: Entity>(&mut self, entity: &E) -> Result<InsertOutcome> {
      let result = async {
         let row = entity.to_row()?;
         let unit = self.session().await?;
         insert_ignoring_conflicts(unit, E::table(), &row).await
      }
      .await;
      self.complete("insert_ignore", result).await
   }

   /// Insert unless it conflicts, and return the key of the inserted row or of
   /// the row it conflicted with.
   ///
   /// The key must be a single INTEGER column. Other tables fail with
   /// [`Error::NonIntegerKey`] before anything is written; use
   /// [`insert_ignore`](Self::insert_ignore) for those.
   ///
   /// The existing row is found through the table's first unique key, or
   /// failing that through the entity's non-null scalar columns. With the
   /// scalar fallback, any one of several matching rows may be returned.
   pub async fn insert_ignore_get_id<E: Entity>(&mut self, entity: &E) -> Result<i64> {
      let result = async {
         let table = E::table();
         require_integer_key(table)?;
         let row = entity.to_row()?;
         let unit = self.session().await?;

         match insert_ignoring_conflicts(unit, table, &row).await? {
            InsertOutcome::Inserted(key) => integer_key(table, &key),
            InsertOutcome::Conflicted => {
               let lookup = builders::conflict_lookup(table, &row)?;
               existing_key(unit, table, &lookup).await
            }
         }
      }
      .await;
      self.complete("insert_ignore_get_id", result).await
   }

   /// [`insert_ignore_get_id`](Self::insert_ignore_get_id) with an explicit
   /// lookup filter for the conflicting row.
   pub async fn insert_ignore_get_id_by<E: Entity>(
      &mut self,
      entity: &E,
      lookup: &Filter,
   ) -> Result<i64> {
      let result = async {
         let table = E::table();
         require_integer_key(table)?;
         if lookup.is_empty() {
            return Err(Error::Statement(
               sqlite_facade_sql::Error::EmptyLookupFilter {
                  table: table.display_name(),
               },
            ));
         }

         let row = entity.to_row()?;
         let unit = self.session().await?;

         match insert_ignoring_conflicts(unit, table, &row).await? {
            InsertOutcome::Inserted(key) => integer_key(table, &key),
            InsertOutcome::Conflicted => existing_key(unit, table, lookup).await,
         }
      }
      .await;
      self.complete("insert_ignore_get_id_by", result).await
   }

   /// One multi-row upsert.
   ///
   /// Update targets are `update_columns`, or every key of the first row.
   /// Empty input issues nothing and opens no unit of work.
   pub async fn bulk_upsert<E: Entity>(
      &mut self,
      rows: &[Row],
      index_elements: &[&str],
      update_columns: Option<&[&str]>,
   ) -> Result<u64> {
      if rows.is_empty() {
         return Ok(0);
      }

      let result = async {
         let Some(statement) =
            builders::bulk_upsert(E::table(), rows, index_elements, update_columns)?
         else {
            return Ok(0);
         };
         let unit = self.session().await?;
         Ok::<_, Error>(unit.execute(&statement).await?.rows_affected)
      }
      .await;
      self.complete("bulk_upsert", result).await
   }

   /// Single `UPDATE` of `properties` on every row matching `filter`.
   ///
   /// Returns rows affected. Empty properties do nothing. An empty filter
   /// matches every row.
   pub async fn update<E: Entity>(&mut self, filter: &Filter, properties: &Row) -> Result<u64> {
      if properties.is_empty() {
         return Ok(0);
      }

      let result = async {
         let Some(statement) = builders::update(E::table(), filter, properties)? else {
            return Ok(0);
         };
         let unit = self.session().await?;
         Ok::<_, Error>(unit.execute(&statement).await?.rows_affected)
      }
      .await;
      self.complete("update", result).await
   }

   /// Load every row matching `filter`, apply `mutate`, and stage an update
   /// by primary key for each.
   ///
   /// Holds all matched entities in memory. Returns the number of entities
   /// loaded.
   pub async fn update_with<E, F>(&mut self, filter: &Filter, mut mutate: F) -> Result<usize>
   where
      E: Entity,
      F: FnMut(&mut E) + Send,
   {
      let result = async {
         let table = E::table();
         let select = builders::select(table, filter, None)?;
         let unit = self.session().await?;
         let rows = unit.fetch_all(&select).await?;
         let loaded = rows.len();

         for row in rows {
            let mut entity = E::from_row(row)?;
            mutate(&mut entity);
            if let Some(statement) = builders::update_by_key(table, &entity.to_row()?)? {
               unit.stage(statement);
            }
         }
         Ok::<_, Error>(loaded)
      }
      .await;
      self.complete("update_with", result).await
   }

   /// Single `DELETE` of every row matching `filter`. Returns rows affected.
   pub async fn delete<E: Entity>(&mut self, filter: &Filter) -> Result<u64> {
      let result = async {
         let statement = builders::delete(E::table(), filter)?;
         let unit = self.session().await?;
         Ok::<_, Error>(unit.execute(&statement).await?.rows_affected)
      }
      .await;
      self.complete("delete", result).await
   }

   /// Run a caller-built write statement in the shared unit of work.
   pub async fn execute(&mut self, statement: &Statement) -> Result<WriteQueryResult> {
      let result = async { self.session().await?.execute(statement).await }.await;
      self.complete("execute", result).await
   }

   /// Run a caller-built statement in the shared unit of work and return its
   /// rows.
   pub async fn execute_statement(&mut self, statement: &Statement) -> Result<Vec<Row>> {
      let result = async { self.session().await?.fetch_all(statement).await }.await;
      self.complete("execute_statement", result).await
   }

   /// Advance a sequence and return its new value.
   pub async fn next_value(&mut self, sequence: &str) -> Result<i64> {
      let result = async {
         let sequence = SequenceName::parse(sequence)?;
         let unit = self.session().await?;
         let row = unit.fetch_optional(&sequence.next_value_statement()).await?;

         row.and_then(|row| row.get("last_value").and_then(JsonValue::as_i64))
            .ok_or_else(|| Error::Other(format!("sequence '{}' has no value row", sequence)))
      }
      .await;
      self.complete("next_value", result).await
   }

   /// Commit the unit of work. Does nothing when none is open.
   ///
   /// The unit of work is released whether or not the commit succeeds.
   pub async fn commit(&mut self) -> Result<()> {
      let Some(unit) = self.unit.take() else {
         return Ok(());
      };
      let id = unit.id();

      unit.commit().await.inspect_err(|e| {
         error!("commit failed in unit of work {}: {}", id, e);
      })
   }

   /// Roll back the unit of work. Does nothing when none is open.
   pub async fn rollback(&mut self) -> Result<()> {
      let Some(unit) = self.unit.take() else {
         return Ok(());
      };
      let id = unit.id();

      unit.rollback().await.inspect_err(|e| {
         error!("rollback failed in unit of work {}: {}", id, e);
      })
   }

   /// Discard and release the unit of work.
   pub async fn close(&mut self) -> Result<()> {
      match self.unit.take() {
         Some(unit) => unit.close().await,
         None => Ok(()),
      }
   }

   /// Open unit of work, creating it if absent.
   async fn session(&mut self) -> Result<&mut UnitOfWork> {
      if self.unit.is_none() {
         let unit = UnitOfWork::begin_write(&self.db).await?;
         debug!("Write facade created unit of work {}", unit.id());
         self.unit = Some(unit);
      }
      self.unit.as_mut().ok_or(Error::UnitOfWorkFinalized)
   }

   /// Session exit: flush on success, close on failure.
   async fn complete<T>(&mut self, operation: &str, result: Result<T>) -> Result<T> {
      let value = match result {
         Ok(value) => value,
         Err(e) => return self.fail(operation, e).await,
      };

      let flushed = match self.unit.as_mut() {
         Some(unit) => unit.flush().await,
         None => Ok(()),
      };

      match flushed {
         Ok(()) => Ok(value),
         Err(e) => self.fail(operation, e).await,
      }
   }

   async fn fail<T>(&mut self, operation: &str, err: Error) -> Result<T> {
      let id = self.session_id();
      error!(
         "{} failed in unit of work {:?} ({}): {}",
         operation,
         id,
         err.error_code(),
         err
      );

      if let Some(unit) = self.unit.take()
         && let Err(close_err) = unit.close().await
      {
         warn!("Failed to close unit of work {:?} after {}: {}", id, operation, close_err);
      }

      Err(err)
   }
}

impl std::fmt::Debug for WriteFacade {
   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
      f.debug_struct("WriteFacade")
         .field("db", &self.db.path())
         .field("unit", &self.unit)
         .finish()
   }
}

async fn insert_ignoring_conflicts(
   unit: &mut UnitOfWork,
   table: &TableDef,
   row: &Row,
) -> Result<InsertOutcome> {
   let statement = builders::insert_ignore(table, row)?;
   let Some(returned) = unit.fetch_optional(&statement).await? else {
      return Ok(InsertOutcome::Conflicted);
   };

   let key = if returned.len() == 1 {
      returned.into_values().next().unwrap_or(JsonValue::Null)
   } else {
      JsonValue::Object(returned.into_iter().collect())
   };
   Ok(InsertOutcome::Inserted(key))
}

fn require_integer_key(table: &TableDef) -> Result<()> {
   let key = table.require_primary_key()?;
   let integer = match key.as_slice() {
      [column] => table
         .column(column)
         .is_some_and(|c| c.column_type == ColumnType::Integer),
      _ => false,
   };
   if !integer {
      return Err(Error::NonIntegerKey {
         table: table.display_name(),
      });
   }
   Ok(())
}

fn integer_key(table: &TableDef, key: &JsonValue) -> Result<i64> {
   key.as_i64().ok_or_else(|| Error::MissingGeneratedKey {
      table: table.display_name(),
   })
}

async fn existing_key(unit: &mut UnitOfWork, table: &TableDef, lookup: &Filter) -> Result<i64> {
   let key = table.require_primary_key()?;
   let statement = builders::select(table, lookup, Some(1))?;

   let Some(row) = unit.fetch_optional(&statement).await? else {
      return Err(Error::LookupRowNotFound {
         table: table.display_name(),
      });
   };

   integer_key(table, row.get(key[0]).unwrap_or(&JsonValue::Null))
}
