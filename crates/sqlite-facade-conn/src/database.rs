//! SQLite database with a read pool, a single-writer pool and attached schemas

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite, Transaction};
use tracing::{debug, warn};

use crate::config::SqliteDatabaseConfig;
use crate::error::{Error, Result};
use crate::schema::{SchemaRegistry, attach_missing, quote_identifier, validate_schema_name};
use crate::write_guard::WriteGuard;

/// Schemas every SQLite connection already has.
const BUILTIN_SCHEMAS: [&str; 2] = ["main", "temp"];

/// SQLite database with connection pooling for concurrent reads and exclusive writes.
///
/// ## Architecture
///
/// - **`read_pool`**: read-only connections for concurrent reads
/// - **`write_conn`**: single-connection pool, so writes are serialized
/// - **`schemas`**: attached schema files; every connection handed out by either
///   pool has all registered schemas attached
///
/// WAL journal mode is enabled lazily on the first write.
#[derive(Debug)]
pub struct SqliteDatabase {
   /// Pool of read-only connections for concurrent reads
   read_pool: Pool<Sqlite>,

   /// Single read-write connection pool (max_connections=1) for serialized writes
   write_conn: Pool<Sqlite>,

   /// Tracks if WAL mode has been initialized (set on first write)
   wal_initialized: AtomicBool,

   /// Marks database as closed to prevent further operations
   closed: AtomicBool,

   /// Attached schema files, shared with the pool hooks
   schemas: SchemaRegistry,

   /// Path to the main database file
   path: PathBuf,
}

impl SqliteDatabase {
   /// Open (creating if missing) the database at `path`.
   pub async fn connect(
      path: impl AsRef<Path>,
      custom_config: Option<SqliteDatabaseConfig>,
   ) -> Result<Arc<Self>> {
      let path = path.as_ref().to_path_buf();
      let config = custom_config.unwrap_or_default();
      let schemas = SchemaRegistry::default();

      if let Some(parent) = path.parent()
         && !parent.as_os_str().is_empty()
      {
         tokio::fs::create_dir_all(parent).await?;
      }

      let write_options = SqliteConnectOptions::new()
         .filename(&path)
         .create_if_missing(true)
         .foreign_keys(true)
         .busy_timeout(config.busy_timeout);

      // The writer connects first so the file exists before read-only connections open it
      let write_conn = pool_options(1, &config, &schemas)
         .connect_with(write_options.clone())
         .await?;

      let read_pool = pool_options(config.max_read_connections, &config, &schemas)
         .connect_with(write_options.read_only(true))
         .await?;

      debug!("Connected to database: {}", path.display());

      Ok(Arc::new(Self {
         read_pool,
         write_conn,
         wal_initialized: AtomicBool::new(false),
         closed: AtomicBool::new(false),
         schemas,
         path,
      }))
   }

   /// Path of the main database file
   pub fn path(&self) -> &Path {
      &self.path
   }

   /// Pool of read-only connections.
   pub fn read_pool(&self) -> Result<&Pool<Sqlite>> {
      self.ensure_open()?;
      Ok(&self.read_pool)
   }

   /// Acquire exclusive write access.
   ///
   /// Enables WAL journal mode on the first call.
   pub async fn acquire_writer(&self) -> Result<WriteGuard> {
      self.ensure_open()?;
      let mut conn = self.write_conn.acquire().await?;

      if !self.wal_initialized.load(Ordering::Acquire) {
         sqlx::query("PRAGMA journal_mode = WAL")
            .execute(&mut *conn)
            .await?;
         self.wal_initialized.store(true, Ordering::Release);
         debug!("WAL mode enabled for: {}", self.path.display());
      }

      Ok(WriteGuard::new(conn))
   }

   /// Begin a transaction on the writer.
   ///
   /// The transaction holds the only write connection until it is committed,
   /// rolled back or dropped. Dropping it rolls back.
   pub async fn begin_write(&self) -> Result<Transaction<'static, Sqlite>> {
      if !self.wal_initialized.load(Ordering::Acquire) {
         drop(self.acquire_writer().await?);
      }
      self.ensure_open()?;
      Ok(self.write_conn.begin().await?)
   }

   /// Begin a read-only transaction on a pooled reader.
   pub async fn begin_read(&self) -> Result<Transaction<'static, Sqlite>> {
      Ok(self.read_pool()?.begin().await?)
   }

   /// Create a schema by attaching `<stem>.<name>.db` next to the main file.
   ///
   /// Once registered, the schema is attached to every connection either pool
   /// hands out. Returns [`Error::SchemaExists`] when the schema is built in,
   /// already registered, or its file already exists; in the last case the
   /// schema is still attached and registered.
   pub async fn create_schema(&self, name: &str) -> Result<()> {
      validate_schema_name(name)?;
      self.ensure_open()?;

      if BUILTIN_SCHEMAS.contains(&name.to_ascii_lowercase().as_str())
         || self.schemas.contains(name)
      {
         return Err(Error::SchemaExists(name.to_string()));
      }

      let schema_path = self.schema_path(name);
      let existed = tokio::fs::try_exists(&schema_path).await?;

      {
         let mut writer = self.acquire_writer().await?;
         let attach = format!("ATTACH DATABASE ?1 AS {}", quote_identifier(name));
         sqlx::query(&attach)
            .bind(schema_path.to_string_lossy().into_owned())
            .execute(&mut *writer)
            .await?;

         let wal = format!("PRAGMA {}.journal_mode = WAL", quote_identifier(name));
         sqlx::query(&wal).execute(&mut *writer).await?;
      }

      self.schemas.insert(name, schema_path);

      if existed {
         debug!("Attached existing schema: {}", name);
         return Err(Error::SchemaExists(name.to_string()));
      }

      debug!("Created schema: {}", name);
      Ok(())
   }

   /// Names of the registered (attached) schemas, in creation order
   pub fn schemas(&self) -> Vec<String> {
      self.schemas.names()
   }

   /// Close both pools. Further operations fail with [`Error::DatabaseClosed`].
   pub async fn close(&self) -> Result<()> {
      if self.closed.swap(true, Ordering::AcqRel) {
         return Ok(());
      }

      self.write_conn.close().await;
      self.read_pool.close().await;
      debug!("Closed database: {}", self.path.display());
      Ok(())
   }

   /// Close the database and delete its files, including attached schema files.
   pub async fn remove(&self) -> Result<()> {
      self.close().await?;

      let mut files = vec![self.path.clone()];
      files.extend(self.schemas.paths());

      for file in files {
         for suffix in ["", "-wal", "-shm"] {
            let mut target = file.clone().into_os_string();
            target.push(suffix);
            match tokio::fs::remove_file(&target).await {
               Ok(()) => {}
               Err(e) if e.kind() == ErrorKind::NotFound => {}
               Err(e) => {
                  warn!("Failed to remove {:?}: {}", target, e);
                  return Err(e.into());
               }
            }
         }
      }

      Ok(())
   }

   fn schema_path(&self, name: &str) -> PathBuf {
      let stem = self
         .path
         .file_stem()
         .map(|s| s.to_string_lossy().into_owned())
         .unwrap_or_else(|| "database".to_string());
      self.path.with_file_name(format!("{stem}.{name}.db"))
   }

   fn ensure_open(&self) -> Result<()> {
      if self.closed.load(Ordering::Acquire) {
         return Err(Error::DatabaseClosed);
      }
      Ok(())
   }
}

/// Pool options shared by both pools; the hooks attach registered schemas.
fn pool_options(
   max_connections: u32,
   config: &SqliteDatabaseConfig,
   schemas: &SchemaRegistry,
) -> SqlitePoolOptions {
   let on_connect = schemas.clone();
   let on_acquire = schemas.clone();

   SqlitePoolOptions::new()
      .max_connections(max_connections)
      .idle_timeout(config.idle_timeout)
      .acquire_timeout(config.acquire_timeout)
      .after_connect(move |conn, _meta| {
         let wanted = on_connect.snapshot();
         Box::pin(async move { attach_missing(conn, wanted).await })
      })
      .before_acquire(move |conn, _meta| {
         let wanted = on_acquire.snapshot();
         Box::pin(async move {
            attach_missing(conn, wanted).await?;
            Ok(true)
         })
      })
}
