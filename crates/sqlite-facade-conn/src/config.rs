//! Pool and timeout settings

use std::time::Duration;

/// Settings for the pools behind a [`SqliteDatabase`](crate::SqliteDatabase)
///
/// ```
/// use std::time::Duration;
/// use sqlite_facade_conn::SqliteDatabaseConfig;
///
/// let config = SqliteDatabaseConfig {
///    max_read_connections: 2,
///    acquire_timeout: Duration::from_secs(5),
///    ..Default::default()
/// };
/// assert_eq!(config.busy_timeout, Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct SqliteDatabaseConfig {
   /// Size of the read-only pool. Default: 6
   pub max_read_connections: u32,

   /// Idle connections in either pool are closed after this long. Default: 30s
   pub idle_timeout: Duration,

   /// Upper bound on waiting for a pooled connection. Default: 30s
   ///
   /// The writer pool has one connection, so an open write unit of work
   /// makes other writers wait up to this long.
   pub acquire_timeout: Duration,

   /// SQLite busy handler timeout on every connection. Default: 5s
   pub busy_timeout: Duration,
}

impl Default for SqliteDatabaseConfig {
   fn default() -> Self {
      Self {
         max_read_connections: 6,
         idle_timeout: Duration::from_secs(30),
         acquire_timeout: Duration::from_secs(30),
         busy_timeout: Duration::from_secs(5),
      }
   }
}
