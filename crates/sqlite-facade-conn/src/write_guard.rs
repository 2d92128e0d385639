//! Exclusive write access

use std::ops::{Deref, DerefMut};

use sqlx::SqliteConnection;
use sqlx::pool::PoolConnection;
use sqlx::Sqlite;

/// RAII guard over the single write connection.
///
/// While a guard is alive no other writer can acquire the connection. Dropping
/// it returns the connection to the write pool.
#[must_use = "if unused, the write connection is released immediately"]
#[derive(Debug)]
pub struct WriteGuard {
   conn: PoolConnection<Sqlite>,
}

impl WriteGuard {
   pub(crate) fn new(conn: PoolConnection<Sqlite>) -> Self {
      Self { conn }
   }
}

impl Deref for WriteGuard {
   type Target = SqliteConnection;

   fn deref(&self) -> &Self::Target {
      &self.conn
   }
}

impl DerefMut for WriteGuard {
   fn deref_mut(&mut self) -> &mut Self::Target {
      &mut self.conn
   }
}
