//! Sequences emulated with one-row tables.
//!
//! A sequence `name` is a table holding `(last_value, increment_by)`.
//! Advancing it is a single `UPDATE … RETURNING`, so it needs the writer.

use crate::ident::{quote_qualified, validate_identifier};
use crate::{Error, Result, Statement};

/// Parsed `name` or `schema.name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceName {
   schema: Option<String>,
   name: String,
}

impl SequenceName {
   pub fn parse(qualified: &str) -> Result<Self> {
      let invalid = || Error::InvalidSequenceName(qualified.to_string());

      let (schema, name) = match qualified.split_once('.') {
         Some((schema, name)) => (Some(schema), name),
         None => (None, qualified),
      };

      if let Some(schema) = schema {
         validate_identifier(schema).map_err(|_| invalid())?;
      }
      validate_identifier(name).map_err(|_| invalid())?;

      Ok(Self {
         schema: schema.map(str::to_string),
         name: name.to_string(),
      })
   }

   pub fn schema(&self) -> Option<&str> {
      self.schema.as_deref()
   }

   pub fn name(&self) -> &str {
      &self.name
   }

   pub fn qualified_name(&self) -> String {
      quote_qualified(self.schema.as_deref(), &self.name)
   }

   /// Create the backing table and seed it so the first advance yields `start`.
   ///
   /// Fails if the sequence already exists.
   pub fn create_statements(&self, start: i64, increment: i64) -> [Statement; 2] {
      let table = self.qualified_name();
      [
         Statement::new(format!(
            "CREATE TABLE {table} (\
             last_value INTEGER NOT NULL, \
             increment_by INTEGER NOT NULL)"
         )),
         Statement::new(format!(
            "INSERT INTO {table} (last_value, increment_by) VALUES (?1, ?2)"
         ))
         .bind(start - increment)
         .bind(increment),
      ]
   }

   /// Advance and return the new value.
   pub fn next_value_statement(&self) -> Statement {
      Statement::new(format!(
         "UPDATE {} SET last_value = last_value + increment_by RETURNING last_value",
         self.qualified_name()
      ))
   }
}

impl std::fmt::Display for SequenceName {
   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
      match &self.schema {
         Some(schema) => write!(f, "{}.{}", schema, self.name),
         None => f.write_str(&self.name),
      }
   }
}
