//! Equality filters.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::Result;
use crate::ident::quote_identifier;
use crate::table::TableDef;

/// Column → expected value, combined with `AND`.
///
/// A `null` value matches with `IS NULL`. An empty filter matches every row.
///
/// ```
/// use serde_json::json;
/// use sqlite_facade_sql::Filter;
///
/// let filter = Filter::new().eq("name", "Ada").eq("deleted_at", json!(null));
/// assert_eq!(filter.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filter(IndexMap<String, JsonValue>);

impl Filter {
   pub fn new() -> Self {
      Self::default()
   }

   /// Add an equality condition.
   pub fn eq(mut self, column: impl Into<String>, value: impl Into<JsonValue>) -> Self {
      self.0.insert(column.into(), value.into());
      self
   }

   pub fn is_empty(&self) -> bool {
      self.0.is_empty()
   }

   pub fn len(&self) -> usize {
      self.0.len()
   }

   pub fn get(&self, column: &str) -> Option<&JsonValue> {
      self.0.get(column)
   }

   pub fn iter(&self) -> impl Iterator<Item = (&String, &JsonValue)> {
      self.0.iter()
   }

   /// Render ` WHERE …` with placeholders numbered from `first_param`.
   ///
   /// Returns an empty clause for an empty filter. Every column must be
   /// declared on `table`.
   pub(crate) fn where_clause(
      &self,
      table: &TableDef,
      first_param: usize,
   ) -> Result<(String, Vec<JsonValue>)> {
      if self.0.is_empty() {
         return Ok((String::new(), Vec::new()));
      }

      let mut conditions = Vec::with_capacity(self.0.len());
      let mut values = Vec::new();

      for (column, value) in &self.0 {
         table.check_column(column)?;
         let column = quote_identifier(column);
         if value.is_null() {
            conditions.push(format!("{column} IS NULL"));
         } else {
            conditions.push(format!("{column} = ?{}", first_param + values.len()));
            values.push(value.clone());
         }
      }

      Ok((format!(" WHERE {}", conditions.join(" AND ")), values))
   }
}

impl From<IndexMap<String, JsonValue>> for Filter {
   fn from(map: IndexMap<String, JsonValue>) -> Self {
      Self(map)
   }
}

impl<K, V> FromIterator<(K, V)> for Filter
where
   K: Into<String>,
   V: Into<JsonValue>,
{
   fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
      Self(
         iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect(),
      )
   }
}

#[cfg(test)]
mod tests {
   use super::*;
   use crate::{ColumnDef, ColumnType};
   use serde_json::json;

   fn people() -> TableDef {
      TableDef::new("people")
         .with_column(ColumnDef::new("id", ColumnType::Integer).primary_key())
         .with_column(ColumnDef::new("name", ColumnType::Text))
         .with_column(ColumnDef::new("age", ColumnType::Integer).nullable())
   }

   #[test]
   fn test_empty_filter_has_no_clause() {
      let (clause, values) = Filter::new().where_clause(&people(), 1).unwrap();
      assert_eq!(clause, "");
      assert!(values.is_empty());
   }

   #[test]
   fn test_conditions_are_anded_and_numbered() {
      let filter = Filter::new().eq("name", "Ada").eq("age", 36);
      let (clause, values) = filter.where_clause(&people(), 3).unwrap();

      assert_eq!(clause, " WHERE \"name\" = ?3 AND \"age\" = ?4");
      assert_eq!(values, vec![json!("Ada"), json!(36)]);
   }

   #[test]
   fn test_null_uses_is_null_and_skips_binding() {
      let filter = Filter::new().eq("age", JsonValue::Null).eq("name", "Ada");
      let (clause, values) = filter.where_clause(&people(), 1).unwrap();

      assert_eq!(clause, " WHERE \"age\" IS NULL AND \"name\" = ?1");
      assert_eq!(values, vec![json!("Ada")]);
   }

   #[test]
   fn test_unknown_column_is_rejected() {
      let filter = Filter::new().eq("name; DROP TABLE people", 1);
      let err = filter.where_clause(&people(), 1).unwrap_err();
      assert_eq!(err.error_code(), "UNKNOWN_COLUMN");
   }

   #[test]
   fn test_from_iterator() {
      let filter: Filter = [("name", "Ada"), ("city", "London")].into_iter().collect();
      assert_eq!(filter.get("city"), Some(&json!("London")));
      assert_eq!(filter.len(), 2);
   }
}
