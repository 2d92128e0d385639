//! Statement builders.
//!
//! Every builder validates column names against the [`TableDef`] and numbers
//! placeholders `?1, ?2, …` in the order values are bound.

use serde_json::Value as JsonValue;

use crate::filter::Filter;
use crate::ident::quote_identifier;
use crate::table::{TableDef, quote_list};
use crate::{Error, Result, Row, Statement};

/// `SELECT <declared columns> FROM table WHERE …`, optionally limited.
pub fn select(table: &TableDef, filter: &Filter, limit: Option<u64>) -> Result<Statement> {
   let columns: Vec<&str> = table.columns().iter().map(|c| c.name.as_str()).collect();
   let (clause, mut values) = filter.where_clause(table, 1)?;

   let mut query = format!(
      "SELECT {} FROM {}{}",
      quote_list(&columns),
      table.qualified_name(),
      clause
   );
   if let Some(limit) = limit {
      query.push_str(&format!(" LIMIT ?{}", values.len() + 1));
      values.push(JsonValue::from(limit));
   }

   Ok(Statement::new(query).with_values(values))
}

/// Plain `INSERT`.
pub fn insert(table: &TableDef, row: &Row) -> Result<Statement> {
   insert_values(table, row)
}

/// `INSERT … ON CONFLICT DO NOTHING RETURNING <primary key>`.
///
/// Yields one row when the insert happened and none when it was ignored.
pub fn insert_ignore(table: &TableDef, row: &Row) -> Result<Statement> {
   let key = table.require_primary_key()?;
   let mut statement = insert_values(table, row)?;
   statement.query.push_str(&format!(
      " ON CONFLICT DO NOTHING RETURNING {}",
      quote_list(&key)
   ));
   Ok(statement)
}

/// `INSERT … ON CONFLICT (index_elements) DO UPDATE SET` every payload column.
pub fn upsert(table: &TableDef, row: &Row, index_elements: &[&str]) -> Result<Statement> {
   if row.is_empty() {
      return Err(Error::EmptyPayload {
         table: table.display_name(),
      });
   }
   check_columns(table, index_elements)?;

   let update: Vec<&str> = row.keys().map(String::as_str).collect();
   let mut statement = insert_values(table, row)?;
   statement
      .query
      .push_str(&on_conflict_update(index_elements, &update));
   Ok(statement)
}

/// Multi-row `INSERT … ON CONFLICT DO UPDATE`.
///
/// Columns are the keys of the first row; every row must carry exactly those
/// keys. Update targets are `update_columns`, or every column of the first row.
/// Returns `None` for no rows.
pub fn bulk_upsert(
   table: &TableDef,
   rows: &[Row],
   index_elements: &[&str],
   update_columns: Option<&[&str]>,
) -> Result<Option<Statement>> {
   let Some(first) = rows.first() else {
      return Ok(None);
   };

   let columns: Vec<&str> = first.keys().map(String::as_str).collect();
   if columns.is_empty() {
      return Err(Error::EmptyPayload {
         table: table.display_name(),
      });
   }
   check_columns(table, &columns)?;
   check_columns(table, index_elements)?;
   let update = update_columns.unwrap_or(&columns);
   check_columns(table, update)?;

   let mut values = Vec::with_capacity(rows.len() * columns.len());
   let mut tuples = Vec::with_capacity(rows.len());

   for (index, row) in rows.iter().enumerate() {
      if row.len() != columns.len() || columns.iter().any(|c| !row.contains_key(*c)) {
         return Err(Error::RowShapeMismatch {
            table: table.display_name(),
            row: index,
         });
      }

      let placeholders: Vec<String> = columns
         .iter()
         .map(|column| {
            values.push(row[*column].clone());
            format!("?{}", values.len())
         })
         .collect();
      tuples.push(format!("({})", placeholders.join(", ")));
   }

   let query = format!(
      "INSERT INTO {} ({}) VALUES {}{}",
      table.qualified_name(),
      quote_list(&columns),
      tuples.join(", "),
      on_conflict_update(index_elements, update)
   );

   Ok(Some(Statement::new(query).with_values(values)))
}

/// `UPDATE … SET properties WHERE filter`. Returns `None` for no properties.
pub fn update(table: &TableDef, filter: &Filter, properties: &Row) -> Result<Option<Statement>> {
   if properties.is_empty() {
      return Ok(None);
   }

   let mut assignments = Vec::with_capacity(properties.len());
   let mut values = Vec::with_capacity(properties.len() + filter.len());
   for (column, value) in properties {
      table.check_column(column)?;
      values.push(value.clone());
      assignments.push(format!("{} = ?{}", quote_identifier(column), values.len()));
   }

   let (clause, filter_values) = filter.where_clause(table, values.len() + 1)?;
   values.extend(filter_values);

   let query = format!(
      "UPDATE {} SET {}{}",
      table.qualified_name(),
      assignments.join(", "),
      clause
   );
   Ok(Some(Statement::new(query).with_values(values)))
}

/// `UPDATE` of every non-key column of `row`, matched by primary key.
///
/// Returns `None` when the row carries nothing but key columns.
pub fn update_by_key(table: &TableDef, row: &Row) -> Result<Option<Statement>> {
   let key = table.require_primary_key()?;

   let mut filter = Filter::new();
   for column in &key {
      let value = row.get(*column).cloned().unwrap_or(JsonValue::Null);
      filter = filter.eq(*column, value);
   }

   let properties: Row = row
      .iter()
      .filter(|(column, _)| !key.contains(&column.as_str()))
      .map(|(column, value)| (column.clone(), value.clone()))
      .collect();

   update(table, &filter, &properties)
}

/// `DELETE FROM … WHERE filter`.
pub fn delete(table: &TableDef, filter: &Filter) -> Result<Statement> {
   let (clause, values) = filter.where_clause(table, 1)?;
   let query = format!("DELETE FROM {}{}", table.qualified_name(), clause);
   Ok(Statement::new(query).with_values(values))
}

/// Lookup filter for the row an ignored insert collided with.
///
/// Uses the table's first unique key when the row carries all of its columns,
/// otherwise every non-null scalar column of the row. The scalar fallback can
/// match more than one row.
pub fn conflict_lookup(table: &TableDef, row: &Row) -> Result<Filter> {
   let declared = table
      .unique_keys()
      .into_iter()
      .find(|key| key.iter().all(|c| row.get(*c).is_some_and(|v| !v.is_null())));

   let filter: Filter = match declared {
      Some(key) => key.iter().map(|c| (*c, row[*c].clone())).collect(),
      None => row
         .iter()
         .filter(|(column, value)| {
            !value.is_null()
               && table
                  .column(column)
                  .is_some_and(|c| c.column_type.is_scalar())
         })
         .map(|(column, value)| (column.clone(), value.clone()))
         .collect(),
   };

   if filter.is_empty() {
      return Err(Error::EmptyLookupFilter {
         table: table.display_name(),
      });
   }
   Ok(filter)
}

fn insert_values(table: &TableDef, row: &Row) -> Result<Statement> {
   if row.is_empty() {
      return Ok(Statement::new(format!(
         "INSERT INTO {} DEFAULT VALUES",
         table.qualified_name()
      )));
   }

   let columns: Vec<&str> = row.keys().map(String::as_str).collect();
   check_columns(table, &columns)?;

   let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
   let query = format!(
      "INSERT INTO {} ({}) VALUES ({})",
      table.qualified_name(),
      quote_list(&columns),
      placeholders.join(", ")
   );

   Ok(Statement::new(query).with_values(row.values().cloned().collect()))
}

fn on_conflict_update(index_elements: &[&str], update: &[&str]) -> String {
   if update.is_empty() {
      return format!(" ON CONFLICT ({}) DO NOTHING", quote_list(index_elements));
   }

   let assignments: Vec<String> = update
      .iter()
      .map(|c| {
         let column = quote_identifier(c);
         format!("{column} = excluded.{column}")
      })
      .collect();

   format!(
      " ON CONFLICT ({}) DO UPDATE SET {}",
      quote_list(index_elements),
      assignments.join(", ")
   )
}

fn check_columns(table: &TableDef, columns: &[&str]) -> Result<()> {
   for column in columns {
      table.check_column(column)?;
   }
   Ok(())
}
