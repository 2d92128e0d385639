//! Row decoding to JSON.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value as JsonValue;
use sqlx::sqlite::{SqliteRow, SqliteValueRef};
use sqlx::{Column, Row as _, TypeInfo, Value, ValueRef};

use crate::{Error, Result, Row};

/// Decode one SQLite value.
///
/// Booleans decode to `true`/`false`, dates and times to their stored text,
/// BLOBs to base64 strings.
pub fn to_json(raw: SqliteValueRef<'_>) -> Result<JsonValue> {
   if raw.is_null() {
      return Ok(JsonValue::Null);
   }

   let type_name = raw.type_info().name().to_string();
   let value = ValueRef::to_owned(&raw);

   let json = match type_name.as_str() {
      "TEXT" | "DATE" | "TIME" | "DATETIME" => {
         JsonValue::String(value.try_decode_unchecked::<String>()?)
      }
      "INTEGER" => JsonValue::from(value.try_decode_unchecked::<i64>()?),
      "BOOLEAN" => JsonValue::Bool(value.try_decode_unchecked::<bool>()?),
      "REAL" => float_to_json(value.try_decode_unchecked::<f64>()?),
      "NUMERIC" => {
         let number = value.try_decode_unchecked::<f64>()?;
         if number.fract() == 0.0 && number.abs() < i64::MAX as f64 {
            JsonValue::from(number as i64)
         } else {
            float_to_json(number)
         }
      }
      "BLOB" => {
         let bytes = value.try_decode_unchecked::<Vec<u8>>()?;
         JsonValue::String(STANDARD.encode(bytes))
      }
      "NULL" => JsonValue::Null,
      other => return Err(Error::UnsupportedDatatype(other.to_string())),
   };

   Ok(json)
}

/// Decode a row, preserving column order.
pub fn decode_row(row: &SqliteRow) -> Result<Row> {
   let mut value = Row::with_capacity(row.columns().len());
   for (i, column) in row.columns().iter().enumerate() {
      let v = row.try_get_raw(i)?;
      value.insert(column.name().to_string(), to_json(v)?);
   }
   Ok(value)
}

pub fn decode_rows(rows: Vec<SqliteRow>) -> Result<Vec<Row>> {
   rows.iter().map(decode_row).collect()
}

// NaN and infinities have no JSON form
fn float_to_json(number: f64) -> JsonValue {
   serde_json::Number::from_f64(number)
      .map(JsonValue::Number)
      .unwrap_or(JsonValue::Null)
}
