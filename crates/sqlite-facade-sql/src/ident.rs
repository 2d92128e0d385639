//! Identifier validation and quoting.

use crate::Error;

/// Validate that a name is a plain SQL identifier.
///
/// Accepts names matching `[a-zA-Z_][a-zA-Z0-9_]*`.
pub(crate) fn validate_identifier(name: &str) -> Result<(), Error> {
   let mut chars = name.chars();
   let valid = match chars.next() {
      Some(first) => {
         (first.is_ascii_alphabetic() || first == '_')
            && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
      }
      None => false,
   };

   if valid {
      Ok(())
   } else {
      Err(Error::InvalidIdentifier {
         name: name.to_string(),
      })
   }
}

/// Quote an identifier with double quotes.
///
/// Any embedded double quotes are doubled per SQL standard (`"` → `""`).
pub(crate) fn quote_identifier(name: &str) -> String {
   format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote an optionally schema-qualified name: `"schema"."name"`.
pub(crate) fn quote_qualified(schema: Option<&str>, name: &str) -> String {
   match schema {
      Some(schema) => format!("{}.{}", quote_identifier(schema), quote_identifier(name)),
      None => quote_identifier(name),
   }
}
