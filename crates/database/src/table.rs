use configuration::error::ConfigError;
use configuration::validate_table_name;
use std::fmt;

/// Postgres truncates identifiers longer than this many bytes.
const MAX_IDENTIFIER_LEN: usize = 63;

/// A validated, possibly schema-qualified, table name.
///
/// Table names cannot be bound as statement parameters, so they are spliced
/// into the SQL text. Each part is rendered as a double-quoted identifier,
/// which means the name is matched case-sensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    schema: Option<String>,
    table: String,
}

impl TableName {
    /// Parses `table` or `schema.table`.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let raw = validate_table_name(Some(raw))?;
        let invalid = || ConfigError::InvalidTableName(raw.to_string());

        let parts: Vec<&str> = raw.split('.').collect();
        let (schema, table) = match parts.as_slice() {
            [table] => (None, *table),
            [schema, table] => (Some(*schema), *table),
            _ => return Err(invalid()),
        };

        for part in schema.iter().chain(std::iter::once(&table)) {
            if !is_valid_identifier(part) {
                return Err(invalid());
            }
        }

        Ok(Self {
            schema: schema.map(str::to_string),
            table: table.to_string(),
        })
    }

    /// The name as it appears in SQL, e.g. `"audit"."logs"`.
    pub fn quoted(&self) -> String {
        match &self.schema {
            Some(schema) => format!("\"{}\".\"{}\"", schema, self.table),
            None => format!("\"{}\"", self.table),
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.table),
            None => f.write_str(&self.table),
        }
    }
}

fn is_valid_identifier(part: &str) -> bool {
    !part.is_empty()
        && part.len() <= MAX_IDENTIFIER_LEN
        && !part.contains(|c: char| c == '"' || c == '\0' || c.is_whitespace())
}
