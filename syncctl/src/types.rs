//! Common type definitions shared across the API, sync and storage layers.
//!
//! - [`SourceMode`]: which of the two configured SQL sources a request targets
//! - [`TableName`]: a validated SQL table identifier, safe to place in SQL text
//! - [`validate_identifier`]: the identifier rule used for tables and columns
//!
//! Table and column names come straight from request paths and stored payloads, so nothing
//! reaches SQL text without passing [`validate_identifier`] first. Values are always bound.

use crate::errors::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub type UserId = Uuid;
pub type CustomerId = Uuid;
pub type RecordId = Uuid;

/// Abbreviate a UUID to its first 8 characters for more readable logs and traces
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}

/// Maximum identifier length accepted by [`validate_identifier`].
pub const MAX_IDENTIFIER_LEN: usize = 255;

/// Which relational source a sync or push talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    Offline,
    Online,
}

impl SourceMode {
    pub const ALL: [SourceMode; 2] = [SourceMode::Offline, SourceMode::Online];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceMode::Offline => "offline",
            SourceMode::Online => "online",
        }
    }
}

impl fmt::Display for SourceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "offline" => Ok(SourceMode::Offline),
            "online" => Ok(SourceMode::Online),
            _ => Err(Error::BadRequest {
                message: "Invalid mode. Use 'offline' or 'online'.".to_string(),
            }),
        }
    }
}

/// Check that `name` is a plain SQL identifier: a letter or underscore followed by letters,
/// digits or underscores, at most [`MAX_IDENTIFIER_LEN`] characters.
pub fn validate_identifier(name: &str) -> Result<(), Error> {
    if name.is_empty() {
        return Err(Error::BadRequest {
            message: "Identifier cannot be empty".to_string(),
        });
    }

    if name.len() > MAX_IDENTIFIER_LEN {
        return Err(Error::BadRequest {
            message: format!("Identifier too long: {} chars (max {MAX_IDENTIFIER_LEN})", name.len()),
        });
    }

    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => {
            return Err(Error::BadRequest {
                message: format!("Invalid identifier '{name}': must start with a letter or underscore"),
            });
        }
    }

    if let Some(c) = chars.find(|c| !c.is_ascii_alphanumeric() && *c != '_') {
        return Err(Error::BadRequest {
            message: format!("Invalid identifier '{name}': contains invalid character '{c}'"),
        });
    }

    Ok(())
}

/// A table name that has passed identifier validation.
///
/// Accepts `table` or `schema.table`; each part must satisfy [`validate_identifier`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TableName(String);

impl TableName {
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let mut parts = raw.split('.');
        let first = parts.next().unwrap_or_default();
        validate_identifier(first)?;
        match (parts.next(), parts.next()) {
            (None, _) => {}
            (Some(table), None) => validate_identifier(table)?,
            (Some(_), Some(_)) => {
                return Err(Error::BadRequest {
                    message: format!("Invalid table name '{raw}': at most one schema qualifier is allowed"),
                });
            }
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TableName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_mode_parsing() {
        assert_eq!("offline".parse::<SourceMode>().unwrap(), SourceMode::Offline);
        assert_eq!("online".parse::<SourceMode>().unwrap(), SourceMode::Online);

        let err = "Online".parse::<SourceMode>().unwrap_err();
        assert!(matches!(err, Error::BadRequest { .. }));
        assert!("staging".parse::<SourceMode>().is_err());
        assert!("".parse::<SourceMode>().is_err());
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("items").is_ok());
        assert!(validate_identifier("_private").is_ok());
        assert!(validate_identifier("Order_Lines_2024").is_ok());

        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("1items").is_err());
        assert!(validate_identifier("items; DROP TABLE users--").is_err());
        assert!(validate_identifier("it'ems").is_err());
        assert!(validate_identifier(&"a".repeat(256)).is_err());
        assert!(validate_identifier(&"a".repeat(255)).is_ok());
    }

    #[test]
    fn test_table_name_schema_qualifier() {
        assert_eq!(TableName::parse("dba.items").unwrap().as_str(), "dba.items");
        assert!(TableName::parse("a.b.c").is_err());
        assert!(TableName::parse("dba.").is_err());
        assert!(TableName::parse(".items").is_err());
        assert!(TableName::parse("items WHERE 1=1").is_err());
    }
}
