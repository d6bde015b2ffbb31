//! Per-backend SQL text for the source databases.
//!
//! Identifiers are validated before they get here and are emitted unquoted, so each backend
//! applies its own case folding. What differs per backend is the placeholder syntax and, for
//! PostgreSQL, the casts on text parameters.

use super::{SourceError, SourceRow};
use crate::payload::DocValue;
use crate::types::TableName;
use std::collections::HashMap;

/// Column name to SQL type, for the columns of an insert target that need a cast.
pub type ColumnTypes = HashMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    MySql,
    Sqlite,
}

impl Dialect {
    /// Pick the dialect from a connection URL scheme.
    pub fn from_url(url: &str) -> Result<Self, SourceError> {
        let scheme = url.split_once(':').map(|(scheme, _)| scheme).unwrap_or_default();
        match scheme {
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "mysql" | "mariadb" => Ok(Dialect::MySql),
            "sqlite" => Ok(Dialect::Sqlite),
            other => Err(SourceError::UnsupportedUrl { scheme: other.to_string() }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::MySql => "mysql",
            Dialect::Sqlite => "sqlite",
        }
    }

    /// Placeholder for the `index`-th bound parameter (1-based).
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${index}"),
            Dialect::MySql | Dialect::Sqlite => "?".to_string(),
        }
    }

    pub fn select_all(&self, table: &TableName) -> String {
        format!("SELECT * FROM {table}")
    }

    /// `INSERT INTO table (cols) VALUES (...)` for one row.
    ///
    /// Nulls are written as a `NULL` literal rather than a bound parameter, so they take the
    /// column's type. Every other value gets a placeholder, numbered in column order.
    ///
    /// PostgreSQL does not convert a text parameter into a date, numeric or uuid column on its
    /// own, so text placeholders get an explicit cast to the column type listed in `types`.
    pub fn insert_statement(&self, table: &TableName, row: &SourceRow, types: &ColumnTypes) -> String {
        let mut columns = Vec::with_capacity(row.len());
        let mut values = Vec::with_capacity(row.len());
        let mut bound = 0;

        for (column, value) in row.iter() {
            columns.push(column.as_str());
            if value.is_null() {
                values.push("NULL".to_string());
                continue;
            }

            bound += 1;
            let placeholder = self.placeholder(bound);
            let is_text = match value {
                DocValue::String(_) => true,
                DocValue::Map(_) => value.as_binary().is_none(),
                _ => false,
            };
            match types.get(column) {
                Some(ty) if is_text && *self == Dialect::Postgres => values.push(format!("{placeholder}::{ty}")),
                _ => values.push(placeholder),
            }
        }

        format!("INSERT INTO {table} ({}) VALUES ({})", columns.join(", "), values.join(", "))
    }
}
