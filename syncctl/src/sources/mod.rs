//! Relational sources that records are pulled from and pushed back into.
//!
//! There are exactly two sources, selected per request by [`SourceMode`]. Handlers only see the
//! [`SourceDatabase`] trait; production uses [`SqlSource`], a lazily-connected native sqlx pool
//! for PostgreSQL, MySQL or SQLite depending on the configured URL.
//!
//! Connections are pool guards, so they go back to the pool on every path, including query
//! failures.

pub mod dialect;
mod sql;

pub use sql::{SourcePool, SqlSource};

use crate::errors::Error;
use crate::payload::{DocValue, Payload};
use crate::types::{SourceMode, TableName, validate_identifier};
use async_trait::async_trait;
use std::ops::Deref;
use std::sync::Arc;
use thiserror::Error as ThisError;
use tracing::{error, info};

#[derive(Debug, ThisError)]
pub enum SourceError {
    #[error("Failed to connect to {mode} database: {message}")]
    Connect { mode: SourceMode, message: String },

    #[error("Query on table {table} failed: {message}")]
    Query { table: String, message: String },

    #[error("Insert into table {table} failed after {inserted} rows: {message}")]
    Insert { table: String, inserted: u64, message: String },

    #[error("Unsupported source database URL scheme '{scheme}'")]
    UnsupportedUrl { scheme: String },
}

/// A payload whose column names are all valid SQL identifiers.
///
/// Only these can be turned into an `INSERT`; construction is the validation point.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRow(Payload);

impl TryFrom<Payload> for SourceRow {
    type Error = Error;

    fn try_from(payload: Payload) -> Result<Self, Self::Error> {
        for column in payload.keys() {
            validate_identifier(column).map_err(|e| Error::BadRequest {
                message: format!("Record column cannot be written back: {e}"),
            })?;
        }
        Ok(Self(payload))
    }
}

impl Deref for SourceRow {
    type Target = Payload;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl SourceRow {
    /// Values that need a bound parameter, in column order (nulls are inlined).
    pub fn bound_values(&self) -> impl Iterator<Item = &DocValue> {
        self.0.values().filter(|v| !v.is_null())
    }
}

/// One SQL database that rows are read from and written back to.
#[async_trait]
pub trait SourceDatabase: Send + Sync {
    fn mode(&self) -> SourceMode;

    /// Open a connection and check it is alive.
    async fn ping(&self) -> Result<(), SourceError>;

    /// `SELECT *` from `table`, every row converted to a payload.
    async fn select_all(&self, table: &TableName) -> Result<Vec<Payload>, SourceError>;

    /// Insert rows one statement at a time on a single connection, no transaction.
    ///
    /// Returns the number of inserted rows. On failure, rows before the failing one stay
    /// inserted.
    async fn insert_rows(&self, table: &TableName, rows: &[SourceRow]) -> Result<u64, SourceError>;
}

/// The offline and online sources.
#[derive(Clone)]
pub struct Sources {
    offline: Arc<dyn SourceDatabase>,
    online: Arc<dyn SourceDatabase>,
}

impl Sources {
    pub fn new(offline: Arc<dyn SourceDatabase>, online: Arc<dyn SourceDatabase>) -> Self {
        Self { offline, online }
    }

    pub fn get(&self, mode: SourceMode) -> &Arc<dyn SourceDatabase> {
        match mode {
            SourceMode::Offline => &self.offline,
            SourceMode::Online => &self.online,
        }
    }

    /// Ping both sources once and log the outcome. Never fails: an unreachable source only
    /// affects the requests that target it.
    pub async fn check_connectivity(&self) {
        for mode in SourceMode::ALL {
            match self.get(mode).ping().await {
                Ok(()) => info!(%mode, "Connected to {mode} source database"),
                Err(e) => error!(%mode, "Could not reach {mode} source database: {e}"),
            }
        }
    }
}

impl std::fmt::Debug for Sources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sources")
            .field("offline", &self.offline.mode())
            .field("online", &self.online.mode())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_row_rejects_unsafe_columns() {
        let mut payload = Payload::new();
        payload.insert("id".to_string(), DocValue::Integer(1));
        assert!(SourceRow::try_from(payload.clone()).is_ok());

        payload.insert("name) VALUES (1); DROP TABLE items; --".to_string(), DocValue::Null);
        let err = SourceRow::try_from(payload).unwrap_err();
        assert!(matches!(err, Error::BadRequest { .. }));
    }

    #[test]
    fn test_bound_values_skip_nulls() {
        let mut payload = Payload::new();
        payload.insert("a".to_string(), DocValue::Integer(1));
        payload.insert("b".to_string(), DocValue::Null);
        payload.insert("c".to_string(), DocValue::from("x"));
        let row = SourceRow::try_from(payload).unwrap();

        let bound: Vec<_> = row.bound_values().cloned().collect();
        assert_eq!(bound, vec![DocValue::Integer(1), DocValue::from("x")]);
    }
}
