//! Test utilities: an in-memory source database and an app wired to it.

use crate::config::{Config, PoolSettings};
use crate::payload::{DocValue, Payload};
use crate::sources::{SourceDatabase, SourceError, SourceRow, Sources};
use crate::types::{SourceMode, TableName};
use async_trait::async_trait;
use axum_test::TestServer;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Build a payload from `(column, value)` pairs.
pub fn row(columns: &[(&str, DocValue)]) -> Payload {
    columns.iter().map(|(name, value)| (name.to_string(), value.clone())).collect()
}

/// A source database held in memory. Every trait call counts as one connection.
pub struct MemorySource {
    mode: SourceMode,
    tables: Mutex<HashMap<String, Vec<Payload>>>,
    connections: AtomicUsize,
}

impl MemorySource {
    pub fn new(mode: SourceMode) -> Self {
        Self {
            mode,
            tables: Mutex::new(HashMap::new()),
            connections: AtomicUsize::new(0),
        }
    }

    pub fn with_table(self, name: &str, rows: Vec<Payload>) -> Self {
        self.set_table(name, rows);
        self
    }

    /// Create or replace a table.
    pub fn set_table(&self, name: &str, rows: Vec<Payload>) {
        self.tables.lock().unwrap().insert(name.to_string(), rows);
    }

    pub fn rows(&self, name: &str) -> Vec<Payload> {
        self.tables.lock().unwrap().get(name).cloned().unwrap_or_default()
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    fn connect(&self) {
        self.connections.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl SourceDatabase for MemorySource {
    fn mode(&self) -> SourceMode {
        self.mode
    }

    async fn ping(&self) -> Result<(), SourceError> {
        self.connect();
        Ok(())
    }

    async fn select_all(&self, table: &TableName) -> Result<Vec<Payload>, SourceError> {
        self.connect();
        self.tables
            .lock()
            .unwrap()
            .get(table.as_str())
            .cloned()
            .ok_or_else(|| SourceError::Query {
                table: table.to_string(),
                message: format!("relation \"{table}\" does not exist"),
            })
    }

    async fn insert_rows(&self, table: &TableName, rows: &[SourceRow]) -> Result<u64, SourceError> {
        self.connect();
        let mut tables = self.tables.lock().unwrap();
        let stored = tables.get_mut(table.as_str()).ok_or_else(|| SourceError::Insert {
            table: table.to_string(),
            inserted: 0,
            message: format!("relation \"{table}\" does not exist"),
        })?;

        stored.extend(rows.iter().map(|row| (**row).clone()));
        Ok(rows.len() as u64)
    }
}

/// Offline and online memory sources, kept reachable for assertions.
pub struct TestSources {
    pub offline: Arc<MemorySource>,
    pub online: Arc<MemorySource>,
}

impl TestSources {
    pub fn new() -> Self {
        Self {
            offline: Arc::new(MemorySource::new(SourceMode::Offline)),
            online: Arc::new(MemorySource::new(SourceMode::Online)),
        }
    }

    pub fn sources(&self) -> Sources {
        Sources::new(self.offline.clone(), self.online.clone())
    }
}

pub fn create_test_config() -> Config {
    let mut config = Config::default();
    config.database.url = Some("postgres://localhost/syncctl_test".to_string());
    config.database.pool = PoolSettings {
        max_connections: 2,
        ..Default::default()
    };
    config.sources.offline.url = Some("sqlite::memory:".to_string());
    config.sources.online.url = Some("sqlite::memory:".to_string());
    config
}

pub fn create_test_app(pool: PgPool, sources: Sources) -> TestServer {
    crate::Application::new_with_pool(create_test_config(), pool, sources)
        .expect("Failed to create application")
        .into_test_server()
}
