//! Database models for synced records.

use crate::payload::Payload;
use crate::types::{RecordId, TableName};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row to upsert, already keyed.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordUpsert {
    pub key: String,
    pub data: Payload,
}

/// What a bulk upsert did, per key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpsertSummary {
    pub inserted: u64,
    pub updated: u64,
    /// Keys whose stored payload already matched
    pub unchanged: u64,
}

impl UpsertSummary {
    pub fn total(&self) -> u64 {
        self.inserted + self.updated + self.unchanged
    }
}

/// Database response for a record
#[derive(Debug, Clone)]
pub struct RecordDBResponse {
    pub id: RecordId,
    pub table_name: String,
    pub record_key: String,
    pub data: Payload,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Filter for listing records of one table
#[derive(Debug, Clone)]
pub struct RecordFilter {
    pub table: TableName,
    /// Top-level payload field and the text it must equal
    pub equals: Option<(String, String)>,
    /// Top-level payload field to order by
    pub sort_field: String,
    pub direction: SortDirection,
    pub skip: i64,
    pub limit: i64,
}

impl RecordFilter {
    pub fn new(table: TableName, sort_field: impl Into<String>) -> Self {
        Self {
            table,
            equals: None,
            sort_field: sort_field.into(),
            direction: SortDirection::Asc,
            skip: 0,
            limit: i64::MAX,
        }
    }

    pub fn with_equals(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.equals = Some((field.into(), value.into()));
        self
    }

    pub fn with_direction(mut self, direction: SortDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn paginate(mut self, skip: i64, limit: i64) -> Self {
        self.skip = skip;
        self.limit = limit;
        self
    }
}
