//! API request/response models for synced records.

use super::pagination::Pagination;
use crate::db::models::records::{RecordDBResponse, SortDirection};
use crate::payload;
use crate::sync::{PushOutcome, SyncOutcome};
use crate::types::SourceMode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Query parameters for reading stored records
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ListRecordsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Top-level payload field to filter and sort on
    pub field: Option<String>,

    /// Value the field must equal (compared as text); ignored without `field`
    pub value: Option<String>,

    /// Sort direction, applied to `field` when given, otherwise to the record key
    pub sort: Option<SortDirection>,
}

/// Query parameters for deleting stored records
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct DeleteRecordsQuery {
    /// Key of the single record to delete
    pub id: Option<String>,

    /// `true` deletes every record of the table
    #[serde(rename = "deleteAll")]
    pub delete_all: Option<String>,
}

impl DeleteRecordsQuery {
    pub fn delete_all(&self) -> bool {
        self.delete_all.as_deref() == Some("true")
    }
}

/// Query parameters for pushing records back to a source
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct PushQuery {
    /// Target source: `offline` (default) or `online`
    pub mode: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordResponse {
    pub key: String,
    #[schema(value_type = Object)]
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<RecordDBResponse> for RecordResponse {
    fn from(record: RecordDBResponse) -> Self {
        Self {
            key: record.record_key,
            data: payload::to_json(&record.data),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ListRecordsResponse {
    pub success: bool,
    /// Records on this page
    pub count: usize,
    /// Records matching the filter across all pages
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub data: Vec<RecordResponse>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SyncResponse {
    pub success: bool,
    pub message: String,
    pub table: String,
    pub mode: SourceMode,
    #[serde(flatten)]
    pub outcome: SyncOutcome,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PushResponse {
    pub success: bool,
    pub message: String,
    pub table: String,
    pub mode: SourceMode,
    #[serde(flatten)]
    pub outcome: PushOutcome,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
    /// Records removed
    pub deleted: u64,
}
