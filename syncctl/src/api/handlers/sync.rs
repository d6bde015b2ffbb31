//! Pull rows from a source into the document store, and push them back.

use crate::{
    AppState,
    api::models::records::{PushQuery, PushResponse, SyncResponse},
    errors::Result,
    sync,
    types::{SourceMode, TableName},
};
use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
};

#[utoipa::path(
    get,
    path = "/fetch-sql/{table}/{mode}",
    tag = "sync",
    summary = "Sync a table from a source",
    description = "Runs `SELECT *` on the table in the chosen source and upserts every row into the \
        document store, keyed by the configured key column. Rows without a key are skipped.",
    params(
        ("table" = String, Path, description = "Source table, optionally schema-qualified"),
        ("mode" = String, Path, description = "`offline` or `online`"),
    ),
    responses(
        (status = 200, description = "Table synced", body = SyncResponse),
        (status = 400, description = "Invalid mode or table name", body = crate::openapi::ErrorMessage),
        (status = 500, description = "Source or document store failure", body = crate::openapi::ErrorDetail),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn fetch_sql(State(state): State<AppState>, Path((table, mode)): Path<(String, String)>) -> Result<Json<SyncResponse>> {
    let mode: SourceMode = mode.parse()?;
    let table = TableName::parse(&table)?;

    let source = state.sources.get(mode);
    let outcome = sync::pull_table(source.as_ref(), &state.db, &table, &state.config.sync.key_column).await?;

    Ok(Json(SyncResponse {
        success: true,
        message: format!("Data fetched from {mode} database for table {table}"),
        table: table.to_string(),
        mode,
        outcome,
    }))
}

#[utoipa::path(
    post,
    path = "/push-sql/{table}",
    tag = "sync",
    summary = "Push stored records back to a source",
    description = "Inserts every stored record of the table into the chosen source, one row at a \
        time without a transaction. Rows inserted before a failure stay in the source.",
    params(
        ("table" = String, Path, description = "Target table, optionally schema-qualified"),
        PushQuery,
    ),
    responses(
        (status = 200, description = "Records pushed", body = PushResponse),
        (status = 400, description = "Invalid mode, table name, or column name", body = crate::openapi::ErrorMessage),
        (status = 404, description = "No stored records for this table", body = crate::openapi::ErrorMessage),
        (status = 500, description = "Source or document store failure", body = crate::openapi::ErrorDetail),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn push_sql(
    State(state): State<AppState>,
    Path(table): Path<String>,
    query: std::result::Result<Query<PushQuery>, QueryRejection>,
) -> Result<Json<PushResponse>> {
    let Query(query) = query?;
    let mode = match query.mode.as_deref() {
        Some(mode) => mode.parse()?,
        None => SourceMode::Offline,
    };
    let table = TableName::parse(&table)?;

    let source = state.sources.get(mode);
    let outcome = sync::push_table(source.as_ref(), &state.db, &table).await?;

    Ok(Json(PushResponse {
        success: true,
        message: format!("Data pushed back to {mode} database for table {table}"),
        table: table.to_string(),
        mode,
        outcome,
    }))
}
