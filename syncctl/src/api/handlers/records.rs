//! Read and delete stored records.

use crate::{
    AppState,
    api::models::records::{DeleteRecordsQuery, DeleteResponse, ListRecordsQuery, ListRecordsResponse, RecordResponse},
    db::{handlers::SyncRecords, models::records::RecordFilter},
    errors::{Error, Result},
    types::TableName,
};
use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
};
use tracing::info;

#[utoipa::path(
    get,
    path = "/data/{table}",
    tag = "records",
    summary = "List stored records",
    description = "Filter on one top-level field (text equality), sort on that field or the key \
        column, and page through the result.",
    params(
        ("table" = String, Path, description = "Table the records were synced from"),
        ListRecordsQuery,
    ),
    responses(
        (status = 200, description = "One page of records", body = ListRecordsResponse),
        (status = 400, description = "Invalid table name or query", body = crate::openapi::ErrorMessage),
        (status = 500, description = "Document store failure", body = crate::openapi::ErrorDetail),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_records(
    State(state): State<AppState>,
    Path(table): Path<String>,
    query: std::result::Result<Query<ListRecordsQuery>, QueryRejection>,
) -> Result<Json<ListRecordsResponse>> {
    let Query(query) = query?;
    let table = TableName::parse(&table)?;
    let field = query.field.filter(|f| !f.is_empty());

    let sort_field = field.clone().unwrap_or_else(|| state.config.sync.key_column.clone());
    let mut filter = RecordFilter::new(table, sort_field)
        .with_direction(query.sort.unwrap_or_default())
        .paginate(query.pagination.skip(), query.pagination.limit());
    if let (Some(field), Some(value)) = (field, query.value) {
        filter = filter.with_equals(field, value);
    }

    let mut conn = state.db.acquire().await?;
    let mut repo = SyncRecords::new(&mut conn);
    let total = repo.count(&filter).await?;
    let records = repo.list(&filter).await?;

    let data: Vec<RecordResponse> = records.into_iter().map(RecordResponse::from).collect();
    Ok(Json(ListRecordsResponse {
        success: true,
        count: data.len(),
        total,
        page: query.pagination.page(),
        limit: query.pagination.limit(),
        data,
    }))
}

#[utoipa::path(
    delete,
    path = "/data/{table}",
    tag = "records",
    summary = "Delete stored records",
    description = "Deletes one record by key (`id`) or every record of the table (`deleteAll=true`).",
    params(
        ("table" = String, Path, description = "Table the records were synced from"),
        DeleteRecordsQuery,
    ),
    responses(
        (status = 200, description = "Records deleted", body = DeleteResponse),
        (status = 400, description = "Neither `id` nor `deleteAll=true` given", body = crate::openapi::ErrorMessage),
        (status = 404, description = "No record with that key", body = crate::openapi::ErrorMessage),
        (status = 500, description = "Document store failure", body = crate::openapi::ErrorDetail),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_records(
    State(state): State<AppState>,
    Path(table): Path<String>,
    query: std::result::Result<Query<DeleteRecordsQuery>, QueryRejection>,
) -> Result<Json<DeleteResponse>> {
    let Query(query) = query?;
    let table = TableName::parse(&table)?;
    let mut conn = state.db.acquire().await?;
    let mut repo = SyncRecords::new(&mut conn);

    if query.delete_all() {
        let deleted = repo.delete_all(&table).await?;
        info!(%table, deleted, "Deleted all records of table {table}");
        return Ok(Json(DeleteResponse {
            success: true,
            message: format!("All records from table '{table}' deleted."),
            deleted,
        }));
    }

    let Some(id) = query.id.filter(|id| !id.is_empty()) else {
        return Err(Error::BadRequest {
            message: "Please provide an 'id' to delete a specific record or set 'deleteAll=true' to remove all data."
                .to_string(),
        });
    };

    if !repo.delete_by_key(&table, &id).await? {
        return Err(Error::NotFound {
            message: format!("No record found with id: {id} in table '{table}'."),
        });
    }

    Ok(Json(DeleteResponse {
        success: true,
        message: format!("Record with id {id} deleted from table '{table}'."),
        deleted: 1,
    }))
}

#[utoipa::path(
    delete,
    path = "/schema/{table}",
    tag = "records",
    summary = "Drop a table's records",
    description = "Removes every stored record of the table. Fails with 404 when there is nothing to drop.",
    params(("table" = String, Path, description = "Table the records were synced from")),
    responses(
        (status = 200, description = "Table dropped", body = DeleteResponse),
        (status = 400, description = "Invalid table name", body = crate::openapi::ErrorMessage),
        (status = 404, description = "No records stored for this table", body = crate::openapi::ErrorMessage),
        (status = 500, description = "Document store failure", body = crate::openapi::ErrorDetail),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn drop_table(State(state): State<AppState>, Path(table): Path<String>) -> Result<Json<DeleteResponse>> {
    let table = TableName::parse(&table)?;
    let mut conn = state.db.acquire().await?;

    let deleted = SyncRecords::new(&mut conn).delete_all(&table).await?;
    if deleted == 0 {
        return Err(Error::NotFound {
            message: format!("No records found for table '{table}'."),
        });
    }

    info!(%table, deleted, "Dropped table {table}");
    Ok(Json(DeleteResponse {
        success: true,
        message: format!("Collection '{table}' deleted successfully."),
        deleted,
    }))
}
