//! OpenAPI document for every route, served as JSON at `/api-docs/openapi.json` and rendered
//! at `/docs`.

use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

use crate::api::{self, models};
use crate::db::models::{records::SortDirection, users::LicenseStatus};
use crate::sync::{PushOutcome, SyncOutcome};
use crate::types::SourceMode;

/// Body of a 400 or 404 response
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorMessage {
    pub success: bool,
    pub message: String,
}

/// Body of a 500 response, carrying the underlying error text
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorDetail {
    pub success: bool,
    pub error: String,
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "syncctl",
        description = "Sync rows between SQL sources and a JSON document store, plus a tenant registry",
    ),
    paths(
        api::handlers::sync::fetch_sql,
        api::handlers::sync::push_sql,
        api::handlers::records::list_records,
        api::handlers::records::delete_records,
        api::handlers::records::drop_table,
        api::handlers::users::create_user,
        api::handlers::users::list_users,
        api::handlers::customers::create_customer,
        api::handlers::customers::list_customers,
    ),
    components(schemas(
        ErrorMessage,
        ErrorDetail,
        SourceMode,
        SortDirection,
        LicenseStatus,
        SyncOutcome,
        PushOutcome,
        models::AlreadyExists,
        models::records::RecordResponse,
        models::records::ListRecordsResponse,
        models::records::SyncResponse,
        models::records::PushResponse,
        models::records::DeleteResponse,
        models::users::UserCreate,
        models::users::UserResponse,
        models::users::UserSummary,
        models::users::UserCreated,
        models::customers::CustomerCreate,
        models::customers::CustomerResponse,
        models::customers::CustomerSummary,
        models::customers::CustomerCreated,
    )),
    tags(
        (name = "sync", description = "Pull rows from and push records to the SQL sources"),
        (name = "records", description = "Stored records"),
        (name = "users", description = "Registry users"),
        (name = "customers", description = "Registry customers"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<_> = doc.paths.paths.keys().cloned().collect();
        for path in [
            "/fetch-sql/{table}/{mode}",
            "/push-sql/{table}",
            "/data/{table}",
            "/schema/{table}",
            "/api/users",
            "/api/users/{db_id}",
            "/api/customers",
            "/api/customers/{db_id}",
        ] {
            assert!(paths.iter().any(|p| p == path), "missing {path}");
        }
    }
}
