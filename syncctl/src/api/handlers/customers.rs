//! Registry customers, scoped by `db_id`.

use super::users::required;
use crate::{
    AppState,
    api::models::{
        AlreadyExists,
        customers::{CustomerCreate, CustomerCreated, CustomerResponse, CustomerSummary},
    },
    db::{handlers::Customers, models::customers::CustomerCreateDBRequest},
    errors::{Error, Result},
    types::abbrev_uuid,
};
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use tracing::{info, warn};

#[utoipa::path(
    post,
    path = "/api/customers",
    tag = "customers",
    summary = "Register a customer",
    description = "Registering an existing `(db_id, name)` pair is not an error and changes nothing.",
    request_body = CustomerCreate,
    responses(
        (status = 201, description = "Customer created", body = CustomerResponse),
        (status = 200, description = "Customer already exists", body = AlreadyExists),
        (status = 400, description = "Missing field or malformed body", body = crate::openapi::ErrorMessage),
        (status = 500, description = "Database failure", body = crate::openapi::ErrorDetail),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_customer(
    State(state): State<AppState>,
    body: std::result::Result<Json<CustomerCreate>, JsonRejection>,
) -> Result<(StatusCode, Json<CustomerCreated>)> {
    let Json(create) = body?;

    let (Some(db_id), Some(name), Some(address), Some(place), Some(phone)) = (
        required(create.db_id),
        required(create.name),
        required(create.address),
        required(create.place),
        required(create.phone),
    ) else {
        warn!("Missing required customer details");
        return Err(Error::BadRequest {
            message: "All fields (db_id, name, address, place, phone) are required".to_string(),
        });
    };

    let request = CustomerCreateDBRequest {
        db_id,
        name,
        address,
        place,
        phone,
    };

    let mut conn = state.db.acquire().await?;
    match Customers::new(&mut conn).create(&request).await? {
        Some(customer) => {
            info!(customer_id = %abbrev_uuid(&customer.id), name = %customer.name, db_id = %customer.db_id, "Customer added");
            Ok((StatusCode::CREATED, Json(CustomerCreated::Created(CustomerResponse::from(customer)))))
        }
        None => {
            warn!(name = %request.name, db_id = %request.db_id, "Customer already exists");
            Ok((
                StatusCode::OK,
                Json(CustomerCreated::Exists(AlreadyExists::new("Customer already exists"))),
            ))
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/customers/{db_id}",
    tag = "customers",
    summary = "List a tenant's customers",
    params(("db_id" = String, Path, description = "Tenant identifier")),
    responses(
        (status = 200, description = "Customers ordered by name", body = Vec<CustomerSummary>),
        (status = 500, description = "Database failure", body = crate::openapi::ErrorDetail),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_customers(
    State(state): State<AppState>,
    Path(db_id): Path<String>,
) -> Result<Json<Vec<CustomerSummary>>> {
    let mut conn = state.db.acquire().await?;
    let customers = Customers::new(&mut conn).list_by_db_id(&db_id).await?;

    Ok(Json(customers.into_iter().map(CustomerSummary::from).collect()))
}

#[cfg(test)]
mod tests {
    use crate::{api::models::customers::CustomerSummary, test_utils::*};
    use axum::http::StatusCode;
    use serde_json::{Value, json};
    use sqlx::PgPool;

    fn customer(db_id: &str, name: &str) -> Value {
        json!({
            "db_id": db_id,
            "name": name,
            "address": "Main Street 1",
            "place": "Leuven",
            "phone": "+32 16 000000",
        })
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_and_list_customers(pool: PgPool) {
        let app = create_test_app(pool, TestSources::new().sources());

        for name in ["Zeta", "Acme"] {
            app.post("/api/customers")
                .json(&customer("shop-1", name))
                .await
                .assert_status(StatusCode::CREATED);
        }
        app.post("/api/customers")
            .json(&customer("shop-2", "Other"))
            .await
            .assert_status(StatusCode::CREATED);

        let customers: Vec<CustomerSummary> = app.get("/api/customers/shop-1").await.json();
        let names: Vec<_> = customers.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Acme", "Zeta"]);
        assert_eq!(customers[0].place, "Leuven");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_duplicate_customer(pool: PgPool) {
        let app = create_test_app(pool.clone(), TestSources::new().sources());

        app.post("/api/customers")
            .json(&customer("shop-1", "Acme"))
            .await
            .assert_status(StatusCode::CREATED);

        let response = app.post("/api/customers").json(&customer("shop-1", "Acme")).await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>(), json!({"message": "Customer already exists"}));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers").fetch_one(&pool).await.unwrap();
        assert_eq!(count, 1);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_customer_requires_all_fields(pool: PgPool) {
        let app = create_test_app(pool, TestSources::new().sources());

        let mut body = customer("shop-1", "Acme");
        body.as_object_mut().unwrap().remove("phone");

        let response = app.post("/api/customers").json(&body).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(
            response.json::<Value>()["message"],
            "All fields (db_id, name, address, place, phone) are required"
        );
    }
}
