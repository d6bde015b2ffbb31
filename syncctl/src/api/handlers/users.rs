//! Registry users, scoped by `db_id`.

use crate::{
    AppState,
    api::models::{
        AlreadyExists,
        users::{UserCreate, UserCreated, UserResponse, UserSummary},
    },
    db::{handlers::Users, models::users::UserCreateDBRequest},
    errors::{Error, Result},
    password,
    types::abbrev_uuid,
};
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use tracing::{info, warn};

/// Trimmed value of a required text field, `None` when missing or blank.
pub(crate) fn required(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[utoipa::path(
    post,
    path = "/api/users",
    tag = "users",
    summary = "Register a user",
    description = "Creates a user with a pending license. The password is stored as an Argon2id hash. \
        Registering an existing `(username, db_id)` pair is not an error and changes nothing.",
    request_body = UserCreate,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 200, description = "User already exists", body = AlreadyExists),
        (status = 400, description = "Missing field or malformed body", body = crate::openapi::ErrorMessage),
        (status = 500, description = "Database failure", body = crate::openapi::ErrorDetail),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_user(
    State(state): State<AppState>,
    body: std::result::Result<Json<UserCreate>, JsonRejection>,
) -> Result<(StatusCode, Json<UserCreated>)> {
    let Json(create) = body?;

    let (Some(db_id), Some(username), Some(password)) = (
        required(create.db_id),
        required(create.username),
        create.password.filter(|p| !p.is_empty()),
    ) else {
        warn!("Missing required user details");
        return Err(Error::BadRequest {
            message: "db_id, username, and password are required".to_string(),
        });
    };

    let request = UserCreateDBRequest {
        password_hash: password::hash_password_blocking(password).await?,
        db_id,
        username,
    };

    let mut conn = state.db.acquire().await?;
    match Users::new(&mut conn).create(&request).await? {
        Some(user) => {
            info!(user_id = %abbrev_uuid(&user.id), username = %user.username, db_id = %user.db_id, "User added with pending license");
            Ok((StatusCode::CREATED, Json(UserCreated::Created(UserResponse::from(user)))))
        }
        None => {
            warn!(username = %request.username, db_id = %request.db_id, "User already exists");
            Ok((StatusCode::OK, Json(UserCreated::Exists(AlreadyExists::new("User already exists")))))
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/users/{db_id}",
    tag = "users",
    summary = "List a tenant's users",
    params(("db_id" = String, Path, description = "Tenant identifier")),
    responses(
        (status = 200, description = "Users ordered by username", body = Vec<UserSummary>),
        (status = 500, description = "Database failure", body = crate::openapi::ErrorDetail),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_users(State(state): State<AppState>, Path(db_id): Path<String>) -> Result<Json<Vec<UserSummary>>> {
    let mut conn = state.db.acquire().await?;
    let users = Users::new(&mut conn).list_by_db_id(&db_id).await?;

    Ok(Json(users.into_iter().map(UserSummary::from).collect()))
}
