//! API request/response models for registry users.

use super::AlreadyExists;
use crate::db::models::users::{LicenseStatus, UserDBResponse};
use crate::types::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Fields are optional so that a missing one is reported as a validation error rather than a
/// body rejection.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UserCreate {
    pub db_id: Option<String>,
    pub username: Option<String>,
    #[schema(format = Password)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    pub db_id: String,
    pub username: String,
    pub license_status: LicenseStatus,
    pub created_at: DateTime<Utc>,
}

/// Entry in a tenant's user listing
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserSummary {
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    pub username: String,
    pub license_status: LicenseStatus,
}

/// Either the new user or an "already exists" message
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(untagged)]
pub enum UserCreated {
    Created(UserResponse),
    Exists(AlreadyExists),
}

impl From<UserDBResponse> for UserResponse {
    fn from(db: UserDBResponse) -> Self {
        Self {
            id: db.id,
            db_id: db.db_id,
            username: db.username,
            license_status: db.license_status,
            created_at: db.created_at,
        }
    }
}

impl From<UserDBResponse> for UserSummary {
    fn from(db: UserDBResponse) -> Self {
        Self {
            id: db.id,
            username: db.username,
            license_status: db.license_status,
        }
    }
}
