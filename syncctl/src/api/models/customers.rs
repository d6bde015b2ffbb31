//! API request/response models for registry customers.

use super::AlreadyExists;
use crate::db::models::customers::CustomerDBResponse;
use crate::types::CustomerId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CustomerCreate {
    pub db_id: Option<String>,
    pub name: Option<String>,
    pub address: Option<String>,
    pub place: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CustomerResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: CustomerId,
    pub db_id: String,
    pub name: String,
    pub address: String,
    pub place: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
}

/// Entry in a tenant's customer listing
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CustomerSummary {
    #[schema(value_type = String, format = "uuid")]
    pub id: CustomerId,
    pub name: String,
    pub address: String,
    pub place: String,
    pub phone: String,
}

/// Either the new customer or an "already exists" message
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(untagged)]
pub enum CustomerCreated {
    Created(CustomerResponse),
    Exists(AlreadyExists),
}

impl From<CustomerDBResponse> for CustomerResponse {
    fn from(db: CustomerDBResponse) -> Self {
        Self {
            id: db.id,
            db_id: db.db_id,
            name: db.name,
            address: db.address,
            place: db.place,
            phone: db.phone,
            created_at: db.created_at,
        }
    }
}

impl From<CustomerDBResponse> for CustomerSummary {
    fn from(db: CustomerDBResponse) -> Self {
        Self {
            id: db.id,
            name: db.name,
            address: db.address,
            place: db.place,
            phone: db.phone,
        }
    }
}
