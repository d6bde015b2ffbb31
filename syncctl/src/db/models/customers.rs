//! Database models for registry customers.

use crate::types::CustomerId;
use chrono::{DateTime, Utc};

/// Database request for creating a new customer
#[derive(Debug, Clone)]
pub struct CustomerCreateDBRequest {
    pub db_id: String,
    pub name: String,
    pub address: String,
    pub place: String,
    pub phone: String,
}

/// Database response for a customer
#[derive(Debug, Clone)]
pub struct CustomerDBResponse {
    pub id: CustomerId,
    pub db_id: String,
    pub name: String,
    pub address: String,
    pub place: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
}
