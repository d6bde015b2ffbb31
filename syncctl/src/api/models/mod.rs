//! API request and response models.
//!
//! Request types deserialize bodies and query strings; response types are what handlers
//! serialize. Each converts from the matching [`crate::db::models`] struct with `From`.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod customers;
pub mod pagination;
pub mod records;
pub mod users;

/// Returned with 200 when a registry entry is already present
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AlreadyExists {
    pub message: String,
}

impl AlreadyExists {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}
