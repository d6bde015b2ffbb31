//! HTTP API: route handlers and their request/response models.
//!
//! - **Sync** (`/fetch-sql/*`, `/push-sql/*`): move rows between a source and the document store
//! - **Records** (`/data/*`, `/schema/*`): read and delete stored records
//! - **Registry** (`/api/users/*`, `/api/customers/*`): tenant users and customers
//!
//! All endpoints carry `utoipa` annotations; the UI is served at `/docs`.

pub mod handlers;
pub mod models;
