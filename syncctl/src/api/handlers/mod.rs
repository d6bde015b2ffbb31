//! Axum route handlers.
//!
//! - [`sync`]: `/fetch-sql/{table}/{mode}` and `/push-sql/{table}`
//! - [`records`]: `/data/{table}` reads and deletes, `/schema/{table}` drops
//! - [`users`], [`customers`]: the registry under `/api`

pub mod customers;
pub mod records;
pub mod sync;
pub mod users;
