//! Database record models matching table schemas.
//!
//! Repositories in [`crate::db::handlers`] accept `*CreateDBRequest` structs and return
//! `*DBResponse` structs from here. API models convert from these with `From`, so the storage
//! and HTTP representations can change independently.
//!
//! - [`records`]: rows synced from the SQL sources, plus list filters
//! - [`users`]: registry users and their license status
//! - [`customers`]: registry customers

pub mod customers;
pub mod records;
pub mod users;
