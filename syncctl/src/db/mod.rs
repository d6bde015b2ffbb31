//! Database layer for the document store and the registry.
//!
//! Both live in one PostgreSQL database reached through a single `sqlx::PgPool`.
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  (API request handlers, sync routine)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │ Repositories│  (db::handlers - queries)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │   Models    │  (db::models - database records)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │  PostgreSQL │
//! └─────────────┘
//! ```
//!
//! - [`handlers`]: repositories for records, users and customers
//! - [`models`]: request/response structs for each table
//! - [`errors`]: database-specific error types
//!
//! Schema changes are `sqlx` migrations in `migrations/`, applied at startup through
//! [`crate::migrator`].

pub mod errors;
pub mod handlers;
pub mod models;
