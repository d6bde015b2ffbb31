//! Repository implementations for database access.
//!
//! Each repository wraps a borrowed `PgConnection` (a pooled connection or an open
//! transaction), builds its queries at runtime with bound parameters, and returns models
//! from [`crate::db::models`].
//!
//! - [`SyncRecords`]: records pulled from the SQL sources, keyed by `(table, key)`
//! - [`Users`]: registry users scoped by `db_id`
//! - [`Customers`]: registry customers scoped by `db_id`
//!
//! ```ignore
//! use syncctl::db::handlers::SyncRecords;
//!
//! async fn example(pool: &sqlx::PgPool, table: &syncctl::types::TableName) -> anyhow::Result<()> {
//!     let mut conn = pool.acquire().await?;
//!     let removed = SyncRecords::new(&mut conn).delete_all(table).await?;
//!     println!("removed {removed} records");
//!     Ok(())
//! }
//! ```

pub mod customers;
pub mod records;
pub mod users;

pub use customers::Customers;
pub use records::SyncRecords;
pub use users::Users;
