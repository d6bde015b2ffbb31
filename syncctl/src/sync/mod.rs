//! Moving rows between the SQL sources and the document store.
//!
//! - [`pull_table`]: `SELECT *` from a source table and upsert every keyed row into
//!   `sync_records` in one statement. Last write wins, keys absent from the pull are kept.
//! - [`push_table`]: insert every stored record of a table back into a source, one row at a
//!   time and without a transaction.
//!
//! Neither retries. Each run logs exactly one line for the table: success, no data, or
//! failure.

mod pull;
mod push;

pub use pull::{SyncOutcome, key_rows, pull_table};
pub use push::{PushOutcome, push_table};
