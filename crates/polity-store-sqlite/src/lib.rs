//! SQLite backend for the Polity identity store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Descendant queries are served from an
//! ancestor → descendant closure table kept in step with every record's
//! materialized path.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
