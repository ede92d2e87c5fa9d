//! SQLite backend for the Glyco star schema.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime.

mod connector;
mod schema;
mod store;

pub mod error;

pub use connector::SqliteConnector;
pub use error::{Error, Result};
pub use store::SqliteStore;
