//! Postgres backend for the Glyco star schema, on a single-connection
//! [`sqlx`] pool.

mod connector;
mod schema;
mod store;

pub mod error;

pub use connector::PgConnector;
pub use error::{Error, Result};
pub use store::PostgresStore;
