//! Error type for `glyco-store-postgres`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("value out of range in {table}: {value}")]
  OutOfRange { table: &'static str, value: i64 },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
