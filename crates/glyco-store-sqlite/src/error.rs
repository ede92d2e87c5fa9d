//! Error type for `glyco-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  /// A count or key read back from SQLite was outside the expected range.
  #[error("value out of range in {table}: {value}")]
  OutOfRange { table: &'static str, value: i64 },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
