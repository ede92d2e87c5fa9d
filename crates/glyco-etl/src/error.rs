//! Error type for `glyco-etl`.

use glyco_core::dimension::Dimension;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  /// Every connection attempt failed. Nothing has been written.
  #[error("store unreachable after {attempts} attempts: {source}")]
  ConnectionExhausted {
    attempts: u32,
    #[source]
    source:   BoxError,
  },

  /// A record's label has no row in its dimension table at fact-load time.
  /// Dimension and patient rows committed earlier stay in place.
  #[error("no {dimension} row labelled {label:?} (patient {patient_id})")]
  DimensionLookupMiss {
    dimension:  Dimension,
    label:      String,
    patient_id: i64,
  },

  #[error("store error: {0}")]
  Store(#[source] BoxError),

  #[error("source error: {0}")]
  Source(#[from] csv::Error),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("config error: {0}")]
  Config(#[from] config::ConfigError),
}

impl Error {
  /// Wrap a backend error.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
