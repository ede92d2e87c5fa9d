//! [`SqliteConnector`]: opens a [`SqliteStore`] at a fixed path.

use std::path::PathBuf;

use glyco_core::store::Connect;

use crate::{Result, SqliteStore};

/// Opens the database file at `path`. The special path `:memory:` opens a
/// fresh in-memory database on every attempt.
#[derive(Debug, Clone)]
pub struct SqliteConnector {
  path: PathBuf,
}

impl SqliteConnector {
  pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }
}

impl Connect for SqliteConnector {
  type Store = SqliteStore;

  fn target(&self) -> String { format!("sqlite:{}", self.path.display()) }

  async fn connect(&self) -> Result<SqliteStore> {
    SqliteStore::open(&self.path).await
  }
}
