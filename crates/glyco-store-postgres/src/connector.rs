//! [`PgConnector`]: one connection attempt against a Postgres server.

use std::{str::FromStr, time::Duration};

use glyco_core::store::Connect;
use sqlx::{
  Connection as _,
  postgres::{PgConnectOptions, PgConnection, PgPoolOptions},
};
use tracing::debug;

use crate::{PostgresStore, Result};

/// How long the pool may wait for its connection once the server has
/// answered.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection parameters for a [`PostgresStore`].
#[derive(Debug, Clone)]
pub struct PgConnector {
  options: PgConnectOptions,
}

impl PgConnector {
  /// Target `host:port`. Database, user and password fall back to libpq's
  /// defaults (`PGDATABASE`, `PGUSER`, ...) unless set.
  pub fn new(host: &str, port: u16) -> Self {
    Self { options: PgConnectOptions::new().host(host).port(port) }
  }

  pub fn database(mut self, database: &str) -> Self {
    self.options = self.options.database(database);
    self
  }

  pub fn username(mut self, user: &str) -> Self {
    self.options = self.options.username(user);
    self
  }

  pub fn password(mut self, password: &str) -> Self {
    self.options = self.options.password(password);
    self
  }

  /// Parse a `postgres://` connection URL.
  pub fn from_url(url: &str) -> Result<Self> {
    Ok(Self { options: PgConnectOptions::from_str(url)? })
  }
}

impl Connect for PgConnector {
  type Store = PostgresStore;

  fn target(&self) -> String {
    format!(
      "postgres://{}:{}/{}",
      self.options.get_host(),
      self.options.get_port(),
      self.options.get_database().unwrap_or_default(),
    )
  }

  /// Opens one direct connection before the pool. A refused or rejected
  /// connection then fails at once with its own error instead of a pool
  /// timeout.
  async fn connect(&self) -> Result<PostgresStore> {
    let conn = PgConnection::connect_with(&self.options).await?;
    conn.close().await?;
    debug!(server = %self.target(), "server is accepting connections");

    let pool = PgPoolOptions::new()
      .max_connections(1)
      .acquire_timeout(ACQUIRE_TIMEOUT)
      .connect_with(self.options.clone())
      .await?;
    Ok(PostgresStore::new(pool))
  }
}
