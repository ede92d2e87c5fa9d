//! Layered job configuration.
//!
//! Precedence, lowest first: built-in defaults, the TOML file,
//! `GLYCO__*` environment variables (`__` separates sections, e.g.
//! `GLYCO__RETRY__MAX_ATTEMPTS`), then the `POSTGRES_DB`, `POSTGRES_USER`,
//! `POSTGRES_PASSWORD` and `POSTGRES_HOST` variables shared with the database
//! container. Command-line [`Overrides`] are applied last with
//! [`Settings::apply`].

use std::{
  collections::HashMap,
  path::{Path, PathBuf},
  time::Duration,
};

use config::{Config, Environment, File};
use glyco_store_postgres::PgConnector;
use serde::Deserialize;

use crate::{Result, connector::RetryPolicy, pipeline::LookupMode};

pub const DEFAULT_SOURCE_PATH: &str = "/app/data/cleaned/diabetes_cleaned.csv";

/// Which store to load into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
  Postgres,
  Sqlite,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PostgresSettings {
  pub host:     String,
  pub port:     u16,
  pub database: Option<String>,
  pub user:     Option<String>,
  pub password: Option<String>,
}

impl PostgresSettings {
  pub fn connector(&self) -> PgConnector {
    let mut connector = PgConnector::new(&self.host, self.port);
    if let Some(database) = &self.database {
      connector = connector.database(database);
    }
    if let Some(user) = &self.user {
      connector = connector.username(user);
    }
    if let Some(password) = &self.password {
      connector = connector.password(password);
    }
    connector
  }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SqliteSettings {
  pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RetrySettings {
  pub max_attempts: u32,
  pub delay_ms:     u64,
}

impl RetrySettings {
  pub fn policy(&self) -> RetryPolicy {
    RetryPolicy {
      max_attempts: self.max_attempts,
      delay:        Duration::from_millis(self.delay_ms),
    }
  }
}

/// Everything the job needs to know before it starts.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
  pub source_path: PathBuf,
  pub backend:     Backend,
  pub lookup:      LookupMode,
  pub postgres:    PostgresSettings,
  pub sqlite:      SqliteSettings,
  pub retry:       RetrySettings,
}

/// Values given on the command line. Each one that is set beats every
/// other layer.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
  pub source_path: Option<PathBuf>,
  pub backend:     Option<Backend>,
  pub lookup:      Option<LookupMode>,
}

impl Settings {
  /// Load from `path` (optional) and the process environment.
  pub fn load(path: &Path) -> Result<Self> {
    Self::load_from(path, std::env::vars().collect())
  }

  /// Load from `path` (optional) and the given environment variables.
  pub fn load_from(path: &Path, vars: HashMap<String, String>) -> Result<Self> {
    let var = |key: &str| vars.get(key).cloned();

    let settings = Config::builder()
      .set_default("source_path", DEFAULT_SOURCE_PATH)?
      .set_default("backend", "postgres")?
      .set_default("lookup", "cached")?
      .set_default("postgres.host", "localhost")?
      .set_default("postgres.port", 5432)?
      .set_default("sqlite.path", "glyco.db")?
      .set_default("retry.max_attempts", 10)?
      .set_default("retry.delay_ms", 3000)?
      .add_source(File::from(path.to_path_buf()).required(false))
      .add_source(
        Environment::with_prefix("GLYCO")
          .separator("__")
          .source(Some(vars.clone())),
      )
      .set_override_option("postgres.database", var("POSTGRES_DB"))?
      .set_override_option("postgres.user", var("POSTGRES_USER"))?
      .set_override_option("postgres.password", var("POSTGRES_PASSWORD"))?
      .set_override_option("postgres.host", var("POSTGRES_HOST"))?
      .build()?;

    let mut settings: Settings = settings.try_deserialize()?;
    settings.source_path = expand_tilde(&settings.source_path);
    settings.sqlite.path = expand_tilde(&settings.sqlite.path);
    Ok(settings)
  }

  /// Layer command-line values over the loaded settings.
  pub fn apply(&mut self, overrides: Overrides) {
    if let Some(source_path) = overrides.source_path {
      self.source_path = expand_tilde(&source_path);
    }
    if let Some(backend) = overrides.backend {
      self.backend = backend;
    }
    if let Some(lookup) = overrides.lookup {
      self.lookup = lookup;
    }
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
