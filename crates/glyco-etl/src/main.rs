//! glyco-etl binary.
//!
//! Reads the cleaned diabetes CSV, connects to the configured store (retrying
//! while it comes up), and loads the star schema. Exits non-zero if the store
//! never becomes reachable or a record cannot be resolved.

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use glyco_core::{record::Record, store::Connect};
use glyco_etl::{
  config::{Backend, Overrides, Settings},
  connector::RetryPolicy,
  logging::{self, LogStream},
  pipeline::{LoadReport, LookupMode},
  session::Session,
  source,
};
use glyco_store_sqlite::SqliteConnector;

#[derive(Parser)]
#[command(author, version, about = "Load the diabetes dataset into a star schema")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "glyco.toml")]
  config: PathBuf,

  /// Source CSV; overrides `source_path`.
  #[arg(long)]
  source: Option<PathBuf>,

  #[arg(long, value_enum)]
  backend: Option<Backend>,

  /// Key resolution strategy for the fact stage.
  #[arg(long, value_enum)]
  lookup: Option<LookupMode>,

  /// Print the load report as JSON on stdout; logs move to stderr.
  #[arg(long)]
  json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let cli = Cli::parse();
  logging::init(LogStream::for_report(cli.json));

  let mut settings = Settings::load(&cli.config).context("failed to load configuration")?;
  settings.apply(Overrides {
    source_path: cli.source,
    backend:     cli.backend,
    lookup:      cli.lookup,
  });

  let records = source::read_records(&settings.source_path)
    .with_context(|| format!("failed to read {}", settings.source_path.display()))?;

  let policy = settings.retry.policy();
  let report = match settings.backend {
    Backend::Postgres => {
      load(&settings.postgres.connector(), policy, &records, settings.lookup).await?
    }
    Backend::Sqlite => {
      let connector = SqliteConnector::new(&settings.sqlite.path);
      load(&connector, policy, &records, settings.lookup).await?
    }
  };

  if cli.json {
    println!("{}", serde_json::to_string_pretty(&report)?);
  }
  tracing::info!(
    records = report.records,
    patients = report.patients_inserted,
    facts = report.facts_inserted,
    "load complete"
  );

  Ok(())
}

async fn load<C: Connect>(
  connector: &C,
  policy: RetryPolicy,
  records: &[Record],
  lookup: LookupMode,
) -> anyhow::Result<LoadReport> {
  let session = Session::open(connector, policy)
    .await
    .with_context(|| format!("could not connect to {}", connector.target()))?;
  let report = session.run(records, lookup).await.context("load failed")?;
  Ok(report)
}
