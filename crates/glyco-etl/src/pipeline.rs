//! The load stages and the sequence that runs them.
//!
//! Every stage takes the open session explicitly and commits its own work
//! before returning. A failure in a later stage leaves earlier stages'
//! rows in place.

use std::collections::HashMap;

use glyco_core::{
  dimension::Dimension,
  fact::NewFact,
  record::{Patient, Record},
  store::StarStore,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{Error, Result};

// ─── Options and report ──────────────────────────────────────────────────────

/// How fact loading maps labels to surrogate keys. Both strategies resolve
/// the same keys.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum LookupMode {
  /// Read each dimension once into memory, then resolve in memory.
  #[default]
  Cached,
  /// One store query per record per dimension.
  PerRow,
}

/// Outcome of loading one dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DimensionLoad {
  pub dimension: Dimension,
  /// Distinct labels found in the records.
  pub distinct:  usize,
  /// Rows that were new to the store.
  pub inserted:  u64,
}

/// What a full run wrote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadReport {
  pub records:           usize,
  pub dimensions:        Vec<DimensionLoad>,
  pub patients_inserted: u64,
  pub facts_inserted:    u64,
}

// ─── Stages ──────────────────────────────────────────────────────────────────

/// Create any missing tables.
pub async fn init_schema<S: StarStore>(store: &S) -> Result<()> {
  store.init_schema().await.map_err(Error::store)?;
  info!("schema ready");
  Ok(())
}

/// Insert the distinct labels of every dimension, skipping known ones.
pub async fn load_dimensions<S: StarStore>(
  store: &S,
  records: &[Record],
) -> Result<Vec<DimensionLoad>> {
  let mut loads = Vec::with_capacity(Dimension::ALL.len());
  for dimension in Dimension::ALL {
    let labels = dimension.distinct_labels(records);
    let distinct = labels.len();
    let inserted = store
      .insert_labels(dimension, labels)
      .await
      .map_err(Error::store)?;
    info!(%dimension, distinct, inserted, "loaded dimension");
    loads.push(DimensionLoad { dimension, distinct, inserted });
  }
  Ok(loads)
}

/// Insert one patient per record, skipping identifiers already present.
pub async fn load_patients<S: StarStore>(store: &S, records: &[Record]) -> Result<u64> {
  let patients: Vec<Patient> = records.iter().map(Patient::from).collect();
  let inserted = store
    .insert_patients(patients)
    .await
    .map_err(Error::store)?;
  info!(inserted, "loaded patients");
  Ok(inserted)
}

/// Resolve the dimension keys of every record, in record order.
///
/// Stops at the first label with no dimension row.
pub async fn resolve_facts<S: StarStore>(
  store: &S,
  records: &[Record],
  mode: LookupMode,
) -> Result<Vec<NewFact>> {
  match mode {
    LookupMode::Cached => {
      let keys = KeyCache::load(store).await?;
      records.iter().map(|r| keys.resolve(r)).collect()
    }
    LookupMode::PerRow => {
      let mut facts = Vec::with_capacity(records.len());
      for record in records {
        facts.push(NewFact {
          patient_id:   record.id,
          gender_id:    lookup(store, Dimension::Gender, record).await?,
          smoking_id:   lookup(store, Dimension::Smoking, record).await?,
          condition_id: lookup(store, Dimension::Condition, record).await?,
        });
      }
      Ok(facts)
    }
  }
}

/// Resolve every record and append the facts in one batch.
///
/// Facts are never deduplicated; loading the same records twice doubles
/// them. If any record fails to resolve, nothing from this call is inserted.
pub async fn load_facts<S: StarStore>(
  store: &S,
  records: &[Record],
  mode: LookupMode,
) -> Result<u64> {
  let facts = resolve_facts(store, records, mode).await?;
  let inserted = store.insert_facts(facts).await.map_err(Error::store)?;
  info!(inserted, "loaded facts");
  Ok(inserted)
}

/// Run every stage in order against an open session.
pub async fn run<S: StarStore>(
  store: &S,
  records: &[Record],
  mode: LookupMode,
) -> Result<LoadReport> {
  init_schema(store).await?;
  let dimensions = load_dimensions(store, records).await?;
  let patients_inserted = load_patients(store, records).await?;
  let facts_inserted = load_facts(store, records, mode).await?;

  Ok(LoadReport {
    records: records.len(),
    dimensions,
    patients_inserted,
    facts_inserted,
  })
}

// ─── Key resolution ──────────────────────────────────────────────────────────

async fn lookup<S: StarStore>(store: &S, dimension: Dimension, record: &Record) -> Result<i64> {
  let label = dimension.label_of(record);
  store
    .lookup_key(dimension, label.to_owned())
    .await
    .map_err(Error::store)?
    .ok_or_else(|| miss(dimension, record))
}

fn miss(dimension: Dimension, record: &Record) -> Error {
  Error::DimensionLookupMiss {
    dimension,
    label: dimension.label_of(record).to_owned(),
    patient_id: record.id,
  }
}

/// Label → key maps of all dimensions, read once.
struct KeyCache {
  keys: HashMap<Dimension, HashMap<String, i64>>,
}

impl KeyCache {
  async fn load<S: StarStore>(store: &S) -> Result<Self> {
    let mut keys = HashMap::new();
    for dimension in Dimension::ALL {
      let map = store.dimension_keys(dimension).await.map_err(Error::store)?;
      keys.insert(dimension, map);
    }
    Ok(Self { keys })
  }

  fn key(&self, dimension: Dimension, record: &Record) -> Result<i64> {
    self
      .keys
      .get(&dimension)
      .and_then(|m| m.get(dimension.label_of(record)))
      .copied()
      .ok_or_else(|| miss(dimension, record))
  }

  fn resolve(&self, record: &Record) -> Result<NewFact> {
    Ok(NewFact {
      patient_id:   record.id,
      gender_id:    self.key(Dimension::Gender, record)?,
      smoking_id:   self.key(Dimension::Smoking, record)?,
      condition_id: self.key(Dimension::Condition, record)?,
    })
  }
}
