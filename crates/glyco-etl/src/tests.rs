//! End-to-end tests of the load stages against an in-memory SQLite store.

use std::{
  collections::HashMap,
  sync::{
    Arc,
    atomic::{AtomicBool, AtomicU32, Ordering},
  },
  time::Duration,
};

use glyco_core::{
  dimension::{Dimension, DimensionRow},
  fact::{Fact, NewFact},
  record::{Patient, Record},
  store::{Connect, StarStore, TableCounts},
};
use glyco_store_sqlite::SqliteStore;

use crate::{
  Error,
  connector::{RetryPolicy, connect_with_retry},
  logging::{self, capture::Captured},
  pipeline::{self, LookupMode},
  session::Session,
};

// ─── Fixtures ────────────────────────────────────────────────────────────────

fn record(id: i64, gender: &str, smoking: &str, condition: &str) -> Record {
  Record {
    id,
    full_name: format!("Patient {id}"),
    age: 30 + id,
    bmi: 22.0 + id as f64,
    blood_pressure: 118.0,
    glucose_levels: 99.5,
    gender: gender.into(),
    smoking_status: smoking.into(),
    condition: condition.into(),
  }
}

fn three_records() -> Vec<Record> {
  vec![
    record(1, "Male", "never", "none"),
    record(2, "Female", "former", "type2"),
    record(3, "Male", "never", "none"),
  ]
}

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn no_delay(max_attempts: u32) -> RetryPolicy {
  RetryPolicy { max_attempts, delay: Duration::ZERO }
}

// ─── Full run ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn three_record_scenario() {
  let s = store().await;
  let report = pipeline::run(&s, &three_records(), LookupMode::Cached)
    .await
    .unwrap();

  assert_eq!(report.records, 3);
  assert_eq!(report.patients_inserted, 3);
  assert_eq!(report.facts_inserted, 3);
  assert!(report.dimensions.iter().all(|d| d.distinct == 2 && d.inserted == 2));

  assert_eq!(
    s.counts().await.unwrap(),
    TableCounts { gender: 2, smoking: 2, condition: 2, patients: 3, facts: 3 }
  );

  let facts = s.list_facts().await.unwrap();
  let by_patient: HashMap<i64, &Fact> = facts.iter().map(|f| (f.patient_id, f)).collect();
  let (one, two, three) = (by_patient[&1], by_patient[&2], by_patient[&3]);

  assert_eq!(
    (one.gender_id, one.smoking_id, one.condition_id),
    (three.gender_id, three.smoking_id, three.condition_id)
  );
  assert_ne!(one.gender_id, two.gender_id);
  assert_ne!(one.smoking_id, two.smoking_id);
  assert_ne!(one.condition_id, two.condition_id);
}

#[tokio::test]
async fn one_dimension_row_per_distinct_label() {
  let records: Vec<Record> = (1..=50)
    .map(|id| {
      let gender = if id % 2 == 0 { "Female" } else { "Male" };
      let smoking = ["never", "former", "current"][id as usize % 3];
      record(id, gender, smoking, "type2")
    })
    .collect();

  let s = store().await;
  pipeline::run(&s, &records, LookupMode::Cached).await.unwrap();

  for dimension in Dimension::ALL {
    let rows = s.list_dimension(dimension).await.unwrap();
    let mut labels: Vec<_> = rows.into_iter().map(|r| r.label).collect();
    labels.sort();
    assert_eq!(labels, dimension.distinct_labels(&records));
  }
  assert_eq!(s.counts().await.unwrap().facts, 50);
}

#[tokio::test]
async fn every_fact_references_existing_rows() {
  let s = store().await;
  let records = three_records();
  pipeline::run(&s, &records, LookupMode::Cached).await.unwrap();

  let keys_of = |rows: Vec<DimensionRow>| rows.into_iter().map(|r| r.key).collect::<Vec<_>>();
  let genders = keys_of(s.list_dimension(Dimension::Gender).await.unwrap());
  let smoking = keys_of(s.list_dimension(Dimension::Smoking).await.unwrap());
  let conditions = keys_of(s.list_dimension(Dimension::Condition).await.unwrap());

  for fact in s.list_facts().await.unwrap() {
    assert!(genders.contains(&fact.gender_id));
    assert!(smoking.contains(&fact.smoking_id));
    assert!(conditions.contains(&fact.condition_id));
    assert!(s.get_patient(fact.patient_id).await.unwrap().is_some());
  }
}

#[tokio::test]
async fn facts_follow_record_order() {
  let s = store().await;
  let records = vec![
    record(30, "Female", "never", "none"),
    record(10, "Male", "never", "none"),
    record(20, "Female", "current", "type1"),
  ];
  pipeline::run(&s, &records, LookupMode::Cached).await.unwrap();

  let order: Vec<i64> = s.list_facts().await.unwrap().iter().map(|f| f.patient_id).collect();
  assert_eq!(order, [30, 10, 20]);
}

#[tokio::test]
async fn patient_attributes_are_loaded() {
  let s = store().await;
  let records = three_records();
  pipeline::run(&s, &records, LookupMode::Cached).await.unwrap();

  let stored = s.get_patient(2).await.unwrap().unwrap();
  assert_eq!(stored, Patient::from(&records[1]));
}

// ─── Reruns ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn dimension_and_patient_stages_are_idempotent() {
  let s = store().await;
  let records = three_records();
  pipeline::init_schema(&s).await.unwrap();

  pipeline::load_dimensions(&s, &records).await.unwrap();
  pipeline::load_patients(&s, &records).await.unwrap();
  let first = s.counts().await.unwrap();

  let loads = pipeline::load_dimensions(&s, &records).await.unwrap();
  let patients = pipeline::load_patients(&s, &records).await.unwrap();

  assert!(loads.iter().all(|d| d.inserted == 0));
  assert_eq!(patients, 0);
  assert_eq!(s.counts().await.unwrap(), first);
}

#[tokio::test]
async fn rerunning_fact_stage_duplicates_facts() {
  let s = store().await;
  let records = three_records();

  pipeline::run(&s, &records, LookupMode::Cached).await.unwrap();
  let second = pipeline::run(&s, &records, LookupMode::Cached).await.unwrap();

  assert_eq!(second.patients_inserted, 0);
  assert_eq!(second.facts_inserted, 3);
  assert_eq!(
    s.counts().await.unwrap(),
    TableCounts { gender: 2, smoking: 2, condition: 2, patients: 3, facts: 6 }
  );

  let facts = s.list_facts().await.unwrap();
  let (first_run, second_run) = facts.split_at(3);
  let keys = |fs: &[Fact]| fs.iter().map(Fact::keys).collect::<Vec<_>>();
  assert_eq!(keys(first_run), keys(second_run));
}

#[tokio::test]
async fn rerun_keeps_existing_surrogate_keys() {
  let s = store().await;
  pipeline::run(&s, &three_records(), LookupMode::Cached).await.unwrap();
  let before = s.dimension_keys(Dimension::Gender).await.unwrap();

  let more = vec![record(4, "Other", "never", "none"), record(5, "Female", "never", "none")];
  pipeline::run(&s, &more, LookupMode::Cached).await.unwrap();
  let after = s.dimension_keys(Dimension::Gender).await.unwrap();

  assert_eq!(after.len(), 3);
  for (label, key) in before {
    assert_eq!(after[&label], key);
  }
}

// ─── Key resolution ──────────────────────────────────────────────────────────

#[tokio::test]
async fn lookup_modes_resolve_identical_keys() {
  let s = store().await;
  let records = three_records();
  pipeline::init_schema(&s).await.unwrap();
  pipeline::load_dimensions(&s, &records).await.unwrap();

  let cached = pipeline::resolve_facts(&s, &records, LookupMode::Cached).await.unwrap();
  let per_row = pipeline::resolve_facts(&s, &records, LookupMode::PerRow).await.unwrap();
  assert_eq!(cached, per_row);
  assert_eq!(cached.len(), 3);
  assert!(cached.iter().zip(&records).all(|(f, r)| f.patient_id == r.id));
}

#[tokio::test]
async fn unknown_label_aborts_fact_stage() {
  for mode in [LookupMode::Cached, LookupMode::PerRow] {
    let s = store().await;
    let mut records = three_records();
    pipeline::run(&s, &records, mode).await.unwrap();

    // The new label never reaches dim_gender.
    records.push(record(4, "Other", "never", "none"));
    records.push(record(5, "Female", "never", "none"));
    pipeline::load_patients(&s, &records).await.unwrap();

    let err = pipeline::load_facts(&s, &records, mode).await.unwrap_err();
    assert!(
      matches!(
        &err,
        Error::DimensionLookupMiss { dimension: Dimension::Gender, label, patient_id: 4 }
          if label == "Other"
      ),
      "{mode:?}: {err}"
    );

    let counts = s.counts().await.unwrap();
    assert_eq!(counts.facts, 3, "{mode:?}");
    assert_eq!(counts.patients, 5, "{mode:?}");
  }
}

#[tokio::test]
async fn skipped_dimension_stage_misses_on_first_record() {
  let s = store().await;
  let records = three_records();
  pipeline::init_schema(&s).await.unwrap();
  pipeline::load_patients(&s, &records).await.unwrap();

  let err = pipeline::load_facts(&s, &records, LookupMode::PerRow).await.unwrap_err();
  assert!(matches!(err, Error::DimensionLookupMiss { patient_id: 1, .. }));
  assert_eq!(s.counts().await.unwrap().facts, 0);
}

#[tokio::test]
async fn lookup_is_case_sensitive() {
  let s = store().await;
  pipeline::run(&s, &three_records(), LookupMode::Cached).await.unwrap();

  let shouty = vec![record(1, "MALE", "never", "none")];
  let err = pipeline::resolve_facts(&s, &shouty, LookupMode::Cached).await.unwrap_err();
  assert!(matches!(err, Error::DimensionLookupMiss { label, .. } if label == "MALE"));
}

#[tokio::test]
async fn empty_input_writes_nothing_but_schema() {
  let s = store().await;
  let report = pipeline::run(&s, &[], LookupMode::Cached).await.unwrap();
  assert_eq!(report.facts_inserted, 0);
  assert_eq!(s.counts().await.unwrap(), TableCounts::default());
  assert_eq!(s.table_names().await.unwrap().len(), 5);
}

// ─── Connection retry ────────────────────────────────────────────────────────

/// Fails the first `failures` attempts, then hands out `store`.
struct FlakyConnector {
  store:    SqliteStore,
  failures: u32,
  calls:    AtomicU32,
}

impl FlakyConnector {
  async fn new(failures: u32) -> Self {
    Self { store: store().await, failures, calls: AtomicU32::new(0) }
  }

  fn calls(&self) -> u32 { self.calls.load(Ordering::SeqCst) }
}

impl Connect for FlakyConnector {
  type Store = SqliteStore;

  fn target(&self) -> String { "flaky".into() }

  async fn connect(&self) -> glyco_store_sqlite::Result<SqliteStore> {
    let attempt = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
    if attempt <= self.failures {
      return Err(tokio_rusqlite::Error::ConnectionClosed.into());
    }
    Ok(self.store.clone())
  }
}

#[tokio::test]
async fn connects_on_last_attempt() {
  let connector = FlakyConnector::new(9).await;
  let session = Session::open(&connector, no_delay(10)).await.unwrap();
  assert_eq!(connector.calls(), 10);

  let report = session.run(&three_records(), LookupMode::Cached).await.unwrap();
  assert_eq!(report.facts_inserted, 3);
}

#[tokio::test]
async fn exhausted_attempts_abort_before_any_write() {
  let connector = FlakyConnector::new(10).await;
  let err = Session::open(&connector, no_delay(10)).await.err().unwrap();

  assert!(matches!(err, Error::ConnectionExhausted { attempts: 10, .. }));
  assert_eq!(connector.calls(), 10);
  assert!(connector.store.table_names().await.unwrap().is_empty());
}

#[tokio::test]
async fn zero_attempts_still_tries_once() {
  let connector = FlakyConnector::new(0).await;
  connect_with_retry(&connector, no_delay(0)).await.unwrap();
  assert_eq!(connector.calls(), 1);
}

#[tokio::test]
async fn retry_waits_between_attempts() {
  let connector = FlakyConnector::new(2).await;
  let policy = RetryPolicy { max_attempts: 3, delay: Duration::from_millis(20) };

  let started = tokio::time::Instant::now();
  connect_with_retry(&connector, policy).await.unwrap();
  assert!(started.elapsed() >= Duration::from_millis(40));
}

#[tokio::test]
async fn failed_attempts_log_their_number() {
  let captured = Captured::default();
  let sink = captured.clone();
  let _guard = tracing::subscriber::set_default(logging::subscriber(move || sink.clone(), false));

  let connector = FlakyConnector::new(2).await;
  connect_with_retry(&connector, no_delay(3)).await.unwrap();

  let log = captured.text();
  assert!(log.contains("store unavailable (1/3)"), "{log}");
  assert!(log.contains("store unavailable (2/3)"), "{log}");
  assert!(!log.contains("(3/3)"), "{log}");
}

// ─── Session lifecycle ───────────────────────────────────────────────────────

#[tokio::test]
async fn session_closes_store_after_success() {
  let s = store().await;
  let handle = s.clone();

  Session::new(s).run(&three_records(), LookupMode::Cached).await.unwrap();
  assert!(handle.counts().await.is_err());
}

/// Delegates to SQLite but rejects every fact batch, and records `close`.
struct FactsRejected {
  inner:  SqliteStore,
  closed: Arc<AtomicBool>,
}

#[derive(Debug, thiserror::Error)]
enum FactsRejectedError {
  #[error("fact insert rejected")]
  Rejected,
  #[error(transparent)]
  Sqlite(#[from] glyco_store_sqlite::Error),
}

impl StarStore for FactsRejected {
  type Error = FactsRejectedError;

  async fn init_schema(&self) -> Result<(), Self::Error> { Ok(self.inner.init_schema().await?) }

  async fn insert_labels(&self, d: Dimension, labels: Vec<String>) -> Result<u64, Self::Error> {
    Ok(self.inner.insert_labels(d, labels).await?)
  }

  async fn insert_patients(&self, patients: Vec<Patient>) -> Result<u64, Self::Error> {
    Ok(self.inner.insert_patients(patients).await?)
  }

  async fn insert_facts(&self, _: Vec<NewFact>) -> Result<u64, Self::Error> {
    Err(FactsRejectedError::Rejected)
  }

  async fn lookup_key(&self, d: Dimension, label: String) -> Result<Option<i64>, Self::Error> {
    Ok(self.inner.lookup_key(d, label).await?)
  }

  async fn dimension_keys(&self, d: Dimension) -> Result<HashMap<String, i64>, Self::Error> {
    Ok(self.inner.dimension_keys(d).await?)
  }

  async fn list_dimension(&self, d: Dimension) -> Result<Vec<DimensionRow>, Self::Error> {
    Ok(self.inner.list_dimension(d).await?)
  }

  async fn get_patient(&self, id: i64) -> Result<Option<Patient>, Self::Error> {
    Ok(self.inner.get_patient(id).await?)
  }

  async fn list_facts(&self) -> Result<Vec<Fact>, Self::Error> { Ok(self.inner.list_facts().await?) }

  async fn counts(&self) -> Result<TableCounts, Self::Error> { Ok(self.inner.counts().await?) }

  async fn close(self) -> Result<(), Self::Error> {
    self.closed.store(true, Ordering::SeqCst);
    Ok(self.inner.close().await?)
  }
}

#[tokio::test]
async fn failed_fact_stage_keeps_earlier_stages_and_closes() {
  let inner = store().await;
  let handle = inner.clone();
  let closed = Arc::new(AtomicBool::new(false));
  let store = FactsRejected { inner, closed: Arc::clone(&closed) };

  let err = Session::new(store)
    .run(&three_records(), LookupMode::Cached)
    .await
    .unwrap_err();

  assert!(matches!(err, Error::Store(_)));
  assert!(closed.load(Ordering::SeqCst));
  // The handle shares the connection the session closed.
  assert!(handle.counts().await.is_err());
}

#[tokio::test]
async fn failed_fact_stage_leaves_dimensions_committed() {
  let inner = store().await;
  let handle = inner.clone();
  let store = FactsRejected { inner, closed: Arc::new(AtomicBool::new(false)) };

  let records = three_records();
  let err = pipeline::run(&store, &records, LookupMode::Cached).await.unwrap_err();
  assert!(matches!(err, Error::Store(_)));

  assert_eq!(
    handle.counts().await.unwrap(),
    TableCounts { gender: 2, smoking: 2, condition: 2, patients: 3, facts: 0 }
  );
}
