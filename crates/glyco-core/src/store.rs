//! The `StarStore` trait and the `Connect` trait that opens one.
//!
//! The traits are implemented by storage backends (`glyco-store-sqlite`,
//! `glyco-store-postgres`). The ETL layer depends on this abstraction, not on
//! any concrete backend.

use std::{collections::HashMap, future::Future};

use serde::Serialize;

use crate::{
  dimension::{Dimension, DimensionRow},
  fact::{Fact, NewFact},
  record::Patient,
};

// ─── Counts ──────────────────────────────────────────────────────────────────

/// Row counts of every table in the star schema.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TableCounts {
  pub gender:    u64,
  pub smoking:   u64,
  pub condition: u64,
  pub patients:  u64,
  pub facts:     u64,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// An open session against a relational store holding the star schema.
///
/// Every write method is its own committed unit: once it returns `Ok`, its
/// rows survive a later failure in another method.
///
/// All methods return `Send` futures so a session can be driven from a
/// multi-threaded tokio runtime.
pub trait StarStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Schema ────────────────────────────────────────────────────────────

  /// Create every table that does not exist yet. Never drops or alters
  /// existing tables.
  fn init_schema(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Insert `labels` into the dimension table, silently skipping labels that
  /// are already present. Returns the number of rows actually inserted.
  fn insert_labels(
    &self,
    dimension: Dimension,
    labels: Vec<String>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Insert patients, skipping any whose `patient_id` already exists.
  /// Existing rows are never updated. Returns the number inserted.
  fn insert_patients(
    &self,
    patients: Vec<Patient>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Append facts. No deduplication; every call adds `facts.len()` rows or
  /// fails as a whole (e.g. on a dangling foreign key).
  fn insert_facts(
    &self,
    facts: Vec<NewFact>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Surrogate key of `label` in `dimension`, by exact match.
  fn lookup_key(
    &self,
    dimension: Dimension,
    label: String,
  ) -> impl Future<Output = Result<Option<i64>, Self::Error>> + Send + '_;

  /// The complete label → key map of `dimension`.
  fn dimension_keys(
    &self,
    dimension: Dimension,
  ) -> impl Future<Output = Result<HashMap<String, i64>, Self::Error>> + Send + '_;

  /// All rows of `dimension`, ordered by key.
  fn list_dimension(
    &self,
    dimension: Dimension,
  ) -> impl Future<Output = Result<Vec<DimensionRow>, Self::Error>> + Send + '_;

  fn get_patient(
    &self,
    patient_id: i64,
  ) -> impl Future<Output = Result<Option<Patient>, Self::Error>> + Send + '_;

  /// All facts, ordered by `fact_id`.
  fn list_facts(&self) -> impl Future<Output = Result<Vec<Fact>, Self::Error>> + Send + '_;

  fn counts(&self) -> impl Future<Output = Result<TableCounts, Self::Error>> + Send + '_;

  // ── Lifecycle ─────────────────────────────────────────────────────────

  /// Release the underlying connection.
  fn close(self) -> impl Future<Output = Result<(), Self::Error>> + Send
  where
    Self: Sized;
}

/// Opens a [`StarStore`] session. One call is one attempt; retrying is the
/// caller's business.
pub trait Connect: Send + Sync {
  type Store: StarStore;

  /// Human-readable description of the target, for logs. Must not contain
  /// credentials.
  fn target(&self) -> String;

  fn connect(
    &self,
  ) -> impl Future<Output = Result<Self::Store, <Self::Store as StarStore>::Error>> + Send + '_;
}
