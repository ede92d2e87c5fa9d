//! Fact rows of `fact_diabetes`.
//!
//! Facts are append-only: the loader never deduplicates them, so loading the
//! same records twice yields two facts per record.

use serde::{Deserialize, Serialize};

/// A fact whose dimension keys have been resolved but which has not been
/// inserted yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFact {
  pub patient_id:   i64,
  pub gender_id:    i64,
  pub smoking_id:   i64,
  pub condition_id: i64,
}

/// A persisted fact row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fact {
  /// Generated by the store.
  pub fact_id:      i64,
  pub patient_id:   i64,
  pub gender_id:    i64,
  pub smoking_id:   i64,
  pub condition_id: i64,
}

impl Fact {
  /// The fact without its generated identifier.
  pub fn keys(&self) -> NewFact {
    NewFact {
      patient_id:   self.patient_id,
      gender_id:    self.gender_id,
      smoking_id:   self.smoking_id,
      condition_id: self.condition_id,
    }
  }
}
