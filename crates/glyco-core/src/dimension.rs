//! The three categorical lookup dimensions of the star schema.
//!
//! Each dimension is a table of `(surrogate key, unique label)` pairs. Labels
//! are compared exactly; `"Male"` and `"male"` are different rows.

use std::{collections::BTreeSet, fmt};

use serde::{Deserialize, Serialize};

use crate::record::Record;

/// A label-lookup dimension.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
  Gender,
  Smoking,
  Condition,
}

impl Dimension {
  /// Every dimension, in load order.
  pub const ALL: [Dimension; 3] =
    [Dimension::Gender, Dimension::Smoking, Dimension::Condition];

  pub fn table(self) -> &'static str {
    match self {
      Self::Gender => "dim_gender",
      Self::Smoking => "dim_smoking",
      Self::Condition => "dim_condition",
    }
  }

  /// Name of the generated surrogate key column.
  pub fn key_column(self) -> &'static str {
    match self {
      Self::Gender => "gender_id",
      Self::Smoking => "smoking_id",
      Self::Condition => "condition_id",
    }
  }

  /// Name of the unique label column.
  pub fn label_column(self) -> &'static str {
    match self {
      Self::Gender => "gender",
      Self::Smoking => "smoking_status",
      Self::Condition => "condition",
    }
  }

  /// The natural key this dimension takes from a record.
  pub fn label_of(self, record: &Record) -> &str {
    match self {
      Self::Gender => &record.gender,
      Self::Smoking => &record.smoking_status,
      Self::Condition => &record.condition,
    }
  }

  /// Distinct labels of this dimension across `records`, sorted.
  pub fn distinct_labels(self, records: &[Record]) -> Vec<String> {
    records
      .iter()
      .map(|r| self.label_of(r))
      .collect::<BTreeSet<_>>()
      .into_iter()
      .map(str::to_owned)
      .collect()
  }

  fn as_str(self) -> &'static str {
    match self {
      Self::Gender => "gender",
      Self::Smoking => "smoking",
      Self::Condition => "condition",
    }
  }
}

impl fmt::Display for Dimension {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// One persisted dimension row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionRow {
  pub key:   i64,
  pub label: String,
}
