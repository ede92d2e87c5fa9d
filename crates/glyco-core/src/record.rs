//! Source records and the patient projection loaded into `dim_patient`.

use serde::{Deserialize, Serialize};

/// One row of the cleaned source file. Immutable once read.
///
/// Field names match the source column headers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
  /// External patient identifier; becomes `dim_patient.patient_id`.
  pub id:             i64,
  pub full_name:      String,
  pub age:            i64,
  pub bmi:            f64,
  pub blood_pressure: f64,
  pub glucose_levels: f64,
  pub gender:         String,
  pub smoking_status: String,
  pub condition:      String,
}

/// A `dim_patient` row. Keyed by the externally supplied identifier, never
/// generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
  pub patient_id:     i64,
  pub full_name:      String,
  pub age:            i64,
  pub bmi:            f64,
  pub blood_pressure: f64,
  pub glucose_levels: f64,
}

impl From<&Record> for Patient {
  fn from(r: &Record) -> Self {
    Self {
      patient_id:     r.id,
      full_name:      r.full_name.clone(),
      age:            r.age,
      bmi:            r.bmi,
      blood_pressure: r.blood_pressure,
      glucose_levels: r.glucose_levels,
    }
  }
}
