//! SQL schema for the SQLite backend.
//!
//! Table and column names are shared with the Postgres backend; consumers
//! query them directly.

/// Connection-level pragmas, applied on every open.
pub const PRAGMAS: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
";

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS dim_gender (
    gender_id INTEGER PRIMARY KEY,
    gender    TEXT UNIQUE
);

CREATE TABLE IF NOT EXISTS dim_smoking (
    smoking_id     INTEGER PRIMARY KEY,
    smoking_status TEXT UNIQUE
);

CREATE TABLE IF NOT EXISTS dim_condition (
    condition_id INTEGER PRIMARY KEY,
    condition    TEXT UNIQUE
);

-- Keyed by the external identifier from the source file; never generated.
CREATE TABLE IF NOT EXISTS dim_patient (
    patient_id     INTEGER PRIMARY KEY,
    full_name      TEXT,
    age            INTEGER,
    bmi            REAL,
    blood_pressure REAL,
    glucose_levels REAL
);

-- Append-only. Reloading the same source appends the same facts again.
CREATE TABLE IF NOT EXISTS fact_diabetes (
    fact_id      INTEGER PRIMARY KEY,
    patient_id   INTEGER NOT NULL REFERENCES dim_patient(patient_id),
    gender_id    INTEGER NOT NULL REFERENCES dim_gender(gender_id),
    smoking_id   INTEGER NOT NULL REFERENCES dim_smoking(smoking_id),
    condition_id INTEGER NOT NULL REFERENCES dim_condition(condition_id)
);
";
