//! Star-schema DDL for Postgres, one statement per entry.
//!
//! Column types are those downstream consumers already query: `SERIAL`
//! surrogate keys, `INT` patient identifiers and `FLOAT` measurements.

pub const SCHEMA: [&str; 5] = [
  r#"CREATE TABLE IF NOT EXISTS dim_gender (
        gender_id SERIAL PRIMARY KEY,
        gender    TEXT UNIQUE
    )"#,
  r#"CREATE TABLE IF NOT EXISTS dim_smoking (
        smoking_id     SERIAL PRIMARY KEY,
        smoking_status TEXT UNIQUE
    )"#,
  r#"CREATE TABLE IF NOT EXISTS dim_condition (
        condition_id SERIAL PRIMARY KEY,
        condition    TEXT UNIQUE
    )"#,
  r#"CREATE TABLE IF NOT EXISTS dim_patient (
        patient_id     INT PRIMARY KEY,
        full_name      TEXT,
        age            INT,
        bmi            FLOAT,
        blood_pressure FLOAT,
        glucose_levels FLOAT
    )"#,
  r#"CREATE TABLE IF NOT EXISTS fact_diabetes (
        fact_id      SERIAL PRIMARY KEY,
        patient_id   INT REFERENCES dim_patient(patient_id),
        gender_id    INT REFERENCES dim_gender(gender_id),
        smoking_id   INT REFERENCES dim_smoking(smoking_id),
        condition_id INT REFERENCES dim_condition(condition_id)
    )"#,
];
