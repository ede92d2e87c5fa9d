//! [`PostgresStore`]: the Postgres implementation of [`StarStore`].

use std::collections::HashMap;

use glyco_core::{
  dimension::{Dimension, DimensionRow},
  fact::{Fact, NewFact},
  record::Patient,
  store::{StarStore, TableCounts},
};
use sqlx::{PgPool, Row};
use tracing::debug;

use crate::{Error, Result, schema::SCHEMA};

/// A star-schema session over a single-connection pool.
///
/// Surrogate keys are `SERIAL` (32-bit) in the schema; every query widens
/// them to `BIGINT` so callers only ever see `i64`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
  pool: PgPool,
}

impl PostgresStore {
  pub fn new(pool: PgPool) -> Self { Self { pool } }

  pub fn pool(&self) -> &PgPool { &self.pool }

  async fn count(&self, table: &'static str) -> Result<u64> {
    let n: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
      .fetch_one(&self.pool)
      .await?;
    u64::try_from(n).map_err(|_| Error::OutOfRange { table, value: n })
  }
}

impl StarStore for PostgresStore {
  type Error = Error;

  async fn init_schema(&self) -> Result<()> {
    let mut tx = self.pool.begin().await?;
    for stmt in SCHEMA {
      sqlx::query(stmt).execute(&mut *tx).await?;
    }
    tx.commit().await?;
    Ok(())
  }

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn insert_labels(&self, dimension: Dimension, labels: Vec<String>) -> Result<u64> {
    let sql = format!(
      "INSERT INTO {table} ({col})
       SELECT * FROM UNNEST($1::TEXT[])
       ON CONFLICT ({col}) DO NOTHING",
      table = dimension.table(),
      col = dimension.label_column(),
    );

    let mut tx = self.pool.begin().await?;
    let inserted = sqlx::query(&sql)
      .bind(&labels)
      .execute(&mut *tx)
      .await?
      .rows_affected();
    tx.commit().await?;

    debug!(%dimension, offered = labels.len(), inserted, "inserted dimension labels");
    Ok(inserted)
  }

  async fn insert_patients(&self, patients: Vec<Patient>) -> Result<u64> {
    let mut ids = Vec::with_capacity(patients.len());
    let mut names = Vec::with_capacity(patients.len());
    let mut ages = Vec::with_capacity(patients.len());
    let mut bmis = Vec::with_capacity(patients.len());
    let mut pressures = Vec::with_capacity(patients.len());
    let mut glucose = Vec::with_capacity(patients.len());
    for p in patients {
      ids.push(p.patient_id);
      names.push(p.full_name);
      ages.push(p.age);
      bmis.push(p.bmi);
      pressures.push(p.blood_pressure);
      glucose.push(p.glucose_levels);
    }

    let mut tx = self.pool.begin().await?;
    let inserted = sqlx::query(
      "INSERT INTO dim_patient (
         patient_id, full_name, age, bmi, blood_pressure, glucose_levels
       )
       SELECT * FROM UNNEST(
         $1::BIGINT[], $2::TEXT[], $3::BIGINT[],
         $4::FLOAT8[], $5::FLOAT8[], $6::FLOAT8[]
       )
       ON CONFLICT (patient_id) DO NOTHING",
    )
    .bind(&ids)
    .bind(&names)
    .bind(&ages)
    .bind(&bmis)
    .bind(&pressures)
    .bind(&glucose)
    .execute(&mut *tx)
    .await?
    .rows_affected();
    tx.commit().await?;

    debug!(offered = ids.len(), inserted, "inserted patients");
    Ok(inserted)
  }

  async fn insert_facts(&self, facts: Vec<NewFact>) -> Result<u64> {
    let patient_ids: Vec<i64> = facts.iter().map(|f| f.patient_id).collect();
    let gender_ids: Vec<i64> = facts.iter().map(|f| f.gender_id).collect();
    let smoking_ids: Vec<i64> = facts.iter().map(|f| f.smoking_id).collect();
    let condition_ids: Vec<i64> = facts.iter().map(|f| f.condition_id).collect();

    let mut tx = self.pool.begin().await?;
    let inserted = sqlx::query(
      "INSERT INTO fact_diabetes (patient_id, gender_id, smoking_id, condition_id)
       SELECT * FROM UNNEST($1::BIGINT[], $2::BIGINT[], $3::BIGINT[], $4::BIGINT[])",
    )
    .bind(&patient_ids)
    .bind(&gender_ids)
    .bind(&smoking_ids)
    .bind(&condition_ids)
    .execute(&mut *tx)
    .await?
    .rows_affected();
    tx.commit().await?;

    debug!(inserted, "inserted facts");
    Ok(inserted)
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn lookup_key(&self, dimension: Dimension, label: String) -> Result<Option<i64>> {
    let sql = format!(
      "SELECT {key}::BIGINT FROM {table} WHERE {col} = $1",
      key = dimension.key_column(),
      table = dimension.table(),
      col = dimension.label_column(),
    );
    Ok(
      sqlx::query_scalar::<_, i64>(&sql)
        .bind(label)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn dimension_keys(&self, dimension: Dimension) -> Result<HashMap<String, i64>> {
    let rows = self.list_dimension(dimension).await?;
    Ok(rows.into_iter().map(|row| (row.label, row.key)).collect())
  }

  async fn list_dimension(&self, dimension: Dimension) -> Result<Vec<DimensionRow>> {
    let sql = format!(
      "SELECT {key}::BIGINT AS key, {col} AS label
       FROM {table} WHERE {col} IS NOT NULL ORDER BY {key}",
      key = dimension.key_column(),
      table = dimension.table(),
      col = dimension.label_column(),
    );

    let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
    rows
      .iter()
      .map(|row| -> Result<DimensionRow> {
        Ok(DimensionRow {
          key:   row.try_get("key")?,
          label: row.try_get("label")?,
        })
      })
      .collect()
  }

  async fn get_patient(&self, patient_id: i64) -> Result<Option<Patient>> {
    let row = sqlx::query(
      "SELECT patient_id::BIGINT AS patient_id, full_name, age::BIGINT AS age,
              bmi, blood_pressure, glucose_levels
       FROM dim_patient WHERE patient_id = $1",
    )
    .bind(patient_id)
    .fetch_optional(&self.pool)
    .await?;

    let Some(row) = row else { return Ok(None) };
    Ok(Some(Patient {
      patient_id:     row.try_get("patient_id")?,
      full_name:      row.try_get("full_name")?,
      age:            row.try_get("age")?,
      bmi:            row.try_get("bmi")?,
      blood_pressure: row.try_get("blood_pressure")?,
      glucose_levels: row.try_get("glucose_levels")?,
    }))
  }

  async fn list_facts(&self) -> Result<Vec<Fact>> {
    let rows = sqlx::query(
      "SELECT fact_id::BIGINT AS fact_id, patient_id::BIGINT AS patient_id,
              gender_id::BIGINT AS gender_id, smoking_id::BIGINT AS smoking_id,
              condition_id::BIGINT AS condition_id
       FROM fact_diabetes ORDER BY fact_id",
    )
    .fetch_all(&self.pool)
    .await?;

    rows
      .iter()
      .map(|row| -> Result<Fact> {
        Ok(Fact {
          fact_id:      row.try_get("fact_id")?,
          patient_id:   row.try_get("patient_id")?,
          gender_id:    row.try_get("gender_id")?,
          smoking_id:   row.try_get("smoking_id")?,
          condition_id: row.try_get("condition_id")?,
        })
      })
      .collect()
  }

  async fn counts(&self) -> Result<TableCounts> {
    Ok(TableCounts {
      gender:    self.count("dim_gender").await?,
      smoking:   self.count("dim_smoking").await?,
      condition: self.count("dim_condition").await?,
      patients:  self.count("dim_patient").await?,
      facts:     self.count("fact_diabetes").await?,
    })
  }

  async fn close(self) -> Result<()> {
    self.pool.close().await;
    Ok(())
  }
}
