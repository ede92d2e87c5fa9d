//! [`SqliteStore`]: the SQLite implementation of [`StarStore`].

use std::{collections::HashMap, path::Path};

use rusqlite::OptionalExtension as _;

use glyco_core::{
  dimension::{Dimension, DimensionRow},
  fact::{Fact, NewFact},
  record::Patient,
  store::{StarStore, TableCounts},
};

use crate::{
  Error, Result,
  schema::{PRAGMAS, SCHEMA},
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A star-schema session backed by a single SQLite file.
///
/// Clones share one reference-counted connection.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) the database at `path`. Tables are not created until
  /// [`StarStore::init_schema`] runs.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.apply_pragmas().await?;
    Ok(store)
  }

  /// Open an empty in-memory database.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.apply_pragmas().await?;
    Ok(store)
  }

  async fn apply_pragmas(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(PRAGMAS)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Names of the user tables currently present, sorted.
  pub async fn table_names(&self) -> Result<Vec<String>> {
    let names = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT name FROM sqlite_master
           WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
           ORDER BY name",
        )?;
        let names = stmt
          .query_map([], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
      })
      .await?;
    Ok(names)
  }

  async fn count(&self, table: &'static str) -> Result<u64> {
    let n: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))?)
      })
      .await?;
    u64::try_from(n).map_err(|_| Error::OutOfRange { table, value: n })
  }
}

// ─── StarStore impl ──────────────────────────────────────────────────────────

impl StarStore for SqliteStore {
  type Error = Error;

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        let tx = conn.transaction()?;
        tx.execute_batch(SCHEMA)?;
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn insert_labels(&self, dimension: Dimension, labels: Vec<String>) -> Result<u64> {
    let sql = format!(
      "INSERT INTO {table} ({col}) VALUES (?1) ON CONFLICT ({col}) DO NOTHING",
      table = dimension.table(),
      col = dimension.label_column(),
    );

    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut inserted = 0;
        {
          let mut stmt = tx.prepare(&sql)?;
          for label in &labels {
            inserted += stmt.execute([label])? as u64;
          }
        }
        tx.commit()?;
        Ok(inserted)
      })
      .await?;
    Ok(inserted)
  }

  async fn insert_patients(&self, patients: Vec<Patient>) -> Result<u64> {
    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut inserted = 0;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO dim_patient (
               patient_id, full_name, age, bmi, blood_pressure, glucose_levels
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (patient_id) DO NOTHING",
          )?;
          for p in &patients {
            inserted += stmt.execute(rusqlite::params![
              p.patient_id,
              p.full_name,
              p.age,
              p.bmi,
              p.blood_pressure,
              p.glucose_levels,
            ])? as u64;
          }
        }
        tx.commit()?;
        Ok(inserted)
      })
      .await?;
    Ok(inserted)
  }

  async fn insert_facts(&self, facts: Vec<NewFact>) -> Result<u64> {
    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut inserted = 0;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO fact_diabetes (patient_id, gender_id, smoking_id, condition_id)
             VALUES (?1, ?2, ?3, ?4)",
          )?;
          for f in &facts {
            inserted += stmt.execute(rusqlite::params![
              f.patient_id,
              f.gender_id,
              f.smoking_id,
              f.condition_id,
            ])? as u64;
          }
        }
        tx.commit()?;
        Ok(inserted)
      })
      .await?;
    Ok(inserted)
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn lookup_key(&self, dimension: Dimension, label: String) -> Result<Option<i64>> {
    let sql = format!(
      "SELECT {key} FROM {table} WHERE {col} = ?1",
      key = dimension.key_column(),
      table = dimension.table(),
      col = dimension.label_column(),
    );

    let key: Option<i64> = self
      .conn
      .call(move |conn| Ok(conn.query_row(&sql, [label], |r| r.get(0)).optional()?))
      .await?;
    Ok(key)
  }

  async fn dimension_keys(&self, dimension: Dimension) -> Result<HashMap<String, i64>> {
    let rows = self.list_dimension(dimension).await?;
    Ok(rows.into_iter().map(|row| (row.label, row.key)).collect())
  }

  async fn list_dimension(&self, dimension: Dimension) -> Result<Vec<DimensionRow>> {
    let sql = format!(
      "SELECT {key}, {col} FROM {table} WHERE {col} IS NOT NULL ORDER BY {key}",
      key = dimension.key_column(),
      table = dimension.table(),
      col = dimension.label_column(),
    );

    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], |row| Ok(DimensionRow { key: row.get(0)?, label: row.get(1)? }))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }

  async fn get_patient(&self, patient_id: i64) -> Result<Option<Patient>> {
    let patient = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT patient_id, full_name, age, bmi, blood_pressure, glucose_levels
               FROM dim_patient WHERE patient_id = ?1",
              [patient_id],
              |row| {
                Ok(Patient {
                  patient_id:     row.get(0)?,
                  full_name:      row.get(1)?,
                  age:            row.get(2)?,
                  bmi:            row.get(3)?,
                  blood_pressure: row.get(4)?,
                  glucose_levels: row.get(5)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;
    Ok(patient)
  }

  async fn list_facts(&self) -> Result<Vec<Fact>> {
    let facts = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT fact_id, patient_id, gender_id, smoking_id, condition_id
           FROM fact_diabetes ORDER BY fact_id",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(Fact {
              fact_id:      row.get(0)?,
              patient_id:   row.get(1)?,
              gender_id:    row.get(2)?,
              smoking_id:   row.get(3)?,
              condition_id: row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(facts)
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
    self.conn.close().await?;
    Ok(())
  }
}
