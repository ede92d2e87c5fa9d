//! Reads the cleaned source file into memory.
//!
//! The file is CSV with a header row naming at least `id`, `full_name`,
//! `age`, `bmi`, `blood_pressure`, `glucose_levels`, `gender`,
//! `smoking_status` and `condition`. Other columns are ignored. Values are
//! taken as-is; cleaning happened upstream.

use std::{fs::File, io::Read, path::Path};

use glyco_core::record::Record;
use tracing::info;

use crate::Result;

/// Read every record of the file at `path`, in file order.
pub fn read_records(path: &Path) -> Result<Vec<Record>> {
  let records = read_records_from(File::open(path)?)?;
  info!(path = %path.display(), records = records.len(), "read source file");
  Ok(records)
}

pub fn read_records_from(reader: impl Read) -> Result<Vec<Record>> {
  let records = csv::Reader::from_reader(reader)
    .deserialize()
    .collect::<Result<Vec<Record>, csv::Error>>()?;
  Ok(records)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::Error;

  const CSV: &str = "\
id,full_name,age,bmi,blood_pressure,glucose_levels,gender,smoking_status,condition,notes
1,Ana Torres,54,27.5,130.0,150.2,Female,never,type2,
2,Luis Gómez,61,31.0,145.5,180.0,Male,former,type2,x
";

  #[test]
  fn reads_records_in_order() {
    let records = read_records_from(CSV.as_bytes()).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].id, 1);
    assert_eq!(records[0].full_name, "Ana Torres");
    assert_eq!(records[1].smoking_status, "former");
    assert_eq!(records[1].glucose_levels, 180.0);
  }

  #[test]
  fn header_only_yields_nothing() {
    let header = CSV.lines().next().unwrap();
    assert!(read_records_from(header.as_bytes()).unwrap().is_empty());
  }

  #[test]
  fn mistyped_value_is_a_source_error() {
    let bad = "id,full_name,age,bmi,blood_pressure,glucose_levels,gender,smoking_status,condition\n\
               x,Ana,54,27.5,130.0,150.2,Female,never,type2\n";
    assert!(matches!(read_records_from(bad.as_bytes()), Err(Error::Source(_))));
  }

  #[test]
  fn missing_file_is_an_io_error() {
    let result = read_records(Path::new("/nonexistent/diabetes_cleaned.csv"));
    assert!(matches!(result, Err(Error::Io(_))));
  }
}
