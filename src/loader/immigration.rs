use crate::error::{PipelineError, Result};
use crate::models::RawImmigrationRecord;
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Reads I-94 arrival extracts stored as Parquet.
pub struct ImmigrationLoader;

impl ImmigrationLoader {
    pub fn new() -> Self {
        ImmigrationLoader
    }

    /// Loads every given file; directories contribute their `.parquet`
    /// files in name order.
    pub fn load_paths(&self, paths: &[PathBuf]) -> Result<Vec<RawImmigrationRecord>> {
        let files = expand_parquet_paths(paths)?;
        if files.is_empty() {
            return Err(PipelineError::load(
                "immigration",
                "no parquet files found in the configured input paths",
            ));
        }

        let mut records = Vec::new();
        for file in &files {
            let batch = self.load_file(file)?;
            info!("Loaded {} arrival records from {}", batch.len(), file.display());
            records.extend(batch);
        }

        info!(
            "Loaded {} arrival records from {} files",
            records.len(),
            files.len()
        );
        Ok(records)
    }

    pub fn load_file(&self, path: &Path) -> Result<Vec<RawImmigrationRecord>> {
        let source = path.display().to_string();
        let file = File::open(path).map_err(|e| PipelineError::load(&source, e))?;
        let df = ParquetReader::new(file)
            .finish()
            .map_err(|e| PipelineError::load(&source, e))?;

        self.records_from_dataframe(&df)
            .map_err(|e| PipelineError::load(&source, e))
    }

    /// Pulls the columns the cleaner needs out of a raw extract frame.
    ///
    /// Numeric columns are cast to Float64 and text columns to String.
    /// Absent columns read as all-null.
    pub fn records_from_dataframe(&self, df: &DataFrame) -> PolarsResult<Vec<RawImmigrationRecord>> {
        let height = df.height();

        let cicid = float_column(df, "cicid")?;
        let i94yr = float_column(df, "i94yr")?;
        let i94mon = float_column(df, "i94mon")?;
        let i94res = float_column(df, "i94res")?;
        let arrdate = float_column(df, "arrdate")?;
        let i94mode = float_column(df, "i94mode")?;
        let depdate = float_column(df, "depdate")?;
        let i94bir = float_column(df, "i94bir")?;
        let i94visa = float_column(df, "i94visa")?;

        let i94port = string_column(df, "i94port")?;
        let i94addr = string_column(df, "i94addr")?;
        let airline = string_column(df, "airline")?;
        let fltno = string_column(df, "fltno")?;
        let visatype = string_column(df, "visatype")?;
        let gender = string_column(df, "gender")?;

        let records = (0..height)
            .map(|i| RawImmigrationRecord {
                cicid: cicid[i],
                i94yr: i94yr[i],
                i94mon: i94mon[i],
                i94res: i94res[i],
                i94port: i94port[i].clone(),
                arrdate: arrdate[i],
                i94mode: i94mode[i],
                i94addr: i94addr[i].clone(),
                depdate: depdate[i],
                i94bir: i94bir[i],
                i94visa: i94visa[i],
                airline: airline[i].clone(),
                fltno: fltno[i].clone(),
                visatype: visatype[i].clone(),
                gender: gender[i].clone(),
            })
            .collect();

        Ok(records)
    }
}

impl Default for ImmigrationLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn float_column(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<f64>>> {
    match df.column(name) {
        Ok(column) => {
            let cast = column.cast(&DataType::Float64)?;
            Ok(cast.f64()?.into_iter().collect())
        }
        Err(_) => {
            warn!("Column '{}' missing from arrival extract; reading as null", name);
            Ok(vec![None; df.height()])
        }
    }
}

fn string_column(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<String>>> {
    match df.column(name) {
        Ok(column) => {
            let cast = column.cast(&DataType::String)?;
            Ok(cast
                .str()?
                .into_iter()
                .map(|value| value.map(str::to_string))
                .collect())
        }
        Err(_) => {
            warn!("Column '{}' missing from arrival extract; reading as null", name);
            Ok(vec![None; df.height()])
        }
    }
}

fn expand_parquet_paths(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let entries = std::fs::read_dir(path)
                .map_err(|e| PipelineError::load(path.display().to_string(), e))?;
            let mut found: Vec<PathBuf> = entries
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.extension().is_some_and(|ext| ext == "parquet"))
                .collect();
            found.sort();
            files.extend(found);
        } else {
            files.push(path.clone());
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_frame() -> DataFrame {
        df!(
            "cicid" => [6.0, 7.0],
            "i94yr" => [2016.0, 2016.0],
            "i94mon" => [4.0, 4.0],
            "i94res" => [117.0, 438.0],
            "i94port" => ["XXX", "NYC"],
            "arrdate" => [Some(20574.0), None],
            "i94mode" => [Some(1.0), Some(2.0)],
            "i94addr" => [None, Some("NY")],
            "i94bir" => [37.0, 22.0],
            "i94visa" => [2.0, 1.0],
            "gender" => [None::<&str>, Some("M")],
            "fltno" => [Some(123i64), None]
        )
        .unwrap()
    }

    #[test]
    fn test_records_from_dataframe() {
        let records = ImmigrationLoader::new()
            .records_from_dataframe(&sample_frame())
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].i94res, Some(117.0));
        assert_eq!(records[0].i94port.as_deref(), Some("XXX"));
        assert_eq!(records[0].i94addr, None);
        assert_eq!(records[0].gender, None);
        assert_eq!(records[0].fltno.as_deref(), Some("123"));
        assert_eq!(records[1].arrdate, None);
        assert_eq!(records[1].gender.as_deref(), Some("M"));
    }

    #[test]
    fn test_missing_columns_read_as_null() {
        let records = ImmigrationLoader::new()
            .records_from_dataframe(&sample_frame())
            .unwrap();
        assert!(records.iter().all(|r| r.depdate.is_none()));
        assert!(records.iter().all(|r| r.airline.is_none()));
        assert!(records.iter().all(|r| r.visatype.is_none()));
    }

    #[test]
    fn test_load_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arrivals.parquet");
        let mut df = sample_frame();
        ParquetWriter::new(File::create(&path).unwrap())
            .finish(&mut df)
            .unwrap();

        let records = ImmigrationLoader::new()
            .load_paths(&[dir.path().to_path_buf()])
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].i94port.as_deref(), Some("NYC"));
    }

    #[test]
    fn test_no_input_files_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ImmigrationLoader::new()
            .load_paths(&[dir.path().to_path_buf()])
            .unwrap_err();
        assert!(matches!(err, PipelineError::Load { .. }));
    }
}
