use crate::error::{PipelineError, Result};
use crate::models::RawDemographicRecord;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

/// Reads the `;`-delimited US city demographics file.
pub struct DemographicsLoader;

impl DemographicsLoader {
    pub fn new() -> Self {
        DemographicsLoader
    }

    pub fn load_file(&self, path: &Path) -> Result<Vec<RawDemographicRecord>> {
        let source = path.display().to_string();
        let file = std::fs::File::open(path).map_err(|e| PipelineError::load(&source, e))?;
        let records = self.load_reader(file, &source)?;
        info!("Loaded {} demographic rows from {}", records.len(), source);
        Ok(records)
    }

    /// Malformed rows are skipped with a warning; a bad header is fatal.
    pub fn load_reader<R: Read>(&self, reader: R, source: &str) -> Result<Vec<RawDemographicRecord>> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b';')
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr
            .headers()
            .map_err(|e| PipelineError::load(source, e))?
            .clone();
        for required in ["City", "State"] {
            if !headers.iter().any(|h| h == required) {
                return Err(PipelineError::load(
                    source,
                    format!("missing required column '{}'", required),
                ));
            }
        }

        let mut records = Vec::new();
        let mut skipped = 0;
        for (index, result) in rdr.deserialize::<RawDemographicRecord>().enumerate() {
            match result {
                Ok(record) => records.push(record),
                Err(e) => {
                    skipped += 1;
                    warn!("Skipping malformed demographic row {}: {}", index + 1, e);
                }
            }
        }

        if skipped > 0 {
            warn!("Skipped {} malformed rows in {}", skipped, source);
        }
        Ok(records)
    }
}

impl Default for DemographicsLoader {
    fn default() -> Self {
        Self::new()
    }
}
