use crate::error::{PipelineError, Result};
use crate::models::{StarSchema, TableName};
use crate::processor::table_to_dataframe;
use async_trait::async_trait;
use futures::future::join_all;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// A place that can hold one file per named partition and replace it
/// wholesale.
#[async_trait]
pub trait PartitionStore: Send + Sync {
    /// Replaces everything under `partition` with a single file and returns
    /// its location. Readers must never see a mix of old and new rows.
    async fn replace_partition(&self, partition: &str, file_name: &str, data: &[u8])
    -> Result<String>;

    fn describe(&self) -> String;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    JsonLines,
    Parquet,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::JsonLines => "json",
            OutputFormat::Parquet => "parquet",
        }
    }

    pub fn serialize(&self, df: &mut DataFrame) -> PolarsResult<Vec<u8>> {
        let mut buf = Vec::new();
        match self {
            OutputFormat::JsonLines => {
                JsonWriter::new(&mut buf)
                    .with_json_format(JsonFormat::JsonLines)
                    .finish(df)?;
            }
            OutputFormat::Parquet => {
                ParquetWriter::new(&mut buf).finish(df)?;
            }
        }
        Ok(buf)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenPartition {
    pub table: TableName,
    pub location: String,
    pub rows: usize,
    pub bytes: usize,
}

/// Persists the star schema, one overwritable partition per table.
pub struct OutputWriter {
    store: Arc<dyn PartitionStore>,
    format: OutputFormat,
    max_attempts: u32,
    retry_backoff: Duration,
}

impl OutputWriter {
    pub fn new(store: Arc<dyn PartitionStore>, format: OutputFormat) -> Self {
        Self {
            store,
            format,
            max_attempts: 3,
            retry_backoff: Duration::from_millis(500),
        }
    }

    pub fn with_retries(mut self, max_attempts: u32, retry_backoff: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.retry_backoff = retry_backoff;
        self
    }

    pub fn file_name(&self) -> String {
        format!("part-00000.{}", self.format.extension())
    }

    /// Writes all six tables. Distinct partitions go out concurrently and
    /// every write is allowed to finish; the first failure is reported after
    /// that, so a failing table never interrupts another table's overwrite.
    pub async fn write_all(&self, schema: &StarSchema) -> Result<Vec<WrittenPartition>> {
        info!(
            "Writing {} tables to {} as {:?}",
            TableName::ALL.len(),
            self.store.describe(),
            self.format
        );
        let outcomes =
            join_all(TableName::ALL.iter().map(|&table| self.write_table(schema, table))).await;

        let mut written = Vec::with_capacity(outcomes.len());
        let mut first_error = None;
        for outcome in outcomes {
            match outcome {
                Ok(partition) => written.push(partition),
                Err(e) => {
                    error!("{}", e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(written),
        }
    }

    pub async fn write_table(&self, schema: &StarSchema, table: TableName) -> Result<WrittenPartition> {
        let mut df = table_to_dataframe(schema, table)
            .map_err(|e| PipelineError::output(table.as_str(), e))?;
        let rows = df.height();
        let data = self
            .format
            .serialize(&mut df)
            .map_err(|e| PipelineError::output(table.as_str(), e))?;

        let file_name = self.file_name();
        let mut attempt = 1;
        loop {
            match self
                .store
                .replace_partition(table.as_str(), &file_name, &data)
                .await
            {
                Ok(location) => {
                    info!("Wrote {} rows ({} bytes) to {}", rows, data.len(), location);
                    return Ok(WrittenPartition {
                        table,
                        location,
                        rows,
                        bytes: data.len(),
                    });
                }
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    warn!(
                        "Attempt {}/{} to write {} failed: {}",
                        attempt, self.max_attempts, table, e
                    );
                    tokio::time::sleep(self.retry_backoff * attempt).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
