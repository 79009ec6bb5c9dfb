use crate::catalog::{CatalogLayout, LineRange, PlaceholderPolicy};
use crate::processor::{KeyOrdering, NullPolicy};
use crate::storage::OutputFormat;
use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Run configuration, read from TOML with `I94_*` environment overrides
/// (`I94_OUTPUT__LOCAL_DIR=/tmp/out` sets `output.local_dir`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub keys: KeyConfig,
    #[serde(default)]
    pub null_policy: NullPolicy,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Parquet files or directories of them.
    pub immigration: Vec<PathBuf>,
    pub demographics: PathBuf,
    pub catalog: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub countries: LineRange,
    pub ports: LineRange,
    pub placeholders: PlaceholderPolicy,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        let layout = CatalogLayout::default();
        Self {
            countries: layout.countries,
            ports: layout.ports,
            placeholders: PlaceholderPolicy::default(),
        }
    }
}

impl CatalogConfig {
    pub fn layout(&self) -> CatalogLayout {
        CatalogLayout {
            countries: self.countries,
            ports: self.ports,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyConfig {
    pub ordering: KeyOrdering,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputTarget {
    #[default]
    Local,
    Minio,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub target: OutputTarget,
    pub format: OutputFormat,
    /// Root directory for the local target.
    pub local_dir: PathBuf,
    /// Key prefix for the MinIO target.
    pub prefix: String,
    pub minio_config: PathBuf,
    pub max_attempts: u32,
    pub retry_backoff_ms: u64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            target: OutputTarget::Local,
            format: OutputFormat::JsonLines,
            local_dir: PathBuf::from("output"),
            prefix: "star-schema".to_string(),
            minio_config: PathBuf::from("configs/minio.toml"),
            max_attempts: 3,
            retry_backoff_ms: 500,
        }
    }
}

impl OutputConfig {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl PipelineConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let config: PipelineConfig = super::load_layered(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.input.immigration.is_empty() {
            return Err(anyhow!("input.immigration must list at least one path"));
        }
        let layout = self.catalog.layout();
        if layout.countries.is_empty() || layout.ports.is_empty() {
            return Err(anyhow!("catalog line ranges must not be empty"));
        }
        let overlap = layout.countries.start <= layout.ports.end
            && layout.ports.start <= layout.countries.end;
        if overlap {
            return Err(anyhow!("catalog country and port line ranges overlap"));
        }
        if self.output.max_attempts == 0 {
            return Err(anyhow!("output.max_attempts must be at least 1"));
        }
        Ok(())
    }
}
