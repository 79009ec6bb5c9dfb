pub mod minio_config;
pub mod pipeline_config;

pub use minio_config::*;
pub use pipeline_config::*;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Prefix of environment overrides: `I94_OUTPUT__FORMAT`, `I94_MINIO__ENDPOINT`.
pub const ENV_PREFIX: &str = "I94";

/// Reads a TOML file and layers `I94_*` environment variables over it
/// (`__` separates nested keys).
pub(crate) fn load_layered<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let settings = ::config::Config::builder()
        .add_source(::config::File::from(path))
        .add_source(
            ::config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .with_context(|| format!("Failed to read config: {}", path.display()))?;

    settings
        .try_deserialize()
        .with_context(|| format!("Failed to parse config: {}", path.display()))
}
