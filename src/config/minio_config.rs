use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::Path;

/// Connection settings for the S3-compatible output target.
///
/// Read from the `[minio]` table of its own TOML file, with `I94_MINIO__*`
/// environment overrides. Access keys never come from the file: they are
/// read from the variables named by `access_key_var` and `secret_key_var`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MinioConfig {
    /// `host:port`, or a full URL whose scheme then wins over `ssl`.
    pub endpoint: String,
    pub bucket_name: String,
    pub region: String,
    pub path_style: bool,
    pub ssl: bool,
    pub access_key_var: String,
    pub secret_key_var: String,
    #[serde(skip)]
    credentials: Option<MinioCredentials>,
}

#[derive(Clone)]
pub struct MinioCredentials {
    pub access_key: String,
    pub secret_key: String,
}

impl fmt::Debug for MinioCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MinioCredentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"***")
            .finish()
    }
}

#[derive(Deserialize)]
struct MinioFile {
    #[serde(default)]
    minio: MinioConfig,
}

impl Default for MinioConfig {
    fn default() -> Self {
        Self {
            endpoint: "localhost:9000".to_string(),
            bucket_name: "i94-star-schema".to_string(),
            region: "us-east-1".to_string(),
            path_style: true,
            ssl: false,
            access_key_var: "MINIO_ACCESS_KEY".to_string(),
            secret_key_var: "MINIO_SECRET_KEY".to_string(),
            credentials: None,
        }
    }
}

impl MinioConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let file: MinioFile = super::load_layered(path)?;
        let mut config = file.minio;
        config.validate()?;
        config.load_credentials()?;
        Ok(config)
    }

    pub fn load_credentials(&mut self) -> Result<()> {
        let access_key = env::var(&self.access_key_var)
            .with_context(|| format!("Missing environment variable: {}", self.access_key_var))?;
        let secret_key = env::var(&self.secret_key_var)
            .with_context(|| format!("Missing environment variable: {}", self.secret_key_var))?;

        self.credentials = Some(MinioCredentials {
            access_key,
            secret_key,
        });
        Ok(())
    }

    pub fn credentials(&self) -> Result<&MinioCredentials> {
        self.credentials
            .as_ref()
            .ok_or_else(|| anyhow!("MinIO credentials not loaded"))
    }

    /// The endpoint with its scheme; `ssl` picks one when none is given.
    pub fn endpoint_url(&self) -> String {
        let endpoint = self.endpoint.trim_end_matches('/');
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else {
            let scheme = if self.ssl { "https" } else { "http" };
            format!("{}://{}", scheme, endpoint)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(anyhow!("minio.endpoint cannot be empty"));
        }
        if self.bucket_name.is_empty() {
            return Err(anyhow!("minio.bucket_name cannot be empty"));
        }
        if self.region.is_empty() {
            return Err(anyhow!("minio.region cannot be empty"));
        }
        if self.ssl && self.endpoint.starts_with("http://") {
            return Err(anyhow!(
                "minio.ssl is set but the endpoint {} is plain http",
                self.endpoint
            ));
        }
        Ok(())
    }
}
