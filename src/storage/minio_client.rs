use crate::config::MinioConfig;
use crate::error::PipelineError;
use crate::storage::PartitionStore;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use s3::bucket::Bucket;
use s3::creds::Credentials;
use s3::region::Region;
use tracing::{debug, info};

/// S3-compatible object store (MinIO in development) holding one key prefix
/// per output table.
pub struct MinioStorage {
    bucket: Bucket,
    prefix: String,
}

fn expect_status(operation: &str, key: &str, status: u16, accepted: &[u16]) -> Result<()> {
    if accepted.contains(&status) {
        Ok(())
    } else {
        Err(anyhow!("{} {} failed: HTTP {}", operation, key, status))
    }
}

impl MinioStorage {
    pub fn from_config(config: &MinioConfig) -> Result<Self> {
        config.validate()?;
        let keys = config.credentials()?;

        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint_url(),
        };
        let credentials = Credentials::new(
            Some(keys.access_key.as_str()),
            Some(keys.secret_key.as_str()),
            None, // security_token
            None, // session_token
            None, // expiration
        )?;

        let bucket = Bucket::new(&config.bucket_name, region, credentials)?;
        let bucket = if config.path_style {
            *bucket.with_path_style()
        } else {
            *bucket
        };

        Ok(MinioStorage {
            bucket,
            prefix: String::new(),
        })
    }

    /// Places every partition under `prefix/`.
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.trim_matches('/').to_string();
        self
    }

    pub fn partition_prefix(&self, partition: &str) -> String {
        if self.prefix.is_empty() {
            format!("{}/", partition)
        } else {
            format!("{}/{}/", self.prefix, partition)
        }
    }

    pub async fn ensure_bucket(&self) -> Result<()> {
        let exists = self
            .bucket
            .exists()
            .await
            .map_err(|e| anyhow!("Failed to check bucket {}: {}", self.bucket.name, e))?;
        if exists {
            info!("Bucket '{}' already exists", self.bucket.name);
            return Ok(());
        }

        Bucket::create(
            &self.bucket.name,
            self.bucket.region.clone(),
            self.bucket.credentials().await?,
            s3::BucketConfiguration::default(),
        )
        .await
        .map_err(|e| anyhow!("Failed to create bucket {}: {}", self.bucket.name, e))?;
        info!("Created bucket: {}", self.bucket.name);
        Ok(())
    }

    async fn put(&self, key: &str, data: &[u8]) -> Result<()> {
        let response = self.bucket.put_object(key, data).await?;
        expect_status("PUT", key, response.status_code(), &[200])
    }

    async fn keys_under(&self, prefix: &str) -> Result<Vec<String>> {
        let pages = self.bucket.list(prefix.to_string(), None).await?;
        Ok(pages
            .into_iter()
            .flat_map(|page| page.contents)
            .map(|object| object.key)
            .collect())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let response = self.bucket.delete_object(key).await?;
        expect_status("DELETE", key, response.status_code(), &[200, 204])?;
        debug!("Deleted stale object: {}", key);
        Ok(())
    }

    /// Puts the new object first, then removes whatever else earlier runs
    /// left under the partition prefix. Readers see either the old or the new
    /// object at the partition key, never neither.
    async fn overwrite_partition(&self, partition: &str, file_name: &str, data: &[u8]) -> Result<String> {
        let prefix = self.partition_prefix(partition);
        let key = format!("{}{}", prefix, file_name);

        self.put(&key, data).await?;

        let stale: Vec<String> = self
            .keys_under(&prefix)
            .await?
            .into_iter()
            .filter(|existing| *existing != key)
            .collect();
        for existing in &stale {
            self.delete(existing).await?;
        }

        info!(
            "Stored partition object {} ({} stale objects removed)",
            key,
            stale.len()
        );
        Ok(key)
    }
}

#[async_trait]
impl PartitionStore for MinioStorage {
    async fn replace_partition(
        &self,
        partition: &str,
        file_name: &str,
        data: &[u8],
    ) -> crate::error::Result<String> {
        self.overwrite_partition(partition, file_name, data)
            .await
            .map_err(|e| PipelineError::output(partition, e))
    }

    fn describe(&self) -> String {
        format!("s3://{}/{}", self.bucket.name, self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn config_with_keys(access_var: &str, secret_var: &str) -> MinioConfig {
        unsafe {
            env::set_var(access_var, "test_access");
            env::set_var(secret_var, "test_secret");
        }
        let mut config = MinioConfig::default();
        config.access_key_var = access_var.to_string();
        config.secret_key_var = secret_var.to_string();
        config.load_credentials().unwrap();
        config
    }

    #[test]
    fn test_from_config() {
        let config = config_with_keys("TEST_I94_CLIENT_ACCESS", "TEST_I94_CLIENT_SECRET");
        let storage = MinioStorage::from_config(&config).unwrap();
        assert_eq!(storage.describe(), "s3://i94-star-schema/");
    }

    #[test]
    fn test_from_config_requires_credentials() {
        let config = MinioConfig::default();
        assert!(MinioStorage::from_config(&config).is_err());
    }

    #[test]
    fn test_partition_prefix() {
        let config = config_with_keys("TEST_I94_PREFIX_ACCESS", "TEST_I94_PREFIX_SECRET");
        let storage = MinioStorage::from_config(&config).unwrap();
        assert_eq!(storage.partition_prefix("immigrant"), "immigrant/");

        let storage = storage.with_prefix("/star-schema/2016-04/");
        assert_eq!(
            storage.partition_prefix("immigrant"),
            "star-schema/2016-04/immigrant/"
        );
        assert_eq!(storage.describe(), "s3://i94-star-schema/star-schema/2016-04");
    }

    #[test]
    fn test_status_check() {
        assert!(expect_status("DELETE", "a/b", 204, &[200, 204]).is_ok());
        let err = expect_status("PUT", "a/b", 403, &[200]).unwrap_err();
        assert_eq!(err.to_string(), "PUT a/b failed: HTTP 403");
    }

    #[tokio::test]
    #[ignore] // needs a running MinIO server
    async fn test_partition_overwrite() {
        if env::var("MINIO_TEST_ENABLED").is_err() {
            return;
        }

        let mut config = MinioConfig::default();
        config.bucket_name = "i94-it".to_string();
        config.load_credentials().unwrap();
        let storage = MinioStorage::from_config(&config).unwrap().with_prefix("it");

        storage.ensure_bucket().await.unwrap();
        storage.put("it/immigrant/stale.json", b"old\n").await.unwrap();

        let key = storage
            .replace_partition("immigrant", "part-00000.json", b"{\"immigrant_id\":1}\n")
            .await
            .unwrap();

        let keys = storage.keys_under("it/immigrant/").await.unwrap();
        assert_eq!(keys, vec![key]);
    }
}
