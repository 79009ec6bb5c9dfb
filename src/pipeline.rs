use crate::catalog::{CatalogParser, CodeCatalog};
use crate::config::{OutputConfig, OutputTarget, PipelineConfig, MinioConfig};
use crate::error::Result;
use crate::loader::{DemographicsLoader, ImmigrationLoader};
use crate::models::{RawDemographicRecord, RawImmigrationRecord, StarSchema};
use crate::processor::{
    CleaningStats, KeyOrdering, NullPolicy, PortResolver, RecordCleaner, StarSchemaBuilder,
    SurrogateKeyAssigner,
};
use crate::storage::{LocalStorage, MinioStorage, OutputWriter, PartitionStore, WrittenPartition};
use anyhow::Context;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformStats {
    pub cleaning: CleaningStats,
    pub demographic_rows: usize,
    pub resolved_ports: usize,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub stats: TransformStats,
    pub partitions: Vec<WrittenPartition>,
}

/// The in-memory part of a run: clean, key, resolve ports, project, check.
pub fn transform(
    catalog: &CodeCatalog,
    arrivals: &[RawImmigrationRecord],
    demographics: Vec<RawDemographicRecord>,
    null_policy: &NullPolicy,
    ordering: KeyOrdering,
) -> Result<(StarSchema, TransformStats)> {
    let cleaner = RecordCleaner::new(catalog, null_policy.clone());
    let (cleaned, cleaning) = cleaner.clean_all(arrivals);

    let immigrants = SurrogateKeyAssigner::new(ordering).assign(cleaned);

    let resolver = PortResolver::new(catalog);
    let demographics = resolver.resolve_all(demographics);
    let resolved_ports = demographics.iter().filter(|d| d.port.is_some()).count();

    let builder = StarSchemaBuilder;
    let schema = builder.build(&immigrants, &demographics);
    builder.verify_referential_integrity(&schema)?;

    let stats = TransformStats {
        cleaning,
        demographic_rows: demographics.len(),
        resolved_ports,
    };
    Ok((schema, stats))
}

pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Reads all inputs and builds the star schema. The catalog is parsed
    /// first; nothing else starts if it is malformed.
    pub fn build(&self) -> Result<(StarSchema, TransformStats)> {
        let input = &self.config.input;

        let parser = CatalogParser::new(
            self.config.catalog.layout(),
            self.config.catalog.placeholders,
        );
        let catalog = parser.parse_file(&input.catalog)?;

        let arrivals = ImmigrationLoader::new().load_paths(&input.immigration)?;
        let demographics = DemographicsLoader::new().load_file(&input.demographics)?;

        transform(
            &catalog,
            &arrivals,
            demographics,
            &self.config.null_policy,
            self.config.keys.ordering,
        )
    }

    /// Builds on the blocking pool, then writes every partition.
    pub async fn run(&self, store: Arc<dyn PartitionStore>) -> Result<RunSummary> {
        let config = self.config.clone();
        let (schema, stats) =
            tokio::task::spawn_blocking(move || Pipeline::new(config).build()).await??;

        let writer = OutputWriter::new(store, self.config.output.format).with_retries(
            self.config.output.max_attempts,
            self.config.output.retry_backoff(),
        );
        let partitions = writer.write_all(&schema).await?;

        info!(
            "Run complete: {} air arrivals, {} demographic rows ({} with a port), {} partitions written",
            stats.cleaning.kept,
            stats.demographic_rows,
            stats.resolved_ports,
            partitions.len()
        );
        Ok(RunSummary { stats, partitions })
    }
}

/// Opens the configured output target.
pub async fn open_store(output: &OutputConfig) -> anyhow::Result<Arc<dyn PartitionStore>> {
    match output.target {
        OutputTarget::Local => {
            let root = if output.prefix.is_empty() {
                output.local_dir.clone()
            } else {
                output.local_dir.join(&output.prefix)
            };
            info!("Writing output to local directory {}", root.display());
            Ok(Arc::new(LocalStorage::new(root)))
        }
        OutputTarget::Minio => {
            let minio_config = MinioConfig::from_file(&output.minio_config)
                .context("Failed to load MinIO configuration")?;
            info!(
                "Loaded MinIO configuration: {}@{}",
                minio_config.endpoint_url(),
                minio_config.bucket_name
            );

            let storage = MinioStorage::from_config(&minio_config)
                .context("Failed to initialize MinIO storage")?
                .with_prefix(&output.prefix);
            storage.ensure_bucket().await?;
            Ok(Arc::new(storage))
        }
    }
}
