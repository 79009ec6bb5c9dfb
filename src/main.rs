use anyhow::{Context, Result, anyhow};
use i94_pipeline::config::PipelineConfig;
use i94_pipeline::pipeline::{Pipeline, open_store};
use std::env;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "configs/pipeline.toml";

fn config_path() -> Result<PathBuf> {
    let mut args = env::args().skip(1);
    let mut path = PathBuf::from(DEFAULT_CONFIG);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let value = args
                    .next()
                    .ok_or_else(|| anyhow!("--config needs a path argument"))?;
                path = PathBuf::from(value);
            }
            other => return Err(anyhow!("Unknown argument: {}", other)),
        }
    }

    Ok(path)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    let path = config_path()?;
    info!("🚀 Starting I-94 star schema pipeline ({})", path.display());

    let config = PipelineConfig::from_file(&path).context("Failed to load pipeline configuration")?;

    let store = open_store(&config.output)
        .await
        .context("Failed to open output storage")
        .with_context(|| {
            "For the MinIO target, ensure the server is running and MINIO_ACCESS_KEY / MINIO_SECRET_KEY are set"
        })?;
    info!("Output target: {}", store.describe());

    let pipeline = Pipeline::new(config);
    match pipeline.run(store).await {
        Ok(summary) => {
            info!("\n=== Pipeline Summary ===");
            info!(
                "📥 Arrival records read: {} ({} non-air dropped)",
                summary.stats.cleaning.input, summary.stats.cleaning.dropped_non_air
            );
            info!(
                "🏙️ Demographic rows: {} ({} matched to a port)",
                summary.stats.demographic_rows, summary.stats.resolved_ports
            );
            for partition in &summary.partitions {
                info!(
                    "📊 {}: {} rows, {} bytes -> {}",
                    partition.table, partition.rows, partition.bytes, partition.location
                );
            }
            info!("🎉 Pipeline completed successfully!");
            Ok(())
        }
        Err(e) => {
            error!("❌ Pipeline failed: {}", e);
            Err(e.into())
        }
    }
}
