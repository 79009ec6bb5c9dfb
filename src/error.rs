use thiserror::Error;

/// Failures that abort a pipeline run.
///
/// Per-record decoding problems never show up here: the field normalizers
/// are total and fall back to sentinel values instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("catalog format error: {0}")]
    CatalogFormat(String),

    #[error("failed to load {source_name}: {message}")]
    Load { source_name: String, message: String },

    #[error("referential integrity violated in {table}: {message}")]
    ReferentialIntegrity { table: String, message: String },

    #[error("failed to write partition '{partition}': {message}")]
    OutputWrite { partition: String, message: String },

    #[error("background task did not finish: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl PipelineError {
    pub fn catalog(message: impl Into<String>) -> Self {
        Self::CatalogFormat(message.into())
    }

    pub fn load(source_name: impl Into<String>, message: impl ToString) -> Self {
        Self::Load {
            source_name: source_name.into(),
            message: message.to_string(),
        }
    }

    pub fn integrity(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ReferentialIntegrity {
            table: table.into(),
            message: message.into(),
        }
    }

    pub fn output(partition: impl Into<String>, message: impl ToString) -> Self {
        Self::OutputWrite {
            partition: partition.into(),
            message: message.to_string(),
        }
    }

    /// Only storage writes are worth retrying; everything else is deterministic.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::OutputWrite { .. })
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
