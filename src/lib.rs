pub mod catalog;
pub mod config;
pub mod error;
pub mod loader;
pub mod models;
pub mod pipeline;
pub mod processor;
pub mod storage;

pub use error::{PipelineError, Result};
