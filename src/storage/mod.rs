pub mod local_storage;
pub mod minio_client;
pub mod output_writer;

pub use local_storage::*;
pub use minio_client::*;
pub use output_writer::*;
