pub mod field_normalizer;
pub mod port_resolver;
pub mod record_cleaner;
pub mod star_schema;
pub mod surrogate_keys;

pub use field_normalizer::*;
pub use port_resolver::*;
pub use record_cleaner::*;
pub use star_schema::*;
pub use surrogate_keys::*;
