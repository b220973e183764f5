//! CQL Codec - on-demand type codecs for CQL wire values
//!
//! The registry maps structural type descriptors to codecs. Primitive codecs
//! are built up front; codecs for collections, tuples and user-defined types
//! are synthesized the first time their descriptor is seen, usually while
//! reading result metadata, and cached for every later lookup. Tuple and UDT
//! values decode their fields lazily.
#![warn(missing_docs)]

// Core foundational modules
pub mod core;
pub mod types;

// Main functional modules
pub mod codec;
pub mod metadata;
pub mod registry;
pub mod system;

// Re-export commonly used items for convenience
pub use crate::core::{Config, Error, LoggingConfig, RegistryConfig, Result};
pub use codec::{SharedCodec, TypeCodec};
pub use metadata::{ColumnSpec, ResultMetadata, Row};
pub use registry::CodecRegistry;
pub use types::{
    CollectionType, CompositeValue, DataType, FieldKey, PrimitiveKind, UserType, Value,
};

/// Crate version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Install a `tracing` subscriber configured from `config`.
///
/// `RUST_LOG` takes precedence over the configured level. Fails if a global
/// subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| Error::config(format!("invalid log filter: {}", e)))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = if config.format == "json" {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| Error::config(format!("failed to install subscriber: {}", e)))?;

    tracing::info!("Initialized {} v{}", NAME, VERSION);
    Ok(())
}
