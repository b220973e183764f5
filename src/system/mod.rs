//! System-level concerns: metrics and monitoring

pub mod metrics;

pub use metrics::{RegistryMetrics, Timer};
