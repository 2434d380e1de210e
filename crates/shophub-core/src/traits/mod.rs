//! Core traits for the storefront

mod metrics;
mod serializer;
mod source;
mod storage;

#[cfg(feature = "tracing")]
mod tracing;

pub use metrics::{EvictionReason, NoopMetrics, QueryMetrics, QueryOperation};
pub use serializer::{JsonSerializer, Serializer};
pub use source::ProductSource;
pub use storage::StorageBackend;

#[cfg(feature = "metrics")]
pub use metrics::MetricsCrateAdapter;

#[cfg(feature = "tracing")]
pub use self::tracing::TracingMetrics;
