//! Prometheus metrics module
//!
//! Service-scoped registry, instrument handles, bucket profiles and the
//! standard HTTP/application instruments.
//!
//! # Feature
//! The process collector requires the `system` feature (enabled by default).

mod buckets;
mod instruments;
mod registry;
mod standard;
#[cfg(feature = "system")]
mod system;

pub use buckets::{
    BucketProfile, HTTP_BUCKETS, LLM_LATENCY_BUCKETS, MEMORY_BUCKETS, validate_buckets,
};
pub use instruments::{CounterFamily, GaugeFamily, HistogramFamily};
pub use registry::{
    DEFAULT_SERVICE_NAME, MetricRegistry, NAMESPACE, SERVICE_LABEL, SUBSYSTEM, qualified_name,
};
pub use standard::{
    APPLICATION_EVENTS_TOTAL, ERROR_STATUS_THRESHOLD, HTTP_ERRORS_TOTAL,
    HTTP_REQUEST_DURATION_SECONDS, HTTP_REQUESTS_TOTAL, RequestObservation, SERVICE_GAUGE,
    StandardInstruments, status_text,
};
#[cfg(feature = "system")]
pub use system::ProcessCollector;
