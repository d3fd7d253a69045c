//! Metrics facade
//!
//! Single entry point owned by a service: builds the registry, registers the
//! standard instruments, and hands out the scrape handler and the HTTP
//! instrumentation wrappers.

use std::fmt;
use std::sync::Arc;

use prometheus::Registry;
use tracing::info;

use crate::api::middleware::MetricsMiddleware;
use crate::errors::Result;
use crate::handler::{Handler, Instrument, ScrapeHandler};
use crate::metrics::{
    BucketProfile, CounterFamily, DEFAULT_SERVICE_NAME, GaugeFamily, HistogramFamily,
    MetricRegistry, StandardInstruments,
};

/// Options for building a [`Metrics`] facade.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Value of the `service` label on every series
    pub service_name: String,
    /// Buckets of `http_request_duration_seconds` and default for custom histograms
    pub histogram_buckets: Vec<f64>,
    /// External Prometheus registry to register into; a fresh one when `None`
    pub registry: Option<Registry>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            histogram_buckets: BucketProfile::Http.to_vec(),
            registry: None,
        }
    }
}

/// Fluent builder over [`MetricsConfig`].
#[derive(Debug, Clone, Default)]
pub struct MetricsBuilder {
    config: MetricsConfig,
}

impl MetricsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.config.service_name = name.into();
        self
    }

    pub fn histogram_buckets(mut self, buckets: Vec<f64>) -> Self {
        self.config.histogram_buckets = buckets;
        self
    }

    pub fn bucket_profile(mut self, profile: BucketProfile) -> Self {
        self.config.histogram_buckets = profile.to_vec();
        self
    }

    pub fn registry(mut self, registry: Registry) -> Self {
        self.config.registry = Some(registry);
        self
    }

    pub fn config(&self) -> &MetricsConfig {
        &self.config
    }

    pub fn build(self) -> Result<Metrics> {
        Metrics::from_config(self.config)
    }
}

impl From<MetricsConfig> for MetricsBuilder {
    fn from(config: MetricsConfig) -> Self {
        Self { config }
    }
}

/// Service metrics facade.
///
/// Clones share the same registry and instruments.
#[derive(Clone)]
pub struct Metrics {
    registry: MetricRegistry,
    standard: Arc<StandardInstruments>,
}

impl Metrics {
    pub fn builder() -> MetricsBuilder {
        MetricsBuilder::new()
    }

    /// Facade with the default service name and HTTP buckets.
    pub fn new() -> Result<Self> {
        Self::from_config(MetricsConfig::default())
    }

    pub fn from_config(config: MetricsConfig) -> Result<Self> {
        let MetricsConfig {
            service_name,
            histogram_buckets,
            registry,
        } = config;

        let registry = match registry {
            Some(external) => {
                MetricRegistry::with_registry(external, service_name, histogram_buckets)?
            }
            None => MetricRegistry::new(service_name, histogram_buckets)?,
        };
        let standard = Arc::new(StandardInstruments::register(&registry)?);

        info!(
            "Metrics initialized for service '{}' ({} histogram buckets)",
            registry.service_name(),
            registry.default_buckets().len()
        );

        Ok(Self { registry, standard })
    }

    pub fn registry(&self) -> &MetricRegistry {
        &self.registry
    }

    pub fn service_name(&self) -> &str {
        self.registry.service_name()
    }

    pub fn instruments(&self) -> &Arc<StandardInstruments> {
        &self.standard
    }

    /// Scrape handler serving this facade's registry.
    pub fn handler(&self) -> ScrapeHandler {
        ScrapeHandler::new(self.registry.clone())
    }

    /// Wrap a host-agnostic handler with the standard HTTP metrics.
    pub fn instrument<H: Handler>(&self, handler: H) -> Instrument<H> {
        Instrument::new(handler, Arc::clone(&self.standard))
    }

    /// actix-web middleware recording the standard HTTP metrics.
    pub fn middleware(&self) -> MetricsMiddleware {
        MetricsMiddleware::new(Arc::clone(&self.standard))
    }

    pub fn record_event(&self, event: &str) {
        self.standard.record_event(event);
    }

    pub fn set_gauge(&self, name: &str, value: f64) {
        self.standard.set_gauge(name, value);
    }

    pub fn increment_gauge(&self, name: &str) {
        self.standard.increment_gauge(name);
    }

    pub fn decrement_gauge(&self, name: &str) {
        self.standard.decrement_gauge(name);
    }

    pub fn add_gauge(&self, name: &str, delta: f64) {
        self.standard.add_gauge(name, delta);
    }

    pub fn register_counter(
        &self,
        name: &str,
        help: &str,
        labels: &[&str],
    ) -> Result<CounterFamily> {
        self.registry.register_counter(name, help, labels)
    }

    /// Empty `buckets` selects the facade's histogram buckets.
    pub fn register_histogram(
        &self,
        name: &str,
        help: &str,
        buckets: &[f64],
        labels: &[&str],
    ) -> Result<HistogramFamily> {
        self.registry
            .register_histogram(name, help, buckets, labels)
    }

    pub fn register_gauge(&self, name: &str, help: &str, labels: &[&str]) -> Result<GaugeFamily> {
        self.registry.register_gauge(name, help, labels)
    }

    /// Current snapshot in the Prometheus text format.
    pub fn render(&self) -> Result<String> {
        self.registry.render()
    }
}

impl fmt::Debug for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metrics")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{HTTP_BUCKETS, LLM_LATENCY_BUCKETS};

    #[test]
    fn test_default_config() {
        let config = MetricsConfig::default();
        assert_eq!(config.service_name, "default");
        assert_eq!(config.histogram_buckets, HTTP_BUCKETS.to_vec());
        assert!(config.registry.is_none());
    }

    #[test]
    fn test_builder_overrides() {
        let builder = Metrics::builder()
            .service_name("svc-A")
            .bucket_profile(BucketProfile::LlmLatency);
        assert_eq!(builder.config().service_name, "svc-A");
        assert_eq!(
            builder.config().histogram_buckets,
            LLM_LATENCY_BUCKETS.to_vec()
        );

        let metrics = builder.build().unwrap();
        assert_eq!(metrics.service_name(), "svc-A");
        assert_eq!(
            metrics.instruments().http_duration.buckets(),
            LLM_LATENCY_BUCKETS
        );
    }

    #[test]
    fn test_empty_buckets_fall_back_to_http() {
        let metrics = Metrics::builder()
            .histogram_buckets(Vec::new())
            .build()
            .unwrap();
        assert_eq!(metrics.registry().default_buckets(), HTTP_BUCKETS);
    }

    #[test]
    fn test_invalid_buckets_fail_build() {
        assert!(
            Metrics::builder()
                .histogram_buckets(vec![1.0, 0.5])
                .build()
                .is_err()
        );
    }

    #[test]
    fn test_convenience_operations_reach_registry() {
        let metrics = Metrics::builder().service_name("facade").build().unwrap();
        metrics.record_event("cache_miss");
        metrics.set_gauge("queue", 3.0);
        metrics.increment_gauge("queue");

        let output = metrics.render().unwrap();
        assert!(output.contains("nexen_service_application_events_total"));
        assert!(output.contains("event=\"cache_miss\""));
        assert!(output.contains("service=\"facade\""));
        assert_eq!(
            metrics.instruments().service_gauge.get(&["queue"]).unwrap(),
            4.0
        );
    }

    #[test]
    fn test_debug_output() {
        let metrics = Metrics::builder()
            .service_name("debug-svc")
            .build()
            .unwrap();
        let debug = format!("{:?}", metrics);
        assert!(debug.starts_with("Metrics"));
        assert!(debug.contains("\"debug-svc\""));
        assert!(debug.contains("nexen_service_http_requests_total"));
    }
}
