//! Metric registry
//!
//! Owns the Prometheus registry for one service, enforces name uniqueness and
//! renders the scrape snapshot. Every metric is prefixed
//! `<NAMESPACE>_<SUBSYSTEM>_` and partitioned by `labels + ["service"]`.

use std::collections::BTreeSet;
use std::fmt;
use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;
use prometheus::core::Collector;
use prometheus::{
    CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TEXT_FORMAT,
    TextEncoder,
};
use tracing::debug;

use super::buckets::{BucketProfile, validate_buckets};
use super::instruments::{CounterFamily, GaugeFamily, HistogramFamily, LabelBinding};
use crate::errors::{MetricsError, Result};

/// Namespace shared by every Nexen metric.
pub const NAMESPACE: &str = "nexen";
/// Subsystem shared by every Nexen metric.
pub const SUBSYSTEM: &str = "service";
/// Label appended to every registry-owned metric.
pub const SERVICE_LABEL: &str = "service";
/// Service label value used when none is configured.
pub const DEFAULT_SERVICE_NAME: &str = "default";

/// Build the fully-qualified name for a short metric name.
pub fn qualified_name(name: &str) -> String {
    format!("{}_{}_{}", NAMESPACE, SUBSYSTEM, name)
}

/// Application metrics registry.
///
/// Cheap to clone; all clones share the same instrument set.
#[derive(Clone)]
pub struct MetricRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    /// Internal Prometheus registry
    registry: Registry,
    /// Fully-qualified names registered through this handle
    names: Mutex<BTreeSet<String>>,
    service: Arc<str>,
    default_buckets: Vec<f64>,
}

impl MetricRegistry {
    /// Create a registry over a fresh Prometheus registry.
    pub fn new(service: impl Into<String>, default_buckets: Vec<f64>) -> Result<Self> {
        Self::with_registry(Registry::new(), service, default_buckets)
    }

    /// Create a registry over an externally supplied Prometheus registry.
    ///
    /// Metrics already present in `registry` still count for uniqueness.
    pub fn with_registry(
        registry: Registry,
        service: impl Into<String>,
        default_buckets: Vec<f64>,
    ) -> Result<Self> {
        let default_buckets = if default_buckets.is_empty() {
            BucketProfile::default().to_vec()
        } else {
            default_buckets
        };
        validate_buckets(&default_buckets)?;

        let service: String = service.into();
        let this = Self {
            inner: Arc::new(RegistryInner {
                registry,
                names: Mutex::new(BTreeSet::new()),
                service: Arc::from(service.as_str()),
                default_buckets,
            }),
        };

        #[cfg(feature = "system")]
        this.register_process_collector()?;

        Ok(this)
    }

    #[cfg(feature = "system")]
    fn register_process_collector(&self) -> Result<()> {
        let collector = super::system::ProcessCollector::new()?;
        match self.inner.registry.register(Box::new(collector)) {
            Ok(()) => Ok(()),
            // 共享的外部 registry 已经带有进程指标
            Err(prometheus::Error::AlreadyReg) => {
                debug!("Process collector already present in supplied registry");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Service label value appended to every observation.
    pub fn service_name(&self) -> &str {
        &self.inner.service
    }

    /// Fallback buckets for histograms registered without explicit buckets.
    pub fn default_buckets(&self) -> &[f64] {
        &self.inner.default_buckets
    }

    /// Underlying Prometheus registry.
    pub fn inner(&self) -> &Registry {
        &self.inner.registry
    }

    /// Whether a metric is registered, by short or fully-qualified name.
    pub fn contains(&self, name: &str) -> bool {
        let names = self.inner.names.lock();
        names.contains(name) || names.contains(&qualified_name(name))
    }

    /// Sorted fully-qualified names registered through this registry.
    pub fn names(&self) -> Vec<String> {
        self.inner.names.lock().iter().cloned().collect()
    }

    /// Register a counter partitioned by `labels + ["service"]`.
    pub fn register_counter(
        &self,
        name: &str,
        help: &str,
        labels: &[&str],
    ) -> Result<CounterFamily> {
        let (fq_name, all_labels) = self.prepare(name, labels)?;
        let opts = Opts::new(name, help)
            .namespace(NAMESPACE)
            .subsystem(SUBSYSTEM);
        let vec = CounterVec::new(opts, &label_refs(&all_labels))?;

        self.register_collector(&fq_name, Box::new(vec.clone()))?;
        debug!("Registered counter {} with labels {:?}", fq_name, all_labels);

        Ok(CounterFamily::new(vec, self.binding(fq_name, all_labels)))
    }

    /// Register a histogram partitioned by `labels + ["service"]`.
    ///
    /// Empty `buckets` falls back to [`Self::default_buckets`].
    pub fn register_histogram(
        &self,
        name: &str,
        help: &str,
        buckets: &[f64],
        labels: &[&str],
    ) -> Result<HistogramFamily> {
        let buckets = if buckets.is_empty() {
            self.inner.default_buckets.clone()
        } else {
            validate_buckets(buckets)?;
            buckets.to_vec()
        };

        let (fq_name, all_labels) = self.prepare(name, labels)?;
        let opts = HistogramOpts::new(name, help)
            .namespace(NAMESPACE)
            .subsystem(SUBSYSTEM)
            .buckets(buckets.clone());
        let vec = HistogramVec::new(opts, &label_refs(&all_labels))?;

        self.register_collector(&fq_name, Box::new(vec.clone()))?;
        debug!(
            "Registered histogram {} with labels {:?} and {} buckets",
            fq_name,
            all_labels,
            buckets.len()
        );

        Ok(HistogramFamily::new(vec, self.binding(fq_name, all_labels), buckets))
    }

    /// Register a gauge partitioned by `labels + ["service"]`.
    pub fn register_gauge(&self, name: &str, help: &str, labels: &[&str]) -> Result<GaugeFamily> {
        let (fq_name, all_labels) = self.prepare(name, labels)?;
        let opts = Opts::new(name, help)
            .namespace(NAMESPACE)
            .subsystem(SUBSYSTEM);
        let vec = GaugeVec::new(opts, &label_refs(&all_labels))?;

        self.register_collector(&fq_name, Box::new(vec.clone()))?;
        debug!("Registered gauge {} with labels {:?}", fq_name, all_labels);

        Ok(GaugeFamily::new(vec, self.binding(fq_name, all_labels)))
    }

    /// Write the current snapshot in the Prometheus text format.
    pub fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        encoder
            .encode(&metric_families, writer)
            .map_err(|e| MetricsError::encoding(e.to_string()))
    }

    /// Export the current snapshot in the Prometheus text format.
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        self.encode(&mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// MIME type of [`Self::render`] output.
    pub fn content_type(&self) -> &'static str {
        TEXT_FORMAT
    }

    /// Validate names and append the service label.
    fn prepare(&self, name: &str, labels: &[&str]) -> Result<(String, Vec<String>)> {
        if !is_valid_metric_name(name) {
            return Err(MetricsError::invalid_name(format!(
                "'{}' is not a valid metric name",
                name
            )));
        }

        let mut all_labels: Vec<String> = Vec::with_capacity(labels.len() + 1);
        for label in labels {
            if *label == SERVICE_LABEL {
                return Err(MetricsError::invalid_name(format!(
                    "label '{}' is reserved and appended automatically",
                    SERVICE_LABEL
                )));
            }
            if !is_valid_label_name(label) {
                return Err(MetricsError::invalid_name(format!(
                    "'{}' is not a valid label name",
                    label
                )));
            }
            if all_labels.iter().any(|l| l == label) {
                return Err(MetricsError::invalid_name(format!(
                    "label '{}' is declared twice",
                    label
                )));
            }
            all_labels.push(label.to_string());
        }
        all_labels.push(SERVICE_LABEL.to_string());

        Ok((qualified_name(name), all_labels))
    }

    /// Register under the name lock so exactly one concurrent caller wins.
    fn register_collector(&self, fq_name: &str, collector: Box<dyn Collector>) -> Result<()> {
        let mut names = self.inner.names.lock();
        if names.contains(fq_name) {
            return Err(MetricsError::duplicate_name(fq_name));
        }

        match self.inner.registry.register(collector) {
            Ok(()) => {
                names.insert(fq_name.to_string());
                Ok(())
            }
            Err(prometheus::Error::AlreadyReg) => Err(MetricsError::duplicate_name(fq_name)),
            // Same name registered elsewhere with another help text or label set
            Err(prometheus::Error::Msg(msg)) if msg.contains("fully-qualified name") => {
                Err(MetricsError::duplicate_name(fq_name))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn binding(&self, fq_name: String, labels: Vec<String>) -> LabelBinding {
        LabelBinding::new(fq_name, labels, Arc::clone(&self.inner.service))
    }
}

impl fmt::Debug for MetricRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricRegistry")
            .field("service", &self.inner.service)
            .field("names", &*self.inner.names.lock())
            .field("default_buckets", &self.inner.default_buckets)
            .finish()
    }
}

fn label_refs(labels: &[String]) -> Vec<&str> {
    labels.iter().map(String::as_str).collect()
}

fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

fn is_valid_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    !name.starts_with("__") && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::buckets::{HTTP_BUCKETS, LLM_LATENCY_BUCKETS};

    fn registry() -> MetricRegistry {
        MetricRegistry::new("unit", Vec::new()).unwrap()
    }

    #[test]
    fn test_qualified_name() {
        assert_eq!(qualified_name("jobs_total"), "nexen_service_jobs_total");
    }

    #[test]
    fn test_empty_default_falls_back_to_http() {
        let reg = registry();
        assert_eq!(reg.default_buckets(), HTTP_BUCKETS);
        assert_eq!(reg.service_name(), "unit");
    }

    #[test]
    fn test_invalid_default_buckets_rejected() {
        let result = MetricRegistry::new("unit", vec![1.0, 0.5]);
        assert!(matches!(result, Err(MetricsError::InvalidBuckets(_))));
    }

    #[test]
    fn test_register_appends_service_label() {
        let reg = registry();
        let counter = reg
            .register_counter("jobs_total", "Jobs processed", &["status"])
            .unwrap();

        assert_eq!(counter.name(), "nexen_service_jobs_total");
        assert_eq!(
            counter.label_names(),
            &["status".to_string(), "service".to_string()]
        );
        assert!(reg.contains("jobs_total"));
        assert!(reg.contains("nexen_service_jobs_total"));
    }

    #[test]
    fn test_duplicate_across_kinds() {
        let reg = registry();
        reg.register_gauge("depth", "Queue depth", &[]).unwrap();

        let err = reg
            .register_counter("depth", "Other", &["x"])
            .err()
            .unwrap();
        assert_eq!(err, MetricsError::duplicate_name("nexen_service_depth"));

        let err = reg
            .register_histogram("depth", "Other", &[], &[])
            .err()
            .unwrap();
        assert!(err.is_duplicate());
        assert_eq!(reg.names(), vec!["nexen_service_depth".to_string()]);
    }

    #[test]
    fn test_reserved_and_invalid_labels() {
        let reg = registry();
        assert!(matches!(
            reg.register_counter("a_total", "help", &["service"]),
            Err(MetricsError::InvalidName(_))
        ));
        assert!(
            reg.register_counter("b_total", "help", &["bad-label"])
                .is_err()
        );
        assert!(
            reg.register_counter("c_total", "help", &["x", "x"])
                .is_err()
        );
        assert!(reg.register_counter("9lives", "help", &[]).is_err());
        assert!(reg.register_counter("", "help", &[]).is_err());
        // Failed registrations do not reserve the name
        assert!(reg.register_counter("a_total", "help", &["kind"]).is_ok());
    }

    #[test]
    fn test_histogram_bucket_fallback_and_override() {
        let reg = MetricRegistry::new("unit", LLM_LATENCY_BUCKETS.to_vec()).unwrap();
        let fallback = reg
            .register_histogram("inference_seconds", "Inference", &[], &["model"])
            .unwrap();
        assert_eq!(fallback.buckets(), LLM_LATENCY_BUCKETS);

        let explicit = reg
            .register_histogram("payload_bytes", "Payload", &[10.0, 100.0], &[])
            .unwrap();
        assert_eq!(explicit.buckets(), &[10.0, 100.0]);

        assert!(matches!(
            reg.register_histogram("broken", "Broken", &[5.0, 1.0], &[]),
            Err(MetricsError::InvalidBuckets(_))
        ));
    }

    #[test]
    fn test_render_contains_observations() {
        let reg = registry();
        let counter = reg
            .register_counter("renders_total", "Render test", &["kind"])
            .unwrap();
        counter.inc(&["a"]).unwrap();
        counter.inc(&["a"]).unwrap();

        let output = reg.render().unwrap();
        assert!(output.contains("# HELP nexen_service_renders_total Render test"));
        assert!(output.contains("# TYPE nexen_service_renders_total counter"));
        assert!(output.contains(
            "nexen_service_renders_total{kind=\"a\",service=\"unit\"} 2"
        ));
        assert!(reg.content_type().starts_with("text/plain"));
    }

    #[test]
    fn test_name_grammar() {
        assert!(is_valid_metric_name("http_requests_total"));
        assert!(is_valid_metric_name("ns:sub_total"));
        assert!(!is_valid_metric_name("has space"));
        assert!(is_valid_label_name("_private"));
        assert!(!is_valid_label_name("__reserved"));
        assert!(!is_valid_label_name("a:b"));
    }
}
