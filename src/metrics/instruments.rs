//! Service-bound instrument families
//!
//! Thin handles over the Prometheus vectors. Each handle remembers the label
//! names declared at registration and the service value appended to them, so
//! call sites pass only their own label values.

use std::fmt;
use std::sync::Arc;

use prometheus::{CounterVec, GaugeVec, HistogramTimer, HistogramVec};

use crate::errors::{MetricsError, Result};

/// Declared label schema of a registered family.
///
/// `labels` always ends with `service`; `service` is the bound value.
#[derive(Debug, Clone)]
pub(crate) struct LabelBinding {
    name: String,
    labels: Arc<[String]>,
    service: Arc<str>,
}

impl LabelBinding {
    pub(crate) fn new(name: String, labels: Vec<String>, service: Arc<str>) -> Self {
        Self {
            name,
            labels: labels.into(),
            service,
        }
    }

    /// Caller values followed by the service value.
    fn resolve<'a>(&'a self, values: &[&'a str]) -> Result<Vec<&'a str>> {
        let expected = self.labels.len() - 1;
        if values.len() != expected {
            return Err(MetricsError::LabelCardinality {
                metric: self.name.clone(),
                expected,
                got: values.len(),
            });
        }
        let mut all = Vec::with_capacity(self.labels.len());
        all.extend_from_slice(values);
        all.push(&self.service);
        Ok(all)
    }

    fn attach(&self, err: prometheus::Error) -> MetricsError {
        match MetricsError::from(err) {
            MetricsError::LabelCardinality { expected, got, .. } => {
                MetricsError::LabelCardinality {
                    metric: self.name.clone(),
                    expected,
                    got,
                }
            }
            other => other,
        }
    }
}

macro_rules! family_accessors {
    ($ty:ident, $vec:ty) => {
        impl $ty {
            /// Fully-qualified metric name.
            pub fn name(&self) -> &str {
                &self.binding.name
            }

            /// Declared label names, `service` last.
            pub fn label_names(&self) -> &[String] {
                &self.binding.labels
            }

            /// Service value appended to every observation.
            pub fn service(&self) -> &str {
                &self.binding.service
            }

            /// Underlying Prometheus vector. Values passed to it directly must
            /// include the service label.
            pub fn inner(&self) -> &$vec {
                &self.vec
            }
        }

        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($ty))
                    .field("name", &self.binding.name)
                    .field("labels", &self.binding.labels)
                    .field("service", &self.binding.service)
                    .finish()
            }
        }
    };
}

/// Monotonic counter partitioned by `labels + [service]`.
#[derive(Clone)]
pub struct CounterFamily {
    vec: CounterVec,
    binding: LabelBinding,
}

impl CounterFamily {
    pub(crate) fn new(vec: CounterVec, binding: LabelBinding) -> Self {
        Self { vec, binding }
    }

    fn child(&self, values: &[&str]) -> Result<prometheus::Counter> {
        let all = self.binding.resolve(values)?;
        self.vec
            .get_metric_with_label_values(all.as_slice())
            .map_err(|e| self.binding.attach(e))
    }

    pub fn inc(&self, values: &[&str]) -> Result<()> {
        self.child(values)?.inc();
        Ok(())
    }

    /// Add `v` to the counter. Negative or non-finite values are rejected.
    pub fn inc_by(&self, values: &[&str], v: f64) -> Result<()> {
        if !v.is_finite() || v < 0.0 {
            return Err(MetricsError::invalid_value(format!(
                "counter '{}' cannot be increased by {}",
                self.binding.name, v
            )));
        }
        self.child(values)?.inc_by(v);
        Ok(())
    }

    /// Current value. Reading a combination that was never observed
    /// materialises it at zero.
    pub fn get(&self, values: &[&str]) -> Result<f64> {
        Ok(self.child(values)?.get())
    }
}

family_accessors!(CounterFamily, CounterVec);

/// Bucketed distribution partitioned by `labels + [service]`.
#[derive(Clone)]
pub struct HistogramFamily {
    vec: HistogramVec,
    binding: LabelBinding,
    buckets: Arc<[f64]>,
}

impl HistogramFamily {
    pub(crate) fn new(vec: HistogramVec, binding: LabelBinding, buckets: Vec<f64>) -> Self {
        Self {
            vec,
            binding,
            buckets: buckets.into(),
        }
    }

    fn child(&self, values: &[&str]) -> Result<prometheus::Histogram> {
        let all = self.binding.resolve(values)?;
        self.vec
            .get_metric_with_label_values(all.as_slice())
            .map_err(|e| self.binding.attach(e))
    }

    pub fn observe(&self, values: &[&str], v: f64) -> Result<()> {
        self.child(values)?.observe(v);
        Ok(())
    }

    /// Start a timer that observes the elapsed seconds when dropped.
    pub fn start_timer(&self, values: &[&str]) -> Result<HistogramTimer> {
        Ok(self.child(values)?.start_timer())
    }

    pub fn sample_count(&self, values: &[&str]) -> Result<u64> {
        Ok(self.child(values)?.get_sample_count())
    }

    pub fn sample_sum(&self, values: &[&str]) -> Result<f64> {
        Ok(self.child(values)?.get_sample_sum())
    }

    /// Upper bounds this histogram was registered with (+Inf implicit).
    pub fn buckets(&self) -> &[f64] {
        &self.buckets
    }
}

family_accessors!(HistogramFamily, HistogramVec);

/// Up/down value partitioned by `labels + [service]`.
#[derive(Clone)]
pub struct GaugeFamily {
    vec: GaugeVec,
    binding: LabelBinding,
}

impl GaugeFamily {
    pub(crate) fn new(vec: GaugeVec, binding: LabelBinding) -> Self {
        Self { vec, binding }
    }

    fn child(&self, values: &[&str]) -> Result<prometheus::Gauge> {
        let all = self.binding.resolve(values)?;
        self.vec
            .get_metric_with_label_values(all.as_slice())
            .map_err(|e| self.binding.attach(e))
    }

    pub fn set(&self, values: &[&str], v: f64) -> Result<()> {
        self.child(values)?.set(v);
        Ok(())
    }

    pub fn inc(&self, values: &[&str]) -> Result<()> {
        self.child(values)?.inc();
        Ok(())
    }

    pub fn dec(&self, values: &[&str]) -> Result<()> {
        self.child(values)?.dec();
        Ok(())
    }

    pub fn add(&self, values: &[&str], v: f64) -> Result<()> {
        self.child(values)?.add(v);
        Ok(())
    }

    pub fn sub(&self, values: &[&str], v: f64) -> Result<()> {
        self.child(values)?.sub(v);
        Ok(())
    }

    pub fn get(&self, values: &[&str]) -> Result<f64> {
        Ok(self.child(values)?.get())
    }
}

family_accessors!(GaugeFamily, GaugeVec);

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::{HistogramOpts, Opts};

    fn binding(name: &str, labels: &[&str]) -> LabelBinding {
        let mut all: Vec<String> = labels.iter().map(|s| s.to_string()).collect();
        all.push("service".to_string());
        LabelBinding::new(name.to_string(), all, Arc::from("svc"))
    }

    fn label_refs(binding: &LabelBinding) -> Vec<&str> {
        binding.labels.iter().map(String::as_str).collect()
    }

    fn counter(labels: &[&str]) -> CounterFamily {
        let b = binding("test_total", labels);
        let vec = CounterVec::new(Opts::new("test_total", "test"), &label_refs(&b)).unwrap();
        CounterFamily::new(vec, b)
    }

    #[test]
    fn test_counter_appends_service() {
        let c = counter(&["kind"]);
        c.inc(&["a"]).unwrap();
        c.inc_by(&["a"], 2.0).unwrap();

        assert_eq!(c.get(&["a"]).unwrap(), 3.0);
        assert_eq!(c.inner().with_label_values(&["a", "svc"]).get(), 3.0);
        assert_eq!(c.label_names(), &["kind".to_string(), "service".to_string()]);
    }

    #[test]
    fn test_debug_shows_name_and_labels() {
        let c = counter(&["kind"]);
        let debug = format!("{:?}", c);
        assert!(debug.starts_with("CounterFamily"));
        assert!(debug.contains("\"test_total\""));
        assert!(debug.contains("\"kind\""));
        assert!(debug.contains("\"svc\""));
    }

    #[test]
    fn test_counter_rejects_wrong_arity() {
        let c = counter(&["kind", "status"]);
        let err = c.inc(&["only-one"]).unwrap_err();
        assert_eq!(
            err,
            MetricsError::LabelCardinality {
                metric: "test_total".to_string(),
                expected: 2,
                got: 1
            }
        );
        // Including the service value explicitly is also a mismatch
        assert!(c.inc(&["a", "b", "svc"]).is_err());
    }

    #[test]
    fn test_counter_rejects_negative_increment() {
        let c = counter(&[]);
        assert!(matches!(
            c.inc_by(&[], -1.0),
            Err(MetricsError::InvalidValue(_))
        ));
        assert!(c.inc_by(&[], f64::NAN).is_err());
        assert_eq!(c.get(&[]).unwrap(), 0.0);
    }

    #[test]
    fn test_histogram_observe_and_timer() {
        let b = binding("latency_seconds", &["op"]);
        let buckets = vec![0.1, 1.0];
        let vec = HistogramVec::new(
            HistogramOpts::new("latency_seconds", "test").buckets(buckets.clone()),
            &label_refs(&b),
        )
        .unwrap();
        let h = HistogramFamily::new(vec, b, buckets);

        h.observe(&["read"], 0.05).unwrap();
        h.observe(&["read"], 0.5).unwrap();
        {
            let _timer = h.start_timer(&["write"]).unwrap();
        }

        assert_eq!(h.sample_count(&["read"]).unwrap(), 2);
        assert!((h.sample_sum(&["read"]).unwrap() - 0.55).abs() < 1e-9);
        assert_eq!(h.sample_count(&["write"]).unwrap(), 1);
        assert_eq!(h.buckets(), &[0.1, 1.0]);
    }

    #[test]
    fn test_gauge_moves_both_ways() {
        let b = binding("queue_depth", &["queue"]);
        let vec = GaugeVec::new(Opts::new("queue_depth", "test"), &label_refs(&b)).unwrap();
        let g = GaugeFamily::new(vec, b);

        g.set(&["jobs"], 10.0).unwrap();
        g.inc(&["jobs"]).unwrap();
        g.add(&["jobs"], 4.0).unwrap();
        g.sub(&["jobs"], 2.5).unwrap();
        g.dec(&["jobs"]).unwrap();

        assert_eq!(g.get(&["jobs"]).unwrap(), 11.5);
        assert!(g.set(&[], 1.0).is_err());
    }
}
