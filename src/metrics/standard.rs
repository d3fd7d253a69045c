//! Standard instruments
//!
//! The five metrics every Nexen service exposes, and the per-request
//! observation guard used by the HTTP middleware.

use std::sync::Arc;
use std::time::Instant;

use actix_web::http::StatusCode;
use tracing::warn;

use super::instruments::{CounterFamily, GaugeFamily, HistogramFamily};
use super::registry::MetricRegistry;
use crate::errors::Result;

pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";
pub const HTTP_ERRORS_TOTAL: &str = "http_errors_total";
pub const APPLICATION_EVENTS_TOTAL: &str = "application_events_total";
pub const SERVICE_GAUGE: &str = "gauge";

/// Status codes at or above this count as errors.
pub const ERROR_STATUS_THRESHOLD: u16 = 400;

#[derive(Debug)]
pub struct StandardInstruments {
    /// HTTP request count by method, path
    pub http_requests: CounterFamily,
    /// HTTP request duration by method, path
    pub http_duration: HistogramFamily,
    /// HTTP error count by method, path, status text
    pub http_errors: CounterFamily,
    /// Application-specific events by event name
    pub application_events: CounterFamily,
    /// Arbitrary service values by gauge name
    pub service_gauge: GaugeFamily,
}

impl StandardInstruments {
    /// Register the standard set. The duration histogram uses the registry
    /// default buckets.
    pub fn register(registry: &MetricRegistry) -> Result<Self> {
        let http_requests = registry.register_counter(
            HTTP_REQUESTS_TOTAL,
            "Total number of HTTP requests received",
            &["method", "path"],
        )?;
        let http_duration = registry.register_histogram(
            HTTP_REQUEST_DURATION_SECONDS,
            "Histogram of HTTP request durations",
            &[],
            &["method", "path"],
        )?;
        let http_errors = registry.register_counter(
            HTTP_ERRORS_TOTAL,
            "Total number of HTTP responses with error status codes",
            &["method", "path", "code"],
        )?;
        let application_events = registry.register_counter(
            APPLICATION_EVENTS_TOTAL,
            "Count of application-specific events",
            &["event"],
        )?;
        let service_gauge = registry.register_gauge(
            SERVICE_GAUGE,
            "Service-specific gauge for arbitrary values",
            &["name"],
        )?;

        Ok(Self {
            http_requests,
            http_duration,
            http_errors,
            application_events,
            service_gauge,
        })
    }

    /// Count the request and start its timer.
    pub fn begin(self: &Arc<Self>, method: &str, path: &str) -> RequestObservation {
        log_failure("http_requests", self.http_requests.inc(&[method, path]));
        RequestObservation {
            instruments: Arc::clone(self),
            method: method.to_string(),
            path: path.to_string(),
            start: Instant::now(),
            finished: false,
        }
    }

    pub fn record_event(&self, event: &str) {
        log_failure("application_events", self.application_events.inc(&[event]));
    }

    pub fn set_gauge(&self, name: &str, value: f64) {
        log_failure("gauge", self.service_gauge.set(&[name], value));
    }

    pub fn add_gauge(&self, name: &str, delta: f64) {
        log_failure("gauge", self.service_gauge.add(&[name], delta));
    }

    pub fn increment_gauge(&self, name: &str) {
        log_failure("gauge", self.service_gauge.inc(&[name]));
    }

    pub fn decrement_gauge(&self, name: &str) {
        log_failure("gauge", self.service_gauge.dec(&[name]));
    }
}

/// Label value for the `code` label of `http_errors_total`.
///
/// The canonical reason phrase ("Internal Server Error"), or the numeric code
/// when the status has none.
pub fn status_text(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.as_u16().to_string())
}

/// In-flight request measurement.
///
/// Call [`finish`](Self::finish) with the captured status. If the guard is
/// dropped first (handler panicked, future cancelled) the duration is still
/// recorded and no error is counted.
#[must_use = "dropping the observation records it without a status"]
pub struct RequestObservation {
    instruments: Arc<StandardInstruments>,
    method: String,
    path: String,
    start: Instant,
    finished: bool,
}

impl RequestObservation {
    /// Record duration and, for status >= 400, the error.
    ///
    /// `None` means the handler never set a status nor wrote a body; it is
    /// treated as below the error threshold.
    pub fn finish(mut self, status: Option<StatusCode>) {
        self.finished = true;
        self.record_duration();

        if let Some(status) = status
            && status.as_u16() >= ERROR_STATUS_THRESHOLD
        {
            let code = status_text(status);
            log_failure(
                "http_errors",
                self.instruments
                    .http_errors
                    .inc(&[&self.method, &self.path, &code]),
            );
        }
    }

    fn record_duration(&self) {
        let duration = self.start.elapsed().as_secs_f64();
        log_failure(
            "http_duration",
            self.instruments
                .http_duration
                .observe(&[&self.method, &self.path], duration),
        );
    }
}

impl Drop for RequestObservation {
    fn drop(&mut self) {
        if !self.finished {
            self.record_duration();
        }
    }
}

/// Standard observations have fixed label arity; surface any failure in the
/// log instead of dropping it silently.
fn log_failure(instrument: &str, result: Result<()>) {
    if let Err(e) = result {
        warn!("Failed to record {} observation: {}", instrument, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instruments() -> (MetricRegistry, Arc<StandardInstruments>) {
        let registry = MetricRegistry::new("unit", Vec::new()).unwrap();
        let standard = Arc::new(StandardInstruments::register(&registry).unwrap());
        (registry, standard)
    }

    #[test]
    fn test_status_text() {
        assert_eq!(
            status_text(StatusCode::INTERNAL_SERVER_ERROR),
            "Internal Server Error"
        );
        assert_eq!(status_text(StatusCode::NOT_FOUND), "Not Found");
        assert_eq!(status_text(StatusCode::from_u16(599).unwrap()), "599");
    }

    fn requests(standard: &StandardInstruments, method: &str, path: &str) -> f64 {
        standard.http_requests.get(&[method, path]).unwrap()
    }

    fn durations(standard: &StandardInstruments, method: &str, path: &str) -> u64 {
        standard
            .http_duration
            .sample_count(&[method, path])
            .unwrap()
    }

    #[test]
    fn test_finish_with_error_status() {
        let (_registry, standard) = instruments();
        let observation = standard.begin("POST", "/completion");
        observation.finish(Some(StatusCode::INTERNAL_SERVER_ERROR));

        assert_eq!(requests(&standard, "POST", "/completion"), 1.0);
        assert_eq!(durations(&standard, "POST", "/completion"), 1);
        let errors = standard
            .http_errors
            .get(&["POST", "/completion", "Internal Server Error"])
            .unwrap();
        assert_eq!(errors, 1.0);
    }

    #[test]
    fn test_finish_below_threshold_counts_no_error() {
        let (registry, standard) = instruments();
        let below = StatusCode::from_u16(399).unwrap();
        for status in [Some(StatusCode::OK), Some(below), None] {
            standard.begin("GET", "/health").finish(status);
        }

        assert_eq!(requests(&standard, "GET", "/health"), 3.0);
        let output = registry.render().unwrap();
        assert!(!output.contains("nexen_service_http_errors_total{"));
    }

    #[test]
    fn test_dropped_observation_records_duration() {
        let (_registry, standard) = instruments();
        {
            let _observation = standard.begin("GET", "/slow");
        }
        assert_eq!(durations(&standard, "GET", "/slow"), 1);
    }

    #[test]
    fn test_convenience_operations() {
        let (_registry, standard) = instruments();
        standard.record_event("signup");
        standard.record_event("signup");
        standard.set_gauge("workers", 4.0);
        standard.increment_gauge("workers");
        standard.decrement_gauge("workers");
        standard.add_gauge("workers", -2.0);

        assert_eq!(standard.application_events.get(&["signup"]).unwrap(), 2.0);
        assert_eq!(standard.service_gauge.get(&["workers"]).unwrap(), 2.0);
    }
}
