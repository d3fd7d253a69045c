use actix_web::http::StatusCode;
use actix_web::http::header::{CONTENT_TYPE, HeaderValue};
use tracing::{debug, error};

use super::{Handler, Request, ResponseSink};
use crate::metrics::MetricRegistry;

/// Serves the current registry snapshot in the Prometheus text format.
#[derive(Clone)]
pub struct ScrapeHandler {
    registry: MetricRegistry,
}

impl ScrapeHandler {
    pub fn new(registry: MetricRegistry) -> Self {
        Self { registry }
    }
}

impl Handler for ScrapeHandler {
    fn serve(&self, _req: &Request, res: &mut dyn ResponseSink) {
        match self.registry.render() {
            Ok(output) => {
                debug!("Metrics scrape: {} bytes", output.len());
                res.set_status(StatusCode::OK);
                res.insert_header(
                    CONTENT_TYPE,
                    HeaderValue::from_static(self.registry.content_type()),
                );
                if let Err(e) = res.write(output.as_bytes()) {
                    error!("Failed to write metrics response: {}", e);
                }
            }
            Err(e) => {
                error!("Failed to encode metrics: {}", e);
                res.set_status(StatusCode::INTERNAL_SERVER_ERROR);
                let body = format!("Failed to encode metrics: {}", e);
                if let Err(e) = res.write(body.as_bytes()) {
                    error!("Failed to write metrics error response: {}", e);
                }
            }
        }
    }
}
