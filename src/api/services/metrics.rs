//! Prometheus metrics endpoint
//!
//! Exposes the facade's registry in Prometheus text format.

use actix_web::{HttpResponse, Responder, web};
use tracing::error;

use crate::facade::Metrics;

/// Metrics service handler
pub struct MetricsService;

impl MetricsService {
    /// Handle metrics export request
    pub async fn scrape(metrics: web::Data<Metrics>) -> impl Responder {
        match metrics.render() {
            Ok(output) => HttpResponse::Ok()
                .content_type(metrics.registry().content_type())
                .body(output),
            Err(e) => {
                error!("Failed to encode metrics: {}", e);
                HttpResponse::InternalServerError()
                    .content_type("text/plain; charset=utf-8")
                    .body(format!("Failed to encode metrics: {}", e))
            }
        }
    }
}
