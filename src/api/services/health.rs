use actix_web::{HttpResponse, Responder, web};
use serde::Serialize;
use std::time::Instant;
use tracing::trace;

use crate::facade::Metrics;

// 服务启动时间
#[derive(Clone, Debug)]
pub struct AppStartTime {
    pub started: Instant,
}

impl AppStartTime {
    pub fn now() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: String,
    pub uptime_seconds: u64,
}

/// Liveness check for the standalone exporter
pub struct HealthService;

impl HealthService {
    pub async fn health_check(
        metrics: web::Data<Metrics>,
        app_start_time: web::Data<AppStartTime>,
    ) -> impl Responder {
        trace!("Received health check request");

        HttpResponse::Ok().json(HealthResponse {
            status: "healthy",
            service: metrics.service_name().to_string(),
            uptime_seconds: app_start_time.started.elapsed().as_secs(),
        })
    }
}
