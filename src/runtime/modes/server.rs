//! Server mode
//!
//! Standalone exporter: serves the scrape endpoint and a health check, both
//! wrapped by the metrics middleware.

use actix_web::{App, HttpServer, web};
use anyhow::Result;
use tracing::{error, warn};

use crate::api::services::{AppStartTime, HealthService, MetricsService};
use crate::config::StaticConfig;
use crate::facade::Metrics;

/// Register the exporter routes.
pub fn exporter_routes(cfg: &mut web::ServiceConfig, metrics_path: &str) {
    cfg.route(metrics_path, web::get().to(MetricsService::scrape))
        .route("/health", web::get().to(HealthService::health_check));
}

/// Run the HTTP server
///
/// **Note**: Logging system must be initialized before calling this function
pub async fn run_server(config: StaticConfig) -> Result<()> {
    let metrics = Metrics::from_config(config.metrics_config()?).map_err(|e| {
        error!("Metrics initialization failed: {}", e);
        e
    })?;

    let bind_address = config.server.bind_address()?;
    let metrics_path = config.server.metrics_path.clone();
    let app_start_time = AppStartTime::now();

    warn!(
        "Serving metrics for service '{}' at http://{}{}",
        metrics.service_name(),
        bind_address,
        metrics_path
    );

    let data = web::Data::new(metrics.clone());
    let server = HttpServer::new(move || {
        let metrics_path = metrics_path.clone();
        App::new()
            .wrap(metrics.middleware())
            .app_data(data.clone())
            .app_data(web::Data::new(app_start_time.clone()))
            .configure(move |cfg| exporter_routes(cfg, &metrics_path))
    })
    .keep_alive(std::time::Duration::from_secs(30));

    server.bind(&bind_address)?.run().await?;

    Ok(())
}
