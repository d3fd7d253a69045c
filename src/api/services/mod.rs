pub mod health;
pub mod metrics;

pub use health::{AppStartTime, HealthService};
pub use metrics::MetricsService;
