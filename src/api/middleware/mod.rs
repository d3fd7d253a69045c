pub mod timing;

pub use timing::{InstrumentedService, MetricsMiddleware};
