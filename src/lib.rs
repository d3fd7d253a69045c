//! nexen-metrics - Prometheus instrumentation for Nexen services
//!
//! Every series is prefixed `nexen_service_` and carries a `service` label
//! bound at construction, so call sites never pass it.
//!
//! # Features
//! - **system**: process memory and CPU collector (default)
//!
//! # Architecture
//! - `metrics`: registry, instrument handles, bucket profiles, standard instruments
//! - `handler`: host-agnostic request/response traits and instrumentation wrapper
//! - `facade`: `Metrics` entry point and its builder
//! - `api`: actix-web middleware and scrape endpoint
//! - `config`: static configuration (TOML + environment)
//! - `runtime`: standalone exporter server
//! - `system`: logging setup

pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod facade;
pub mod handler;
pub mod metrics;
pub mod runtime;
pub mod system;

pub use errors::{MetricsError, Result};
pub use facade::{Metrics, MetricsBuilder, MetricsConfig};
pub use handler::{BufferedResponse, Handler, Request, ResponseSink, decode_path, handler_fn};
pub use metrics::{BucketProfile, MetricRegistry};
