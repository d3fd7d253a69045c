//! Mode routing
//!
//! The binary has a single execution mode: the exporter server.

pub mod server;

pub use server::{exporter_routes, run_server};
