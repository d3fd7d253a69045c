//! Application lifecycle
//!
//! - `modes::server`: standalone exporter HTTP server

pub mod modes;
