//! actix-web integration
//!
//! - `middleware`: request instrumentation
//! - `services`: the scrape endpoint

pub mod middleware;
pub mod services;
