//! Histogram bucket profiles
//!
//! Named, immutable sets of ascending bucket boundaries. The HTTP profile is
//! the registry default unless another one is configured.

use std::fmt;
use std::str::FromStr;

use crate::errors::{MetricsError, Result};

/// Buckets for HTTP request durations (in seconds).
pub const HTTP_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Buckets for LLM inference latency (in seconds).
///
/// Wider range to cover the variability of model response times.
pub const LLM_LATENCY_BUCKETS: &[f64] = &[
    0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 30.0, 60.0, 120.0,
];

/// Buckets for memory usage (in MB).
pub const MEMORY_BUCKETS: &[f64] = &[50.0, 100.0, 250.0, 500.0, 1000.0, 2000.0, 5000.0, 10000.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BucketProfile {
    #[default]
    Http,
    LlmLatency,
    Memory,
}

impl BucketProfile {
    pub const ALL: [BucketProfile; 3] = [Self::Http, Self::LlmLatency, Self::Memory];

    pub fn buckets(&self) -> &'static [f64] {
        match self {
            Self::Http => HTTP_BUCKETS,
            Self::LlmLatency => LLM_LATENCY_BUCKETS,
            Self::Memory => MEMORY_BUCKETS,
        }
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.buckets().to_vec()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::LlmLatency => "llm",
            Self::Memory => "memory",
        }
    }
}

impl fmt::Display for BucketProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BucketProfile {
    type Err = MetricsError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "llm" | "llm_latency" | "llm-latency" => Ok(Self::LlmLatency),
            "memory" => Ok(Self::Memory),
            _ => Err(MetricsError::config(format!(
                "Invalid bucket profile: '{}'. Valid: http, llm, memory",
                s
            ))),
        }
    }
}

/// Check that bucket boundaries are finite and strictly increasing.
///
/// An empty slice is rejected here; callers decide the fallback before
/// validating.
pub fn validate_buckets(buckets: &[f64]) -> Result<()> {
    if buckets.is_empty() {
        return Err(MetricsError::invalid_buckets("bucket list is empty"));
    }
    if let Some(bad) = buckets.iter().find(|b| !b.is_finite()) {
        return Err(MetricsError::invalid_buckets(format!(
            "bucket boundary {} is not finite (+Inf is implicit)",
            bad
        )));
    }
    for pair in buckets.windows(2) {
        if pair[0] >= pair[1] {
            return Err(MetricsError::invalid_buckets(format!(
                "buckets must be strictly increasing, found {} before {}",
                pair[0], pair[1]
            )));
        }
    }
    Ok(())
}
