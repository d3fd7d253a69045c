//! Command-line interface definitions using clap

use clap::Parser;

use crate::config::StaticConfig;

/// nexen-metrics - standalone Prometheus exporter for a Nexen service
#[derive(Parser, Debug, Default)]
#[command(name = "nexen-metrics")]
#[command(version)]
#[command(about = "Expose Nexen service metrics in Prometheus format", long_about = None)]
pub struct Cli {
    /// Configuration file (TOML)
    #[arg(long, short = 'c')]
    pub config: Option<String>,

    /// Address to listen on for the metrics endpoint, e.g. ":8080"
    #[arg(long = "metrics.listen-address")]
    pub listen_address: Option<String>,

    /// Path under which to expose metrics
    #[arg(long = "metrics.path")]
    pub metrics_path: Option<String>,

    /// Value of the service label
    #[arg(long)]
    pub service_name: Option<String>,

    /// Histogram bucket profile: http, llm, memory
    #[arg(long)]
    pub bucket_profile: Option<String>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    pub print_config: bool,
}

impl Cli {
    /// Command-line flags take precedence over file and environment values.
    pub fn apply(&self, config: &mut StaticConfig) {
        if let Some(addr) = &self.listen_address {
            config.server.listen_address = addr.clone();
        }
        if let Some(path) = &self.metrics_path {
            config.server.metrics_path = path.clone();
        }
        if let Some(name) = &self.service_name {
            config.metrics.service_name = name.clone();
        }
        if let Some(profile) = &self.bucket_profile {
            config.metrics.bucket_profile = profile.clone();
            // 命令行指定 profile 时忽略文件中的显式 buckets
            config.metrics.buckets = None;
        }
    }
}
