use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::{MetricsError, Result};
use crate::facade::MetricsConfig;
use crate::metrics::{BucketProfile, DEFAULT_SERVICE_NAME, validate_buckets};

/// Default configuration file, read when present
pub const DEFAULT_CONFIG_PATH: &str = "nexen-metrics.toml";

/// Environment variable prefix, sections separated by `__`
pub const ENV_PREFIX: &str = "NEXEN";

/// 静态配置（从 TOML 加载，启动时使用）
///
/// - server: 监听地址、metrics 路径
/// - metrics: service 名称、bucket 配置
/// - logging: 日志配置
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct StaticConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub metrics: MetricsSection,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：ENV > TOML > 默认值
    /// 示例：NEXEN__SERVER__LISTEN_ADDRESS=:9100
    ///
    /// An explicit `path` must exist; without one, [`DEFAULT_CONFIG_PATH`] is
    /// read if present. The result is not validated, so command line
    /// overrides can still be applied before [`StaticConfig::validate`].
    pub fn load(path: Option<&str>) -> Result<Self> {
        use config::{Config, Environment, File};

        let file = match path {
            Some(path) => File::with_name(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_PATH).required(false),
        };

        let settings = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// Parse a TOML document, without environment overrides.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: StaticConfig = toml::from_str(content)
            .map_err(|e| MetricsError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.server.metrics_path.starts_with('/') {
            return Err(MetricsError::config(format!(
                "metrics_path '{}' must start with '/'",
                self.server.metrics_path
            )));
        }
        self.server.bind_address()?;
        self.metrics.buckets()?;
        Ok(())
    }

    /// Facade options described by the `[metrics]` section.
    pub fn metrics_config(&self) -> Result<MetricsConfig> {
        Ok(MetricsConfig {
            service_name: self.metrics.service_name.clone(),
            histogram_buckets: self.metrics.buckets()?,
            registry: None,
        })
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        Self::default()
            .to_toml()
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| MetricsError::config(e.to_string()))
    }

    /// 保存配置到 TOML 文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = self.to_toml()?;

        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// `host:port`, or `:port` for all interfaces
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
    #[serde(default = "default_metrics_path")]
    pub metrics_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            metrics_path: default_metrics_path(),
        }
    }
}

impl ServerConfig {
    /// Socket address to bind; `:8080` becomes `0.0.0.0:8080`.
    pub fn bind_address(&self) -> Result<String> {
        let addr = if self.listen_address.starts_with(':') {
            format!("0.0.0.0{}", self.listen_address)
        } else {
            self.listen_address.clone()
        };

        match addr.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => Ok(addr),
            _ => Err(MetricsError::config(format!(
                "invalid listen address '{}'",
                self.listen_address
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricsSection {
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// http, llm, memory
    #[serde(default = "default_bucket_profile")]
    pub bucket_profile: String,
    /// Explicit bucket bounds, overriding `bucket_profile`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buckets: Option<Vec<f64>>,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            bucket_profile: default_bucket_profile(),
            buckets: None,
        }
    }
}

impl MetricsSection {
    /// Resolved histogram buckets.
    pub fn buckets(&self) -> Result<Vec<f64>> {
        match &self.buckets {
            Some(buckets) => {
                validate_buckets(buckets)?;
                Ok(buckets.clone())
            }
            None => Ok(self.bucket_profile.parse::<BucketProfile>()?.to_vec()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// text, json
    #[serde(default = "default_log_format")]
    pub format: String,
    /// 日志文件路径，为空时输出到 stdout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

fn default_listen_address() -> String {
    ":8080".to_string()
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

fn default_service_name() -> String {
    DEFAULT_SERVICE_NAME.to_string()
}

fn default_bucket_profile() -> String {
    BucketProfile::default().name().to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}
