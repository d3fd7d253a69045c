use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum MetricsError {
    /// A metric with this fully-qualified name is already registered.
    DuplicateName { name: String },
    /// Metric or label name does not match the exposition grammar.
    InvalidName(String),
    /// Histogram bucket boundaries are not finite and strictly increasing.
    InvalidBuckets(String),
    /// Number of label values does not match the declared label names.
    LabelCardinality {
        metric: String,
        expected: usize,
        got: usize,
    },
    InvalidValue(String),
    Encoding(String),
    Collaborator(String),
    Config(String),
    Io(String),
}

impl MetricsError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            MetricsError::DuplicateName { .. } => "M001",
            MetricsError::InvalidName(_) => "M002",
            MetricsError::InvalidBuckets(_) => "M003",
            MetricsError::LabelCardinality { .. } => "M004",
            MetricsError::InvalidValue(_) => "M005",
            MetricsError::Encoding(_) => "M006",
            MetricsError::Collaborator(_) => "M007",
            MetricsError::Config(_) => "M008",
            MetricsError::Io(_) => "M009",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            MetricsError::DuplicateName { .. } => "Duplicate Metric Name",
            MetricsError::InvalidName(_) => "Invalid Name",
            MetricsError::InvalidBuckets(_) => "Invalid Histogram Buckets",
            MetricsError::LabelCardinality { .. } => "Label Cardinality Mismatch",
            MetricsError::InvalidValue(_) => "Invalid Value",
            MetricsError::Encoding(_) => "Encoding Error",
            MetricsError::Collaborator(_) => "Prometheus Error",
            MetricsError::Config(_) => "Configuration Error",
            MetricsError::Io(_) => "IO Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> String {
        match self {
            MetricsError::DuplicateName { name } => {
                format!("metric '{}' is already registered", name)
            }
            MetricsError::LabelCardinality {
                metric,
                expected,
                got,
            } => format!(
                "metric '{}' expects {} label values, got {}",
                metric, expected, got
            ),
            MetricsError::InvalidName(msg)
            | MetricsError::InvalidBuckets(msg)
            | MetricsError::InvalidValue(msg)
            | MetricsError::Encoding(msg)
            | MetricsError::Collaborator(msg)
            | MetricsError::Config(msg)
            | MetricsError::Io(msg) => msg.clone(),
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, MetricsError::DuplicateName { .. })
    }

    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for MetricsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for MetricsError {}

// 便捷的构造函数
impl MetricsError {
    pub fn duplicate_name<T: Into<String>>(name: T) -> Self {
        MetricsError::DuplicateName { name: name.into() }
    }

    pub fn invalid_name<T: Into<String>>(msg: T) -> Self {
        MetricsError::InvalidName(msg.into())
    }

    pub fn invalid_buckets<T: Into<String>>(msg: T) -> Self {
        MetricsError::InvalidBuckets(msg.into())
    }

    pub fn invalid_value<T: Into<String>>(msg: T) -> Self {
        MetricsError::InvalidValue(msg.into())
    }

    pub fn encoding<T: Into<String>>(msg: T) -> Self {
        MetricsError::Encoding(msg.into())
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        MetricsError::Config(msg.into())
    }
}

impl From<prometheus::Error> for MetricsError {
    fn from(err: prometheus::Error) -> Self {
        match err {
            prometheus::Error::InconsistentCardinality { expect, got } => {
                MetricsError::LabelCardinality {
                    metric: String::new(),
                    expected: expect,
                    got,
                }
            }
            prometheus::Error::Msg(msg) => MetricsError::Collaborator(msg),
            other => MetricsError::Collaborator(other.to_string()),
        }
    }
}

impl From<std::io::Error> for MetricsError {
    fn from(err: std::io::Error) -> Self {
        MetricsError::Io(err.to_string())
    }
}

impl From<std::string::FromUtf8Error> for MetricsError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        MetricsError::Encoding(err.to_string())
    }
}

impl From<config::ConfigError> for MetricsError {
    fn from(err: config::ConfigError) -> Self {
        MetricsError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MetricsError>;
