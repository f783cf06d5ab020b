//! 翻译模块统一错误处理
//!
//! 提供结构化错误类型和错误处理机制

use std::fmt;

use thiserror::Error;

/// 翻译错误类型
#[derive(Error, Debug, Clone)]
pub enum TranslationError {
    /// 配置错误
    #[error("配置错误: {0}")]
    ConfigError(String),

    /// 选择器解析错误
    #[error("选择器无效 `{selector}`: {reason}")]
    SelectorError { selector: String, reason: String },

    /// 网络错误
    #[error("网络错误: {0}")]
    NetworkError(String),

    /// 授权错误
    #[error("获取翻译授权失败: {0}")]
    AuthError(String),

    /// 翻译服务返回非成功状态
    #[error("翻译服务错误 [{status}]: {message}")]
    ServiceError { status: u16, message: String },

    /// 缓存错误
    #[error("缓存错误: {0}")]
    CacheError(String),

    /// 输入验证错误
    #[error("输入无效: {0}")]
    InvalidInput(String),

    /// 解析错误
    #[error("解析错误: {0}")]
    ParseError(String),

    /// 序列化错误
    #[error("序列化错误: {0}")]
    SerializationError(String),

    /// 内部错误
    #[error("内部错误: {0}")]
    InternalError(String),
}

impl TranslationError {
    /// 检查错误是否可重试
    pub fn is_retryable(&self) -> bool {
        match self {
            TranslationError::NetworkError(_) => true,
            TranslationError::AuthError(_) => true,
            TranslationError::ServiceError { status, .. } => *status == 429 || *status >= 500,
            TranslationError::CacheError(_) => true,
            TranslationError::ConfigError(_) => false,
            TranslationError::SelectorError { .. } => false,
            TranslationError::InvalidInput(_) => false,
            TranslationError::ParseError(_) => false,
            TranslationError::SerializationError(_) => false,
            TranslationError::InternalError(_) => false,
        }
    }

    /// 获取错误的严重程度
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            TranslationError::ConfigError(_) => ErrorSeverity::Critical,
            TranslationError::SelectorError { .. } => ErrorSeverity::Critical,
            TranslationError::NetworkError(_) => ErrorSeverity::Warning,
            TranslationError::AuthError(_) => ErrorSeverity::Error,
            TranslationError::ServiceError { .. } => ErrorSeverity::Warning,
            TranslationError::CacheError(_) => ErrorSeverity::Warning,
            TranslationError::InvalidInput(_) => ErrorSeverity::Info,
            TranslationError::ParseError(_) => ErrorSeverity::Error,
            TranslationError::SerializationError(_) => ErrorSeverity::Error,
            TranslationError::InternalError(_) => ErrorSeverity::Critical,
        }
    }

    /// 获取错误类别
    pub fn category(&self) -> ErrorCategory {
        match self {
            TranslationError::ConfigError(_) => ErrorCategory::Configuration,
            TranslationError::SelectorError { .. } => ErrorCategory::Configuration,
            TranslationError::NetworkError(_) => ErrorCategory::Network,
            TranslationError::AuthError(_) => ErrorCategory::Auth,
            TranslationError::ServiceError { .. } => ErrorCategory::Service,
            TranslationError::CacheError(_) => ErrorCategory::Cache,
            TranslationError::InvalidInput(_) => ErrorCategory::Input,
            TranslationError::ParseError(_) => ErrorCategory::Parsing,
            TranslationError::SerializationError(_) => ErrorCategory::Serialization,
            TranslationError::InternalError(_) => ErrorCategory::Internal,
        }
    }

    /// 创建带上下文的错误
    pub fn with_context<T: fmt::Display>(self, context: T) -> Self {
        match self {
            TranslationError::ConfigError(msg) => {
                TranslationError::ConfigError(format!("{} (上下文: {})", msg, context))
            }
            TranslationError::NetworkError(msg) => {
                TranslationError::NetworkError(format!("{} (上下文: {})", msg, context))
            }
            TranslationError::AuthError(msg) => {
                TranslationError::AuthError(format!("{} (上下文: {})", msg, context))
            }
            TranslationError::CacheError(msg) => {
                TranslationError::CacheError(format!("{} (上下文: {})", msg, context))
            }
            TranslationError::InvalidInput(msg) => {
                TranslationError::InvalidInput(format!("{} (上下文: {})", msg, context))
            }
            TranslationError::ParseError(msg) => {
                TranslationError::ParseError(format!("{} (上下文: {})", msg, context))
            }
            TranslationError::SerializationError(msg) => {
                TranslationError::SerializationError(format!("{} (上下文: {})", msg, context))
            }
            TranslationError::InternalError(msg) => {
                TranslationError::InternalError(format!("{} (上下文: {})", msg, context))
            }
            TranslationError::ServiceError { status, message } => TranslationError::ServiceError {
                status,
                message: format!("{} (上下文: {})", message, context),
            },
            TranslationError::SelectorError { selector, reason } => {
                TranslationError::SelectorError {
                    selector,
                    reason: format!("{} (上下文: {})", reason, context),
                }
            }
        }
    }
}

/// 错误严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Configuration,
    Network,
    Auth,
    Service,
    Cache,
    Input,
    Parsing,
    Serialization,
    Internal,
}

impl From<std::io::Error> for TranslationError {
    fn from(error: std::io::Error) -> Self {
        TranslationError::InternalError(format!("IO错误: {}", error))
    }
}

impl From<reqwest::Error> for TranslationError {
    fn from(error: reqwest::Error) -> Self {
        match error.status() {
            Some(status) => TranslationError::ServiceError {
                status: status.as_u16(),
                message: error.to_string(),
            },
            None if error.is_decode() => {
                TranslationError::SerializationError(format!("响应解码失败: {}", error))
            }
            None => TranslationError::NetworkError(error.to_string()),
        }
    }
}

impl From<serde_json::Error> for TranslationError {
    fn from(error: serde_json::Error) -> Self {
        TranslationError::SerializationError(format!("JSON序列化错误: {}", error))
    }
}

impl From<toml::de::Error> for TranslationError {
    fn from(error: toml::de::Error) -> Self {
        TranslationError::ParseError(format!("TOML解析错误: {}", error))
    }
}

impl From<config::ConfigError> for TranslationError {
    fn from(error: config::ConfigError) -> Self {
        TranslationError::ConfigError(format!("配置错误: {}", error))
    }
}

impl From<regex::Error> for TranslationError {
    fn from(error: regex::Error) -> Self {
        TranslationError::ConfigError(format!("正则表达式错误: {}", error))
    }
}

impl From<redb::Error> for TranslationError {
    fn from(error: redb::Error) -> Self {
        TranslationError::CacheError(error.to_string())
    }
}

macro_rules! impl_from_redb {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for TranslationError {
                fn from(error: $ty) -> Self {
                    TranslationError::CacheError(error.to_string())
                }
            }
        )*
    };
}

impl_from_redb!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

/// 错误结果类型别名
pub type TranslationResult<T> = Result<T, TranslationError>;

/// 错误处理助手函数
pub mod helpers {
    use super::*;

    /// 按严重程度记录错误
    pub fn log_error(error: &TranslationError) {
        match error.severity() {
            ErrorSeverity::Info => tracing::info!("翻译信息: {}", error),
            ErrorSeverity::Warning => tracing::warn!("翻译警告: {}", error),
            ErrorSeverity::Error => tracing::error!("翻译错误: {}", error),
            ErrorSeverity::Critical => tracing::error!("翻译严重错误: {}", error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TranslationError::ServiceError {
            status: 500,
            message: "Internal".to_string(),
        };
        assert_eq!(err.to_string(), "翻译服务错误 [500]: Internal");
    }

    #[test]
    fn test_retryable_service_errors() {
        let throttled = TranslationError::ServiceError {
            status: 429,
            message: String::new(),
        };
        let bad_request = TranslationError::ServiceError {
            status: 400,
            message: String::new(),
        };
        assert!(throttled.is_retryable());
        assert!(!bad_request.is_retryable());
        assert!(!TranslationError::ConfigError("x".into()).is_retryable());
    }

    #[test]
    fn test_with_context_keeps_variant() {
        let err = TranslationError::CacheError("写入失败".into()).with_context("redb");
        assert_eq!(err.category(), ErrorCategory::Cache);
        assert!(err.to_string().contains("上下文: redb"));
    }
}
