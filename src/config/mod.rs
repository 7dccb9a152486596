use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::{fs, net::SocketAddr, path::Path, str::FromStr};
use tracing::debug;
use url::Url;
use validator::{Validate, ValidationError, ValidationErrors};

pub mod common;
pub mod upstream;

pub use self::common::*;
pub use self::upstream::*;

// 配置结果类型别名
pub type ConfigResult<T> = Result<T, ConfigError>;

// 自定义验证函数 - 验证Socket地址格式
pub fn validate_socket_addr(addr: &str) -> Result<(), ValidationError> {
    match SocketAddr::from_str(addr) {
        Ok(_) => Ok(()),
        Err(_) => Err(ValidationError::new("invalid_socket_addr")),
    }
}

// 自定义验证函数 - 验证上游URL
//
// GET 转发时直接在基础 URL 后拼接 `?` 与原始查询串，
// 因此基础 URL 自身不能带查询串或片段
pub fn validate_upstream_url(url_str: &str) -> Result<(), ValidationError> {
    let url = Url::parse(url_str).map_err(|_| ValidationError::new("invalid_url"))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ValidationError::new("unsupported_url_scheme"));
    }
    if url.query().is_some() {
        return Err(ValidationError::new("url_must_not_have_query"));
    }
    if url.fragment().is_some() {
        return Err(ValidationError::new("url_must_not_have_fragment"));
    }
    Ok(())
}

// 自定义验证函数 - 验证代理URL格式
pub fn validate_proxy_url(url_str: &str) -> Result<(), ValidationError> {
    match Url::parse(url_str) {
        Ok(_) => Ok(()),
        Err(_) => Err(ValidationError::new("invalid_proxy_url")),
    }
}

// 应用配置
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Validate)]
#[serde(rename_all = "lowercase")]
pub struct Config {
    // 中继服务器配置
    #[validate(nested)]
    pub server: ServerConfig,
    // 管理服务器配置（可选）
    #[serde(default)]
    #[validate(nested)]
    pub admin: Option<AdminConfig>,
    // 上游配置（可选，默认 Cloudflare）
    #[serde(default)]
    #[validate(nested)]
    pub upstream: UpstreamConfig,
    // HTTP客户端配置（可选）
    #[serde(default)]
    #[validate(nested)]
    pub http_client: Option<HttpClientConfig>,
}

impl Config {
    // 从文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        debug!("Loading configuration file: {:?}", path.as_ref());
        let content = fs::read_to_string(path).map_err(ConfigError::LoadError)?;
        Self::from_yaml(&content)
    }

    // 从 YAML 文本加载配置
    pub fn from_yaml(content: &str) -> ConfigResult<Self> {
        let config: Config = serde_yaml::from_str(content).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    // 验证配置有效性
    pub fn validate(&self) -> ConfigResult<()> {
        // 使用 validator 库进行验证
        if let Err(errors) = Validate::validate(self) {
            return Err(ConfigError::ValidationError(format_validation_errors(
                &errors,
            )));
        }
        Ok(())
    }
}

// 将 ValidationErrors 转换为友好的错误信息
fn format_validation_errors(errors: &ValidationErrors) -> String {
    let mut messages = Vec::new();

    for (field, error_kind) in errors.errors() {
        match error_kind {
            validator::ValidationErrorsKind::Field(field_errors) => {
                for error in field_errors {
                    let message = error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| error.code.to_string());
                    messages.push(format!("Field '{}': {}", field, message));
                }
            }
            validator::ValidationErrorsKind::Struct(struct_errors) => {
                messages.push(format!(
                    "Struct '{}' validation failed: {}",
                    field,
                    format_validation_errors(struct_errors)
                ));
            }
            validator::ValidationErrorsKind::List(list_errors) => {
                for (index, err) in list_errors {
                    messages.push(format!(
                        "List '{}' at index {}: {}",
                        field,
                        index,
                        format_validation_errors(err)
                    ));
                }
            }
        }
    }

    if messages.is_empty() {
        "Unknown validation error".to_string()
    } else {
        messages.join("\n")
    }
}

// 默认配置实现
impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig::default(),
            admin: Some(AdminConfig::default()),
            upstream: UpstreamConfig::default(),
            http_client: Some(HttpClientConfig::default()),
        }
    }
}
