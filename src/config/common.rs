use crate::r#const::{body_limits, http_client_limits, server_defaults};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::validate_socket_addr;

// HTTP客户端配置
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Validate)]
pub struct HttpClientConfig {
    // 连接超时（秒）
    #[validate(range(
        min = http_client_limits::MIN_CONNECT_TIMEOUT,
        max = http_client_limits::MAX_CONNECT_TIMEOUT,
        message = "Connect timeout must be between 1 and 120 seconds"
    ))]
    pub connect_timeout: u64,
    // 请求超时（秒），覆盖整个上游往返
    #[validate(range(
        min = http_client_limits::MIN_REQUEST_TIMEOUT,
        max = http_client_limits::MAX_REQUEST_TIMEOUT,
        message = "Request timeout must be between 1 and 1200 seconds"
    ))]
    pub request_timeout: u64,
    // 空闲连接超时（秒）（可选）
    #[validate(range(
        min = http_client_limits::MIN_IDLE_TIMEOUT,
        max = http_client_limits::MAX_IDLE_TIMEOUT,
        message = "Idle timeout must be between 5 and 1800 seconds"
    ))]
    pub idle_timeout: Option<u64>,
    // TCP Keepalive（秒）（可选）
    #[validate(range(
        min = http_client_limits::MIN_KEEPALIVE,
        max = http_client_limits::MAX_KEEPALIVE,
        message = "Keepalive must be between 5 and 600 seconds"
    ))]
    pub keepalive: Option<u32>,
    // HTTP用户代理（可选）
    pub agent: Option<String>,
    // 是否跳过上游证书校验
    #[serde(default)]
    pub insecure_skip_verify: bool,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: http_client_limits::DEFAULT_CONNECT_TIMEOUT,
            request_timeout: http_client_limits::DEFAULT_REQUEST_TIMEOUT,
            idle_timeout: Some(http_client_limits::DEFAULT_IDLE_TIMEOUT),
            keepalive: Some(http_client_limits::DEFAULT_KEEPALIVE),
            agent: None,
            insecure_skip_verify: false,
        }
    }
}

// 服务器配置
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Validate)]
pub struct ServerConfig {
    // 中继 HTTP 监听地址
    #[validate(custom(function = "validate_socket_addr"))]
    pub listen_http: String,
    // POST 请求体最大字节数
    #[serde(default = "default_max_body_size")]
    #[validate(range(
        min = body_limits::MIN_MAX_BODY_SIZE,
        max = body_limits::MAX_MAX_BODY_SIZE,
        message = "Max body size must be between 512 and 1048576 bytes"
    ))]
    pub max_body_size: usize,
}

fn default_max_body_size() -> usize {
    body_limits::DEFAULT_MAX_BODY_SIZE
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_http: server_defaults::DEFAULT_HTTP_LISTEN.to_string(),
            max_body_size: default_max_body_size(),
        }
    }
}

// 管理服务器配置
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Validate)]
pub struct AdminConfig {
    // 管理服务器监听地址
    #[validate(custom(function = "validate_socket_addr"))]
    pub listen: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            listen: server_defaults::DEFAULT_ADMIN_LISTEN.to_string(),
        }
    }
}
