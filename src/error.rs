use crate::r#const::{relay_responses, upstream_error_labels};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::io;
use std::net::AddrParseError;
use thiserror::Error;

// Unified error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(#[from] UpstreamFailure),

    #[error("Request body too large: {0}")]
    PayloadTooLarge(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid proxy configuration: {0}")]
    InvalidProxy(String),

    #[error("Shutdown timeout out of range")]
    InvalidShutdownTimeout,
}

impl From<AddrParseError> for AppError {
    fn from(err: AddrParseError) -> Self {
        Self::Config(ConfigError::InvalidListenAddress(err.to_string()))
    }
}

// 客户端只会看到固定的响应体，错误细节仅写入日志
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::UpstreamUnavailable(_) => (
                StatusCode::BAD_GATEWAY,
                relay_responses::PROXY_ERROR_BODY,
            )
                .into_response(),
            AppError::PayloadTooLarge(_) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                relay_responses::PAYLOAD_TOO_LARGE_BODY,
            )
                .into_response(),
            AppError::BadRequest(_) => {
                (StatusCode::BAD_REQUEST, relay_responses::BAD_REQUEST_BODY).into_response()
            }
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                relay_responses::INTERNAL_ERROR_BODY,
            )
                .into_response(),
        }
    }
}

// 上游传输失败类型
//
// 所有变体对客户端表现一致（502），区分原因只用于日志与指标
#[derive(Error, Debug)]
pub enum UpstreamFailure {
    #[error("upstream request timed out: {0}")]
    Timeout(#[source] reqwest::Error),

    #[error("failed to connect to upstream: {0}")]
    Connect(#[source] reqwest::Error),

    #[error("upstream redirect failed: {0}")]
    Redirect(#[source] reqwest::Error),

    #[error("failed to read upstream response body: {0}")]
    Body(#[source] reqwest::Error),

    #[error("upstream request failed: {0}")]
    Request(#[source] reqwest::Error),
}

impl UpstreamFailure {
    // 根据 reqwest 错误归类失败原因，去掉其中携带的 URL 以免查询串进入日志
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        let err = err.without_url();
        if err.is_timeout() {
            Self::Timeout(err)
        } else if err.is_connect() {
            Self::Connect(err)
        } else if err.is_redirect() {
            Self::Redirect(err)
        } else if err.is_body() || err.is_decode() {
            Self::Body(err)
        } else {
            Self::Request(err)
        }
    }

    // 指标标签
    pub fn label(&self) -> &'static str {
        match self {
            Self::Timeout(_) => upstream_error_labels::TIMEOUT,
            Self::Connect(_) => upstream_error_labels::CONNECT,
            Self::Redirect(_) => upstream_error_labels::REDIRECT,
            Self::Body(_) => upstream_error_labels::BODY,
            Self::Request(_) => upstream_error_labels::REQUEST,
        }
    }
}

// Configuration error type
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration file: {0}")]
    LoadError(#[from] io::Error),

    #[error("YAML parsing error: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid server listen address: {0}")]
    InvalidListenAddress(String),

    #[error("Invalid upstream URL: {0}")]
    InvalidUpstreamUrl(String),

    #[error("Configuration validation error: {0}")]
    ValidationError(String),
}
