// src/relay/exchange.rs

use crate::error::AppError;
use crate::r#const::{http_headers, route_labels};
use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::{HeaderMap, Method, StatusCode},
};

/// 入站请求的处理路径
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// 任意路径的 POST，请求体为二进制 DNS 消息
    Post,
    /// 带 `dns` 查询参数的 GET
    Get,
    /// 其余请求，返回存活响应
    Liveness,
}

impl Route {
    /// 按优先级对请求分类，对所有方法与参数组合都有定义
    pub fn classify(method: &Method, query: Option<&str>) -> Self {
        if method == Method::POST {
            return Self::Post;
        }
        if method == Method::GET && query.is_some_and(has_dns_param) {
            return Self::Get;
        }
        Self::Liveness
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Post => route_labels::POST,
            Self::Get => route_labels::GET,
            Self::Liveness => route_labels::LIVENESS,
        }
    }
}

// 只判断参数是否存在，值可以为空，且不做任何解码校验
fn has_dns_param(query: &str) -> bool {
    url::form_urlencoded::parse(query.as_bytes())
        .any(|(key, _)| key == http_headers::DNS_QUERY_PARAM)
}

/// 一次中继交换：单个入站请求及其对应的上游往返
///
/// DNS 负载（POST 请求体或 GET 查询串）始终是不透明的字节
#[derive(Debug, Clone)]
pub struct RelayExchange {
    pub route: Route,
    pub method: Method,
    /// 原始查询串（不含 `?`），原样拼接到上游 URL
    pub query: Option<String>,
    pub headers: HeaderMap,
    /// 仅 POST 携带
    pub body: Option<Bytes>,
}

impl RelayExchange {
    /// 从入站请求构建交换，POST 时读取完整请求体
    ///
    /// 请求体大小受路由上的 `DefaultBodyLimit` 约束
    pub async fn from_request(route: Route, request: Request) -> Result<Self, AppError> {
        let method = request.method().clone();
        let headers = request.headers().clone();
        let query = request.uri().query().map(str::to_owned);

        let body = match route {
            Route::Post => Some(read_body(request).await?),
            Route::Get | Route::Liveness => None,
        };

        Ok(Self {
            route,
            method,
            query,
            headers,
            body,
        })
    }
}

async fn read_body(request: Request) -> Result<Bytes, AppError> {
    match Bytes::from_request(request, &()).await {
        Ok(body) => Ok(body),
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            Err(AppError::PayloadTooLarge(rejection.body_text()))
        }
        Err(rejection) => Err(AppError::BadRequest(rejection.body_text())),
    }
}
