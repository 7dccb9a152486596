// src/upstream/headers.rs
//
// 请求/响应头部改写规则。入站头部只读，每一步都构建新的 HeaderMap。

use crate::r#const::http_headers::{self, content_types};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method};

/// 判断头部是否属于连接级头部
///
/// 连接管理与消息分帧由 HTTP 客户端/服务器各自负责，这类头部不跨跳转发
pub fn is_connection_scoped(name: &HeaderName) -> bool {
    http_headers::CONNECTION_SCOPED
        .iter()
        .any(|scoped| name.as_str() == *scoped)
}

/// 根据入站头部构建发往上游的请求头
///
/// - 去掉 `Host`，上游只接受它自己的主机名
/// - 强制 `Accept: application/dns-message`
/// - POST 额外强制 `Content-Type: application/dns-message`
/// - `Content-Length` 由 HTTP 客户端按实际请求体重新计算
pub fn upstream_request_headers(inbound: &HeaderMap, method: &Method) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(inbound.len() + 2);

    for (name, value) in inbound.iter() {
        if name == header::HOST || name == header::CONTENT_LENGTH || is_connection_scoped(name) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }

    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static(content_types::DNS_MESSAGE),
    );

    if method == Method::POST {
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(content_types::DNS_MESSAGE),
        );
    }

    headers
}

/// 根据上游响应头构建返回给客户端的响应头
///
/// - 强制 `Content-Type: application/dns-message`，部分客户端对细微差异也会拒绝
/// - 去掉 `Content-Length`，避免改写后长度不一致导致截断
/// - 设置 `Access-Control-Allow-Origin: *`
pub fn client_response_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(upstream.len() + 1);

    for (name, value) in upstream.iter() {
        if name == header::CONTENT_LENGTH || is_connection_scoped(name) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }

    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(content_types::DNS_MESSAGE),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static(http_headers::ALLOW_ANY_ORIGIN),
    );

    headers
}
