use crate::config::{HttpClientConfig, UpstreamConfig};
use crate::error::{AppError, ConfigError, UpstreamFailure};
use crate::metrics::METRICS;
use crate::relay::exchange::{RelayExchange, Route};
use crate::upstream::headers::{client_response_headers, upstream_request_headers};
use crate::upstream::http_client::HttpClient;
use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use hyper::ext::ReasonPhrase;
use reqwest::{Client, RequestBuilder};
use std::convert::Infallible;
use std::time::Instant;
use tracing::{debug, error, info};
use url::Url;

/// 上游响应，头部已按客户端规则改写
#[derive(Debug)]
pub struct UpstreamReply {
    pub status: StatusCode,
    /// 上游返回的非标准原因短语（仅 HTTP/1）
    pub reason: Option<ReasonPhrase>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl IntoResponse for UpstreamReply {
    fn into_response(self) -> Response {
        // 以流的形式返回响应体，服务端不会再补回 Content-Length
        let chunks = futures_util::stream::iter([Ok::<_, Infallible>(self.body)]);
        let mut response = Response::new(Body::from_stream(chunks));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        if let Some(reason) = self.reason {
            response.extensions_mut().insert(reason);
        }
        response
    }
}

/// 上游转发器
///
/// 持有固定的上游地址与可复用的 HTTP 客户端，请求之间不共享其他状态
#[derive(Debug)]
pub struct UpstreamForwarder {
    // 复用连接池的HTTP客户端
    client: Client,
    // 上游 DoH 基础地址
    endpoint: String,
}

impl UpstreamForwarder {
    /// 创建新的上游转发器
    pub fn new(
        upstream: &UpstreamConfig,
        http_config: &HttpClientConfig,
    ) -> Result<Self, AppError> {
        Url::parse(&upstream.url).map_err(|e| {
            ConfigError::InvalidUpstreamUrl(format!("{}: {}", upstream.url, e))
        })?;

        let client = HttpClient::create(http_config, upstream.proxy.as_deref())?;

        info!("Upstream forwarder initialized, endpoint: {}", upstream.url);

        Ok(Self {
            client,
            endpoint: upstream.url.clone(),
        })
    }

    /// 上游基础地址
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// 计算本次交换的上游地址
    ///
    /// GET 在基础地址后原样拼接查询串，POST 直接使用基础地址
    pub fn target_url(&self, exchange: &RelayExchange) -> String {
        match (exchange.route, exchange.query.as_deref()) {
            (Route::Get, Some(query)) => format!("{}?{}", self.endpoint, query),
            _ => self.endpoint.clone(),
        }
    }

    /// 转发一次中继交换
    ///
    /// 不重试；任何传输失败统一为 `AppError::UpstreamUnavailable`
    pub async fn forward(&self, exchange: RelayExchange) -> Result<UpstreamReply, AppError> {
        let url = self.target_url(&exchange);
        let headers = upstream_request_headers(&exchange.headers, &exchange.method);
        let method_label = exchange.method.as_str().to_owned();

        let mut request = self
            .client
            .request(exchange.method, url)
            .headers(headers);
        if let Some(body) = exchange.body {
            request = request.body(body);
        }

        // 记录开始时间
        let start_time = Instant::now();

        match Self::round_trip(request).await {
            Ok(reply) => {
                let duration = start_time.elapsed();
                METRICS
                    .upstream_duration_seconds()
                    .with_label_values(&[method_label.as_str()])
                    .observe(duration.as_secs_f64());
                METRICS
                    .upstream_responses_total()
                    .with_label_values(&[reply.status.as_str()])
                    .inc();

                debug!(
                    "Upstream {} returned {} in {:?}",
                    method_label, reply.status, duration
                );
                Ok(reply)
            }
            Err(failure) => {
                error!(
                    "Upstream request failed ({}): {} - {}",
                    failure.label(),
                    self.endpoint,
                    failure
                );

                METRICS
                    .upstream_errors_total()
                    .with_label_values(&[failure.label()])
                    .inc();

                Err(AppError::UpstreamUnavailable(failure))
            }
        }
    }

    // 发送请求并读取完整响应体，响应体传输失败同样视为上游失败
    async fn round_trip(request: RequestBuilder) -> Result<UpstreamReply, UpstreamFailure> {
        let response = request.send().await.map_err(UpstreamFailure::from_reqwest)?;

        let status = response.status();
        let reason = response.extensions().get::<ReasonPhrase>().cloned();
        let headers = client_response_headers(response.headers());
        let body = response.bytes().await.map_err(UpstreamFailure::from_reqwest)?;

        Ok(UpstreamReply {
            status,
            reason,
            headers,
            body,
        })
    }
}
