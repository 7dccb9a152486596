// src/relay/handlers.rs

use crate::error::AppError;
use crate::metrics::METRICS;
use crate::r#const::{http_headers::content_types, relay_responses};
use crate::relay::exchange::{RelayExchange, Route};
use crate::relay::state::RelayState;
use crate::upstream::UpstreamReply;
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use std::time::Instant;
use tracing::debug;

/// 中继入口，挂在路由的 fallback 上，匹配任意路径与方法
///
/// 先分类，再转发或直接返回存活响应；客户端只会收到上游响应、存活文本或固定错误
pub async fn dispatch(State(state): State<RelayState>, request: Request) -> Response {
    let route = Route::classify(request.method(), request.uri().query());

    METRICS
        .requests_total()
        .with_label_values(&[route.label()])
        .inc();

    debug!(
        "Dispatching {} {} as {}",
        request.method(),
        request.uri().path(),
        route.label()
    );

    match route {
        Route::Liveness => liveness(),
        Route::Post | Route::Get => {
            // 记录请求开始时间
            let start_time = Instant::now();
            let response = match relay(&state, route, request).await {
                Ok(reply) => reply.into_response(),
                Err(e) => e.into_response(),
            };

            // 失败的请求同样计入耗时
            let duration = start_time.elapsed();
            METRICS
                .request_duration_seconds()
                .with_label_values(&[route.label()])
                .observe(duration.as_secs_f64());

            debug!(
                "DoH {} request finished with {} in {:?}",
                route.label(),
                response.status(),
                duration
            );

            response
        }
    }
}

/// 存活响应，不访问上游
pub fn liveness() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, content_types::TEXT_PLAIN_UTF8)],
        relay_responses::LIVENESS_BODY,
    )
        .into_response()
}

async fn relay(
    state: &RelayState,
    route: Route,
    request: Request,
) -> Result<UpstreamReply, AppError> {
    let exchange = RelayExchange::from_request(route, request).await?;
    state.forwarder.forward(exchange).await
}
