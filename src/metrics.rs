use axum::http::{header, StatusCode};
use axum::{routing::get, Router};
use once_cell::sync::Lazy;
use prometheus::{opts, HistogramVec, IntCounterVec, Registry};

// 全局静态指标实例
pub static METRICS: Lazy<RelayMetrics> = Lazy::new(RelayMetrics::new);

// DoH 中继指标
pub struct RelayMetrics {
    registry: Registry,

    // 1. 入站请求指标
    requests_total: IntCounterVec,
    request_duration_seconds: HistogramVec,

    // 2. 上游 DoH 解析器指标
    upstream_responses_total: IntCounterVec,
    upstream_errors_total: IntCounterVec,
    upstream_duration_seconds: HistogramVec,
}

impl Default for RelayMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayMetrics {
    // 创建新的指标收集器
    pub fn new() -> Self {
        let registry = Registry::new();

        // 1. 入站请求指标
        let requests_total = IntCounterVec::new(
            opts!(
                "dohrelay_requests_total",
                "Total inbound requests, classified by dispatch route (post, get, liveness)"
            ),
            &["route"],
        )
        .unwrap();

        let request_duration_seconds = HistogramVec::new(
            prometheus::histogram_opts!(
                "dohrelay_request_duration_seconds",
                "Relayed request duration in seconds, classified by dispatch route",
                vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
            ),
            &["route"],
        )
        .unwrap();

        // 2. 上游 DoH 解析器指标
        let upstream_responses_total = IntCounterVec::new(
            opts!(
                "dohrelay_upstream_responses_total",
                "Total responses received from the upstream DoH resolver, classified by HTTP status"
            ),
            &["status"],
        )
        .unwrap();

        let upstream_errors_total = IntCounterVec::new(
            opts!(
                "dohrelay_upstream_errors_total",
                "Total upstream transport failures, classified by failure kind"
            ),
            &["error_type"],
        )
        .unwrap();

        let upstream_duration_seconds = HistogramVec::new(
            prometheus::histogram_opts!(
                "dohrelay_upstream_duration_seconds",
                "Upstream DoH round trip duration in seconds, classified by HTTP method",
                vec![0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
            ),
            &["method"],
        )
        .unwrap();

        let metrics = RelayMetrics {
            registry,
            requests_total,
            request_duration_seconds,
            upstream_responses_total,
            upstream_errors_total,
            upstream_duration_seconds,
        };

        // 注册所有指标
        metrics.register_all_metrics();

        metrics
    }

    // 注册所有指标
    fn register_all_metrics(&self) {
        self.registry
            .register(Box::new(self.requests_total.clone()))
            .unwrap();
        self.registry
            .register(Box::new(self.request_duration_seconds.clone()))
            .unwrap();
        self.registry
            .register(Box::new(self.upstream_responses_total.clone()))
            .unwrap();
        self.registry
            .register(Box::new(self.upstream_errors_total.clone()))
            .unwrap();
        self.registry
            .register(Box::new(self.upstream_duration_seconds.clone()))
            .unwrap();
    }

    // 获取 Prometheus 注册表
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    // 导出所有指标为文本格式
    pub fn export_metrics(&self) -> String {
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = String::new();
        if let Err(e) = encoder.encode_utf8(&metric_families, &mut buffer) {
            tracing::error!("Failed to encode metrics: {}", e);
        }
        buffer
    }

    pub fn requests_total(&self) -> &IntCounterVec {
        &self.requests_total
    }

    pub fn request_duration_seconds(&self) -> &HistogramVec {
        &self.request_duration_seconds
    }

    pub fn upstream_responses_total(&self) -> &IntCounterVec {
        &self.upstream_responses_total
    }

    pub fn upstream_errors_total(&self) -> &IntCounterVec {
        &self.upstream_errors_total
    }

    pub fn upstream_duration_seconds(&self) -> &HistogramVec {
        &self.upstream_duration_seconds
    }
}

// 提供指标导出路由
pub fn metrics_routes() -> Router {
    Router::new().route(
        "/metrics",
        get(|| async {
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
                METRICS.export_metrics(),
            )
        }),
    )
}
