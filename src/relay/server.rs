// src/relay/server.rs

use crate::error::AppError;
use crate::relay::handlers::dispatch;
use crate::relay::state::RelayState;
use crate::upstream::UpstreamForwarder;
use axum::{extract::DefaultBodyLimit, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_graceful_shutdown::SubsystemHandle;
use tracing::{error, info};

/// 构建中继路由
///
/// 所有路径与方法都进入 `dispatch`，分类完全由方法与查询参数决定
///
/// `max_body_size` 对应配置项 `server.max_body_size`，同时也是 DoH POST 的请求体上限：
/// 超过上限的 POST 直接返回 413，不会转发到上游。默认值 65535 即 DNS 消息的最大长度
pub fn build_router(forwarder: Arc<UpstreamForwarder>, max_body_size: usize) -> Router {
    Router::new()
        .fallback(dispatch)
        .layer(DefaultBodyLimit::max(max_body_size))
        .with_state(RelayState { forwarder })
}

/// DoH 中继服务器
pub struct RelayServer {
    /// 监听地址
    bind_addr: SocketAddr,
    /// POST 请求体上限
    max_body_size: usize,
    /// 上游转发器
    forwarder: Arc<UpstreamForwarder>,
    /// 关闭信号发送端
    shutdown_tx: oneshot::Sender<()>,
    /// 关闭信号接收端
    shutdown_rx: oneshot::Receiver<()>,
}

impl RelayServer {
    /// 创建新的中继服务器
    pub fn new(
        bind_addr: SocketAddr,
        max_body_size: usize,
        forwarder: Arc<UpstreamForwarder>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        Self {
            bind_addr,
            max_body_size,
            forwarder,
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// 启动中继服务器
    pub async fn run(self, subsys: SubsystemHandle) -> Result<(), AppError> {
        let app = build_router(self.forwarder.clone(), self.max_body_size);

        // 创建 TCP 监听器
        let listener = match TcpListener::bind(self.bind_addr).await {
            Ok(listener) => {
                info!(
                    "DoH relay listening on {}, upstream: {}",
                    self.bind_addr,
                    self.forwarder.endpoint()
                );
                listener
            }
            Err(e) => {
                error!("Failed to bind DoH relay: {}", e);
                return Err(AppError::Io(e));
            }
        };

        // 获取关闭信号接收端
        let shutdown_rx = self.shutdown_rx;

        // 启动 HTTP 服务器
        tokio::select! {
            result = axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>()
            )
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                info!("DoH relay received shutdown signal");
            }) => {
                if let Err(e) = result {
                    error!("DoH relay error: {}", e);
                } else {
                    info!("DoH relay completed normally");
                }
                Ok(())
            }
            _ = subsys.on_shutdown_requested() => {
                info!("Shutdown requested, stopping DoH relay");
                let _ = self.shutdown_tx.send(());
                Ok(())
            }
        }
    }
}
