// src/admin.rs

use crate::error::AppError;
use crate::metrics;
use axum::{routing::get, Router};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio_graceful_shutdown::{IntoSubsystem, SubsystemHandle};
use tracing::{error, info};

// 管理路由：健康检查与指标
pub fn admin_routes() -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .merge(metrics::metrics_routes())
}

// 管理服务器，生命周期完全由所属子系统控制
pub struct AdminServer {
    // 监听地址
    listen_addr: SocketAddr,
}

impl AdminServer {
    // 创建新的管理服务器
    pub fn new(listen_addr: SocketAddr) -> Self {
        Self { listen_addr }
    }
}

#[async_trait::async_trait]
impl IntoSubsystem<AppError> for AdminServer {
    async fn run(self, subsys: SubsystemHandle) -> Result<(), AppError> {
        let listener = TcpListener::bind(self.listen_addr).await.map_err(|e| {
            error!("Failed to bind admin server: {}", e);
            AppError::Io(e)
        })?;
        info!("Admin server listening on {}", self.listen_addr);

        axum::serve(listener, admin_routes())
            .with_graceful_shutdown(async move {
                subsys.on_shutdown_requested().await;
                info!("Received subsystem shutdown request, admin server is stopping");
            })
            .await
            .map_err(|e| {
                error!("Admin server error: {}", e);
                AppError::Io(e)
            })?;

        info!("Admin server stopped");
        Ok(())
    }
}

// 健康检查处理程序
async fn health_handler() -> &'static str {
    "OK"
}
