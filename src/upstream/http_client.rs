use crate::config::HttpClientConfig;
use crate::error::AppError;
use crate::r#const::http_client_limits;
use reqwest::redirect::Policy;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

pub struct HttpClient;

impl HttpClient {
    // 创建HTTP客户端
    //
    // 不挂载重试中间件：上游失败直接返回 502
    pub fn create(config: &HttpClientConfig, proxy: Option<&str>) -> Result<Client, AppError> {
        debug!(
            "Creating HTTP client for upstream, config: {:?}, proxy: {:?}",
            config, proxy
        );

        // 创建客户端构建器
        let mut client_builder = reqwest::ClientBuilder::new()
            .danger_accept_invalid_certs(config.insecure_skip_verify)
            .connect_timeout(Duration::from_secs(config.connect_timeout))
            .timeout(Duration::from_secs(config.request_timeout))
            .redirect(Policy::limited(http_client_limits::MAX_REDIRECTS));

        // 配置TCP keepalive
        if let Some(keepalive) = config.keepalive {
            client_builder = client_builder.tcp_keepalive(Duration::from_secs(keepalive as u64));
        }

        // 配置空闲连接超时
        if let Some(idle_timeout) = config.idle_timeout {
            client_builder = client_builder.pool_idle_timeout(Duration::from_secs(idle_timeout));
        }

        // 配置用户代理
        if let Some(ref agent) = config.agent {
            client_builder = client_builder.user_agent(agent);
        }

        // 配置代理
        if let Some(proxy_url) = proxy {
            client_builder = client_builder.proxy(
                reqwest::Proxy::all(proxy_url)
                    .map_err(|e| AppError::InvalidProxy(format!("{}: {}", proxy_url, e)))?,
            );
        }

        // 创建HTTP客户端
        let client = client_builder.build()?;

        Ok(client)
    }
}
