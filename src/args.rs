use crate::error::AppError;
use crate::r#const::shutdown_timeout;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

// DoH 中继服务
#[derive(Parser, Debug, Clone)]
#[command(
    name = "dohrelay",
    author,
    version,
    about = "A lightweight DNS-over-HTTPS relay for browsers and strict DoH clients\n\n\
             Key Features:\n\
             - RFC 8484 Relay: DoH POST and GET (?dns=) queries forwarded to one upstream resolver\n\
             - Transparent: DNS payloads are never parsed or modified\n\
             - Header Normalization: application/dns-message responses with CORS enabled\n\
             - Liveness: plain-text response for browser navigation\n\
             - Observability: health check and Prometheus metrics on the admin listener"
)]
pub struct Args {
    // 配置文件路径
    #[arg(short, long, default_value = "./config.yaml")]
    pub config: PathBuf,

    // 测试配置
    #[arg(
        short = 't',
        long = "test",
        action = ArgAction::SetTrue,
        help = "Test configuration file for validity and exit"
    )]
    pub test_config: bool,

    // 启用调试日志
    #[arg(
        short = 'd',
        long = "debug",
        action = ArgAction::SetTrue,
        help = "Enable debug level logging for detailed output"
    )]
    pub debug: bool,

    // 关闭超时
    #[arg(
        long = "shutdown-timeout",
        help = "Maximum time in seconds to wait for complete shutdown",
        default_value_t = shutdown_timeout::DEFAULT
    )]
    pub shutdown_timeout: u64,
}

impl Args {
    // 解析命令行参数
    pub fn parse_args() -> Self {
        Args::parse()
    }

    // 验证参数
    pub fn validation(&self) -> Result<(), AppError> {
        if self.shutdown_timeout < shutdown_timeout::MIN
            || self.shutdown_timeout > shutdown_timeout::MAX
        {
            return Err(AppError::InvalidShutdownTimeout);
        }
        Ok(())
    }
}
