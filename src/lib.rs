pub mod admin;
pub mod args;
pub mod config;
pub mod r#const;
pub mod error;
pub mod metrics;
pub mod relay;
pub mod upstream;

// 重导出常用组件
pub use admin::AdminServer;
pub use args::Args;
pub use config::Config;
pub use error::{AppError, UpstreamFailure};
pub use metrics::RelayMetrics;
pub use r#const::subsystem_names;
pub use relay::{RelayServer, Route};
pub use upstream::UpstreamForwarder;
