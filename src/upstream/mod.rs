// 声明子模块
mod forwarder;
pub mod headers;
mod http_client;

// 重导出公共API
pub use forwarder::{UpstreamForwarder, UpstreamReply};
pub use http_client::HttpClient;
