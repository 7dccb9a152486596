// src/relay/mod.rs
//
// DoH (DNS over HTTPS) 中继模块：
// - POST（任意路径）：二进制 DNS 消息，转发到上游
// - GET 带 `dns` 参数：查询串原样拼接后转发到上游
// - 其余请求：返回存活响应

// 子模块定义
pub mod exchange;
pub mod handlers;
pub mod server;
pub mod state;

// 公开导出
pub use exchange::{RelayExchange, Route};
pub use server::{build_router, RelayServer};
