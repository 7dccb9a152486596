// 应用常量定义

//
// 配置参数限制常量
//

// 应用关闭等待时间限制
pub mod shutdown_timeout {
    // 默认值
    pub const DEFAULT: u64 = 30;
    // 最小值
    pub const MIN: u64 = 1;
    // 最大值
    pub const MAX: u64 = 120;
}

// HTTP客户端配置限制
pub mod http_client_limits {
    // 默认连接超时（秒）
    pub const DEFAULT_CONNECT_TIMEOUT: u64 = 3;
    // 最小连接超时（秒）
    pub const MIN_CONNECT_TIMEOUT: u64 = 1;
    // 最大连接超时（秒）
    pub const MAX_CONNECT_TIMEOUT: u64 = 120;
    // 默认请求超时（秒）
    pub const DEFAULT_REQUEST_TIMEOUT: u64 = 5;
    // 最小请求超时（秒）
    pub const MIN_REQUEST_TIMEOUT: u64 = 1;
    // 最大请求超时（秒）
    pub const MAX_REQUEST_TIMEOUT: u64 = 1200;
    // 默认空闲超时（秒）
    pub const DEFAULT_IDLE_TIMEOUT: u64 = 10;
    // 最小空闲超时（秒）
    pub const MIN_IDLE_TIMEOUT: u64 = 5;
    // 最大空闲超时（秒）
    pub const MAX_IDLE_TIMEOUT: u64 = 1800;
    // 默认keepalive时间（秒）
    pub const DEFAULT_KEEPALIVE: u32 = 30;
    // 最小keepalive时间（秒）
    pub const MIN_KEEPALIVE: u32 = 5;
    // 最大keepalive时间（秒）
    pub const MAX_KEEPALIVE: u32 = 600;
    // 最大重定向次数
    pub const MAX_REDIRECTS: usize = 10;
}

// 请求体大小限制
pub mod body_limits {
    // 默认最大请求体（字节），即 DNS 消息的最大长度
    pub const DEFAULT_MAX_BODY_SIZE: usize = 65535;
    // 最小请求体限制（字节）
    pub const MIN_MAX_BODY_SIZE: usize = 512;
    // 最大请求体限制（字节）- 1MB
    pub const MAX_MAX_BODY_SIZE: usize = 1024 * 1024;
}

//
// 指标标签常量
//

// 请求分类标签
pub mod route_labels {
    // DoH POST 请求
    pub const POST: &str = "post";
    // 带 dns 参数的 DoH GET 请求
    pub const GET: &str = "get";
    // 存活探测
    pub const LIVENESS: &str = "liveness";
}

// 上游错误类型标签
pub mod upstream_error_labels {
    // 请求超时
    pub const TIMEOUT: &str = "timeout";
    // 连接失败
    pub const CONNECT: &str = "connect";
    // 重定向错误
    pub const REDIRECT: &str = "redirect";
    // 响应体读取失败
    pub const BODY: &str = "body";
    // 其他请求错误
    pub const REQUEST: &str = "request";
}

// 子系统名称
pub mod subsystem_names {
    // 中继服务器子系统
    pub const RELAY_SERVER: &str = "relay_server";
    // 管理服务器子系统
    pub const ADMIN_SERVER: &str = "admin_server";
}

// 服务器默认值
pub mod server_defaults {
    // 默认中继监听地址
    pub const DEFAULT_HTTP_LISTEN: &str = "127.0.0.1:8080";
    // 默认管理服务器监听地址
    pub const DEFAULT_ADMIN_LISTEN: &str = "127.0.0.1:9000";
}

// 上游默认值
pub mod upstream_defaults {
    // 默认上游 DoH 服务器
    pub const DEFAULT_DOH_SERVER: &str = "https://1.1.1.1/dns-query";
}

// 中继响应常量
pub mod relay_responses {
    // 存活探测响应体
    pub const LIVENESS_BODY: &str = "DoH Service is Running.";
    // 上游不可用时的响应体
    pub const PROXY_ERROR_BODY: &str = "Proxy Error";
    // 请求体过大时的响应体
    pub const PAYLOAD_TOO_LARGE_BODY: &str = "Payload Too Large";
    // 请求体读取失败时的响应体
    pub const BAD_REQUEST_BODY: &str = "Bad Request";
    // 其他内部错误的响应体
    pub const INTERNAL_ERROR_BODY: &str = "Internal Server Error";
}

// HTTP头常量
pub mod http_headers {
    // DoH 查询参数名
    pub const DNS_QUERY_PARAM: &str = "dns";
    // 跨域允许的来源
    pub const ALLOW_ANY_ORIGIN: &str = "*";

    // 内容类型常量
    pub mod content_types {
        // DNS消息内容类型
        pub const DNS_MESSAGE: &str = "application/dns-message";
        // 纯文本内容类型
        pub const TEXT_PLAIN_UTF8: &str = "text/plain; charset=utf-8";
    }

    // 不转发的连接级头部
    pub const CONNECTION_SCOPED: &[&str] = &[
        "connection",
        "keep-alive",
        "proxy-connection",
        "transfer-encoding",
        "te",
        "trailer",
        "upgrade",
    ];
}
