use crate::r#const::upstream_defaults;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{validate_proxy_url, validate_upstream_url};

// 上游 DoH 服务器配置
//
// 中继只有一个固定上游，不做选择与故障转移
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Validate)]
pub struct UpstreamConfig {
    // DoH 服务器基础 URL，GET 请求会在其后追加原始查询串
    #[serde(default = "default_upstream_url")]
    #[validate(custom(function = "validate_upstream_url"))]
    pub url: String,
    // 出站代理（可选）
    #[validate(custom(function = "validate_proxy_url"))]
    pub proxy: Option<String>,
}

fn default_upstream_url() -> String {
    upstream_defaults::DEFAULT_DOH_SERVER.to_string()
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: default_upstream_url(),
            proxy: None,
        }
    }
}
