// src/relay/state.rs

use crate::upstream::UpstreamForwarder;
use std::sync::Arc;

/// 中继服务状态
#[derive(Clone)]
pub struct RelayState {
    /// 上游转发器
    pub forwarder: Arc<UpstreamForwarder>,
}
