//! 统计信息
//!
//! 按流统计发送与交付情况。

use std::collections::BTreeMap;

use serde::Serialize;

/// 单条流的统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlowStats {
    pub sent_pkts: u64,
    pub sent_bytes: u64,
    pub delivered_pkts: u64,
    pub delivered_bytes: u64,
    /// 被 queue disc 拒绝的包
    pub dropped_pkts: u64,
}

/// 全部流的统计（按 flow_id 排序）
#[derive(Debug, Clone, Default, Serialize)]
pub struct Stats {
    pub flows: BTreeMap<u64, FlowStats>,
}

impl Stats {
    pub fn flow(&self, flow_id: u64) -> Option<&FlowStats> {
        self.flows.get(&flow_id)
    }

    pub(crate) fn flow_mut(&mut self, flow_id: u64) -> &mut FlowStats {
        self.flows.entry(flow_id).or_default()
    }

    pub fn delivered_pkts(&self) -> u64 {
        self.flows.values().map(|f| f.delivered_pkts).sum()
    }

    pub fn delivered_bytes(&self) -> u64 {
        self.flows.values().map(|f| f.delivered_bytes).sum()
    }
}
