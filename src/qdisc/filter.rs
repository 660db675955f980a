//! 分类过滤器
//!
//! 有类别的 queue disc 按顺序询问过滤器，第一个给出类别下标的过滤器胜出。

use std::collections::HashMap;
use std::fmt;

use super::item::QueueDiscItem;

pub trait PacketFilter: fmt::Debug + Send {
    /// 返回类别下标；不匹配时返回 None，交给下一个过滤器。
    fn classify(&self, item: &QueueDiscItem) -> Option<usize>;
}

/// 按 flow id 查表分类
#[derive(Debug, Clone, Default)]
pub struct FlowFilter {
    classes: HashMap<u64, usize>,
}

impl FlowFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 把 `flow_id` 的包送进 `class`
    pub fn route(mut self, flow_id: u64, class: usize) -> Self {
        self.classes.insert(flow_id, class);
        self
    }
}

impl PacketFilter for FlowFilter {
    fn classify(&self, item: &QueueDiscItem) -> Option<usize> {
        self.classes.get(&item.packet().flow_id).copied()
    }
}
