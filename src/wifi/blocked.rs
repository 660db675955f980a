use std::collections::HashSet;

use super::mac_header::Mac48Address;

/// 某个 (receiver, TID) 当前是否必须暂缓发送（例如 Block Ack 协商尚未完成）。
pub trait BlockedDestinations {
    fn is_blocked(&self, addr: Mac48Address, tid: u8) -> bool;
}

/// 由聚合 / Block Ack 组件维护的阻塞集合
#[derive(Debug, Clone, Default)]
pub struct QosBlockedDestinations {
    blocked: HashSet<(Mac48Address, u8)>,
}

impl QosBlockedDestinations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn block(&mut self, addr: Mac48Address, tid: u8) {
        self.blocked.insert((addr, tid));
    }

    pub fn unblock(&mut self, addr: Mac48Address, tid: u8) {
        self.blocked.remove(&(addr, tid));
    }

    pub fn len(&self) -> usize {
        self.blocked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocked.is_empty()
    }
}

impl BlockedDestinations for QosBlockedDestinations {
    fn is_blocked(&self, addr: Mac48Address, tid: u8) -> bool {
        self.blocked.contains(&(addr, tid))
    }
}
