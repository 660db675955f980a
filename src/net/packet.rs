//! 数据包类型
//!
//! 对队列来说数据包是不透明的：只关心字节数和可选的优先级标签。

use crate::queue::QueueItem;

/// 网络数据包
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub id: u64,
    pub flow_id: u64,
    pub size_bytes: u32,
    /// socket priority 标签（0..=15 有效；更高位会被 queue disc 屏蔽掉）
    pub priority: Option<u8>,
}

impl Packet {
    /// 创建一个不带优先级标签的数据包
    pub fn new(id: u64, flow_id: u64, size_bytes: u32) -> Self {
        Self {
            id,
            flow_id,
            size_bytes,
            priority: None,
        }
    }

    /// 附加优先级标签
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = Some(priority);
        self
    }
}

impl QueueItem for Packet {
    fn size_bytes(&self) -> u32 {
        self.size_bytes
    }
}
