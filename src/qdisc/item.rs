use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::net::Packet;
use crate::queue::QueueItem;

/// 在 queue disc 树中流转的元素：只包一层 Packet，大小取自 Packet。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueDiscItem {
    packet: Packet,
}

impl QueueDiscItem {
    pub fn new(packet: Packet) -> Self {
        Self { packet }
    }

    pub fn packet(&self) -> &Packet {
        &self.packet
    }

    pub fn into_packet(self) -> Packet {
        self.packet
    }

    /// 优先级标签，未打标签时为 0
    pub fn priority(&self) -> u8 {
        self.packet.priority.unwrap_or(0)
    }

    pub fn len_bytes(&self) -> u64 {
        u64::from(self.packet.size_bytes)
    }
}

impl QueueItem for QueueDiscItem {
    fn size_bytes(&self) -> u32 {
        self.packet.size_bytes
    }
}

impl From<Packet> for QueueDiscItem {
    fn from(packet: Packet) -> Self {
        Self::new(packet)
    }
}

/// 丢包原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// 超过了 queue disc 自己配置的上限
    Overlimit,
    /// 被 queue disc 的内部队列拒绝
    InternalQueueFull,
}

impl DropReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DropReason::Overlimit => "Overlimit",
            DropReason::InternalQueueFull => "InternalQueueFull",
        }
    }
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 入队失败：元素连同原因一起交还给调用方。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("packet {} ({} bytes) dropped: {reason}", .item.packet().id, .item.packet().size_bytes)]
pub struct Dropped {
    pub item: QueueDiscItem,
    pub reason: DropReason,
}

impl Dropped {
    pub fn new(item: QueueDiscItem, reason: DropReason) -> Self {
        Self { item, reason }
    }
}
