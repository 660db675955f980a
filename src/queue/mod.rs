//! 底层有界队列（leaf buffers）
//!
//! queue disc 的内部队列和网卡（device）发送队列都建立在这里的 `PacketQueue` 之上。
//! 容量既可以按包数也可以按字节数计算。

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

mod drop_tail;

pub use drop_tail::DropTailQueue;

/// 容量计量单位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueSizeUnit {
    Packets,
    Bytes,
}

/// 队列容量（或当前占用）：数值 + 单位。
///
/// 文本形式为 `"<n>p"`（包）或 `"<n>B"`（字节），配置文件里也用这种写法。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueueSize {
    pub unit: QueueSizeUnit,
    pub value: u64,
}

impl QueueSize {
    pub fn packets(value: u64) -> Self {
        Self {
            unit: QueueSizeUnit::Packets,
            value,
        }
    }

    pub fn bytes(value: u64) -> Self {
        Self {
            unit: QueueSizeUnit::Bytes,
            value,
        }
    }

    /// 在当前占用 `(n_packets, n_bytes)` 之上再放入 `item_bytes` 是否会超过该上限。
    pub fn would_exceed(&self, n_packets: u64, n_bytes: u64, item_bytes: u64) -> bool {
        match self.unit {
            QueueSizeUnit::Packets => n_packets.saturating_add(1) > self.value,
            QueueSizeUnit::Bytes => n_bytes.saturating_add(item_bytes) > self.value,
        }
    }
}

impl fmt::Display for QueueSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.unit {
            QueueSizeUnit::Packets => write!(f, "{}p", self.value),
            QueueSizeUnit::Bytes => write!(f, "{}B", self.value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid queue size {0:?}: expected \"<n>p\" or \"<n>B\"")]
pub struct ParseQueueSizeError(pub String);

impl FromStr for QueueSize {
    type Err = ParseQueueSizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let err = || ParseQueueSizeError(s.to_string());
        let (digits, unit) = if let Some(d) = raw.strip_suffix('p') {
            (d, QueueSizeUnit::Packets)
        } else if let Some(d) = raw.strip_suffix('B') {
            (d, QueueSizeUnit::Bytes)
        } else {
            return Err(err());
        };
        let value = digits.trim().parse::<u64>().map_err(|_| err())?;
        Ok(Self { unit, value })
    }
}

impl TryFrom<String> for QueueSize {
    type Error = ParseQueueSizeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<QueueSize> for String {
    fn from(size: QueueSize) -> Self {
        size.to_string()
    }
}

impl serde::Serialize for QueueSize {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for QueueSize {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// 能放进有界队列的东西：只需要知道自己的字节数。
pub trait QueueItem {
    fn size_bytes(&self) -> u32;
}

/// 有界 FIFO 队列抽象
pub trait PacketQueue<T>: fmt::Debug + Send {
    /// 入队：成功返回 Ok；超出容量时拒绝并原样返回 Err(item)
    fn enqueue(&mut self, item: T) -> Result<(), T>;
    /// 出队：返回最早入队的元素
    fn dequeue(&mut self) -> Option<T>;
    fn peek(&self) -> Option<&T>;

    fn len(&self) -> usize;
    fn bytes(&self) -> u64;
    fn max_size(&self) -> QueueSize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
