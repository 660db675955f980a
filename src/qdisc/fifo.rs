//! Fifo queue disc
//!
//! 纯叶子节点：恰好一个内部 DropTail 队列，入队/出队直接透传。

use tracing::trace;

use super::core::{QueueDisc, QueueDiscBase};
use super::error::ConfigError;
use super::item::{DropReason, Dropped, QueueDiscItem};
use crate::queue::{DropTailQueue, QueueSize, QueueSizeUnit};

#[derive(Debug)]
pub struct FifoQueueDisc {
    base: QueueDiscBase,
}

impl FifoQueueDisc {
    pub const DEFAULT_MAX_PACKETS: u64 = 1000;
    pub const DEFAULT_MAX_BYTES: u64 = 1000 * 65535;

    /// 默认按包计数，上限 1000 个包
    pub fn new() -> Self {
        Self::with_mode(QueueSizeUnit::Packets)
    }

    /// 指定计量单位，上限取该单位的默认值
    pub fn with_mode(unit: QueueSizeUnit) -> Self {
        let limit = match unit {
            QueueSizeUnit::Packets => QueueSize::packets(Self::DEFAULT_MAX_PACKETS),
            QueueSizeUnit::Bytes => QueueSize::bytes(Self::DEFAULT_MAX_BYTES),
        };
        Self::with_limit(limit)
    }

    pub fn with_limit(limit: QueueSize) -> Self {
        Self {
            base: QueueDiscBase::new(Some(limit)),
        }
    }
}

impl Default for FifoQueueDisc {
    fn default() -> Self {
        Self::new()
    }
}

impl QueueDisc for FifoQueueDisc {
    fn kind(&self) -> &'static str {
        "fifo"
    }

    fn base(&self) -> &QueueDiscBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut QueueDiscBase {
        &mut self.base
    }

    fn do_enqueue(&mut self, item: QueueDiscItem) -> Result<(), Dropped> {
        // 内部队列的拒绝由 QueueDisc::enqueue 统一记账
        self.base
            .internal_queue_mut(0)
            .enqueue(item)
            .map_err(|item| Dropped::new(item, DropReason::InternalQueueFull))
    }

    fn do_dequeue(&mut self) -> Option<QueueDiscItem> {
        self.base.internal_queue_mut(0).dequeue()
    }

    fn do_peek(&self) -> Option<&QueueDiscItem> {
        self.base.internal_queue(0).peek()
    }

    fn check_config(&mut self) -> Result<(), ConfigError> {
        let kind = self.kind();
        if self.base.n_classes() > 0 {
            return Err(ConfigError::ClassesNotAllowed { kind });
        }
        if self.base.n_filters() > 0 {
            return Err(ConfigError::FiltersNotAllowed { kind });
        }
        let Some(limit) = self.base.max_size() else {
            return Err(ConfigError::MissingLimit { kind });
        };

        if self.base.n_internal_queues() == 0 {
            trace!(%limit, "创建默认 DropTail 内部队列");
            self.base
                .add_internal_queue(Box::new(DropTailQueue::<QueueDiscItem>::new(limit)));
        }

        let found = self.base.n_internal_queues();
        if found != 1 {
            return Err(ConfigError::InternalQueueCount {
                kind,
                expected: 1,
                found,
            });
        }

        let queue = self.base.internal_queue(0).max_size();
        if queue != limit {
            return Err(ConfigError::LimitMismatch {
                index: 0,
                queue,
                qdisc: limit,
            });
        }
        Ok(())
    }
}
