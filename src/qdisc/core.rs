//! queue disc 树的公共部分
//!
//! `QueueDiscBase` 负责所有 queue disc 共有的东西：容量上限、占用计数、统计、
//! 内部队列 / 子 queue disc / 过滤器的存放、requeue 槽位和回调。
//! 具体策略（分类、出队顺序）由实现 `QueueDisc` 的类型通过 `do_*` 钩子提供。

use std::collections::VecDeque;
use std::fmt;

use tracing::{debug, trace, warn};

use super::error::ConfigError;
use super::filter::PacketFilter;
use super::item::{DropReason, Dropped, QueueDiscItem};
use super::stats::QueueDiscStats;
use crate::queue::{PacketQueue, QueueSize, QueueSizeUnit};

/// 丢包回调：每次拒绝恰好触发一次
pub type DropCallback = Box<dyn FnMut(&QueueDiscItem, DropReason) + Send>;
/// 队列包数变化回调：`(old, new)`
pub type PacketsInQueueCallback = Box<dyn FnMut(u64, u64) + Send>;

pub type InternalQueue = Box<dyn PacketQueue<QueueDiscItem>>;

/// 生命周期：`Unconfigured → Validated → InService`，校验失败进入 `Failed`（终态）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueDiscState {
    Unconfigured,
    Validated,
    InService,
    Failed,
}

pub struct QueueDiscBase {
    max_size: Option<QueueSize>,
    n_packets: u64,
    n_bytes: u64,
    stats: QueueDiscStats,
    state: QueueDiscState,
    internal_queues: Vec<InternalQueue>,
    classes: Vec<Box<dyn QueueDisc>>,
    filters: Vec<Box<dyn PacketFilter>>,
    requeued: VecDeque<QueueDiscItem>,
    drop_callback: Option<DropCallback>,
    packets_in_queue_callback: Option<PacketsInQueueCallback>,
}

impl fmt::Debug for QueueDiscBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueDiscBase")
            .field("max_size", &self.max_size)
            .field("n_packets", &self.n_packets)
            .field("n_bytes", &self.n_bytes)
            .field("state", &self.state)
            .field("internal_queues", &self.internal_queues)
            .field("classes", &self.classes)
            .field("filters", &self.filters)
            .field("requeued", &self.requeued.len())
            .finish_non_exhaustive()
    }
}

impl QueueDiscBase {
    /// `max_size == None` 表示本节点不设上限（由子节点各自限制）。
    pub fn new(max_size: Option<QueueSize>) -> Self {
        Self {
            max_size,
            n_packets: 0,
            n_bytes: 0,
            stats: QueueDiscStats::default(),
            state: QueueDiscState::Unconfigured,
            internal_queues: Vec::new(),
            classes: Vec::new(),
            filters: Vec::new(),
            requeued: VecDeque::new(),
            drop_callback: None,
            packets_in_queue_callback: None,
        }
    }

    pub fn state(&self) -> QueueDiscState {
        self.state
    }

    pub fn max_size(&self) -> Option<QueueSize> {
        self.max_size
    }

    pub fn set_max_size(&mut self, size: QueueSize) {
        self.assert_configurable("set_max_size");
        self.max_size = Some(size);
    }

    /// 当前占用，单位跟随上限的单位（无上限时按包数）
    pub fn current_size(&self) -> QueueSize {
        match self.max_size {
            Some(limit) if limit.unit == QueueSizeUnit::Bytes => QueueSize::bytes(self.n_bytes),
            _ => QueueSize::packets(self.n_packets),
        }
    }

    pub fn n_packets(&self) -> u64 {
        self.n_packets
    }

    pub fn n_bytes(&self) -> u64 {
        self.n_bytes
    }

    pub fn stats(&self) -> &QueueDiscStats {
        &self.stats
    }

    /// requeue 槽位里等待重发的元素数
    pub fn n_requeued(&self) -> usize {
        self.requeued.len()
    }

    pub fn add_internal_queue(&mut self, queue: InternalQueue) {
        self.assert_configurable("add_internal_queue");
        self.internal_queues.push(queue);
    }

    pub fn n_internal_queues(&self) -> usize {
        self.internal_queues.len()
    }

    /// 第 `i` 个内部队列。
    ///
    /// # Panics
    ///
    /// `i >= n_internal_queues()` 时 panic。
    pub fn internal_queue(&self, i: usize) -> &dyn PacketQueue<QueueDiscItem> {
        self.internal_queues[i].as_ref()
    }

    /// 同 [`internal_queue`](Self::internal_queue)，越界时 panic。
    pub fn internal_queue_mut(&mut self, i: usize) -> &mut dyn PacketQueue<QueueDiscItem> {
        self.internal_queues[i].as_mut()
    }

    /// 添加一个子 queue disc，类别下标就是它在列表中的位置。
    pub fn add_class(&mut self, child: Box<dyn QueueDisc>) -> usize {
        self.assert_configurable("add_class");
        self.classes.push(child);
        self.classes.len() - 1
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    /// 类别下标为 `i` 的子 queue disc。
    ///
    /// # Panics
    ///
    /// `i >= n_classes()` 时 panic。
    pub fn class(&self, i: usize) -> &dyn QueueDisc {
        self.classes[i].as_ref()
    }

    /// 同 [`class`](Self::class)，越界时 panic。
    pub fn class_mut(&mut self, i: usize) -> &mut dyn QueueDisc {
        self.classes[i].as_mut()
    }

    /// 子 queue disc，按类别下标排列
    pub fn classes(&self) -> &[Box<dyn QueueDisc>] {
        &self.classes
    }

    pub fn classes_mut(&mut self) -> &mut [Box<dyn QueueDisc>] {
        &mut self.classes
    }

    pub fn add_filter(&mut self, filter: Box<dyn PacketFilter>) {
        self.assert_configurable("add_filter");
        self.filters.push(filter);
    }

    pub fn n_filters(&self) -> usize {
        self.filters.len()
    }

    /// 依次询问过滤器，返回第一个匹配的类别下标
    pub fn classify(&self, item: &QueueDiscItem) -> Option<usize> {
        self.filters.iter().find_map(|f| f.classify(item))
    }

    pub fn set_drop_callback(&mut self, cb: DropCallback) {
        self.drop_callback = Some(cb);
    }

    pub fn set_packets_in_queue_callback(&mut self, cb: PacketsInQueueCallback) {
        self.packets_in_queue_callback = Some(cb);
    }

    /// 内部队列的上限不能比本节点的上限小
    pub fn check_internal_queue_limits(&self) -> Result<(), ConfigError> {
        let Some(limit) = self.max_size else {
            return Ok(());
        };
        for (index, q) in self.internal_queues.iter().enumerate() {
            let queue = q.max_size();
            if queue.unit == limit.unit && queue.value < limit.value {
                return Err(ConfigError::InternalQueueTooSmall {
                    index,
                    queue,
                    qdisc: limit,
                });
            }
        }
        Ok(())
    }

    fn assert_configurable(&self, op: &str) {
        assert!(
            self.state == QueueDiscState::Unconfigured,
            "{op} is only allowed before the queue disc is initialized (state {:?})",
            self.state
        );
    }

    fn begin_service(&mut self, kind: &'static str) {
        match self.state {
            QueueDiscState::InService => {}
            QueueDiscState::Validated => self.state = QueueDiscState::InService,
            state => panic!("{kind} queue disc used before a successful initialize() (state {state:?})"),
        }
    }

    fn would_exceed_limit(&self, bytes: u64) -> bool {
        self.max_size
            .is_some_and(|limit| limit.would_exceed(self.n_packets, self.n_bytes, bytes))
    }

    fn initialize_classes(&mut self) -> Result<(), ConfigError> {
        for (index, child) in self.classes.iter_mut().enumerate() {
            if matches!(
                child.base().state(),
                QueueDiscState::Unconfigured | QueueDiscState::Failed
            ) {
                child.initialize().map_err(|source| ConfigError::Class {
                    index,
                    source: Box::new(source),
                })?;
            }
        }
        Ok(())
    }

    fn set_packets(&mut self, new: u64) {
        let old = self.n_packets;
        self.n_packets = new;
        if let Some(cb) = self.packets_in_queue_callback.as_mut() {
            cb(old, new);
        }
    }

    fn on_enqueued(&mut self, bytes: u64) {
        self.n_bytes += bytes;
        self.stats.record_enqueued(bytes);
        self.set_packets(self.n_packets + 1);
    }

    fn on_dequeued(&mut self, bytes: u64) {
        self.n_bytes = self.n_bytes.saturating_sub(bytes);
        self.stats.record_dequeued(bytes);
        self.set_packets(self.n_packets.saturating_sub(1));
    }

    fn on_requeued(&mut self, bytes: u64) {
        self.n_bytes += bytes;
        self.stats.record_requeued(bytes);
        self.set_packets(self.n_packets + 1);
    }

    fn record_drop(&mut self, dropped: &Dropped) {
        self.stats.record_drop(dropped.item.len_bytes(), dropped.reason);
        if let Some(cb) = self.drop_callback.as_mut() {
            cb(&dropped.item, dropped.reason);
        }
    }
}

/// queue disc 的统一接口。
///
/// 实现者只提供策略钩子（`do_enqueue` / `do_dequeue` / `do_peek` / `check_config`），
/// 计数、上限检查、requeue 和状态机由默认方法统一处理。
pub trait QueueDisc: fmt::Debug + Send {
    fn kind(&self) -> &'static str;

    fn base(&self) -> &QueueDiscBase;

    fn base_mut(&mut self) -> &mut QueueDiscBase;

    /// 把元素放进内部队列或子 queue disc；拒绝时原样交还。
    fn do_enqueue(&mut self, item: QueueDiscItem) -> Result<(), Dropped>;

    fn do_dequeue(&mut self) -> Option<QueueDiscItem>;

    fn do_peek(&self) -> Option<&QueueDiscItem>;

    /// 校验存储配置；调用方没有提供内部队列 / 子类别时在这里补上默认值。
    fn check_config(&mut self) -> Result<(), ConfigError>;

    /// 校验通过后、第一次入队前执行一次。
    fn initialize_params(&mut self) {}

    /// 校验配置（包括子 queue disc），成功后进入可用状态。
    fn initialize(&mut self) -> Result<(), ConfigError> {
        let kind = self.kind();
        match self.base().state() {
            QueueDiscState::Unconfigured => {}
            QueueDiscState::Failed => return Err(ConfigError::Failed { kind }),
            QueueDiscState::Validated | QueueDiscState::InService => {
                return Err(ConfigError::AlreadyInitialized { kind });
            }
        }

        let checked = self
            .check_config()
            .and_then(|()| self.base().check_internal_queue_limits())
            .and_then(|()| self.base_mut().initialize_classes());
        if let Err(err) = checked {
            warn!(kind, %err, "queue disc 配置校验失败");
            self.base_mut().state = QueueDiscState::Failed;
            return Err(err);
        }

        self.initialize_params();
        self.base_mut().state = QueueDiscState::Validated;
        debug!(
            kind,
            internal_queues = self.base().n_internal_queues(),
            classes = self.base().n_classes(),
            "queue disc 已就绪"
        );
        Ok(())
    }

    /// 入队。超过本节点上限时以 `Overlimit` 拒绝；子节点的拒绝原样向上传递，
    /// 路径上每个节点各记一次丢包。
    fn enqueue(&mut self, item: QueueDiscItem) -> Result<(), Dropped> {
        let kind = self.kind();
        self.base_mut().begin_service(kind);
        let bytes = item.len_bytes();
        self.base_mut().stats.record_received(bytes);

        let result = if self.base().would_exceed_limit(bytes) {
            Err(Dropped::new(item, DropReason::Overlimit))
        } else {
            self.do_enqueue(item)
        };

        match result {
            Ok(()) => {
                self.base_mut().on_enqueued(bytes);
                trace!(kind, bytes, n_packets = self.base().n_packets(), "入队");
                Ok(())
            }
            Err(dropped) => {
                debug!(
                    kind,
                    pkt_id = dropped.item.packet().id,
                    reason = %dropped.reason,
                    "丢包"
                );
                self.base_mut().record_drop(&dropped);
                Err(dropped)
            }
        }
    }

    /// 出队。之前 requeue 回来的元素优先。
    fn dequeue(&mut self) -> Option<QueueDiscItem> {
        let kind = self.kind();
        self.base_mut().begin_service(kind);
        let item = match self.base_mut().requeued.pop_front() {
            Some(item) => item,
            None => self.do_dequeue()?,
        };
        self.base_mut().on_dequeued(item.len_bytes());
        trace!(kind, pkt_id = item.packet().id, n_packets = self.base().n_packets(), "出队");
        Some(item)
    }

    /// 与 `dequeue` 选择相同的元素，但不取出。
    fn peek(&self) -> Option<&QueueDiscItem> {
        let base = self.base();
        assert!(
            matches!(
                base.state(),
                QueueDiscState::Validated | QueueDiscState::InService
            ),
            "{} queue disc peeked before a successful initialize()",
            self.kind()
        );
        base.requeued.front().or_else(|| self.do_peek())
    }

    /// 把刚出队、但下游没能发出去的元素放回队首。不重新分类，也不做上限检查。
    fn requeue(&mut self, item: QueueDiscItem) {
        let kind = self.kind();
        self.base_mut().begin_service(kind);
        let bytes = item.len_bytes();
        trace!(kind, pkt_id = item.packet().id, "requeue");
        self.base_mut().requeued.push_front(item);
        self.base_mut().on_requeued(bytes);
    }

    fn n_packets(&self) -> u64 {
        self.base().n_packets()
    }

    fn n_bytes(&self) -> u64 {
        self.base().n_bytes()
    }

    fn is_empty(&self) -> bool {
        self.base().n_packets() == 0
    }

    fn stats(&self) -> &QueueDiscStats {
        self.base().stats()
    }
}
