//! 带生存期的 MAC 发送队列
//!
//! 每个帧入队时打上当前仿真时间。帧在队列里停留达到 `max_delay` 就过期，
//! 过期帧只在访问队列时被清理（没有定时器）：每次 push / pop / peek / 查找前，
//! 从队首开始连续丢弃过期帧，直到遇到一个未过期的帧。按条件查找时，扫描途中
//! 遇到的过期帧也会被丢弃。
//!
//! 队列满时按 `DropPolicy` 处理：`DropNewest` 拒绝新帧，`DropOldest` 挤掉队首。
//!
//! 通用的 `enqueue` / `dequeue` / `peek` 被禁用，调用会直接 panic；
//! 请使用 `push_back` / `pop_front` / `peek_front` 等具名操作。

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::blocked::BlockedDestinations;
use super::mac_header::{AddressType, Mac48Address, WifiMacHeader};
use crate::net::Packet;
use crate::queue::{PacketQueue, QueueItem, QueueSize};
use crate::sim::SimTime;

/// 队列中的一帧：数据包 + MAC 帧头 + 入队时间
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiMacQueueItem {
    packet: Packet,
    header: WifiMacHeader,
    tstamp: SimTime,
}

impl WifiMacQueueItem {
    pub fn new(packet: Packet, header: WifiMacHeader) -> Self {
        Self {
            packet,
            header,
            tstamp: SimTime::ZERO,
        }
    }

    pub fn packet(&self) -> &Packet {
        &self.packet
    }

    pub fn header(&self) -> &WifiMacHeader {
        &self.header
    }

    pub fn address(&self, ty: AddressType) -> Mac48Address {
        self.header.address(ty)
    }

    /// 入队时间（由队列在 push 时写入）
    pub fn timestamp(&self) -> SimTime {
        self.tstamp
    }

    pub fn into_parts(self) -> (Packet, WifiMacHeader) {
        (self.packet, self.header)
    }

    fn matches_tid_and_address(&self, tid: u8, ty: AddressType, addr: Mac48Address) -> bool {
        self.header.qos_tid == Some(tid) && self.header.address(ty) == addr
    }
}

impl QueueItem for WifiMacQueueItem {
    fn size_bytes(&self) -> u32 {
        self.packet.size_bytes
    }
}

/// 队列已满时的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropPolicy {
    /// 丢弃队首（最老的）帧，接纳新帧
    DropOldest,
    /// 拒绝新帧，队列内容不变
    #[default]
    DropNewest,
}

/// MAC 队列丢帧原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MacDropReason {
    /// 超过生存期
    Expired,
    /// 队列满（被拒绝的新帧，或被挤掉的队首帧）
    Overflow,
    /// flush 时清空
    Flushed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MacQueueStats {
    pub n_total_received_packets: u64,
    pub n_total_dequeued_packets: u64,
    pub n_total_removed_packets: u64,
    pub n_total_dropped_packets: u64,
    pub n_total_dropped_bytes: u64,
    pub dropped_packets_by_reason: BTreeMap<MacDropReason, u64>,
}

impl MacQueueStats {
    pub fn dropped_packets(&self, reason: MacDropReason) -> u64 {
        self.dropped_packets_by_reason
            .get(&reason)
            .copied()
            .unwrap_or(0)
    }

    fn record_drop(&mut self, bytes: u64, reason: MacDropReason) {
        self.n_total_dropped_packets += 1;
        self.n_total_dropped_bytes += bytes;
        *self.dropped_packets_by_reason.entry(reason).or_insert(0) += 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum End {
    Front,
    Back,
}

#[derive(Debug)]
pub struct WifiMacQueue {
    queue: VecDeque<WifiMacQueueItem>,
    n_bytes: u64,
    max_size: QueueSize,
    max_delay: SimTime,
    drop_policy: DropPolicy,
    stats: MacQueueStats,
}

impl WifiMacQueue {
    pub const DEFAULT_MAX_PACKETS: u64 = 500;
    pub const DEFAULT_MAX_DELAY_MS: u64 = 500;

    /// 默认：500 帧、生存期 500 ms、`DropNewest`
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            n_bytes: 0,
            max_size: QueueSize::packets(Self::DEFAULT_MAX_PACKETS),
            max_delay: SimTime::from_millis(Self::DEFAULT_MAX_DELAY_MS),
            drop_policy: DropPolicy::default(),
            stats: MacQueueStats::default(),
        }
    }

    pub fn with_max_size(mut self, max_size: QueueSize) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn with_max_delay(mut self, max_delay: SimTime) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn with_drop_policy(mut self, policy: DropPolicy) -> Self {
        self.drop_policy = policy;
        self
    }

    pub fn max_size(&self) -> QueueSize {
        self.max_size
    }

    pub fn set_max_size(&mut self, max_size: QueueSize) {
        self.max_size = max_size;
    }

    pub fn max_delay(&self) -> SimTime {
        self.max_delay
    }

    pub fn set_max_delay(&mut self, max_delay: SimTime) {
        self.max_delay = max_delay;
    }

    pub fn drop_policy(&self) -> DropPolicy {
        self.drop_policy
    }

    pub fn set_drop_policy(&mut self, policy: DropPolicy) {
        self.drop_policy = policy;
    }

    /// 当前帧数（可能包含尚未被清理的过期帧）
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn n_bytes(&self) -> u64 {
        self.n_bytes
    }

    pub fn stats(&self) -> &MacQueueStats {
        &self.stats
    }

    /// 在队尾插入；被拒绝时原样返回
    pub fn push_back(
        &mut self,
        item: WifiMacQueueItem,
        now: SimTime,
    ) -> Result<(), WifiMacQueueItem> {
        self.insert(item, now, End::Back)
    }

    /// 在队首插入（例如重传的帧）；被拒绝时原样返回
    pub fn push_front(
        &mut self,
        item: WifiMacQueueItem,
        now: SimTime,
    ) -> Result<(), WifiMacQueueItem> {
        self.insert(item, now, End::Front)
    }

    pub fn pop_front(&mut self, now: SimTime) -> Option<WifiMacQueueItem> {
        self.cleanup(now);
        self.take(0)
    }

    pub fn peek_front(&mut self, now: SimTime) -> Option<&WifiMacQueueItem> {
        self.cleanup(now);
        self.queue.front()
    }

    /// 取出第一个 TID 为 `tid`、且 `ty` 角色地址为 `addr` 的 QoS Data 帧
    pub fn dequeue_by_tid_and_address(
        &mut self,
        tid: u8,
        ty: AddressType,
        addr: Mac48Address,
        now: SimTime,
    ) -> Option<WifiMacQueueItem> {
        let idx = self.find(now, |it| it.matches_tid_and_address(tid, ty, addr))?;
        self.take(idx)
    }

    pub fn peek_by_tid_and_address(
        &mut self,
        tid: u8,
        ty: AddressType,
        addr: Mac48Address,
        now: SimTime,
    ) -> Option<&WifiMacQueueItem> {
        let idx = self.find(now, |it| it.matches_tid_and_address(tid, ty, addr))?;
        self.queue.get(idx)
    }

    /// 取出第一个可以发送的帧：非 QoS 帧，或 (addr1, TID) 不在阻塞集合中的 QoS 帧
    pub fn dequeue_first_available(
        &mut self,
        blocked: &dyn BlockedDestinations,
        now: SimTime,
    ) -> Option<WifiMacQueueItem> {
        let idx = self.find(now, |it| is_available(it, blocked))?;
        self.take(idx)
    }

    pub fn peek_first_available(
        &mut self,
        blocked: &dyn BlockedDestinations,
        now: SimTime,
    ) -> Option<&WifiMacQueueItem> {
        let idx = self.find(now, |it| is_available(it, blocked))?;
        self.queue.get(idx)
    }

    /// 匹配的未过期 QoS Data 帧数
    pub fn count_by_tid_and_address(
        &mut self,
        tid: u8,
        ty: AddressType,
        addr: Mac48Address,
        now: SimTime,
    ) -> usize {
        self.cleanup(now);
        let max_delay = self.max_delay;
        self.queue
            .iter()
            .filter(|it| !is_expired(it, max_delay, now))
            .filter(|it| it.matches_tid_and_address(tid, ty, addr))
            .count()
    }

    /// 移除第一个与 `item` 完全相同的帧
    pub fn remove(&mut self, item: &WifiMacQueueItem) -> bool {
        match self.queue.iter().position(|it| it == item) {
            Some(idx) => {
                self.remove_at(idx);
                self.stats.n_total_removed_packets += 1;
                true
            }
            None => false,
        }
    }

    /// 移除第一个携带 `packet` 的帧
    pub fn remove_packet(&mut self, packet: &Packet) -> bool {
        match self.queue.iter().position(|it| it.packet == *packet) {
            Some(idx) => {
                self.remove_at(idx);
                self.stats.n_total_removed_packets += 1;
                true
            }
            None => false,
        }
    }

    /// 丢弃全部帧，返回丢弃的数量
    pub fn flush(&mut self) -> usize {
        let n = self.queue.len();
        while let Some(item) = self.queue.pop_front() {
            let bytes = u64::from(item.size_bytes());
            self.n_bytes = self.n_bytes.saturating_sub(bytes);
            self.stats.record_drop(bytes, MacDropReason::Flushed);
        }
        if n > 0 {
            debug!(flushed = n, "MAC 队列已清空");
        }
        n
    }

    fn insert(
        &mut self,
        mut item: WifiMacQueueItem,
        now: SimTime,
        end: End,
    ) -> Result<(), WifiMacQueueItem> {
        self.cleanup(now);
        item.tstamp = now;
        self.stats.n_total_received_packets += 1;
        let bytes = u64::from(item.size_bytes());

        if self.would_overflow(bytes) {
            match self.drop_policy {
                DropPolicy::DropNewest => {
                    debug!(pkt_id = item.packet.id, len = self.queue.len(), "队列已满，拒绝新帧");
                    self.stats.record_drop(bytes, MacDropReason::Overflow);
                    return Err(item);
                }
                DropPolicy::DropOldest => {
                    while self.would_overflow(bytes) {
                        let Some(old) = self.remove_at(0) else {
                            break;
                        };
                        debug!(pkt_id = old.packet.id, "队列已满，丢弃队首帧");
                        self.stats
                            .record_drop(u64::from(old.size_bytes()), MacDropReason::Overflow);
                    }
                    // 单个帧就超过字节上限时，清空队列也放不下
                    if self.would_overflow(bytes) {
                        self.stats.record_drop(bytes, MacDropReason::Overflow);
                        return Err(item);
                    }
                }
            }
        }

        trace!(pkt_id = item.packet.id, ?end, now = ?now, "MAC 帧入队");
        self.n_bytes += bytes;
        match end {
            End::Back => self.queue.push_back(item),
            End::Front => self.queue.push_front(item),
        }
        Ok(())
    }

    fn would_overflow(&self, bytes: u64) -> bool {
        self.max_size
            .would_exceed(self.queue.len() as u64, self.n_bytes, bytes)
    }

    /// 从队首连续丢弃过期帧，直到遇到未过期的帧
    fn cleanup(&mut self, now: SimTime) {
        while self
            .queue
            .front()
            .is_some_and(|it| is_expired(it, self.max_delay, now))
        {
            self.expire(0, now);
        }
    }

    /// 清理后从前往后扫描，途中遇到的过期帧一并丢弃；返回第一个满足条件的下标
    fn find<F>(&mut self, now: SimTime, pred: F) -> Option<usize>
    where
        F: Fn(&WifiMacQueueItem) -> bool,
    {
        self.cleanup(now);
        let mut idx = 0;
        while idx < self.queue.len() {
            let item = &self.queue[idx];
            if is_expired(item, self.max_delay, now) {
                self.expire(idx, now);
                continue;
            }
            if pred(item) {
                return Some(idx);
            }
            idx += 1;
        }
        None
    }

    fn expire(&mut self, idx: usize, now: SimTime) {
        if let Some(item) = self.remove_at(idx) {
            let bytes = u64::from(item.size_bytes());
            debug!(
                pkt_id = item.packet.id,
                enqueued_at = ?item.tstamp,
                now = ?now,
                "MAC 帧超过生存期，丢弃"
            );
            self.stats.record_drop(bytes, MacDropReason::Expired);
        }
    }

    fn take(&mut self, idx: usize) -> Option<WifiMacQueueItem> {
        let item = self.remove_at(idx)?;
        self.stats.n_total_dequeued_packets += 1;
        Some(item)
    }

    fn remove_at(&mut self, idx: usize) -> Option<WifiMacQueueItem> {
        let item = self.queue.remove(idx)?;
        self.n_bytes = self
            .n_bytes
            .saturating_sub(u64::from(item.size_bytes()));
        Some(item)
    }
}

impl Default for WifiMacQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for WifiMacQueue {
    fn drop(&mut self) {
        self.flush();
    }
}

/// 通用队列接口只保留只读部分；入队/出队/查看必须走带时间的具名操作。
impl PacketQueue<WifiMacQueueItem> for WifiMacQueue {
    fn enqueue(&mut self, _item: WifiMacQueueItem) -> Result<(), WifiMacQueueItem> {
        panic!("WifiMacQueue forbids the use of enqueue(); use push_back()");
    }

    fn dequeue(&mut self) -> Option<WifiMacQueueItem> {
        panic!("WifiMacQueue forbids the use of dequeue(); use pop_front()");
    }

    fn peek(&self) -> Option<&WifiMacQueueItem> {
        panic!("WifiMacQueue forbids the use of peek(); use peek_front()");
    }

    fn len(&self) -> usize {
        self.queue.len()
    }

    fn bytes(&self) -> u64 {
        self.n_bytes
    }

    fn max_size(&self) -> QueueSize {
        self.max_size
    }
}

fn is_expired(item: &WifiMacQueueItem, max_delay: SimTime, now: SimTime) -> bool {
    now.saturating_since(item.tstamp) >= max_delay
}

fn is_available(item: &WifiMacQueueItem, blocked: &dyn BlockedDestinations) -> bool {
    match item.header.qos_tid {
        None => true,
        Some(tid) => !blocked.is_blocked(item.header.addr1, tid),
    }
}
