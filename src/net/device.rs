//! 点到点网卡
//!
//! 一条单向链路加一个很小的发送队列（DropTail，默认 1 个包）。
//! 网卡一次只序列化一个包；发送队列满时对上层呈"停止"状态，
//! 上层（queue disc）据此决定是否把刚出队的包 requeue 回去。

use tracing::{debug, trace};

use super::packet::Packet;
use crate::queue::{DropTailQueue, PacketQueue, QueueSize};
use crate::sim::SimTime;

/// 一次序列化发送的时间安排
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transmission {
    pub pkt: Packet,
    /// 最后一个 bit 离开网卡的时刻
    pub depart: SimTime,
    /// 到达对端的时刻
    pub arrive: SimTime,
}

#[derive(Debug)]
pub struct PointToPointDevice {
    bandwidth_bps: u64,
    latency: SimTime,
    busy: bool,
    queue: DropTailQueue<Packet>,
    tx_pkts: u64,
    tx_bytes: u64,
}

impl PointToPointDevice {
    pub const DEFAULT_QUEUE_PACKETS: u64 = 1;

    pub fn new(bandwidth_bps: u64, latency: SimTime, queue_size: QueueSize) -> Self {
        Self {
            bandwidth_bps,
            latency,
            busy: false,
            queue: DropTailQueue::new(queue_size),
            tx_pkts: 0,
            tx_bytes: 0,
        }
    }

    pub fn bandwidth_bps(&self) -> u64 {
        self.bandwidth_bps
    }

    pub fn latency(&self) -> SimTime {
        self.latency
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// 发送队列已满，不能再接收新包
    pub fn is_stopped(&self) -> bool {
        self.queue
            .max_size()
            .would_exceed(self.queue.len() as u64, self.queue.bytes(), 1)
    }

    /// 发送队列放不下一个 `bytes` 字节的包，要等它先排空一些。
    ///
    /// 队列为空时总是返回 `false`：比队列上限还大的包交给 `send` 直接丢弃，
    /// 否则它会永远卡在上层队首。
    pub fn is_stopped_for(&self, bytes: u64) -> bool {
        !self.queue.is_empty()
            && self
                .queue
                .max_size()
                .would_exceed(self.queue.len() as u64, self.queue.bytes(), bytes)
    }

    /// 发送队列里的包数（不含正在序列化的包）
    pub fn queue_len(&self) -> u64 {
        self.queue.len() as u64
    }

    pub fn queue_max_size(&self) -> QueueSize {
        self.queue.max_size()
    }

    /// 被发送队列丢弃的包数
    pub fn dropped_pkts(&self) -> u64 {
        self.queue.dropped_pkts()
    }

    pub fn tx_pkts(&self) -> u64 {
        self.tx_pkts
    }

    pub fn tx_bytes(&self) -> u64 {
        self.tx_bytes
    }

    /// 计算传输指定字节数所需的时间
    pub fn tx_time(&self, bytes: u32) -> SimTime {
        // ceil(bytes*8 / bps) 秒 -> 纳秒
        if self.bandwidth_bps == 0 {
            return SimTime(u64::MAX / 4);
        }
        let bits = u128::from(bytes).saturating_mul(8);
        let bps = u128::from(self.bandwidth_bps);
        let nanos = (bits.saturating_mul(1_000_000_000u128) + (bps - 1)) / bps;
        SimTime(nanos.min(u128::from(u64::MAX)) as u64)
    }

    /// 把包放进发送队列；队列满时丢弃并交还
    pub fn send(&mut self, pkt: Packet) -> Result<(), Packet> {
        match self.queue.enqueue(pkt) {
            Ok(()) => Ok(()),
            Err(pkt) => {
                debug!(pkt_id = pkt.id, "网卡发送队列已满，丢包");
                Err(pkt)
            }
        }
    }

    /// 空闲时从发送队列取一个包开始序列化
    pub fn try_start_tx(&mut self, now: SimTime) -> Option<Transmission> {
        if self.busy {
            return None;
        }
        let pkt = self.queue.dequeue()?;
        let depart = now.saturating_add(self.tx_time(pkt.size_bytes));
        let arrive = depart.saturating_add(self.latency);
        self.busy = true;
        self.tx_pkts += 1;
        self.tx_bytes += u64::from(pkt.size_bytes);
        trace!(pkt_id = pkt.id, depart = ?depart, arrive = ?arrive, "开始序列化");
        Some(Transmission {
            pkt,
            depart,
            arrive,
        })
    }

    /// 当前包序列化完成，网卡回到空闲
    pub fn complete_tx(&mut self) {
        self.busy = false;
    }
}
