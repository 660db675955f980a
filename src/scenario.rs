//! 流量控制场景：主机出口 = 根 queue disc + 点到点网卡
//!
//! 流按固定速率产生包，包先进根 queue disc，再由 `restart` 搬到网卡发送队列。
//! 网卡发送队列满（停止）时，刚出队的包会被 requeue 回 queue disc，
//! 等网卡完成一次发送后再继续。

use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::{debug, info, trace};

use crate::net::{Packet, PointToPointDevice, Stats};
use crate::qdisc::{QueueDisc, QueueDiscItem, QueueDiscStats, build_queue_disc};
use crate::sim::{Event, FlowSpec, ScenarioError, ScenarioSpec, SimTime, Simulator, World, world_mut};
use crate::trace::{TraceEventKind, TraceLogger};

/// queue disc 回调写进来的待处理记录；回调拿不到仿真时钟，由世界在操作后统一打时间戳。
type PendingNotes = Arc<Mutex<Vec<TraceEventKind>>>;

/// 场景结束后的汇总
#[derive(Debug, Clone, Serialize)]
pub struct TcReport {
    pub final_time_ns: u64,
    /// 根 queue disc 的计数
    pub qdisc: QueueDiscStats,
    /// 根 queue disc 的各个子类别（按 band 顺序）
    pub classes: Vec<QueueDiscStats>,
    pub qdisc_packets_in_queue: u64,
    pub device_tx_pkts: u64,
    pub device_tx_bytes: u64,
    pub device_dropped_pkts: u64,
    pub stats: Stats,
}

#[derive(Debug)]
pub struct TcOutcome {
    pub report: TcReport,
    pub trace: Option<TraceLogger>,
}

/// 单个出口端口的仿真世界
pub struct TcWorld {
    pub root: Box<dyn QueueDisc>,
    pub device: PointToPointDevice,
    pub stats: Stats,
    pub trace: Option<TraceLogger>,
    pending: PendingNotes,
    device_len: u64,
    next_pkt_id: u64,
}

impl World for TcWorld {
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

impl TcWorld {
    /// 根据场景配置构建并校验 queue disc 树，挂上占用/丢包回调。
    pub fn new(spec: &ScenarioSpec) -> Result<Self, ScenarioError> {
        let mut root = build_queue_disc(&spec.root)?;
        let pending: PendingNotes = Arc::default();

        let notes = Arc::clone(&pending);
        root.base_mut()
            .set_packets_in_queue_callback(Box::new(move |old, new| {
                if let Ok(mut v) = notes.lock() {
                    v.push(TraceEventKind::TcPacketsInQueue { old, new });
                }
            }));
        let notes = Arc::clone(&pending);
        root.base_mut()
            .set_drop_callback(Box::new(move |_item, reason| {
                if let Ok(mut v) = notes.lock() {
                    v.push(TraceEventKind::QdiscDrop { reason });
                }
            }));

        let device = PointToPointDevice::new(
            spec.link.rate_mbps.saturating_mul(1_000_000),
            SimTime::from_micros(spec.link.delay_us),
            spec.link.device_queue,
        );

        Ok(Self {
            root,
            device,
            stats: Stats::default(),
            trace: None,
            pending,
            device_len: 0,
            next_pkt_id: 0,
        })
    }

    pub fn with_trace(mut self) -> Self {
        self.trace = Some(TraceLogger::default());
        self
    }

    pub fn make_packet(&mut self, flow_id: u64, pkt_bytes: u32, priority: Option<u8>) -> Packet {
        let id = self.next_pkt_id;
        self.next_pkt_id += 1;
        Packet {
            id,
            flow_id,
            size_bytes: pkt_bytes,
            priority,
        }
    }

    /// 上层交下来的包：进根 queue disc，然后尝试往网卡搬。
    #[tracing::instrument(skip(self, sim), fields(pkt_id = pkt.id, flow_id = pkt.flow_id))]
    pub fn send(&mut self, pkt: Packet, sim: &mut Simulator) {
        let flow = self.stats.flow_mut(pkt.flow_id);
        flow.sent_pkts += 1;
        flow.sent_bytes += u64::from(pkt.size_bytes);

        if let Err(dropped) = self.root.enqueue(QueueDiscItem::new(pkt)) {
            let pkt = dropped.item.packet();
            self.stats.flow_mut(pkt.flow_id).dropped_pkts += 1;
            debug!(pkt_id = pkt.id, reason = %dropped.reason, "queue disc 拒绝");
        }
        self.flush_notes(sim.now());
        self.restart(sim);
    }

    /// 从根 queue disc 往网卡搬包，直到 queue disc 为空或网卡放不下队首的包。
    pub fn restart(&mut self, sim: &mut Simulator) {
        let now = sim.now();
        loop {
            // 已经有一个包在等网卡，网卡还放不下它就不再出队
            if self.root.base().n_requeued() > 0 {
                let waiting = self.root.peek().map_or(0, QueueDiscItem::len_bytes);
                if self.device.is_stopped_for(waiting) {
                    break;
                }
            }
            let Some(item) = self.root.dequeue() else {
                break;
            };
            if self.device.is_stopped_for(item.len_bytes()) {
                trace!(pkt_id = item.packet().id, "网卡停止，requeue");
                if let Some(t) = self.trace.as_mut() {
                    t.record_packet(now, item.packet(), TraceEventKind::Requeue);
                }
                self.root.requeue(item);
                break;
            }
            if let Err(pkt) = self.device.send(item.into_packet()) {
                self.stats.flow_mut(pkt.flow_id).dropped_pkts += 1;
                if let Some(t) = self.trace.as_mut() {
                    t.record_packet(now, &pkt, TraceEventKind::DeviceReject);
                }
            }
            self.note_device_len(now);
            self.start_tx(sim);
        }
        self.flush_notes(now);
    }

    fn start_tx(&mut self, sim: &mut Simulator) {
        let now = sim.now();
        let Some(tx) = self.device.try_start_tx(now) else {
            return;
        };
        self.note_device_len(now);
        if let Some(t) = self.trace.as_mut() {
            t.record_packet(
                now,
                &tx.pkt,
                TraceEventKind::TxStart {
                    depart_ns: tx.depart.0,
                    arrive_ns: tx.arrive.0,
                },
            );
        }
        sim.schedule(tx.depart, TxComplete);
        sim.schedule(tx.arrive, DeliverPacket { pkt: tx.pkt });
    }

    fn on_tx_complete(&mut self, sim: &mut Simulator) {
        self.device.complete_tx();
        self.start_tx(sim);
        self.restart(sim);
    }

    fn on_delivered(&mut self, pkt: Packet, now: SimTime) {
        let flow = self.stats.flow_mut(pkt.flow_id);
        flow.delivered_pkts += 1;
        flow.delivered_bytes += u64::from(pkt.size_bytes);
        if let Some(t) = self.trace.as_mut() {
            t.record_packet(now, &pkt, TraceEventKind::Delivered);
        }
    }

    fn note_device_len(&mut self, now: SimTime) {
        let new = self.device.queue_len();
        let old = self.device_len;
        if old == new {
            return;
        }
        self.device_len = new;
        if let Some(t) = self.trace.as_mut() {
            t.record(now, TraceEventKind::DevicePacketsInQueue { old, new });
        }
    }

    fn flush_notes(&mut self, now: SimTime) {
        let notes = match self.pending.lock() {
            Ok(mut v) => std::mem::take(&mut *v),
            Err(_) => return,
        };
        if let Some(t) = self.trace.as_mut() {
            for kind in notes {
                t.record(now, kind);
            }
        }
    }

    pub fn report(&self, now: SimTime) -> TcReport {
        TcReport {
            final_time_ns: now.0,
            qdisc: self.root.stats().clone(),
            classes: self
                .root
                .base()
                .classes()
                .iter()
                .map(|c| c.stats().clone())
                .collect(),
            qdisc_packets_in_queue: self.root.n_packets(),
            device_tx_pkts: self.device.tx_pkts(),
            device_tx_bytes: self.device.tx_bytes(),
            device_dropped_pkts: self.device.dropped_pkts(),
            stats: self.stats.clone(),
        }
    }
}

/// 流量注入事件：按固定间隔产生一个包，直到 `stop_at`
#[derive(Debug)]
pub struct InjectFlow {
    pub flow_id: u64,
    pub priority: Option<u8>,
    pub pkt_bytes: u32,
    pub gap: SimTime,
    pub stop_at: SimTime,
}

impl InjectFlow {
    pub fn from_spec(f: &FlowSpec) -> Self {
        Self {
            flow_id: f.flow_id,
            priority: f.priority,
            pkt_bytes: f.pkt_bytes,
            gap: packet_gap(f.pkt_bytes, f.rate_mbps),
            stop_at: SimTime::from_millis(f.stop_ms),
        }
    }
}

impl Event for InjectFlow {
    #[tracing::instrument(skip(self, sim, world), fields(flow_id = self.flow_id))]
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let me = *self;
        if sim.now() >= me.stop_at {
            return;
        }
        let w = world_mut::<TcWorld>(world);
        let pkt = w.make_packet(me.flow_id, me.pkt_bytes, me.priority);
        w.send(pkt, sim);

        let next_at = sim.now().saturating_add(me.gap);
        if next_at < me.stop_at {
            sim.schedule(next_at, me);
        }
    }
}

/// 网卡完成一次序列化
#[derive(Debug)]
pub struct TxComplete;

impl Event for TxComplete {
    #[tracing::instrument(skip(self, sim, world))]
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        world_mut::<TcWorld>(world).on_tx_complete(sim);
    }
}

/// 包到达链路对端
#[derive(Debug)]
pub struct DeliverPacket {
    pub pkt: Packet,
}

impl Event for DeliverPacket {
    #[tracing::instrument(skip(self, sim, world), fields(pkt_id = self.pkt.id, flow_id = self.pkt.flow_id))]
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let DeliverPacket { pkt } = *self;
        trace!("📨 数据包到达对端");
        world_mut::<TcWorld>(world).on_delivered(pkt, sim.now());
    }
}

/// 以 `rate_mbps` 发送 `pkt_bytes` 字节包的间隔（向上取整到纳秒）
pub fn packet_gap(pkt_bytes: u32, rate_mbps: u64) -> SimTime {
    let bps = u128::from(rate_mbps.max(1)) * 1_000_000;
    let bits = u128::from(pkt_bytes) * 8;
    let nanos = (bits * 1_000_000_000 + bps - 1) / bps;
    SimTime(nanos.min(u128::from(u64::MAX)) as u64)
}

/// 跑完整个场景并返回汇总
pub fn run_traffic_control(
    spec: &ScenarioSpec,
    record_trace: bool,
) -> Result<TcOutcome, ScenarioError> {
    spec.validate()?;
    let mut world = TcWorld::new(spec)?;
    if record_trace {
        world = world.with_trace();
    }

    let mut sim = Simulator::default();
    for f in &spec.flows {
        sim.schedule(SimTime::from_millis(f.start_ms), InjectFlow::from_spec(f));
    }
    info!(
        flows = spec.flows.len(),
        rate_mbps = spec.link.rate_mbps,
        root = world.root.kind(),
        "🚦 流量控制场景开始"
    );
    let until = SimTime::from_millis(spec.until_ms);
    sim.run_until(until, &mut world);

    let report = world.report(sim.now());
    info!(
        delivered = report.stats.delivered_pkts(),
        qdisc_drops = report.qdisc.n_total_dropped_packets,
        requeued = report.qdisc.n_total_requeued_packets,
        "🏁 流量控制场景结束"
    );
    Ok(TcOutcome {
        report,
        trace: world.trace.take(),
    })
}
