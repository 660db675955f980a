//! MAC 队列场景：AP 向多个站点、多个 TID 周期性地发帧
//!
//! 帧按固定间隔到达 AP 的 `WifiMacQueue`；信道按固定服务间隔每次取走一个可发送的帧
//! （`dequeue_first_available`）。场景开始时某个 (站点, TID) 处于 Block Ack
//! 协商中而被阻塞，到 `blocked_until_ms` 解除。服务速度跟不上或阻塞太久时，
//! 帧会因为超过生存期或队列溢出而被丢弃。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::blocked::QosBlockedDestinations;
use super::mac_header::{Mac48Address, WifiMacHeader};
use super::mac_queue::{DropPolicy, MacDropReason, WifiMacQueue, WifiMacQueueItem};
use crate::net::Packet;
use crate::queue::QueueSize;
use crate::sim::{Event, ScenarioError, SimTime, Simulator, World, world_mut};
use crate::trace::{TraceEventKind, TraceLogger};

/// 每个站点最多 16 个 TID，flow_id = station * 16 + tid
const TIDS_PER_STATION: u64 = 16;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MacScenario {
    pub stations: u64,
    /// 每个站点使用 TID `0..tids`
    pub tids: u8,
    pub frames_per_flow: u64,
    pub frame_bytes: u32,
    /// 同一条流相邻两帧的到达间隔
    pub arrival_gap_us: u64,
    /// 信道每隔多久发走一帧
    pub service_us: u64,
    pub lifetime_ms: u64,
    pub max_frames: u64,
    pub drop_policy: DropPolicy,
    /// 处于 Block Ack 协商中的 (站点, TID)
    pub blocked: Option<(u64, u8)>,
    pub blocked_until_ms: u64,
    pub until_ms: u64,
}

impl Default for MacScenario {
    fn default() -> Self {
        Self {
            stations: 2,
            tids: 2,
            frames_per_flow: 200,
            frame_bytes: 1000,
            arrival_gap_us: 1_000,
            service_us: 2_000,
            lifetime_ms: WifiMacQueue::DEFAULT_MAX_DELAY_MS,
            max_frames: WifiMacQueue::DEFAULT_MAX_PACKETS,
            drop_policy: DropPolicy::default(),
            blocked: Some((0, 0)),
            blocked_until_ms: 100,
            until_ms: 2_000,
        }
    }
}

impl MacScenario {
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.stations == 0 {
            return Err(ScenarioError::Invalid("stations must be > 0".into()));
        }
        if self.tids == 0 || u64::from(self.tids) > TIDS_PER_STATION {
            return Err(ScenarioError::Invalid(format!(
                "tids must be in 1..=16, got {}",
                self.tids
            )));
        }
        if self.arrival_gap_us == 0 || self.service_us == 0 {
            return Err(ScenarioError::Invalid(
                "arrival_gap_us and service_us must be > 0".into(),
            ));
        }
        if self.max_frames == 0 {
            return Err(ScenarioError::Invalid("max_frames must be > 0".into()));
        }
        Ok(())
    }

    fn station_address(station: u64) -> Mac48Address {
        Mac48Address::from_index(station + 1)
    }
}

/// 场景汇总。`generated == sent + expired + overflow + flushed`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MacScenarioReport {
    pub generated: u64,
    pub sent: u64,
    pub expired: u64,
    pub overflow: u64,
    /// 场景结束时仍在队列里、被 flush 掉的帧
    pub flushed: u64,
    pub sent_by_station: BTreeMap<u64, u64>,
    /// 被阻塞的流发出第一帧的时间
    pub blocked_first_tx_ns: Option<u64>,
}

pub struct MacWorld {
    pub queue: WifiMacQueue,
    pub blocked: QosBlockedDestinations,
    pub trace: Option<TraceLogger>,
    ap: Mac48Address,
    blocked_flow: Option<u64>,
    report: MacScenarioReport,
    next_pkt_id: u64,
    last_drops: BTreeMap<MacDropReason, u64>,
}

impl World for MacWorld {
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

impl MacWorld {
    pub fn new(scn: &MacScenario) -> Self {
        let queue = WifiMacQueue::new()
            .with_max_size(QueueSize::packets(scn.max_frames))
            .with_max_delay(SimTime::from_millis(scn.lifetime_ms))
            .with_drop_policy(scn.drop_policy);
        let mut blocked = QosBlockedDestinations::new();
        if let Some((station, tid)) = scn.blocked {
            blocked.block(MacScenario::station_address(station), tid);
        }
        Self {
            queue,
            blocked,
            trace: None,
            ap: Mac48Address::from_index(0xa0_0000),
            blocked_flow: scn
                .blocked
                .map(|(station, tid)| station * TIDS_PER_STATION + u64::from(tid)),
            report: MacScenarioReport::default(),
            next_pkt_id: 0,
            last_drops: BTreeMap::new(),
        }
    }

    pub fn with_trace(mut self) -> Self {
        self.trace = Some(TraceLogger::default());
        self
    }

    fn on_arrival(&mut self, station: u64, tid: u8, bytes: u32, now: SimTime) {
        let flow_id = station * TIDS_PER_STATION + u64::from(tid);
        let pkt = Packet::new(self.next_pkt_id, flow_id, bytes);
        self.next_pkt_id += 1;
        self.report.generated += 1;

        let header = WifiMacHeader::qos_data(
            MacScenario::station_address(station),
            self.ap,
            self.ap,
            tid,
        );
        if self
            .queue
            .push_back(WifiMacQueueItem::new(pkt, header), now)
            .is_err()
        {
            debug!(station, tid, "帧被拒绝");
        }
        self.note_drops(now);
    }

    fn on_service(&mut self, now: SimTime) {
        if let Some(item) = self.queue.dequeue_first_available(&self.blocked, now) {
            let flow_id = item.packet().flow_id;
            let station = flow_id / TIDS_PER_STATION;
            self.report.sent += 1;
            *self.report.sent_by_station.entry(station).or_insert(0) += 1;
            if self.blocked_flow == Some(flow_id) && self.report.blocked_first_tx_ns.is_none() {
                self.report.blocked_first_tx_ns = Some(now.0);
            }
            if let Some(t) = self.trace.as_mut() {
                let tid = item.header().qos_tid.unwrap_or(0);
                t.record_packet(now, item.packet(), TraceEventKind::MacTx { station, tid });
            }
        }
        self.note_drops(now);
    }

    /// 把队列丢帧计数的变化写进 trace
    fn note_drops(&mut self, now: SimTime) {
        let Some(t) = self.trace.as_mut() else {
            return;
        };
        for reason in [
            MacDropReason::Expired,
            MacDropReason::Overflow,
            MacDropReason::Flushed,
        ] {
            let count = self.queue.stats().dropped_packets(reason);
            let last = self.last_drops.entry(reason).or_insert(0);
            if *last != count {
                *last = count;
                t.record(now, TraceEventKind::MacDrop { reason, count });
            }
        }
    }

    /// 清空队列并生成汇总
    pub fn finish(&mut self, now: SimTime) -> MacScenarioReport {
        self.queue.flush();
        self.note_drops(now);
        let stats = self.queue.stats();
        let mut report = self.report.clone();
        report.expired = stats.dropped_packets(MacDropReason::Expired);
        report.overflow = stats.dropped_packets(MacDropReason::Overflow);
        report.flushed = stats.dropped_packets(MacDropReason::Flushed);
        report
    }
}

/// 一条 (站点, TID) 流的下一帧到达
#[derive(Debug)]
struct FrameArrival {
    station: u64,
    tid: u8,
    bytes: u32,
    remaining: u64,
    gap: SimTime,
}

impl Event for FrameArrival {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let mut me = *self;
        if me.remaining == 0 {
            return;
        }
        world_mut::<MacWorld>(world).on_arrival(me.station, me.tid, me.bytes, sim.now());
        me.remaining -= 1;
        if me.remaining > 0 {
            sim.schedule_in(me.gap, me);
        }
    }
}

/// 信道空闲，尝试发走一帧
#[derive(Debug)]
struct ServiceTick {
    interval: SimTime,
    until: SimTime,
}

impl Event for ServiceTick {
    #[tracing::instrument(level = "trace", skip(self, sim, world))]
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let me = *self;
        world_mut::<MacWorld>(world).on_service(sim.now());
        if sim.now().saturating_add(me.interval) <= me.until {
            sim.schedule_in(me.interval, me);
        }
    }
}

/// Block Ack 协商完成，解除阻塞
#[derive(Debug)]
struct Unblock {
    addr: Mac48Address,
    tid: u8,
}

impl Event for Unblock {
    fn execute(self: Box<Self>, _sim: &mut Simulator, world: &mut dyn World) {
        let Unblock { addr, tid } = *self;
        info!(%addr, tid, "🔓 Block Ack 协商完成");
        world_mut::<MacWorld>(world).blocked.unblock(addr, tid);
    }
}

/// 跑完整个 MAC 场景，返回汇总和（可选的）事件记录
pub fn run_mac_scenario(
    scn: &MacScenario,
    record_trace: bool,
) -> Result<(MacScenarioReport, Option<TraceLogger>), ScenarioError> {
    scn.validate()?;
    let mut world = MacWorld::new(scn);
    if record_trace {
        world = world.with_trace();
    }

    let mut sim = Simulator::default();
    let gap = SimTime::from_micros(scn.arrival_gap_us);
    for station in 0..scn.stations {
        for tid in 0..scn.tids {
            sim.schedule(
                SimTime::ZERO,
                FrameArrival {
                    station,
                    tid,
                    bytes: scn.frame_bytes,
                    remaining: scn.frames_per_flow,
                    gap,
                },
            );
        }
    }
    let until = SimTime::from_millis(scn.until_ms);
    let interval = SimTime::from_micros(scn.service_us);
    sim.schedule(interval, ServiceTick { interval, until });
    if let Some((station, tid)) = scn.blocked {
        sim.schedule(
            SimTime::from_millis(scn.blocked_until_ms),
            Unblock {
                addr: MacScenario::station_address(station),
                tid,
            },
        );
    }

    info!(
        stations = scn.stations,
        tids = scn.tids,
        lifetime_ms = scn.lifetime_ms,
        policy = ?scn.drop_policy,
        "📡 MAC 队列场景开始"
    );
    sim.run_until(until, &mut world);
    let report = world.finish(sim.now());
    info!(
        generated = report.generated,
        sent = report.sent,
        expired = report.expired,
        overflow = report.overflow,
        "🏁 MAC 队列场景结束"
    );
    Ok((report, world.trace.take()))
}
