use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::net::Packet;
use crate::qdisc::DropReason;
use crate::sim::SimTime;
use crate::wifi::MacDropReason;

/// 事件类型
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraceEventKind {
    /// 根 queue disc 的包数变化
    TcPacketsInQueue { old: u64, new: u64 },
    /// 设备发送队列的包数变化
    DevicePacketsInQueue { old: u64, new: u64 },
    /// queue disc 丢包
    QdiscDrop { reason: DropReason },
    /// 设备队列拒绝（随后会 requeue 回 queue disc）
    DeviceReject,
    /// 包被放回 queue disc 的 requeue 槽位
    Requeue,
    /// 设备开始序列化一个包
    TxStart { depart_ns: u64, arrive_ns: u64 },
    /// 包到达对端
    Delivered,
    /// MAC 队列：帧被发送
    MacTx { station: u64, tid: u8 },
    /// MAC 队列：帧被丢弃（累计计数变化时记录）
    MacDrop { reason: MacDropReason, count: u64 },
}

/// 一条事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEvent {
    /// 仿真时间（纳秒，和 `SimTime.0` 同口径）
    pub t_ns: u64,
    pub pkt_id: Option<u64>,
    pub flow_id: Option<u64>,
    pub pkt_bytes: Option<u32>,
    #[serde(flatten)]
    pub kind: TraceEventKind,
}

/// 事件收集器（存内存，仿真结束写 JSON 文件）
#[derive(Debug, Default)]
pub struct TraceLogger {
    pub events: Vec<TraceEvent>,
}

impl TraceLogger {
    pub fn push(&mut self, ev: TraceEvent) {
        self.events.push(ev);
    }

    /// 与具体包无关的事件
    pub fn record(&mut self, now: SimTime, kind: TraceEventKind) {
        self.push(TraceEvent {
            t_ns: now.0,
            pkt_id: None,
            flow_id: None,
            pkt_bytes: None,
            kind,
        });
    }

    /// 带包信息的事件
    pub fn record_packet(&mut self, now: SimTime, pkt: &Packet, kind: TraceEventKind) {
        self.push(TraceEvent {
            t_ns: now.0,
            pkt_id: Some(pkt.id),
            flow_id: Some(pkt.flow_id),
            pkt_bytes: Some(pkt.size_bytes),
            kind,
        });
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// 满足条件的事件条数
    pub fn count(&self, pred: impl Fn(&TraceEventKind) -> bool) -> usize {
        self.events.iter().filter(|e| pred(&e.kind)).count()
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let json = serde_json::to_string_pretty(&self.events).map_err(io::Error::other)?;
        fs::write(path, json)
    }
}
