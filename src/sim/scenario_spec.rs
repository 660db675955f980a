//! 流量控制场景的配置文件格式（JSON）
//!
//! 所有字段都有缺省值，空对象 `{}` 就是默认场景：10 Mbps / 2 ms 点到点链路，
//! 网卡发送队列 1 个包，根节点为带两个 Fifo band 的 Prio，两条 50 Mbps、1448 B 的流。

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::qdisc::{ConfigError, QdiscSpec};
use crate::queue::QueueSize;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to read scenario file: {0}")]
    Io(#[from] io::Error),
    #[error("failed to parse scenario file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid scenario: {0}")]
    Invalid(String),
    #[error("invalid queue disc tree: {0}")]
    QueueDisc(#[from] ConfigError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSpec {
    #[serde(default)]
    pub link: LinkSpec,
    /// 根 queue disc
    #[serde(default)]
    pub root: QdiscSpec,
    #[serde(default = "default_flows")]
    pub flows: Vec<FlowSpec>,
    /// 仿真结束时间
    #[serde(default = "default_until_ms")]
    pub until_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkSpec {
    #[serde(default = "default_rate_mbps")]
    pub rate_mbps: u64,
    #[serde(default = "default_delay_us")]
    pub delay_us: u64,
    /// 网卡发送队列上限
    #[serde(default = "default_device_queue")]
    pub device_queue: QueueSize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowSpec {
    pub flow_id: u64,
    /// socket priority 标签；缺省表示不打标签
    #[serde(default)]
    pub priority: Option<u8>,
    #[serde(default = "default_pkt_bytes")]
    pub pkt_bytes: u32,
    #[serde(default = "default_flow_rate_mbps")]
    pub rate_mbps: u64,
    #[serde(default = "default_start_ms")]
    pub start_ms: u64,
    #[serde(default = "default_stop_ms")]
    pub stop_ms: u64,
}

fn default_flows() -> Vec<FlowSpec> {
    vec![FlowSpec::new(0, None), FlowSpec::new(1, Some(6))]
}

fn default_until_ms() -> u64 {
    15_000
}

fn default_rate_mbps() -> u64 {
    10
}

fn default_delay_us() -> u64 {
    2_000
}

fn default_device_queue() -> QueueSize {
    QueueSize::packets(1)
}

fn default_pkt_bytes() -> u32 {
    1448
}

fn default_flow_rate_mbps() -> u64 {
    50
}

fn default_start_ms() -> u64 {
    1_000
}

fn default_stop_ms() -> u64 {
    10_100
}

impl Default for ScenarioSpec {
    fn default() -> Self {
        Self {
            link: LinkSpec::default(),
            root: QdiscSpec::default(),
            flows: default_flows(),
            until_ms: default_until_ms(),
        }
    }
}

impl Default for LinkSpec {
    fn default() -> Self {
        Self {
            rate_mbps: default_rate_mbps(),
            delay_us: default_delay_us(),
            device_queue: default_device_queue(),
        }
    }
}

impl FlowSpec {
    /// 默认参数的流：50 Mbps、1448 B，1 s 开始，10.1 s 结束
    pub fn new(flow_id: u64, priority: Option<u8>) -> Self {
        Self {
            flow_id,
            priority,
            pkt_bytes: default_pkt_bytes(),
            rate_mbps: default_flow_rate_mbps(),
            start_ms: default_start_ms(),
            stop_ms: default_stop_ms(),
        }
    }
}

impl ScenarioSpec {
    pub fn from_json(raw: &str) -> Result<Self, ScenarioError> {
        let spec: ScenarioSpec = serde_json::from_str(raw)?;
        spec.validate()?;
        Ok(spec)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// 语义检查（queue disc 树本身的校验在构建时进行）
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.link.rate_mbps == 0 {
            return Err(ScenarioError::Invalid("link.rate_mbps must be > 0".into()));
        }
        let mut seen = std::collections::HashSet::new();
        for f in &self.flows {
            if !seen.insert(f.flow_id) {
                return Err(ScenarioError::Invalid(format!(
                    "duplicate flow_id {}",
                    f.flow_id
                )));
            }
            if f.pkt_bytes == 0 || f.rate_mbps == 0 {
                return Err(ScenarioError::Invalid(format!(
                    "flow {}: pkt_bytes and rate_mbps must be > 0",
                    f.flow_id
                )));
            }
            if f.stop_ms < f.start_ms {
                return Err(ScenarioError::Invalid(format!(
                    "flow {}: stop_ms ({}) is before start_ms ({})",
                    f.flow_id, f.stop_ms, f.start_ms
                )));
            }
        }
        Ok(())
    }
}
