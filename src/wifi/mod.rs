//! Wi-Fi MAC 层的发送队列
//!
//! - `mac_header`：地址与 QoS 帧头
//! - `mac_queue`：带生存期与丢弃策略的 `WifiMacQueue`
//! - `blocked`：Block Ack 协商期间暂缓的 (receiver, TID)
//! - `scenario`：多站点、多 TID 的到达/服务仿真

mod blocked;
mod mac_header;
mod mac_queue;
mod scenario;

pub use blocked::{BlockedDestinations, QosBlockedDestinations};
pub use mac_header::{AddressType, Mac48Address, WifiMacHeader};
pub use mac_queue::{DropPolicy, MacDropReason, MacQueueStats, WifiMacQueue, WifiMacQueueItem};
pub use scenario::{MacScenario, MacScenarioReport, MacWorld, run_mac_scenario};
