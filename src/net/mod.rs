//! 网络模块
//!
//! 数据包、点到点网卡和按流统计。

mod device;
mod packet;
mod stats;

pub use device::{PointToPointDevice, Transmission};
pub use packet::Packet;
pub use stats::{FlowStats, Stats};
