//! 流量控制排队规则（queue discs）
//!
//! 一棵 queue disc 树：叶子节点（Fifo）持有内部有界队列，内部节点（Prio）持有子 queue disc。
//! 入队自上而下（分类 → 路由 → 拒绝时记丢包），出队自下而上（按 band 严格优先）。
//!
//! 使用前必须调用 `initialize()`（或通过 `build_queue_disc` 构建），校验失败的节点不能再用。

mod core;
mod error;
mod factory;
mod fifo;
mod filter;
mod item;
mod prio;
mod stats;

pub use self::core::{
    DropCallback, InternalQueue, PacketsInQueueCallback, QueueDisc, QueueDiscBase, QueueDiscState,
};
pub use error::ConfigError;
pub use factory::{QdiscSpec, build_queue_disc, create_queue_disc};
pub use fifo::FifoQueueDisc;
pub use filter::{FlowFilter, PacketFilter};
pub use item::{DropReason, Dropped, QueueDiscItem};
pub use prio::PrioQueueDisc;
pub use stats::QueueDiscStats;
