//! 结构化事件记录（JSON）
//!
//! 仿真过程中把队列占用变化、丢包、requeue、发送与交付记为事件，
//! 结束后整体写成一个 JSON 文件，便于离线画图或比对。

mod types;

pub use types::{TraceEvent, TraceEventKind, TraceLogger};
