//! 仿真核心模块
//!
//! 事件驱动仿真的核心组件：仿真时间、事件、世界、仿真器，以及场景配置格式。

mod event;
mod scenario_spec;
mod simulator;
mod time;

pub use event::{Event, World, world_mut};
pub use scenario_spec::{FlowSpec, LinkSpec, ScenarioError, ScenarioSpec};
pub use simulator::Simulator;
pub use time::SimTime;
