//! 事件与世界 trait
//!
//! 事件由 `Simulator` 按时间顺序执行；世界由业务层实现（出口端口、MAC 队列场景等）。

use super::simulator::Simulator;
use std::any::Any;

/// 事件：可被调度执行。使用 `self: Box<Self>` 以支持 move/所有权转移。
pub trait Event: Send + 'static {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World);
}

/// 仿真世界：事件通过 `as_any_mut` 向下转型拿到具体状态。
pub trait World: Any {
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// 每个事件执行完之后调用一次。
    fn on_tick(&mut self, _sim: &mut Simulator) {}
}

/// 在事件里把 `dyn World` 还原成具体类型。
///
/// 世界类型不匹配属于场景搭建错误，直接 panic。
pub fn world_mut<W: World>(world: &mut dyn World) -> &mut W {
    world
        .as_any_mut()
        .downcast_mut::<W>()
        .unwrap_or_else(|| panic!("world must be {}", std::any::type_name::<W>()))
}
