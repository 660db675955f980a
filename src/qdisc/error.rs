use thiserror::Error;

use crate::queue::QueueSize;

/// queue disc 配置校验失败。出现后该 queue disc 不能投入使用。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{kind} queue disc cannot have classes")]
    ClassesNotAllowed { kind: &'static str },

    #[error("{kind} queue disc cannot have internal queues")]
    InternalQueuesNotAllowed { kind: &'static str },

    #[error("{kind} queue disc does not use packet filters")]
    FiltersNotAllowed { kind: &'static str },

    #[error("{kind} queue disc needs {expected} internal queue(s), found {found}")]
    InternalQueueCount {
        kind: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("{kind} queue disc needs at least {min} classes, found {found}")]
    TooFewClasses {
        kind: &'static str,
        min: usize,
        found: usize,
    },

    #[error("{kind} queue disc needs a size limit")]
    MissingLimit { kind: &'static str },

    #[error("internal queue {index} has limit {queue}, queue disc limit is {qdisc}")]
    LimitMismatch {
        index: usize,
        queue: QueueSize,
        qdisc: QueueSize,
    },

    #[error("internal queue {index} limit {queue} is smaller than the queue disc limit {qdisc}")]
    InternalQueueTooSmall {
        index: usize,
        queue: QueueSize,
        qdisc: QueueSize,
    },

    #[error("priority {priority} maps to band {band}, but only {classes} classes exist")]
    BandOutOfRange {
        priority: u8,
        band: u16,
        classes: usize,
    },

    #[error("priomap needs 16 entries, found {found}")]
    PriomapLength { found: usize },

    #[error("class {index}: {source}")]
    Class {
        index: usize,
        source: Box<ConfigError>,
    },

    #[error("{kind} queue disc was already initialized")]
    AlreadyInitialized { kind: &'static str },

    #[error("{kind} queue disc failed validation earlier and cannot be reused")]
    Failed { kind: &'static str },
}
