//! DropTail（尾丢弃）队列
//!
//! 当队列容量不足时，直接丢弃新到达的元素。

use std::collections::VecDeque;
use std::fmt;

use super::{PacketQueue, QueueItem, QueueSize};

#[derive(Debug)]
pub struct DropTailQueue<T> {
    max_size: QueueSize,
    cur_bytes: u64,
    q: VecDeque<T>,
    dropped_pkts: u64,
    dropped_bytes: u64,
}

impl<T> DropTailQueue<T> {
    pub fn new(max_size: QueueSize) -> Self {
        Self {
            max_size,
            cur_bytes: 0,
            q: VecDeque::new(),
            dropped_pkts: 0,
            dropped_bytes: 0,
        }
    }

    /// 因容量不足被本队列拒绝的包数
    pub fn dropped_pkts(&self) -> u64 {
        self.dropped_pkts
    }

    pub fn dropped_bytes(&self) -> u64 {
        self.dropped_bytes
    }
}

impl<T: QueueItem + fmt::Debug + Send> PacketQueue<T> for DropTailQueue<T> {
    fn enqueue(&mut self, item: T) -> Result<(), T> {
        let sz = u64::from(item.size_bytes());
        if self
            .max_size
            .would_exceed(self.q.len() as u64, self.cur_bytes, sz)
        {
            self.dropped_pkts += 1;
            self.dropped_bytes = self.dropped_bytes.saturating_add(sz);
            return Err(item);
        }
        self.cur_bytes = self.cur_bytes.saturating_add(sz);
        self.q.push_back(item);
        Ok(())
    }

    fn dequeue(&mut self) -> Option<T> {
        let item = self.q.pop_front()?;
        self.cur_bytes = self
            .cur_bytes
            .saturating_sub(u64::from(item.size_bytes()));
        Some(item)
    }

    fn peek(&self) -> Option<&T> {
        self.q.front()
    }

    fn len(&self) -> usize {
        self.q.len()
    }

    fn bytes(&self) -> u64 {
        self.cur_bytes
    }

    fn max_size(&self) -> QueueSize {
        self.max_size
    }
}
