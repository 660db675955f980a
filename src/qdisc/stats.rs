use std::collections::BTreeMap;

use serde::Serialize;

use super::item::DropReason;

/// 一个 queue disc 在整个生命周期内的累计计数（只增不减，重建后归零）。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueDiscStats {
    pub n_total_received_packets: u64,
    pub n_total_received_bytes: u64,
    pub n_total_enqueued_packets: u64,
    pub n_total_enqueued_bytes: u64,
    pub n_total_dequeued_packets: u64,
    pub n_total_dequeued_bytes: u64,
    pub n_total_requeued_packets: u64,
    pub n_total_requeued_bytes: u64,
    pub n_total_dropped_packets: u64,
    pub n_total_dropped_bytes: u64,
    pub dropped_packets_by_reason: BTreeMap<DropReason, u64>,
}

impl QueueDiscStats {
    pub fn dropped_packets(&self, reason: DropReason) -> u64 {
        self.dropped_packets_by_reason
            .get(&reason)
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn record_received(&mut self, bytes: u64) {
        self.n_total_received_packets += 1;
        self.n_total_received_bytes += bytes;
    }

    pub(crate) fn record_enqueued(&mut self, bytes: u64) {
        self.n_total_enqueued_packets += 1;
        self.n_total_enqueued_bytes += bytes;
    }

    pub(crate) fn record_dequeued(&mut self, bytes: u64) {
        self.n_total_dequeued_packets += 1;
        self.n_total_dequeued_bytes += bytes;
    }

    pub(crate) fn record_requeued(&mut self, bytes: u64) {
        self.n_total_requeued_packets += 1;
        self.n_total_requeued_bytes += bytes;
    }

    pub(crate) fn record_drop(&mut self, bytes: u64, reason: DropReason) {
        self.n_total_dropped_packets += 1;
        self.n_total_dropped_bytes += bytes;
        *self.dropped_packets_by_reason.entry(reason).or_insert(0) += 1;
    }
}
