//! Prio queue disc
//!
//! Strict priority over N >= 2 child queue discs. The packet's priority tag is
//! mapped through a 16-entry priomap to a band; dequeue always serves the lowest
//! non-empty band, so a busy band 0 starves every other band. There is no
//! fairness between bands.

use tracing::trace;

use super::core::{QueueDisc, QueueDiscBase, QueueDiscState};
use super::error::ConfigError;
use super::fifo::FifoQueueDisc;
use super::item::{Dropped, QueueDiscItem};

#[derive(Debug)]
pub struct PrioQueueDisc {
    base: QueueDiscBase,
    prio2band: [u16; 16],
    /// bit i set: priority i was mapped explicitly via `set_band_for_priority`
    overridden: u16,
}

impl PrioQueueDisc {
    pub const MIN_CLASSES: usize = 2;
    /// Linux pfifo_fast-style priomap
    pub const DEFAULT_PRIO2BAND: [u16; 16] = [1, 2, 2, 2, 1, 2, 0, 0, 1, 1, 1, 1, 1, 1, 1, 1];

    pub fn new() -> Self {
        Self {
            base: QueueDiscBase::new(None),
            prio2band: Self::DEFAULT_PRIO2BAND,
            overridden: 0,
        }
    }

    /// Maps `prio` (must be < 16) to `band`.
    pub fn set_band_for_priority(&mut self, prio: u8, band: u16) {
        assert!(prio < 16, "priority values must be less than 16, got {prio}");
        if self.base.state() != QueueDiscState::Unconfigured {
            assert!(
                usize::from(band) < self.base.n_classes(),
                "band {band} out of range ({} classes)",
                self.base.n_classes()
            );
        }
        self.prio2band[usize::from(prio)] = band;
        self.overridden |= 1 << prio;
    }

    pub fn band_for_priority(&self, prio: u8) -> u16 {
        assert!(prio < 16, "priority values must be less than 16, got {prio}");
        self.prio2band[usize::from(prio)]
    }

    pub fn priomap(&self) -> [u16; 16] {
        self.prio2band
    }

    fn classify_band(&self, item: &QueueDiscItem) -> usize {
        usize::from(self.prio2band[usize::from(item.priority() & 0x0f)])
    }
}

impl Default for PrioQueueDisc {
    fn default() -> Self {
        Self::new()
    }
}

impl QueueDisc for PrioQueueDisc {
    fn kind(&self) -> &'static str {
        "prio"
    }

    fn base(&self) -> &QueueDiscBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut QueueDiscBase {
        &mut self.base
    }

    fn do_enqueue(&mut self, item: QueueDiscItem) -> Result<(), Dropped> {
        let band = self.classify_band(&item);
        // A child rejection has already been counted by the child.
        let child = self.base.class_mut(band);
        let res = child.enqueue(item);
        trace!(band, n_packets = child.n_packets(), "band occupancy");
        res
    }

    fn do_dequeue(&mut self) -> Option<QueueDiscItem> {
        for (band, class) in self.base.classes_mut().iter_mut().enumerate() {
            if let Some(item) = class.dequeue() {
                trace!(band, pkt_id = item.packet().id, "popped");
                return Some(item);
            }
        }
        None
    }

    fn do_peek(&self) -> Option<&QueueDiscItem> {
        self.base.classes().iter().find_map(|class| class.peek())
    }

    fn check_config(&mut self) -> Result<(), ConfigError> {
        let kind = self.kind();
        if self.base.n_internal_queues() > 0 {
            return Err(ConfigError::InternalQueuesNotAllowed { kind });
        }
        if self.base.n_filters() > 0 {
            return Err(ConfigError::FiltersNotAllowed { kind });
        }

        if self.base.n_classes() == 0 {
            for _ in 0..Self::MIN_CLASSES {
                self.base.add_class(Box::new(FifoQueueDisc::new()));
            }
        }

        let classes = self.base.n_classes();
        if classes < Self::MIN_CLASSES {
            return Err(ConfigError::TooFewClasses {
                kind,
                min: Self::MIN_CLASSES,
                found: classes,
            });
        }

        let last = u16::try_from(classes - 1).unwrap_or(u16::MAX);
        for prio in 0..16u8 {
            let band = self.prio2band[usize::from(prio)];
            if usize::from(band) < classes {
                continue;
            }
            if self.overridden & (1 << prio) != 0 {
                return Err(ConfigError::BandOutOfRange {
                    priority: prio,
                    band,
                    classes,
                });
            }
            // default entries pointing past the last band fall into the last band
            self.prio2band[usize::from(prio)] = last;
        }
        Ok(())
    }
}
