//! Change/resend detector.
//!
//! One slot per [`Device`] remembers the last report that made it to the host
//! and how many decision passes went by without anything new to say. A device
//! is dirty when its report differs from the last one sent, when the pointer
//! carries motion, or when the idle counter reaches the keep-alive threshold.
//! The counter only resets when a dispatch is committed, so a failed
//! keep-alive is retried on the next pass.

use crate::config::KEEPALIVE_PASSES;
use crate::inputs::Device;
use crate::report::Report;

/// Tunables of the detector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DetectorConfig {
    /// Unchanged passes before a device is resent, per device.
    /// Zero disables the keep-alive for that device.
    pub keepalive_passes: [u16; 3],
}

impl DetectorConfig {
    /// Same keep-alive threshold for every device.
    #[must_use]
    pub const fn uniform(passes: u16) -> Self {
        Self {
            keepalive_passes: [passes; 3],
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self::uniform(KEEPALIVE_PASSES)
    }
}

#[derive(Clone, Copy, Debug)]
struct Slot {
    last_sent: Report,
    idle_passes: u16,
}

impl Slot {
    const fn idle(device: Device) -> Self {
        Self {
            last_sent: Report::idle(device),
            idle_passes: 0,
        }
    }
}

/// Outcome of [`ChangeDetector::evaluate`] for one device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Decision {
    /// Nothing to send.
    Quiet,
    /// Content differs from the last report sent, or carries motion.
    Changed,
    /// Unchanged, but the keep-alive interval elapsed.
    KeepAlive,
}

impl Decision {
    /// True if the device should be dispatched this pass.
    #[inline]
    #[must_use]
    pub const fn is_dirty(self) -> bool {
        !matches!(self, Decision::Quiet)
    }
}

pub struct ChangeDetector {
    slots: [Slot; 3],
    config: DetectorConfig,
}

impl ChangeDetector {
    #[must_use]
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            slots: Device::ALL.map(Slot::idle),
            config,
        }
    }

    /// Decide whether `report` should go out this pass.
    pub fn evaluate(&mut self, report: &Report) -> Decision {
        let device = report.device();
        let threshold = self.config.keepalive_passes[device.index()];
        let slot = &mut self.slots[device.index()];

        if *report != slot.last_sent || report.has_motion() {
            return Decision::Changed;
        }

        if threshold == 0 {
            return Decision::Quiet;
        }
        slot.idle_passes = slot.idle_passes.saturating_add(1);
        if slot.idle_passes >= threshold {
            Decision::KeepAlive
        } else {
            Decision::Quiet
        }
    }

    /// Record a report the host accepted.
    pub fn commit(&mut self, report: &Report) {
        let slot = &mut self.slots[report.device().index()];
        slot.last_sent = *report;
        slot.idle_passes = 0;
    }

    /// Last report committed for `device`.
    #[must_use]
    pub fn last_sent(&self, device: Device) -> &Report {
        &self.slots[device.index()].last_sent
    }

    /// Forget everything sent so far (new host session).
    pub fn reset(&mut self) {
        self.slots = Device::ALL.map(Slot::idle);
    }
}

impl Default for ChangeDetector {
    fn default() -> Self {
        Self::new(DetectorConfig::default())
    }
}
