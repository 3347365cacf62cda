//! Debounce filter for the switches and gain stage for the encoders.
//!
//! [`DebounceHistory`] is a fixed-depth ring of raw [`InputLines`] words. It
//! is written from the tick interrupt and read from the main loop, so every
//! slot is an atomic and there is exactly one writer. A channel settles to
//! "pressed" only when it was pressed in every slot of the ring.

use portable_atomic::{AtomicU32, AtomicUsize, Ordering};

use crate::inputs::InputLines;

/// Rolling window of raw switch samples, collapsed with a bitwise AND.
///
/// The ring starts zeroed, so every channel reads released until it has been
/// seen pressed for a full window.
pub struct DebounceHistory<const N: usize> {
    slots: [AtomicU32; N],
    /// Next slot to overwrite.
    head: AtomicUsize,
    /// Number of samples pushed, saturating at `N`.
    filled: AtomicUsize,
}

impl<const N: usize> DebounceHistory<N> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: [const { AtomicU32::new(0) }; N],
            head: AtomicUsize::new(0),
            filled: AtomicUsize::new(0),
        }
    }

    /// Depth of the window.
    #[inline]
    #[must_use]
    pub const fn window(&self) -> usize {
        N
    }

    /// Shift one raw sample into the ring (tick context, single writer).
    ///
    /// Returns the settled value once the window is full, `None` before that.
    pub fn push(&self, raw: InputLines) -> Option<InputLines> {
        let head = self.head.load(Ordering::Relaxed);
        self.slots[head].store(raw.raw(), Ordering::Release);
        self.head.store((head + 1) % N, Ordering::Relaxed);
        if self.filled.load(Ordering::Relaxed) < N {
            self.filled.fetch_add(1, Ordering::Release);
        }
        self.settled()
    }

    /// True once `N` samples have been pushed.
    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.filled.load(Ordering::Acquire) >= N
    }

    /// AND of every slot, or `None` while the window is still filling.
    #[must_use]
    pub fn settled(&self) -> Option<InputLines> {
        if !self.is_full() {
            return None;
        }
        let bits = self
            .slots
            .iter()
            .fold(InputLines::MASK, |acc, slot| acc & slot.load(Ordering::Acquire));
        Some(InputLines::new(bits))
    }

    /// Forget every sample and start filling again.
    pub fn clear(&self) {
        for slot in &self.slots {
            slot.store(0, Ordering::Relaxed);
        }
        self.head.store(0, Ordering::Relaxed);
        self.filled.store(0, Ordering::Release);
    }
}

impl<const N: usize> Default for DebounceHistory<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Scales centered encoder readings into report-sized relative motion.
///
/// Motion is continuous, so there is no debounce. Scaled motion beyond the
/// report range is carried into the next pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotionFilter {
    scale: i32,
    residual: [i32; 2],
}

impl MotionFilter {
    /// Largest magnitude a relative axis can carry on the wire.
    pub const AXIS_LIMIT: i32 = 127;

    #[must_use]
    pub const fn new(scale: i32) -> Self {
        Self {
            scale,
            residual: [0, 0],
        }
    }

    /// Convert accumulated raw deltas into one pass worth of motion.
    pub fn apply(&mut self, raw: [i32; 2]) -> [i8; 2] {
        let mut out = [0i8; 2];
        for axis in 0..2 {
            let total = raw[axis]
                .saturating_mul(self.scale)
                .saturating_add(self.residual[axis]);
            let sent = total.clamp(-Self::AXIS_LIMIT, Self::AXIS_LIMIT);
            self.residual[axis] = total - sent;
            out[axis] = sent as i8;
        }
        out
    }

    /// Put motion that could not be sent back into the carry.
    pub fn carry(&mut self, unsent: [i8; 2]) {
        for (residual, delta) in self.residual.iter_mut().zip(unsent) {
            *residual += i32::from(delta);
        }
    }

    /// Drop any carried motion.
    pub fn reset(&mut self) {
        self.residual = [0, 0];
    }
}
