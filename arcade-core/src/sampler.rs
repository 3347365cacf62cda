//! Raw sampler: one electrical snapshot of the panel per tick.
//!
//! Switches are idle-high (pulled up), so the sampler inverts the electrical
//! levels to get logical "pressed" bits. Each quadrature counter is read and
//! put back to its center value in the same step, which turns the absolute
//! counter into a relative delta.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use portable_atomic::{AtomicU32, Ordering};

use crate::inputs::InputLines;

/// Source of the electrical switch levels, bit-packed in [`InputLines`] order.
///
/// A set bit means the line reads high (switch open).
pub trait SwitchBank {
    type Error;

    /// Read every line once. Must not block beyond the bit-banging itself.
    fn read_levels(&mut self) -> Result<u32, Self::Error>;
}

/// A position counter driven by a quadrature decoder.
pub trait QuadratureCounter {
    /// Current absolute position.
    fn position(&self) -> u32;

    /// Overwrite the absolute position.
    fn set_position(&self, position: u32);

    /// Read the position and reset it to `center`, returning the old value.
    fn recenter(&self, center: u32) -> u32 {
        let position = self.position();
        self.set_position(center);
        position
    }
}

/// Wrapping quadrature position counter shared with an encoder decoder task.
///
/// Positions run `0..=limit` and wrap in both directions.
pub struct EncoderCounter {
    position: AtomicU32,
    limit: u32,
}

impl EncoderCounter {
    #[must_use]
    pub const fn new(limit: u32, start: u32) -> Self {
        let start = if start > limit { limit } else { start };
        Self {
            position: AtomicU32::new(start),
            limit,
        }
    }

    /// Wrap limit of this counter.
    #[inline]
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Advance one quadrature count in the given direction.
    pub fn step(&self, forward: bool) {
        let limit = self.limit;
        let _ = self
            .position
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |p| {
                Some(match (forward, p) {
                    (true, p) if p >= limit => 0,
                    (true, p) => p + 1,
                    (false, 0) => limit,
                    (false, p) => p - 1,
                })
            });
    }
}

impl QuadratureCounter for EncoderCounter {
    fn position(&self) -> u32 {
        self.position.load(Ordering::Acquire)
    }

    fn set_position(&self, position: u32) {
        self.position
            .store(position.min(self.limit), Ordering::Release);
    }

    /// Swap in the center so counts landing between read and reset are kept.
    fn recenter(&self, center: u32) -> u32 {
        self.position.swap(center.min(self.limit), Ordering::AcqRel)
    }
}

/// Error from a [`ShiftRegisterChain`] pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ShiftError {
    /// Parallel-load line could not be driven.
    Load,
    /// Shift clock could not be driven.
    Clock,
    /// Serial data line could not be read.
    Data,
}

/// Half period of the load and clock pulses.
const PULSE_NS: u32 = 200;

/// Daisy-chained parallel-in/serial-out shift registers (74HC165 style).
///
/// `load` is the active-low parallel load, `clock` shifts on its rising edge
/// and `data` is the serial output of the last register in the chain. The
/// first bit clocked out becomes bit 0 of the returned levels.
pub struct ShiftRegisterChain<L, C, Q, D> {
    load: L,
    clock: C,
    data: Q,
    delay: D,
    bits: u32,
}

impl<L, C, Q, D> ShiftRegisterChain<L, C, Q, D>
where
    L: OutputPin,
    C: OutputPin,
    Q: InputPin,
    D: DelayNs,
{
    /// Create a chain reading `bits` lines (at most 32).
    pub fn new(load: L, clock: C, data: Q, delay: D, bits: u32) -> Self {
        Self {
            load,
            clock,
            data,
            delay,
            bits: bits.min(32),
        }
    }
}

impl<L, C, Q, D> SwitchBank for ShiftRegisterChain<L, C, Q, D>
where
    L: OutputPin,
    C: OutputPin,
    Q: InputPin,
    D: DelayNs,
{
    type Error = ShiftError;

    fn read_levels(&mut self) -> Result<u32, ShiftError> {
        self.clock.set_low().map_err(|_| ShiftError::Clock)?;
        self.load.set_low().map_err(|_| ShiftError::Load)?;
        self.delay.delay_ns(PULSE_NS);
        self.load.set_high().map_err(|_| ShiftError::Load)?;
        self.delay.delay_ns(PULSE_NS);

        let mut levels = 0u32;
        for bit in 0..self.bits {
            if self.data.is_high().map_err(|_| ShiftError::Data)? {
                levels |= 1 << bit;
            }
            self.clock.set_high().map_err(|_| ShiftError::Clock)?;
            self.delay.delay_ns(PULSE_NS);
            self.clock.set_low().map_err(|_| ShiftError::Clock)?;
            self.delay.delay_ns(PULSE_NS);
        }

        // Lines past the end of the chain read as open.
        if self.bits < 32 {
            levels |= u32::MAX << self.bits;
        }
        Ok(levels)
    }
}

/// One tick's unprocessed reading.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawSample {
    /// Logical switch state (already inverted from the electrical levels).
    pub lines: InputLines,
    /// Centered encoder deltas (X, Y), unscaled.
    pub motion: [i32; 2],
}

/// Reads the switch bank and both encoders once per tick.
pub struct RawSampler<'a, B, C> {
    bank: B,
    counters: [&'a C; 2],
    center: u32,
}

impl<'a, B, C> RawSampler<'a, B, C>
where
    B: SwitchBank,
    C: QuadratureCounter,
{
    #[must_use]
    pub fn new(bank: B, x: &'a C, y: &'a C, center: u32) -> Self {
        Self {
            bank,
            counters: [x, y],
            center,
        }
    }

    /// Take one snapshot. The only side effect is recentering the counters.
    pub fn sample(&mut self) -> Result<RawSample, B::Error> {
        let levels = self.bank.read_levels()?;
        let center = self.center as i32;
        let motion = self
            .counters
            .map(|counter| counter.recenter(self.center) as i32 - center);
        Ok(RawSample {
            lines: InputLines::new(!levels),
            motion,
        })
    }

    /// Get a mutable reference to the switch bank.
    pub fn bank_mut(&mut self) -> &mut B {
        &mut self.bank
    }
}
