//! The two halves of the polling engine.
//!
//! [`TickContext`] is the state the fixed-rate tick writes: the debounce ring,
//! accumulated encoder motion, an elapsed-tick counter and the program-mode
//! latch. Everything in it is atomic so the tick can run at interrupt
//! priority while the main loop reads it.
//!
//! [`Engine`] is owned by the main loop. Each [`Engine::poll`] is one decision
//! pass over however many ticks elapsed: it builds the three reports from the
//! settled lines, asks the detector which ones are due and dispatches those,
//! one at a time, in [`Device::ALL`] order.

use portable_atomic::{AtomicBool, AtomicI32, AtomicU32, Ordering};

use crate::config::{DEBOUNCE_WINDOW, MOTION_SCALE};
use crate::debounce::{DebounceHistory, MotionFilter};
use crate::detector::{ChangeDetector, Decision, DetectorConfig};
use crate::dispatch::{DispatchError, Dispatcher, ReportTransport, TransportError};
use crate::inputs::{Device, InputLines, PointerState};
use crate::lifecycle::{Indicator, LifecycleController, LinkState};
use crate::report::Report;
use crate::sampler::{QuadratureCounter, RawSampler, SwitchBank};

/// What a single tick did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TickOutcome {
    /// Lines and encoders were sampled.
    Sampled,
    /// The switch bank could not be read; nothing was recorded.
    SampleFailed,
    /// The escape input was seen on this tick and program mode latched.
    EnteredProgramMode,
    /// Program mode was already latched; nothing was sampled.
    Halted,
}

/// State written by the tick, read by the main loop.
pub struct TickContext<const N: usize = DEBOUNCE_WINDOW> {
    history: DebounceHistory<N>,
    motion: [AtomicI32; 2],
    elapsed: AtomicU32,
    program_mode: AtomicBool,
    sample_errors: AtomicU32,
}

impl<const N: usize> TickContext<N> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            history: DebounceHistory::new(),
            motion: [AtomicI32::new(0), AtomicI32::new(0)],
            elapsed: AtomicU32::new(0),
            program_mode: AtomicBool::new(false),
            sample_errors: AtomicU32::new(0),
        }
    }

    /// Run one tick. Never blocks beyond the switch bank read.
    ///
    /// The escape input bypasses the debounce window: one active tick latches
    /// program mode for good.
    pub fn on_tick<B, C>(&self, escape_active: bool, sampler: &mut RawSampler<'_, B, C>) -> TickOutcome
    where
        B: SwitchBank,
        C: QuadratureCounter,
    {
        if self.program_mode.load(Ordering::Acquire) {
            return TickOutcome::Halted;
        }
        if escape_active {
            self.program_mode.store(true, Ordering::Release);
            return TickOutcome::EnteredProgramMode;
        }

        let outcome = match sampler.sample() {
            Ok(sample) => {
                self.history.push(sample.lines);
                for (acc, delta) in self.motion.iter().zip(sample.motion) {
                    acc.fetch_add(delta, Ordering::AcqRel);
                }
                TickOutcome::Sampled
            }
            Err(_) => {
                self.sample_errors.fetch_add(1, Ordering::Relaxed);
                TickOutcome::SampleFailed
            }
        };
        self.elapsed.fetch_add(1, Ordering::AcqRel);
        outcome
    }

    /// Ticks since the last successful [`take_elapsed`](Self::take_elapsed).
    #[inline]
    #[must_use]
    pub fn elapsed(&self) -> u32 {
        self.elapsed.load(Ordering::Acquire)
    }

    /// Claim the elapsed ticks once at least `threshold` have accumulated.
    ///
    /// Several late ticks coalesce into one pass.
    pub fn take_elapsed(&self, threshold: u32) -> Option<u32> {
        if self.elapsed.load(Ordering::Acquire) < threshold {
            return None;
        }
        Some(self.elapsed.swap(0, Ordering::AcqRel))
    }

    /// True once the escape input latched program mode.
    #[inline]
    #[must_use]
    pub fn program_mode(&self) -> bool {
        self.program_mode.load(Ordering::Acquire)
    }

    /// Debounced lines, `None` until the window has filled.
    #[must_use]
    pub fn settled(&self) -> Option<InputLines> {
        self.history.settled()
    }

    /// Drain the encoder motion accumulated since the last call.
    pub fn take_motion(&self) -> [i32; 2] {
        [
            self.motion[0].swap(0, Ordering::AcqRel),
            self.motion[1].swap(0, Ordering::AcqRel),
        ]
    }

    /// Number of ticks whose switch read failed.
    #[must_use]
    pub fn sample_errors(&self) -> u32 {
        self.sample_errors.load(Ordering::Relaxed)
    }
}

impl<const N: usize> Default for TickContext<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Why a pass ended without looking at the reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Skipped {
    /// Program mode latched.
    ProgramMode,
    /// Host has not configured the device.
    NotConfigured,
    /// Sitting out passes after a transmit timeout.
    Backoff,
    /// Debounce window still filling.
    Settling,
}

/// Result of one [`Engine::poll`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PollOutcome {
    /// New indicator color, when it changed this pass.
    pub indicator: Option<Indicator>,
    /// A new host session started; sent state was resynchronized.
    pub reconnected: bool,
    /// Set if the pass stopped early.
    pub skipped: Option<Skipped>,
    /// Bitmask of devices dispatched this pass (bit = [`Device::index`]).
    pub sent: u8,
    /// Result of the remote wake request, if one was issued.
    pub wake: Option<Result<(), TransportError>>,
    /// First dispatch failure; it ends the pass.
    pub error: Option<DispatchError>,
}

impl PollOutcome {
    /// True if `device` was dispatched this pass.
    #[must_use]
    pub const fn was_sent(&self, device: Device) -> bool {
        self.sent & (1 << device.index()) != 0
    }

    fn skip(mut self, reason: Skipped) -> Self {
        self.skipped = Some(reason);
        self
    }
}

/// Main-loop half of the engine.
pub struct Engine {
    detector: ChangeDetector,
    dispatcher: Dispatcher,
    motion: MotionFilter,
    lifecycle: LifecycleController,
}

impl Engine {
    #[must_use]
    pub fn new(detector: DetectorConfig, motion_scale: i32) -> Self {
        Self {
            detector: ChangeDetector::new(detector),
            dispatcher: Dispatcher::new(),
            motion: MotionFilter::new(motion_scale),
            lifecycle: LifecycleController::new(),
        }
    }

    /// Run one decision pass.
    pub async fn poll<T, const N: usize>(
        &mut self,
        ctx: &TickContext<N>,
        link: &LinkState,
        transport: &mut T,
    ) -> PollOutcome
    where
        T: ReportTransport,
    {
        let program_mode = ctx.program_mode();
        let observed = self.lifecycle.observe(link, program_mode);
        let mut outcome = PollOutcome {
            indicator: observed.indicator,
            reconnected: observed.reconnected,
            ..PollOutcome::default()
        };

        if observed.reconnected {
            self.detector.reset();
            self.motion.reset();
        }
        if program_mode {
            return outcome.skip(Skipped::ProgramMode);
        }
        if !link.connection().is_configured() {
            // Nobody to report motion to.
            ctx.take_motion();
            return outcome.skip(Skipped::NotConfigured);
        }
        if !self.dispatcher.begin_pass() {
            return outcome.skip(Skipped::Backoff);
        }
        let Some(lines) = ctx.settled() else {
            return outcome.skip(Skipped::Settling);
        };

        let [dx, dy] = self.motion.apply(ctx.take_motion());
        let reports = [
            Report::PadA(lines.pad_a()),
            Report::PadB(lines.pad_b()),
            Report::Pointer(PointerState {
                buttons: lines.pointer_buttons(),
                dx,
                dy,
            }),
        ];

        let mut pending = reports.iter();
        while let Some(report) = pending.next() {
            match self.detector.evaluate(report) {
                Decision::Quiet => continue,
                // Keep-alives alone never wake a sleeping host.
                Decision::KeepAlive if link.is_suspended() => continue,
                _ => {}
            }

            if link.is_suspended() && outcome.wake.is_none() {
                outcome.wake = Some(self.dispatcher.wake(link, transport));
            }

            match self.dispatcher.send(link, transport, report).await {
                Ok(()) => {
                    self.detector.commit(report);
                    outcome.sent |= 1 << report.device().index();
                }
                Err(e) => {
                    outcome.error = Some(e);
                    // Unsent motion goes out with the next pass.
                    for unsent in core::iter::once(report).chain(pending.by_ref()) {
                        if let Report::Pointer(p) = unsent {
                            self.motion.carry([p.dx, p.dy]);
                        }
                    }
                    break;
                }
            }
        }

        outcome
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(DetectorConfig::default(), MOTION_SCALE)
    }
}
