//! Platform-agnostic input sampling, debounce and HID report dispatch for an
//! arcade panel: two digital gamepads and one relative pointer multiplexed on
//! a single interrupt-IN endpoint.
//!
//! # Overview
//!
//! Data flows leaf-first through these modules:
//!
//! - [`sampler`]: one electrical snapshot per tick ([`RawSampler`], [`SwitchBank`])
//! - [`debounce`]: rolling AND window and motion gain ([`DebounceHistory`], [`MotionFilter`])
//! - [`detector`]: decides which devices are due ([`ChangeDetector`])
//! - [`report`]: bit-exact wire layout ([`Report`])
//! - [`dispatch`]: one report in flight at a time ([`Dispatcher`], [`ReportTransport`])
//! - [`lifecycle`]: host connection state and status indicator ([`LinkState`])
//! - [`engine`]: ties the tick and the decision pass together ([`TickContext`], [`Engine`])
//!
//! The tick side ([`TickContext::on_tick`]) only touches atomics and can run
//! at interrupt priority. The decision side ([`Engine::poll`]) runs in the main
//! loop and awaits the transport.
//!
//! # Example
//!
//! ```rust
//! use arcade_core::{EncoderCounter, InputLines, RawSampler, SwitchBank, TickContext};
//!
//! struct Idle;
//!
//! impl SwitchBank for Idle {
//!     type Error = ();
//!     fn read_levels(&mut self) -> Result<u32, ()> {
//!         Ok(u32::MAX) // every line pulled high
//!     }
//! }
//!
//! let x = EncoderCounter::new(255, 127);
//! let y = EncoderCounter::new(255, 127);
//! let mut sampler = RawSampler::new(Idle, &x, &y, 127);
//! let ticks = TickContext::<5>::new();
//! for _ in 0..5 {
//!     ticks.on_tick(false, &mut sampler);
//! }
//! assert_eq!(ticks.settled(), Some(InputLines::NONE));
//! ```
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Enable defmt formatting (for embedded logging)

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

pub mod config;
pub mod debounce;
pub mod detector;
pub mod dispatch;
pub mod engine;
pub mod inputs;
pub mod lifecycle;
pub mod report;
pub mod sampler;

#[cfg(test)]
mod testing;

// Re-export main types at crate root
pub use debounce::{DebounceHistory, MotionFilter};
pub use detector::{ChangeDetector, Decision, DetectorConfig};
pub use dispatch::{DispatchError, Dispatcher, ReportTransport, TransportError};
pub use engine::{Engine, PollOutcome, Skipped, TickContext, TickOutcome};
pub use inputs::{Device, Directions, InputLines, PadButtons, PadState, PointerState};
pub use lifecycle::{
    ConnectionState, Indicator, LifecycleController, LinkState, Observation, UsbEvent,
};
pub use report::{Report, MAX_REPORT_SIZE};
pub use sampler::{
    EncoderCounter, QuadratureCounter, RawSample, RawSampler, ShiftError, ShiftRegisterChain,
    SwitchBank,
};
