//! Arcade panel to USB HID for RP2040.
//!
//! This crate provides the chip side of the panel: the shift-register switch
//! bank on GPIO, PIO spinner decoders, the status LED and the embassy-usb
//! HID transport. Sampling, debounce and dispatch live in `arcade_core`.

#![no_std]

// Re-export core types for convenience
pub use arcade_core::{
    config, EncoderCounter, Engine, Indicator, LinkState, PollOutcome, RawSampler,
    ShiftRegisterChain, Skipped, TickContext, TickOutcome,
};

pub mod encoder;
pub mod indicator;
pub mod usb;

use embassy_rp::gpio::{Input, Output};
use embassy_time::Delay;

pub use encoder::run_encoder;
pub use indicator::StatusLight;
pub use usb::{configure_usb_hid, UsbDriver, UsbEventHandler, UsbHidTransport, WakeSignal};

/// Number of switch lines wired to the shift-register chain.
pub const PANEL_LINES: u32 = 30;

/// The 74HC165 chain carrying every panel switch.
pub type PanelChain = ShiftRegisterChain<Output<'static>, Output<'static>, Input<'static>, Delay>;

/// Sampler over the panel chain and the two spinner counters.
pub type PanelSampler = RawSampler<'static, PanelChain, EncoderCounter>;
