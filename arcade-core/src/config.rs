//! Compile-time configuration.
//!
//! Timing, filter depths and USB identity live here so they can be tuned in
//! one place. The debounce window and the keep-alive counter are deliberately
//! separate constants: the first filters raw electrical noise, the second
//! governs how often an unchanged report is re-sent.

/// Period of the sampling tick in microseconds (1 kHz).
pub const TICK_PERIOD_US: u64 = 1_000;

/// Number of ticks between two decision passes of the main loop.
///
/// Ticks that elapse while the main loop is busy are coalesced into one pass.
pub const DECISION_TICKS: u32 = 8;

/// Depth of the raw debounce window, in ticks.
///
/// A switch must read pressed in every one of the last `DEBOUNCE_WINDOW`
/// samples before it is reported pressed.
pub const DEBOUNCE_WINDOW: usize = 5;

/// Number of consecutive unchanged decision passes after which a device's
/// last report is sent again as a keep-alive.
pub const KEEPALIVE_PASSES: u16 = 5;

/// Integer gain applied to centered encoder readings before reporting.
pub const MOTION_SCALE: i32 = 2;

/// Counter value the quadrature counters are recentered to after each read.
pub const ENCODER_CENTER: u32 = 127;

/// Wrap limit of the quadrature counters (positions run `0..=ENCODER_LIMIT`).
pub const ENCODER_LIMIT: u32 = 255;

/// Upper bound on the wait for the host to take a queued report.
pub const ACK_TIMEOUT_MS: u64 = 50;

/// Longest run of passes skipped after repeated transmit timeouts.
pub const MAX_BACKOFF_PASSES: u8 = 8;

// USB identity

/// pid.codes test VID/PID. Replace with an allocated pair for production.
pub const USB_VID: u16 = 0x1209;
pub const USB_PID: u16 = 0x0001;

pub const USB_MANUFACTURER: &str = "Rust Arcade";
pub const USB_PRODUCT: &str = "Arcade Panel (2 pads + spinner)";
pub const USB_SERIAL_NUMBER: &str = "001";

/// Interrupt-IN polling interval requested from the host (ms).
pub const USB_HID_POLL_MS: u8 = 1;

/// Maximum packet size of the interrupt-IN endpoint.
pub const USB_HID_MAX_PACKET: u16 = 8;
