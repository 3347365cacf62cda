//! Host connection lifecycle and status indicator policy.
//!
//! [`LinkState`] is written from the USB driver's event callback and read by
//! the main loop, so it is all atomics and every method is non-blocking.
//! [`LifecycleController`] lives in the main loop and turns the observed link
//! state into status indicator transitions.

use portable_atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

/// Events delivered by the USB transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UsbEvent {
    /// The host configured the device.
    Connected,
    /// The host deconfigured the device, the bus reset or VBUS went away.
    Disconnected,
    /// The in-flight report was taken by the host.
    ReportAcknowledged,
    /// The host suspended the bus.
    Suspended,
    /// Bus activity resumed.
    Resumed,
    /// The host enabled or disabled device-initiated remote wakeup.
    RemoteWakeupEnabled(bool),
    /// Transport-level error. Fatal conditions arrive as `Disconnected`.
    Error,
}

/// Transmit-side state of the connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ConnectionState {
    /// The host has not finished configuration.
    Unconfigured = 0,
    /// Configured, nothing in flight.
    Idle = 1,
    /// One report is in flight.
    Sending = 2,
}

impl ConnectionState {
    const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => ConnectionState::Idle,
            2 => ConnectionState::Sending,
            _ => ConnectionState::Unconfigured,
        }
    }

    /// True once the host has configured the device.
    #[inline]
    #[must_use]
    pub const fn is_configured(self) -> bool {
        !matches!(self, ConnectionState::Unconfigured)
    }
}

/// Connection flags shared between the USB callback and the main loop.
pub struct LinkState {
    state: AtomicU8,
    suspended: AtomicBool,
    remote_wakeup: AtomicBool,
    /// Bumped on every new configuration so reconnects are never missed.
    generation: AtomicU32,
}

impl LinkState {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(ConnectionState::Unconfigured as u8),
            suspended: AtomicBool::new(false),
            remote_wakeup: AtomicBool::new(false),
            generation: AtomicU32::new(0),
        }
    }

    /// React to a transport event. Safe to call from the driver callback.
    pub fn on_event(&self, event: UsbEvent) {
        match event {
            UsbEvent::Connected => {
                self.suspended.store(false, Ordering::Release);
                self.state
                    .store(ConnectionState::Idle as u8, Ordering::Release);
                self.generation.fetch_add(1, Ordering::AcqRel);
            }
            UsbEvent::Disconnected => {
                self.state
                    .store(ConnectionState::Unconfigured as u8, Ordering::Release);
            }
            UsbEvent::ReportAcknowledged => self.end_send(),
            UsbEvent::Suspended => self.suspended.store(true, Ordering::Release),
            UsbEvent::Resumed => self.suspended.store(false, Ordering::Release),
            UsbEvent::RemoteWakeupEnabled(enabled) => {
                self.remote_wakeup.store(enabled, Ordering::Release)
            }
            UsbEvent::Error => {}
        }
    }

    #[inline]
    #[must_use]
    pub fn connection(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    #[inline]
    #[must_use]
    pub fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::Acquire)
    }

    #[inline]
    #[must_use]
    pub fn remote_wakeup_enabled(&self) -> bool {
        self.remote_wakeup.load(Ordering::Acquire)
    }

    /// Configuration counter, incremented on every `Connected` event.
    #[inline]
    #[must_use]
    pub fn generation(&self) -> u32 {
        self.generation.load(Ordering::Acquire)
    }

    /// Claim the single in-flight slot (Idle -> Sending).
    ///
    /// On failure returns the state that prevented the claim.
    pub fn begin_send(&self) -> Result<(), ConnectionState> {
        self.state
            .compare_exchange(
                ConnectionState::Idle as u8,
                ConnectionState::Sending as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(|_| ())
            .map_err(ConnectionState::from_u8)
    }

    /// Release the in-flight slot (Sending -> Idle).
    ///
    /// A disconnect that raced the send wins: the state stays Unconfigured.
    pub fn end_send(&self) {
        let _ = self.state.compare_exchange(
            ConnectionState::Sending as u8,
            ConnectionState::Idle as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }
}

impl Default for LinkState {
    fn default() -> Self {
        Self::new()
    }
}

/// Tri-color status light.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Indicator {
    Off,
    /// Not configured, or bus suspended.
    Red,
    /// Configured and awake.
    Green,
    /// Program mode latched.
    Blue,
}

impl Indicator {
    /// Channel levels as (red, green, blue).
    #[must_use]
    pub const fn rgb(self) -> (bool, bool, bool) {
        match self {
            Indicator::Off => (false, false, false),
            Indicator::Red => (true, false, false),
            Indicator::Green => (false, true, false),
            Indicator::Blue => (false, false, true),
        }
    }

    /// Indicator color for a given link state and mode.
    #[must_use]
    pub const fn for_state(connection: ConnectionState, suspended: bool, program_mode: bool) -> Self {
        if program_mode {
            Indicator::Blue
        } else if !connection.is_configured() || suspended {
            Indicator::Red
        } else {
            Indicator::Green
        }
    }
}

/// What the main loop learned from one look at the link.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Observation {
    /// New indicator color, only when it changed.
    pub indicator: Option<Indicator>,
    /// The host configured the device since the previous observation.
    pub reconnected: bool,
}

/// Main-loop side of the lifecycle: tracks what was last shown.
pub struct LifecycleController {
    shown: Indicator,
    generation: u32,
}

impl LifecycleController {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            shown: Indicator::Off,
            generation: 0,
        }
    }

    /// Indicator currently displayed.
    #[inline]
    #[must_use]
    pub const fn shown(&self) -> Indicator {
        self.shown
    }

    /// Compare the link against the last observation.
    pub fn observe(&mut self, link: &LinkState, program_mode: bool) -> Observation {
        let generation = link.generation();
        let reconnected = generation != self.generation;
        self.generation = generation;

        let wanted = Indicator::for_state(link.connection(), link.is_suspended(), program_mode);
        let indicator = if wanted != self.shown {
            self.shown = wanted;
            Some(wanted)
        } else {
            None
        };

        Observation {
            indicator,
            reconnected,
        }
    }
}

impl Default for LifecycleController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_disconnect_cycle() {
        let link = LinkState::new();
        assert_eq!(link.connection(), ConnectionState::Unconfigured);
        link.on_event(UsbEvent::Connected);
        assert_eq!(link.connection(), ConnectionState::Idle);
        link.on_event(UsbEvent::Disconnected);
        assert_eq!(link.connection(), ConnectionState::Unconfigured);
    }

    #[test]
    fn test_single_in_flight_slot() {
        let link = LinkState::new();
        assert_eq!(link.begin_send(), Err(ConnectionState::Unconfigured));
        link.on_event(UsbEvent::Connected);
        assert_eq!(link.begin_send(), Ok(()));
        assert_eq!(link.begin_send(), Err(ConnectionState::Sending));
        link.on_event(UsbEvent::ReportAcknowledged);
        assert_eq!(link.connection(), ConnectionState::Idle);
        assert_eq!(link.begin_send(), Ok(()));
    }

    #[test]
    fn test_disconnect_during_send_wins() {
        let link = LinkState::new();
        link.on_event(UsbEvent::Connected);
        link.begin_send().unwrap();
        link.on_event(UsbEvent::Disconnected);
        link.end_send();
        assert_eq!(link.connection(), ConnectionState::Unconfigured);
    }

    #[test]
    fn test_connect_clears_suspend() {
        let link = LinkState::new();
        link.on_event(UsbEvent::Suspended);
        assert!(link.is_suspended());
        link.on_event(UsbEvent::Connected);
        assert!(!link.is_suspended());
        link.on_event(UsbEvent::Suspended);
        link.on_event(UsbEvent::Resumed);
        assert!(!link.is_suspended());
    }

    #[test]
    fn test_indicator_only_reports_transitions() {
        let link = LinkState::new();
        let mut controller = LifecycleController::new();

        assert_eq!(controller.observe(&link, false).indicator, Some(Indicator::Red));
        assert_eq!(controller.observe(&link, false).indicator, None);

        link.on_event(UsbEvent::Connected);
        let seen = controller.observe(&link, false);
        assert_eq!(seen.indicator, Some(Indicator::Green));
        assert!(seen.reconnected);
        assert!(!controller.observe(&link, false).reconnected);

        link.on_event(UsbEvent::Suspended);
        assert_eq!(controller.observe(&link, false).indicator, Some(Indicator::Red));
        link.on_event(UsbEvent::Resumed);
        assert_eq!(controller.observe(&link, false).indicator, Some(Indicator::Green));

        assert_eq!(controller.observe(&link, true).indicator, Some(Indicator::Blue));
        assert_eq!(controller.shown(), Indicator::Blue);
    }

    #[test]
    fn test_reconnect_seen_even_if_disconnect_missed() {
        let link = LinkState::new();
        let mut controller = LifecycleController::new();
        link.on_event(UsbEvent::Connected);
        controller.observe(&link, false);
        link.on_event(UsbEvent::Disconnected);
        link.on_event(UsbEvent::Connected);
        assert!(controller.observe(&link, false).reconnected);
    }

    #[test]
    fn test_indicator_colors() {
        assert_eq!(Indicator::Red.rgb(), (true, false, false));
        assert_eq!(Indicator::Green.rgb(), (false, true, false));
        assert_eq!(Indicator::Blue.rgb(), (false, false, true));
        assert_eq!(Indicator::Off.rgb(), (false, false, false));
    }
}
