//! Report dispatcher and the transport trait it drives.

use core::future::Future;

use crate::config::MAX_BACKOFF_PASSES;
use crate::lifecycle::{ConnectionState, LinkState};
use crate::report::{Report, MAX_REPORT_SIZE};

/// Error type for transport operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// No free in-flight slot.
    Busy,
    /// The host did not take the report within the acknowledgement timeout.
    Timeout,
    /// Endpoint disabled (bus reset or deconfigured mid-transfer).
    Disabled,
    /// The host did not allow a remote wakeup.
    WakeRejected,
}

/// Error type for [`Dispatcher::send`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DispatchError {
    /// The host has not configured the device. Nothing was submitted.
    NotConfigured,
    /// The transport refused or failed the transfer.
    Transmit(TransportError),
}

/// Async trait for the HID interrupt-IN endpoint.
///
/// Implementations own the single in-flight slot of the device. `transmit`
/// completes when the host has taken the report, and must give up with
/// [`TransportError::Timeout`] after a bounded wait.
pub trait ReportTransport {
    /// Send one encoded report (report ID first).
    fn transmit(&mut self, report: &[u8]) -> impl Future<Output = Result<(), TransportError>>;

    /// Ask the bus to resume. Non-blocking; the wake itself happens later.
    fn remote_wakeup(&mut self) -> Result<(), TransportError>;
}

/// Encodes reports and pushes them through a [`ReportTransport`], one at a time.
///
/// After a timeout the dispatcher sits out a growing number of decision passes
/// so a stalled host cannot keep the main loop parked on acknowledgements.
#[derive(Debug, Default)]
pub struct Dispatcher {
    backoff: u8,
    skip: u8,
}

impl Dispatcher {
    #[must_use]
    pub const fn new() -> Self {
        Self { backoff: 0, skip: 0 }
    }

    /// True while passes are being skipped after a timeout.
    #[inline]
    #[must_use]
    pub const fn in_backoff(&self) -> bool {
        self.skip > 0
    }

    /// Account for one decision pass. Returns `false` if this pass must not dispatch.
    pub fn begin_pass(&mut self) -> bool {
        if self.skip > 0 {
            self.skip -= 1;
            false
        } else {
            true
        }
    }

    /// Send `report` and wait for the host to take it.
    ///
    /// The link must be at least Idle. The in-flight slot is claimed before the
    /// transfer and released after it, whatever the outcome.
    pub async fn send<T: ReportTransport>(
        &mut self,
        link: &LinkState,
        transport: &mut T,
        report: &Report,
    ) -> Result<(), DispatchError> {
        link.begin_send().map_err(|state| match state {
            ConnectionState::Unconfigured => DispatchError::NotConfigured,
            _ => DispatchError::Transmit(TransportError::Busy),
        })?;

        let mut buf = [0u8; MAX_REPORT_SIZE];
        let len = report.encode(&mut buf);
        let result = transport.transmit(&buf[..len]).await;
        link.end_send();

        match result {
            Ok(()) => {
                self.backoff = 0;
                self.skip = 0;
                Ok(())
            }
            Err(TransportError::Timeout) => {
                self.backoff = self.backoff.saturating_mul(2).clamp(1, MAX_BACKOFF_PASSES);
                self.skip = self.backoff;
                Err(DispatchError::Transmit(TransportError::Timeout))
            }
            Err(e) => Err(DispatchError::Transmit(e)),
        }
    }

    /// Request a remote wakeup if the host allows it.
    pub fn wake<T: ReportTransport>(
        &mut self,
        link: &LinkState,
        transport: &mut T,
    ) -> Result<(), TransportError> {
        if !link.remote_wakeup_enabled() {
            return Err(TransportError::WakeRejected);
        }
        transport.remote_wakeup()
    }
}
