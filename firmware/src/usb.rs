//! USB HID transport: report descriptor, the interrupt-IN writer and the bus
//! event handler.

use arcade_core::config::{ACK_TIMEOUT_MS, USB_HID_MAX_PACKET, USB_HID_POLL_MS};
use arcade_core::{LinkState, ReportTransport, TransportError, UsbEvent};
use defmt::{debug, info};
use embassy_rp::peripherals::USB;
use embassy_rp::usb::Driver;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{with_timeout, Duration};
use embassy_usb::class::hid::{HidBootProtocol, HidSubclass, HidWriter, State};
use embassy_usb::driver::EndpointError;
use embassy_usb::{Builder, Handler};

/// USB driver of the RP2040.
pub type UsbDriver = Driver<'static, USB>;

/// Remote wake requests from the main loop to the USB task.
pub type WakeSignal = Signal<CriticalSectionRawMutex, ()>;

/// Size of the interrupt-IN writer buffer (report ID + largest payload).
pub const HID_WRITER_SIZE: usize = 8;

/// HID report descriptor: two gamepads and a relative pointer, one report ID each.
///
/// ```text
/// ID 1  X,Y 2 bits each (-1..1), 4 pad, 12 buttons, 4 pad
/// ID 2  X,Y 2 bits each (-1..1), 4 pad, 8 buttons
/// ID 3  2 buttons, 6 pad, X,Y 8 bits each (-127..127, relative)
/// ```
pub const REPORT_DESCRIPTOR: &[u8] = &[
    // --- PadA ---
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x05, // Usage (Gamepad)
    0xA1, 0x01, // Collection (Application)
    0xA1, 0x00, //   Collection (Physical)
    0x85, 0x01, //     Report ID (1)
    0x05, 0x01, //     Usage Page (Generic Desktop)
    0x09, 0x30, //     Usage (X)
    0x09, 0x31, //     Usage (Y)
    0x15, 0xFF, //     Logical Minimum (-1)
    0x25, 0x01, //     Logical Maximum (1)
    0x75, 0x02, //     Report Size (2)
    0x95, 0x02, //     Report Count (2)
    0x81, 0x42, //     Input (Data, Variable, Absolute, No Null)
    0x75, 0x01, //     Report Size (1)
    0x95, 0x04, //     Report Count (4)
    0x81, 0x01, //     Input (Constant)
    0x05, 0x09, //     Usage Page (Button)
    0x19, 0x01, //     Usage Minimum (Button 1)
    0x29, 0x0C, //     Usage Maximum (Button 12)
    0x15, 0x00, //     Logical Minimum (0)
    0x25, 0x01, //     Logical Maximum (1)
    0x75, 0x01, //     Report Size (1)
    0x95, 0x0C, //     Report Count (12)
    0x81, 0x02, //     Input (Data, Variable, Absolute)
    0x75, 0x04, //     Report Size (4)
    0x95, 0x01, //     Report Count (1)
    0x81, 0x01, //     Input (Constant)
    0xC0, //   End Collection
    0xC0, // End Collection
    //
    // --- PadB ---
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x05, // Usage (Gamepad)
    0xA1, 0x01, // Collection (Application)
    0xA1, 0x00, //   Collection (Physical)
    0x85, 0x02, //     Report ID (2)
    0x05, 0x01, //     Usage Page (Generic Desktop)
    0x09, 0x30, //     Usage (X)
    0x09, 0x31, //     Usage (Y)
    0x15, 0xFF, //     Logical Minimum (-1)
    0x25, 0x01, //     Logical Maximum (1)
    0x75, 0x02, //     Report Size (2)
    0x95, 0x02, //     Report Count (2)
    0x81, 0x42, //     Input (Data, Variable, Absolute, No Null)
    0x75, 0x01, //     Report Size (1)
    0x95, 0x04, //     Report Count (4)
    0x81, 0x01, //     Input (Constant)
    0x05, 0x09, //     Usage Page (Button)
    0x19, 0x01, //     Usage Minimum (Button 1)
    0x29, 0x08, //     Usage Maximum (Button 8)
    0x15, 0x00, //     Logical Minimum (0)
    0x25, 0x01, //     Logical Maximum (1)
    0x75, 0x01, //     Report Size (1)
    0x95, 0x08, //     Report Count (8)
    0x81, 0x02, //     Input (Data, Variable, Absolute)
    0xC0, //   End Collection
    0xC0, // End Collection
    //
    // --- Pointer ---
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x02, // Usage (Mouse)
    0xA1, 0x01, // Collection (Application)
    0x09, 0x01, //   Usage (Pointer)
    0xA1, 0x00, //   Collection (Physical)
    0x85, 0x03, //     Report ID (3)
    0x05, 0x09, //     Usage Page (Button)
    0x19, 0x01, //     Usage Minimum (Button 1)
    0x29, 0x02, //     Usage Maximum (Button 2)
    0x15, 0x00, //     Logical Minimum (0)
    0x25, 0x01, //     Logical Maximum (1)
    0x75, 0x01, //     Report Size (1)
    0x95, 0x02, //     Report Count (2)
    0x81, 0x02, //     Input (Data, Variable, Absolute)
    0x75, 0x06, //     Report Size (6)
    0x95, 0x01, //     Report Count (1)
    0x81, 0x01, //     Input (Constant)
    0x05, 0x01, //     Usage Page (Generic Desktop)
    0x09, 0x30, //     Usage (X)
    0x09, 0x31, //     Usage (Y)
    0x15, 0x81, //     Logical Minimum (-127)
    0x25, 0x7F, //     Logical Maximum (127)
    0x75, 0x08, //     Report Size (8)
    0x95, 0x02, //     Report Count (2)
    0x81, 0x06, //     Input (Data, Variable, Relative)
    0xC0, //   End Collection
    0xC0, // End Collection
];

/// Interrupt-IN transport.
///
/// Wraps an embassy-usb HID writer and bounds every transfer with
/// [`ACK_TIMEOUT_MS`]. The write completes once the host has polled the
/// endpoint, which is the acknowledgement the dispatcher waits for.
pub struct UsbHidTransport<'d> {
    writer: HidWriter<'d, Driver<'d, USB>, HID_WRITER_SIZE>,
    link: &'d LinkState,
    wake: &'d WakeSignal,
}

impl<'d> UsbHidTransport<'d> {
    pub fn new(
        writer: HidWriter<'d, Driver<'d, USB>, HID_WRITER_SIZE>,
        link: &'d LinkState,
        wake: &'d WakeSignal,
    ) -> Self {
        Self { writer, link, wake }
    }

    /// Wait until the host has configured the endpoint.
    pub async fn wait_ready(&mut self) {
        self.writer.ready().await;
    }
}

impl ReportTransport for UsbHidTransport<'_> {
    async fn transmit(&mut self, report: &[u8]) -> Result<(), TransportError> {
        let timeout = Duration::from_millis(ACK_TIMEOUT_MS);
        match with_timeout(timeout, self.writer.write(report)).await {
            Ok(Ok(())) => {
                self.link.on_event(UsbEvent::ReportAcknowledged);
                Ok(())
            }
            Ok(Err(EndpointError::Disabled)) => Err(TransportError::Disabled),
            Ok(Err(EndpointError::BufferOverflow)) => Err(TransportError::Busy),
            Err(_) => Err(TransportError::Timeout),
        }
    }

    fn remote_wakeup(&mut self) -> Result<(), TransportError> {
        self.wake.signal(());
        Ok(())
    }
}

/// Forwards USB bus callbacks to the shared [`LinkState`].
///
/// Runs inside the USB task; every callback only stores atomics.
pub struct UsbEventHandler {
    link: &'static LinkState,
}

impl UsbEventHandler {
    pub const fn new(link: &'static LinkState) -> Self {
        Self { link }
    }

    fn post(&self, event: UsbEvent) {
        debug!("USB event: {:?}", event);
        self.link.on_event(event);
    }
}

impl Handler for UsbEventHandler {
    fn enabled(&mut self, enabled: bool) {
        if !enabled {
            info!("USB disabled");
            self.post(UsbEvent::Disconnected);
        }
    }

    fn reset(&mut self) {
        self.post(UsbEvent::Disconnected);
    }

    fn configured(&mut self, configured: bool) {
        if configured {
            info!("USB configured");
            self.post(UsbEvent::Connected);
        } else {
            info!("USB deconfigured");
            self.post(UsbEvent::Disconnected);
        }
    }

    fn suspended(&mut self, suspended: bool) {
        if suspended {
            info!("USB suspended");
            self.post(UsbEvent::Suspended);
        } else {
            info!("USB resumed");
            self.post(UsbEvent::Resumed);
        }
    }

    fn remote_wakeup_enabled(&mut self, enabled: bool) {
        self.post(UsbEvent::RemoteWakeupEnabled(enabled));
    }
}

/// Configure the HID class in the USB builder.
///
/// Returns the HID writer for the interrupt-IN endpoint.
pub fn configure_usb_hid<'d>(
    builder: &mut Builder<'d, Driver<'d, USB>>,
    state: &'d mut State<'d>,
) -> HidWriter<'d, Driver<'d, USB>, HID_WRITER_SIZE> {
    let config = embassy_usb::class::hid::Config {
        report_descriptor: REPORT_DESCRIPTOR,
        request_handler: None,
        poll_ms: USB_HID_POLL_MS,
        max_packet_size: USB_HID_MAX_PACKET,
        hid_subclass: HidSubclass::No,
        hid_boot_protocol: HidBootProtocol::None,
    };

    HidWriter::new(builder, state, config)
}
