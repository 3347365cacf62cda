//! Wire layout of the three numbered HID input reports.
//!
//! ```text
//! Report 1 (PadA, 3 bytes)
//!   byte 0: bits 0-1 X (-1/0/1), bits 2-3 Y (-1/0/1), bits 4-7 padding
//!   byte 1: buttons 1-8
//!   byte 2: bits 0-3 buttons 9-12, bits 4-7 padding
//!
//! Report 2 (PadB, 2 bytes)
//!   byte 0: bits 0-1 X, bits 2-3 Y, bits 4-7 padding
//!   byte 1: buttons 1-8
//!
//! Report 3 (Pointer, 3 bytes)
//!   byte 0: bits 0-1 buttons 1-2, bits 2-7 padding
//!   byte 1: relative X (-127..=127)
//!   byte 2: relative Y (-127..=127)
//! ```
//!
//! Axis fields are 2-bit two's complement, so -1 is `0b11`.

use crate::inputs::{Device, PadState, PointerState};

/// Largest encoded report including the report ID prefix.
pub const MAX_REPORT_SIZE: usize = 4;

/// A report ready to be serialized for one device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Report {
    PadA(PadState),
    PadB(PadState),
    Pointer(PointerState),
}

impl Report {
    /// Idle report for a device (centered, nothing pressed, no motion).
    #[must_use]
    pub const fn idle(device: Device) -> Self {
        match device {
            Device::PadA => Report::PadA(PadState::NEUTRAL),
            Device::PadB => Report::PadB(PadState::NEUTRAL),
            Device::Pointer => Report::Pointer(PointerState::IDLE),
        }
    }

    /// The device this report belongs to.
    #[must_use]
    pub const fn device(&self) -> Device {
        match self {
            Report::PadA(_) => Device::PadA,
            Report::PadB(_) => Device::PadB,
            Report::Pointer(_) => Device::Pointer,
        }
    }

    /// Numeric report ID used to multiplex the devices on one endpoint.
    #[must_use]
    pub const fn report_id(&self) -> u8 {
        match self {
            Report::PadA(_) => 1,
            Report::PadB(_) => 2,
            Report::Pointer(_) => 3,
        }
    }

    /// Payload length in bytes, without the report ID.
    #[must_use]
    pub const fn payload_len(&self) -> usize {
        match self {
            Report::PadA(_) => 3,
            Report::PadB(_) => 2,
            Report::Pointer(_) => 3,
        }
    }

    /// True if the report carries relative motion that must not be coalesced.
    #[must_use]
    pub const fn has_motion(&self) -> bool {
        match self {
            Report::Pointer(p) => p.has_motion(),
            _ => false,
        }
    }

    /// Write the payload bytes (no report ID) into `buf`.
    ///
    /// Returns the number of bytes written, or 0 if `buf` is too small.
    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        let len = self.payload_len();
        if buf.len() < len {
            return 0;
        }
        match self {
            Report::PadA(pad) => {
                buf[0] = direction_byte(pad);
                buf[1] = (pad.buttons.raw() & 0xFF) as u8;
                buf[2] = ((pad.buttons.raw() >> 8) & 0x0F) as u8;
            }
            Report::PadB(pad) => {
                buf[0] = direction_byte(pad);
                buf[1] = (pad.buttons.raw() & 0xFF) as u8;
            }
            Report::Pointer(p) => {
                buf[0] = p.buttons & 0x03;
                buf[1] = p.dx as u8;
                buf[2] = p.dy as u8;
            }
        }
        len
    }

    /// Write the report ID followed by the payload into `buf`.
    ///
    /// Returns the number of bytes written, or 0 if `buf` is too small.
    pub fn encode(&self, buf: &mut [u8]) -> usize {
        if buf.len() < self.payload_len() + 1 {
            return 0;
        }
        buf[0] = self.report_id();
        1 + self.serialize(&mut buf[1..])
    }
}

/// Pack the two 2-bit axis fields of a pad into the low nibble.
fn direction_byte(pad: &PadState) -> u8 {
    let x = (pad.directions.x_axis() as u8) & 0b11;
    let y = (pad.directions.y_axis() as u8) & 0b11;
    x | (y << 2)
}
