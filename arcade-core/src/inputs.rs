//! Logical input set: the bit-packed channel word and the per-device views of it.
//!
//! All switches of the panel are carried in one [`InputLines`] word. The
//! layout groups channels exactly the way the wire reports group them:
//!
//! ```text
//! bit  0..=3   PadA  Left, Right, Up, Down
//! bit  4..=15  PadA  buttons 1-12
//! bit 16..=19  PadB  Left, Right, Up, Down
//! bit 20..=27  PadB  buttons 1-8
//! bit 28..=29  Pointer buttons 1-2
//! bit 30..=31  unused
//! ```
//!
//! A set bit means the channel is logically active (switch closed).

use core::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

/// Bit-packed logical state of every switch on the panel.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InputLines(pub u32);

impl InputLines {
    /// Mask of every bit that carries a channel.
    pub const MASK: u32 = 0x3FFF_FFFF;

    const PAD_A_DIR_SHIFT: u32 = 0;
    const PAD_A_BUTTON_SHIFT: u32 = 4;
    const PAD_B_DIR_SHIFT: u32 = 16;
    const PAD_B_BUTTON_SHIFT: u32 = 20;
    const POINTER_BUTTON_SHIFT: u32 = 28;

    /// Nothing pressed.
    pub const NONE: Self = Self(0);

    /// Build a word from raw bits, dropping the unused positions.
    #[inline]
    #[must_use]
    pub const fn new(bits: u32) -> Self {
        Self(bits & Self::MASK)
    }

    /// Get the raw u32 value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Check if no channel is active.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Bit of PadA button `n` (1-based, 1..=12).
    #[inline]
    #[must_use]
    pub const fn pad_a_button(n: u8) -> Self {
        Self(1 << (Self::PAD_A_BUTTON_SHIFT + n as u32 - 1))
    }

    /// Bit of PadB button `n` (1-based, 1..=8).
    #[inline]
    #[must_use]
    pub const fn pad_b_button(n: u8) -> Self {
        Self(1 << (Self::PAD_B_BUTTON_SHIFT + n as u32 - 1))
    }

    /// Bit of pointer button `n` (1-based, 1..=2).
    #[inline]
    #[must_use]
    pub const fn pointer_button(n: u8) -> Self {
        Self(1 << (Self::POINTER_BUTTON_SHIFT + n as u32 - 1))
    }

    /// PadA direction switch bits.
    #[inline]
    #[must_use]
    pub const fn pad_a_direction(dir: Directions) -> Self {
        Self((dir.0 as u32) << Self::PAD_A_DIR_SHIFT)
    }

    /// PadB direction switch bits.
    #[inline]
    #[must_use]
    pub const fn pad_b_direction(dir: Directions) -> Self {
        Self((dir.0 as u32) << Self::PAD_B_DIR_SHIFT)
    }

    /// Extract the PadA view (4 directions, 12 buttons).
    #[must_use]
    pub const fn pad_a(self) -> PadState {
        PadState {
            directions: Directions(((self.0 >> Self::PAD_A_DIR_SHIFT) & 0x0F) as u8),
            buttons: PadButtons(((self.0 >> Self::PAD_A_BUTTON_SHIFT) & 0x0FFF) as u16),
        }
    }

    /// Extract the PadB view (4 directions, 8 buttons).
    #[must_use]
    pub const fn pad_b(self) -> PadState {
        PadState {
            directions: Directions(((self.0 >> Self::PAD_B_DIR_SHIFT) & 0x0F) as u8),
            buttons: PadButtons(((self.0 >> Self::PAD_B_BUTTON_SHIFT) & 0x00FF) as u16),
        }
    }

    /// Extract the two pointer buttons (bit 0 = button 1).
    #[must_use]
    pub const fn pointer_buttons(self) -> u8 {
        ((self.0 >> Self::POINTER_BUTTON_SHIFT) & 0x03) as u8
    }
}

impl BitOr for InputLines {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for InputLines {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for InputLines {
    type Output = Self;

    #[inline]
    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

impl BitAndAssign for InputLines {
    #[inline]
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl Not for InputLines {
    type Output = Self;

    #[inline]
    fn not(self) -> Self::Output {
        Self(!self.0 & Self::MASK)
    }
}

/// Four direction switches of one pad.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Directions(pub u8);

impl Directions {
    pub const LEFT: Self = Self(1 << 0);
    pub const RIGHT: Self = Self(1 << 1);
    pub const UP: Self = Self(1 << 2);
    pub const DOWN: Self = Self(1 << 3);

    pub const NONE: Self = Self(0);

    /// Check if the given direction(s) are held.
    #[inline]
    #[must_use]
    pub const fn contains(self, dir: Directions) -> bool {
        (self.0 & dir.0) == dir.0
    }

    /// X axis value: Left = -1, Right = +1, both or neither = 0.
    #[must_use]
    pub const fn x_axis(self) -> i8 {
        axis(self.contains(Self::LEFT), self.contains(Self::RIGHT))
    }

    /// Y axis value: Up = -1, Down = +1, both or neither = 0.
    #[must_use]
    pub const fn y_axis(self) -> i8 {
        axis(self.contains(Self::UP), self.contains(Self::DOWN))
    }
}

const fn axis(negative: bool, positive: bool) -> i8 {
    match (negative, positive) {
        (true, false) => -1,
        (false, true) => 1,
        _ => 0,
    }
}

impl BitOr for Directions {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

/// Button bitfield of one pad (bit 0 = button 1).
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PadButtons(pub u16);

impl PadButtons {
    pub const NONE: Self = Self(0);

    /// Check if button `n` (1-based) is pressed.
    #[inline]
    #[must_use]
    pub const fn is_pressed(self, n: u8) -> bool {
        n >= 1 && n <= 16 && self.0 & (1 << (n - 1)) != 0
    }

    /// Get the raw u16 value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }
}

/// Settled state of one gamepad.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PadState {
    pub directions: Directions,
    pub buttons: PadButtons,
}

impl PadState {
    /// Centered stick, no buttons.
    pub const NEUTRAL: Self = Self {
        directions: Directions::NONE,
        buttons: PadButtons::NONE,
    };
}

/// Settled state of the pointer: buttons plus relative motion since the last pass.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PointerState {
    /// Bit 0 = button 1, bit 1 = button 2.
    pub buttons: u8,
    pub dx: i8,
    pub dy: i8,
}

impl PointerState {
    pub const IDLE: Self = Self {
        buttons: 0,
        dx: 0,
        dy: 0,
    };

    /// True when the pointer carries any relative motion.
    #[inline]
    #[must_use]
    pub const fn has_motion(&self) -> bool {
        self.dx != 0 || self.dy != 0
    }
}

/// The three logical devices multiplexed on the interrupt-IN endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Device {
    PadA,
    PadB,
    Pointer,
}

impl Device {
    /// Dispatch order within one decision pass.
    pub const ALL: [Device; 3] = [Device::PadA, Device::PadB, Device::Pointer];

    /// Dense index for per-device tables.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Device::PadA => 0,
            Device::PadB => 1,
            Device::Pointer => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_a_view_extracts_directions_and_buttons() {
        let lines = InputLines::pad_a_direction(Directions::LEFT | Directions::DOWN)
            | InputLines::pad_a_button(1)
            | InputLines::pad_a_button(12);
        let pad = lines.pad_a();
        assert!(pad.directions.contains(Directions::LEFT));
        assert!(pad.directions.contains(Directions::DOWN));
        assert!(pad.buttons.is_pressed(1));
        assert!(pad.buttons.is_pressed(12));
        assert!(!pad.buttons.is_pressed(2));
        assert_eq!(lines.pad_b(), PadState::NEUTRAL);
        assert_eq!(lines.pointer_buttons(), 0);
    }

    #[test]
    fn test_pad_b_and_pointer_views_are_independent() {
        let lines = InputLines::pad_b_direction(Directions::UP)
            | InputLines::pad_b_button(8)
            | InputLines::pointer_button(2);
        assert_eq!(lines.pad_a(), PadState::NEUTRAL);
        assert_eq!(lines.pad_b().directions, Directions::UP);
        assert_eq!(lines.pad_b().buttons, PadButtons(0x80));
        assert_eq!(lines.pointer_buttons(), 0b10);
    }

    #[test]
    fn test_unused_bits_are_masked() {
        assert_eq!(InputLines::new(0xFFFF_FFFF).raw(), InputLines::MASK);
        assert_eq!((!InputLines::NONE).raw(), InputLines::MASK);
    }

    #[test]
    fn test_opposing_directions_cancel() {
        assert_eq!(Directions::LEFT.x_axis(), -1);
        assert_eq!(Directions::RIGHT.x_axis(), 1);
        assert_eq!((Directions::LEFT | Directions::RIGHT).x_axis(), 0);
        assert_eq!(Directions::UP.y_axis(), -1);
        assert_eq!(Directions::DOWN.y_axis(), 1);
        assert_eq!((Directions::UP | Directions::DOWN).y_axis(), 0);
        assert_eq!(Directions::NONE.x_axis(), 0);
    }
}
