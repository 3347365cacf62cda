//! Tri-color status LED.

use arcade_core::Indicator;
use embassy_rp::gpio::{Level, Output};

/// Common-cathode RGB LED on three GPIOs.
pub struct StatusLight<'d> {
    red: Output<'d>,
    green: Output<'d>,
    blue: Output<'d>,
}

impl<'d> StatusLight<'d> {
    /// Take the three channel outputs; the light starts off.
    pub fn new(mut red: Output<'d>, mut green: Output<'d>, mut blue: Output<'d>) -> Self {
        red.set_low();
        green.set_low();
        blue.set_low();
        Self { red, green, blue }
    }

    pub fn show(&mut self, indicator: Indicator) {
        let (r, g, b) = indicator.rgb();
        self.red.set_level(Level::from(r));
        self.green.set_level(Level::from(g));
        self.blue.set_level(Level::from(b));
    }
}
