//! Spinner encoders decoded by PIO state machines.

use arcade_core::EncoderCounter;
use defmt::trace;
use embassy_rp::pio::Instance;
use embassy_rp::pio_programs::rotary_encoder::{Direction, PioEncoder};

/// Feed one PIO quadrature decoder into a shared counter. Never returns.
pub async fn run_encoder<'d, T: Instance, const SM: usize>(
    mut encoder: PioEncoder<'d, T, SM>,
    counter: &EncoderCounter,
) -> ! {
    loop {
        let forward = matches!(encoder.read().await, Direction::Clockwise);
        counter.step(forward);
        trace!("Encoder SM{}: forward={}", SM, forward);
    }
}
