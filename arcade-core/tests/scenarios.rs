//! End-to-end behavior of the sampling and dispatch pipeline.

use core::convert::Infallible;
use core::future::Future;
use core::pin::pin;
use core::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

use arcade_core::config::{DEBOUNCE_WINDOW, ENCODER_CENTER, ENCODER_LIMIT, KEEPALIVE_PASSES};
use arcade_core::{
    ConnectionState, Device, DispatchError, Dispatcher, EncoderCounter, Engine, Indicator,
    InputLines, LinkState, MotionFilter, QuadratureCounter, RawSampler, Report, ReportTransport,
    Skipped, SwitchBank, TickContext, TransportError, UsbEvent,
};

fn block_on<F: Future>(f: F) -> F::Output {
    fn noop_raw_waker() -> RawWaker {
        fn noop(_: *const ()) {}
        fn clone(_: *const ()) -> RawWaker {
            noop_raw_waker()
        }
        static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, noop, noop, noop);
        RawWaker::new(core::ptr::null(), &VTABLE)
    }

    let waker = unsafe { Waker::from_raw(noop_raw_waker()) };
    let mut cx = Context::from_waker(&waker);
    match pin!(f).poll(&mut cx) {
        Poll::Ready(result) => result,
        Poll::Pending => panic!("Mock future returned Pending unexpectedly"),
    }
}

/// Idle-high switch levels with a settable set of pressed channels.
struct Panel(u32);

impl Panel {
    fn idle() -> Self {
        Self(u32::MAX)
    }

    fn press(&mut self, lines: InputLines) {
        self.0 = (!lines).raw();
    }
}

impl SwitchBank for Panel {
    type Error = Infallible;

    fn read_levels(&mut self) -> Result<u32, Infallible> {
        Ok(self.0)
    }
}

/// Records reports and checks the in-flight slot is held during each transfer.
struct Host<'a> {
    link: &'a LinkState,
    reports: Vec<Vec<u8>>,
    overlapping: usize,
}

impl<'a> Host<'a> {
    fn new(link: &'a LinkState) -> Self {
        Self {
            link,
            reports: Vec::new(),
            overlapping: 0,
        }
    }
}

impl ReportTransport for Host<'_> {
    fn transmit(&mut self, report: &[u8]) -> impl Future<Output = Result<(), TransportError>> {
        // A second claim while this one is in flight must be refused.
        if self.link.begin_send() != Err(ConnectionState::Sending) {
            self.overlapping += 1;
        }
        self.reports.push(report.to_vec());
        core::future::ready(Ok(()))
    }

    fn remote_wakeup(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

fn counters() -> (EncoderCounter, EncoderCounter) {
    (
        EncoderCounter::new(ENCODER_LIMIT, ENCODER_CENTER),
        EncoderCounter::new(ENCODER_LIMIT, ENCODER_CENTER),
    )
}

fn connected() -> LinkState {
    let link = LinkState::new();
    link.on_event(UsbEvent::Connected);
    link
}

#[test]
fn held_button_produces_exactly_one_pad_a_report() {
    let (x, y) = counters();
    let mut sampler = RawSampler::new(Panel::idle(), &x, &y, ENCODER_CENTER);
    let ticks: TickContext = TickContext::new();
    let link = connected();
    let mut host = Host::new(&link);
    let mut engine = Engine::default();

    sampler.bank_mut().press(InputLines::pad_a_button(1));
    for _ in 0..DEBOUNCE_WINDOW {
        ticks.on_tick(false, &mut sampler);
    }

    let outcome = block_on(engine.poll(&ticks, &link, &mut host));
    assert_eq!(outcome.error, None);
    assert_eq!(host.reports, [vec![1, 0x00, 0x01, 0x00]]);
    assert!(outcome.was_sent(Device::PadA));
    assert_eq!(host.overlapping, 0);
}

#[test]
fn oscillating_input_never_settles_pressed() {
    let (x, y) = counters();
    let mut sampler = RawSampler::new(Panel::idle(), &x, &y, ENCODER_CENTER);
    let ticks = TickContext::<5>::new();
    let button = InputLines::pad_b_button(4);

    for i in 0..50 {
        let lines = if i % 2 == 0 { button } else { InputLines::NONE };
        sampler.bank_mut().press(lines);
        ticks.on_tick(false, &mut sampler);
        if i >= 4 {
            assert_eq!(ticks.settled(), Some(InputLines::NONE));
        }
    }

    sampler.bank_mut().press(button);
    for _ in 0..5 {
        ticks.on_tick(false, &mut sampler);
    }
    assert_eq!(ticks.settled(), Some(button));
}

#[test]
fn unchanged_state_is_resent_once_per_keepalive_interval() {
    let (x, y) = counters();
    let mut sampler = RawSampler::new(Panel::idle(), &x, &y, ENCODER_CENTER);
    let ticks = TickContext::<1>::new();
    let link = connected();
    let mut host = Host::new(&link);
    let mut engine = Engine::default();
    ticks.on_tick(false, &mut sampler);

    for _ in 1..KEEPALIVE_PASSES {
        block_on(engine.poll(&ticks, &link, &mut host));
    }
    assert!(host.reports.is_empty());

    let outcome = block_on(engine.poll(&ticks, &link, &mut host));
    for device in Device::ALL {
        assert!(outcome.was_sent(device));
    }
    assert_eq!(host.reports.len(), 3);

    for _ in 1..KEEPALIVE_PASSES {
        block_on(engine.poll(&ticks, &link, &mut host));
    }
    assert_eq!(host.reports.len(), 3);
    assert_eq!(host.overlapping, 0);
}

#[test]
fn encoder_round_trip_is_proportional_to_travel() {
    let (x, y) = counters();
    let mut sampler = RawSampler::new(Panel::idle(), &x, &y, ENCODER_CENTER);
    let mut filter = MotionFilter::new(2);

    x.set_position(ENCODER_CENTER + 9);
    y.set_position(ENCODER_CENTER - 9);
    assert_eq!(filter.apply(sampler.sample().unwrap().motion), [18, -18]);

    x.set_position(ENCODER_CENTER - 9);
    y.set_position(ENCODER_CENTER + 9);
    assert_eq!(filter.apply(sampler.sample().unwrap().motion), [-18, 18]);

    assert_eq!(filter.apply(sampler.sample().unwrap().motion), [0, 0]);
    assert_eq!(x.position(), ENCODER_CENTER);
}

#[test]
fn dispatch_before_configuration_touches_nothing() {
    let link = LinkState::new();
    let mut host = Host::new(&link);
    let mut dispatcher = Dispatcher::new();

    let result = block_on(dispatcher.send(&link, &mut host, &Report::idle(Device::Pointer)));
    assert_eq!(result, Err(DispatchError::NotConfigured));
    assert!(host.reports.is_empty());
    assert_eq!(link.connection(), ConnectionState::Unconfigured);
}

#[test]
fn program_mode_latch_survives_arbitrary_input() {
    let (x, y) = counters();
    let mut sampler = RawSampler::new(Panel::idle(), &x, &y, ENCODER_CENTER);
    let ticks = TickContext::<5>::new();
    let link = connected();
    let mut host = Host::new(&link);
    let mut engine = Engine::default();

    ticks.on_tick(true, &mut sampler);

    let mut noise = 0x1234_5678u32;
    for _ in 0..1000 {
        noise = noise.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        sampler.bank_mut().0 = noise;
        x.step(noise & 1 == 1);
        ticks.on_tick(noise & 2 == 2, &mut sampler);
    }
    assert!(ticks.program_mode());
    assert_eq!(ticks.elapsed(), 0);
    assert_eq!(ticks.settled(), None);

    let outcome = block_on(engine.poll(&ticks, &link, &mut host));
    assert_eq!(outcome.skipped, Some(Skipped::ProgramMode));
    assert_eq!(outcome.indicator, Some(Indicator::Blue));
    for _ in 0..10 {
        block_on(engine.poll(&ticks, &link, &mut host));
    }
    assert!(host.reports.is_empty());
}
