#![no_std]
#![no_main]

use arcade_hid::config::{
    DECISION_TICKS, ENCODER_CENTER, ENCODER_LIMIT, TICK_PERIOD_US, USB_MANUFACTURER, USB_PID,
    USB_PRODUCT, USB_SERIAL_NUMBER, USB_VID,
};
use arcade_hid::{
    configure_usb_hid, run_encoder, EncoderCounter, Engine, LinkState, PanelChain, PanelSampler,
    PollOutcome, Skipped, StatusLight, TickContext, TickOutcome, UsbDriver, UsbEventHandler,
    UsbHidTransport, WakeSignal, PANEL_LINES,
};
use defmt::{debug, error, info, warn};
use defmt_rtt as _;
use embassy_executor::{InterruptExecutor, Spawner};
use embassy_futures::select::{select, Either};
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::interrupt;
use embassy_rp::interrupt::{InterruptExt, Priority};
use embassy_rp::peripherals::{PIO0, USB};
use embassy_rp::pio::Pio;
use embassy_rp::pio_programs::rotary_encoder::{PioEncoder, PioEncoderProgram};
use embassy_rp::usb::Driver;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Delay, Duration, Ticker};
use embassy_usb::class::hid::State;
use embassy_usb::{Builder, Config as UsbConfig, UsbDevice};
use static_cell::StaticCell;

#[cfg(feature = "dev-panic")]
use panic_probe as _;
#[cfg(feature = "prod-panic")]
use panic_reset as _;

bind_interrupts!(struct Irqs {
    USBCTRL_IRQ => embassy_rp::usb::InterruptHandler<USB>;
    PIO0_IRQ_0 => embassy_rp::pio::InterruptHandler<PIO0>;
});

/// Sampling runs here, preempting the main loop and the USB stack.
static EXECUTOR_HIGH: InterruptExecutor = InterruptExecutor::new();

#[interrupt]
unsafe fn SWI_IRQ_1() {
    unsafe { EXECUTOR_HIGH.on_interrupt() }
}

static TICKS: TickContext = TickContext::new();
static LINK: LinkState = LinkState::new();
static SPINNER_X: EncoderCounter = EncoderCounter::new(ENCODER_LIMIT, ENCODER_CENTER);
static SPINNER_Y: EncoderCounter = EncoderCounter::new(ENCODER_LIMIT, ENCODER_CENTER);

/// Raised by the tick when a decision pass is due.
static DECISION: Signal<CriticalSectionRawMutex, ()> = Signal::new();
/// Raised by the main loop when the suspended host should be woken.
static WAKE: WakeSignal = Signal::new();

/// USB device configuration buffer.
static CONFIG_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static BOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static MSOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static CONTROL_BUF: StaticCell<[u8; 64]> = StaticCell::new();

/// HID state.
static HID_STATE: StaticCell<State> = StaticCell::new();
static USB_HANDLER: StaticCell<UsbEventHandler> = StaticCell::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Arcade HID starting...");

    let p = embassy_rp::init(embassy_rp::config::Config::default());

    // --- Panel switches (74HC165 chain) ---
    let chain: PanelChain = PanelChain::new(
        Output::new(p.PIN_2, Level::High), // SH/LD
        Output::new(p.PIN_3, Level::Low),  // CLK
        Input::new(p.PIN_4, Pull::None),   // QH
        Delay,
        PANEL_LINES,
    );
    let sampler = PanelSampler::new(chain, &SPINNER_X, &SPINNER_Y, ENCODER_CENTER);
    let escape = Input::new(p.PIN_22, Pull::Up);

    // --- Spinners ---
    let Pio {
        mut common,
        sm0,
        sm1,
        ..
    } = Pio::new(p.PIO0, Irqs);
    let program = PioEncoderProgram::new(&mut common);
    let encoder_x = PioEncoder::new(&mut common, sm0, p.PIN_6, p.PIN_7, &program);
    let encoder_y = PioEncoder::new(&mut common, sm1, p.PIN_8, p.PIN_9, &program);

    // --- Status light ---
    let light = StatusLight::new(
        Output::new(p.PIN_18, Level::Low),
        Output::new(p.PIN_19, Level::Low),
        Output::new(p.PIN_20, Level::Low),
    );

    // --- USB Setup ---
    let usb_driver = Driver::new(p.USB, Irqs);

    let mut usb_config = UsbConfig::new(USB_VID, USB_PID);
    usb_config.manufacturer = Some(USB_MANUFACTURER);
    usb_config.product = Some(USB_PRODUCT);
    usb_config.serial_number = Some(USB_SERIAL_NUMBER);
    usb_config.max_power = 100;
    usb_config.max_packet_size_0 = 64;
    usb_config.supports_remote_wakeup = true;

    let config_descriptor = CONFIG_DESCRIPTOR.init([0; 256]);
    let bos_descriptor = BOS_DESCRIPTOR.init([0; 256]);
    let msos_descriptor = MSOS_DESCRIPTOR.init([0; 256]);
    let control_buf = CONTROL_BUF.init([0; 64]);

    let mut builder = Builder::new(
        usb_driver,
        usb_config,
        config_descriptor,
        bos_descriptor,
        msos_descriptor,
        control_buf,
    );
    builder.handler(USB_HANDLER.init(UsbEventHandler::new(&LINK)));

    let hid_state = HID_STATE.init(State::new());
    let hid_writer = configure_usb_hid(&mut builder, hid_state);
    let usb_device = builder.build();
    let transport = UsbHidTransport::new(hid_writer, &LINK, &WAKE);

    // --- Tasks ---
    interrupt::SWI_IRQ_1.set_priority(Priority::P2);
    let high = EXECUTOR_HIGH.start(interrupt::SWI_IRQ_1);
    high.spawn(tick_task(sampler, escape).unwrap());

    spawner.spawn(usb_task(usb_device).unwrap());
    spawner.spawn(spinner_x_task(encoder_x).unwrap());
    spawner.spawn(spinner_y_task(encoder_y).unwrap());
    spawner.spawn(app_task(transport, light).unwrap());

    info!("Arcade HID initialized, waiting for host...");
}

/// USB device task - runs the USB stack and performs remote wakeups.
#[embassy_executor::task]
async fn usb_task(mut device: UsbDevice<'static, UsbDriver>) {
    loop {
        device.run_until_suspend().await;
        match select(device.wait_resume(), WAKE.wait()).await {
            Either::First(()) => {}
            Either::Second(()) => {
                debug!("Requesting remote wakeup");
                if let Err(e) = device.remote_wakeup().await {
                    warn!("Remote wakeup failed: {:?}", e);
                }
            }
        }
    }
}

/// Fixed-rate sampling tick.
#[embassy_executor::task]
async fn tick_task(mut sampler: PanelSampler, escape: Input<'static>) {
    let mut ticker = Ticker::every(Duration::from_micros(TICK_PERIOD_US));
    loop {
        ticker.next().await;
        match TICKS.on_tick(escape.is_low(), &mut sampler) {
            TickOutcome::Sampled | TickOutcome::SampleFailed => {
                if TICKS.elapsed() >= DECISION_TICKS {
                    DECISION.signal(());
                }
            }
            TickOutcome::EnteredProgramMode | TickOutcome::Halted => {
                DECISION.signal(());
                return;
            }
        }
    }
}

#[embassy_executor::task]
async fn spinner_x_task(encoder: PioEncoder<'static, PIO0, 0>) {
    run_encoder(encoder, &SPINNER_X).await
}

#[embassy_executor::task]
async fn spinner_y_task(encoder: PioEncoder<'static, PIO0, 1>) {
    run_encoder(encoder, &SPINNER_Y).await
}

/// Main loop - one decision pass per `DECISION_TICKS` ticks.
#[embassy_executor::task]
async fn app_task(mut transport: UsbHidTransport<'static>, mut light: StatusLight<'static>) {
    let mut engine = Engine::default();
    let mut read_errors = 0;

    loop {
        DECISION.wait().await;
        if !TICKS.program_mode() && TICKS.take_elapsed(DECISION_TICKS).is_none() {
            continue;
        }

        let outcome = engine.poll(&TICKS, &LINK, &mut transport).await;
        report(&outcome);
        let errors = TICKS.sample_errors();
        if errors != read_errors {
            warn!("Switch chain read failed ({} total)", errors);
            read_errors = errors;
        }
        if let Some(indicator) = outcome.indicator {
            light.show(indicator);
        }

        if outcome.skipped == Some(Skipped::ProgramMode) {
            info!("Program mode latched, polling stopped until reset");
            core::future::pending::<()>().await;
        }
    }
}

fn report(outcome: &PollOutcome) {
    if outcome.reconnected {
        info!("Host session started, resending state");
    }
    if let Some(indicator) = outcome.indicator {
        debug!("Indicator -> {:?}", indicator);
    }
    if let Some(Err(e)) = outcome.wake {
        warn!("Remote wakeup not sent: {:?}", e);
    }
    if let Some(e) = outcome.error {
        error!("Dispatch error: {:?}", e);
    }
    if outcome.sent != 0 {
        debug!("Sent reports mask={=u8:b}", outcome.sent);
    }
}
