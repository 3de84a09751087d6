// pulp-loop demo firmware for ESP32-C3
//
// Boot: logger -> hal -> heap -> sleep alarm -> register work -> run loop
// LED blinks every 500ms. Button A logs presses, A+B together stops
// the loop (registered first so it wins over A alone), releasing B
// arms a one-shot 2s later. After the loop exits the core parks in WFI.

#![no_std]
#![no_main]

use core::time::Duration;

use esp_backtrace as _;
use esp_hal::clock::CpuClock;
use esp_hal::gpio::{Level, Output, OutputConfig, Pin};
use esp_hal::timer::OneShotTimer;
use esp_hal::timer::timg::TimerGroup;
use log::{error, info};

use pulp_loop::board::{self, EspClock, GpioBank, pins};
use pulp_loop::{Action, Config, Context, Error, Exit, Scheduler};

esp_bootloader_esp_idf::esp_app_desc!();

const BLINK_MS: u64 = 500;
const BUTTON_POLL_MS: u64 = 20;

#[esp_hal::main]
fn main() -> ! {
    esp_println::logger::init_logger_from_env();
    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);
    esp_alloc::heap_allocator!(size: 32 * 1024);

    info!("booting...");

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    let clock = EspClock::new(OneShotTimer::new(timg0.timer0));
    info!("sleep alarm on TIMG0.");

    let mut led = Output::new(peripherals.GPIO7, Level::Low, OutputConfig::default());
    let bank = GpioBank::new()
        .with_pin(pins::BTN_A, peripherals.GPIO4.degrade())
        .with_pin(pins::BTN_B, peripherals.GPIO5.degrade());
    info!(
        "LED on GPIO{}, buttons on GPIO{}/GPIO{}",
        pins::LED,
        pins::BTN_A,
        pins::BTN_B
    );

    let mut sched = Scheduler::with_pins(clock, bank).with_config(
        Config::new().with_button_poll(Duration::from_millis(BUTTON_POLL_MS)),
    );

    sched.every("blink", Duration::from_millis(BLINK_MS), move |_: &mut Context<'_>| {
        led.toggle();
    });

    sched.after("banner", Duration::from_secs(1), |cx: &mut Context<'_>| {
        info!("up since {}", cx.now());
    });

    if let Err(e) = bind_buttons(&mut sched) {
        error!("button setup failed: {}", e);
    }

    match sched.start() {
        Ok(Exit::Stopped) => info!("loop stopped"),
        Ok(Exit::NothingToDo) => info!("no work registered"),
        Err(e) => error!("loop aborted: {}", e),
    }

    loop {
        board::wait_for_interrupt();
    }
}

fn bind_buttons(sched: &mut Scheduler<EspClock, GpioBank>) -> Result<(), Error> {
    sched.on(&[pins::BTN_A, pins::BTN_B], Action::Press, |cx: &mut Context<'_>| {
        info!("A+B: stopping");
        cx.stop();
    })?;

    sched.on(&[pins::BTN_A], Action::Press, |cx: &mut Context<'_>| {
        info!("A pressed @ {}", cx.now());
    })?;

    sched.on(&[pins::BTN_B], Action::Release, |cx: &mut Context<'_>| {
        cx.after("reminder", Duration::from_secs(2), |cx: &mut Context<'_>| {
            info!("B released 2s ago ({})", cx.now());
        });
    })
}
