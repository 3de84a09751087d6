//! ESP32-C3 board support
//!
//! Backs the event loop's two hardware seams with esp-hal: [`EspClock`]
//! reads the system timer and sleeps the core in WFI until a one-shot
//! timer alarm fires, [`GpioBank`] hands out pulled-down `Input`s for
//! button pins by GPIO number.

pub mod pins;

use alloc::vec::Vec;
use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;

use critical_section::Mutex;
use embedded_hal::delay::DelayNs;
use esp_hal::Blocking;
use esp_hal::delay::Delay;
use esp_hal::gpio::{AnyPin, Input, InputConfig, Pull};
use esp_hal::interrupt::Priority;
use esp_hal::timer::OneShotTimer;
use log::{debug, warn};

use crate::drivers::input::PinBank;
use crate::kernel::{Clock, Instant};

// sleep alarm, shared with its ISR
static ALARM: Mutex<RefCell<Option<OneShotTimer<'static, Blocking>>>> =
    Mutex::new(RefCell::new(None));
static RANG: AtomicBool = AtomicBool::new(false);

#[esp_hal::handler(priority = Priority::Priority1)]
fn alarm_handler() {
    critical_section::with(|cs| {
        if let Some(timer) = ALARM.borrow_ref_mut(cs).as_mut() {
            timer.clear_interrupt();
        }
    });
    RANG.store(true, Ordering::Release);
}

/// Microseconds since boot from the esp-hal system timer. Sleeps park
/// the core until a one-shot alarm interrupt.
///
/// The alarm lives in a static, so build one of these per firmware.
pub struct EspClock {
    // fallback when the alarm refuses a timeout
    delay: Delay,
}

impl EspClock {
    pub fn new(mut alarm: OneShotTimer<'static, Blocking>) -> Self {
        critical_section::with(|cs| {
            alarm.set_interrupt_handler(alarm_handler);
            alarm.listen();
            ALARM.borrow_ref_mut(cs).replace(alarm);
        });
        debug!("board: sleep alarm armed on interrupt");
        Self {
            delay: Delay::new(),
        }
    }

    fn arm(us: u64) -> bool {
        RANG.store(false, Ordering::Relaxed);
        critical_section::with(|cs| {
            ALARM
                .borrow_ref_mut(cs)
                .as_mut()
                .is_some_and(|timer| timer.schedule(esp_hal::time::Duration::from_micros(us)).is_ok())
        })
    }
}

impl Clock for EspClock {
    fn now(&mut self) -> Instant {
        Instant::from_micros(esp_hal::time::Instant::now().duration_since_epoch().as_micros())
    }

    fn sleep(&mut self, duration: Duration) {
        let us = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
        if us == 0 {
            return;
        }

        if !Self::arm(us) {
            // capped to one u32 worth of micros (~71 min); the loop re-checks
            warn!("board: alarm refused {}us, busy-waiting", us);
            self.delay.delay_us(u32::try_from(us).unwrap_or(u32::MAX));
            return;
        }

        // wfi with interrupts masked still wakes on a pending one, so the
        // alarm cannot slip in between the check and the sleep
        while !critical_section::with(|_| {
            let rang = RANG.load(Ordering::Acquire);
            if !rang {
                wait_for_interrupt();
            }
            rang
        }) {}
    }
}

/// GPIOs set aside for buttons, keyed by GPIO number.
///
/// Pins are moved in at boot and moved out, configured, on first use.
pub struct GpioBank {
    free: Vec<(u8, AnyPin<'static>)>,
}

impl GpioBank {
    pub const fn new() -> Self {
        Self { free: Vec::new() }
    }

    pub fn with_pin(mut self, gpio: u8, pin: AnyPin<'static>) -> Self {
        self.free.push((gpio, pin));
        self
    }
}

impl Default for GpioBank {
    fn default() -> Self {
        Self::new()
    }
}

impl PinBank for GpioBank {
    type Id = u8;
    type Pin = Input<'static>;

    fn is_available(&self, gpio: u8) -> bool {
        self.free.iter().any(|(n, _)| *n == gpio)
    }

    fn configure_pull_down(&mut self, gpio: u8) -> Option<Input<'static>> {
        let at = self.free.iter().position(|(n, _)| *n == gpio)?;
        let (_, pin) = self.free.swap_remove(at);
        debug!("board: GPIO{} input, pull down", gpio);
        Some(Input::new(pin, InputConfig::default().with_pull(Pull::Down)))
    }
}

/// Park the core until the next interrupt.
#[inline]
pub fn wait_for_interrupt() {
    #[cfg(target_arch = "riscv32")]
    unsafe {
        core::arch::asm!("wfi", options(nomem, nostack));
    }

    #[cfg(not(target_arch = "riscv32"))]
    core::hint::spin_loop();
}
