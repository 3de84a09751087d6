//! Simulated clock and pins for host tests.
//!
//! Both are cheap handles over shared cells: a test keeps one clone to
//! drive time or pin levels while the scheduler owns another.

use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use core::cell::Cell;
use core::time::Duration;

use embedded_hal::digital::{ErrorKind, ErrorType, InputPin};

use crate::drivers::input::PinBank;
use crate::kernel::{Clock, Instant};

/// Clock that only moves when slept on or advanced by hand.
#[derive(Clone)]
pub struct SimClock {
    now: Rc<Cell<Instant>>,
    sleeps: Rc<Cell<usize>>,
    // cut every sleep to at most this long (early wakeups)
    max_sleep: Option<Duration>,
    // add this much to every sleep (late wakeups)
    oversleep: Duration,
}

impl SimClock {
    pub fn new() -> Self {
        Self::starting_at(Instant::ZERO)
    }

    pub fn starting_at(t: Instant) -> Self {
        Self {
            now: Rc::new(Cell::new(t)),
            sleeps: Rc::new(Cell::new(0)),
            max_sleep: None,
            oversleep: Duration::ZERO,
        }
    }

    pub fn with_max_sleep(mut self, max: Duration) -> Self {
        self.max_sleep = Some(max);
        self
    }

    pub fn with_oversleep(mut self, extra: Duration) -> Self {
        self.oversleep = extra;
        self
    }

    pub fn advance(&self, d: Duration) {
        self.now.set(self.now.get() + d);
    }

    pub fn sleeps(&self) -> usize {
        self.sleeps.get()
    }
}

impl Clock for SimClock {
    fn now(&mut self) -> Instant {
        self.now.get()
    }

    fn sleep(&mut self, duration: Duration) {
        self.sleeps.set(self.sleeps.get() + 1);
        let step = match self.max_sleep {
            Some(max) => duration.min(max),
            None => duration,
        };
        self.advance(step + self.oversleep);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimPinError;

impl embedded_hal::digital::Error for SimPinError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// Pin whose level is set by the test. Clones share the level.
#[derive(Clone, Default)]
pub struct SimPin {
    high: Rc<Cell<bool>>,
    broken: Rc<Cell<bool>>,
}

impl SimPin {
    pub fn set(&self, high: bool) {
        self.high.set(high);
    }

    /// Every read from now on fails.
    pub fn fail(&self) {
        self.broken.set(true);
    }
}

impl ErrorType for SimPin {
    type Error = SimPinError;
}

impl InputPin for SimPin {
    fn is_high(&mut self) -> Result<bool, SimPinError> {
        if self.broken.get() {
            return Err(SimPinError);
        }
        Ok(self.high.get())
    }

    fn is_low(&mut self) -> Result<bool, SimPinError> {
        self.is_high().map(|high| !high)
    }
}

#[derive(Default)]
pub struct SimBank {
    pins: BTreeMap<u8, SimPin>,
    configured: BTreeMap<u8, usize>,
}

impl SimBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make pin `id` available and return a handle to drive its level.
    pub fn pin(&mut self, id: u8) -> SimPin {
        self.pins.entry(id).or_default().clone()
    }

    /// How many times `id` was configured.
    pub fn configured(&self, id: u8) -> usize {
        self.configured.get(&id).copied().unwrap_or(0)
    }
}

impl PinBank for SimBank {
    type Id = u8;
    type Pin = SimPin;

    fn is_available(&self, id: u8) -> bool {
        self.pins.contains_key(&id)
    }

    fn configure_pull_down(&mut self, id: u8) -> Option<SimPin> {
        let pin = self.pins.get(&id)?.clone();
        *self.configured.entry(id).or_insert(0) += 1;
        Some(pin)
    }
}
