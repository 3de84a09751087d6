//! Button chords on plain digital pins
//!
//! A [`Gamepad`] owns every pin referenced by a binding, samples them
//! once per poll, runs the samples through the [`EdgeDetector`] and hands
//! fresh presses/releases to the bindings in registration order.
//!
//! Dispatch is a short-circuiting rule list, not pub/sub: the first
//! matching handler that returns [`Outcome::Handled`] ends the poll.

use alloc::vec::Vec;
use core::convert::Infallible;
use core::fmt;

use embedded_hal::digital::{Error as _, ErrorType, InputPin};
use log::{debug, warn};

use crate::drivers::edge::{EdgeDetector, Edges, MAX_PINS, PinSet};
use crate::error::Error;
use crate::kernel::scheduler::{Context, Handler, Outcome};

/// Source of button pins.
///
/// `configure_pull_down` is called at most once per pin id, the first
/// time a binding mentions it, and only after `is_available` said yes
/// for every new pin of the chord. The returned pin reads high while the
/// button is pressed.
pub trait PinBank {
    type Id: Copy + PartialEq + fmt::Debug;
    type Pin: InputPin;

    fn is_available(&self, id: Self::Id) -> bool;

    fn configure_pull_down(&mut self, id: Self::Id) -> Option<Self::Pin>;
}

/// Bank for loops that only use timers.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPins;

/// Uninhabited pin type handed out by [`NoPins`].
#[derive(Debug)]
pub enum NoPin {}

impl ErrorType for NoPin {
    type Error = Infallible;
}

impl InputPin for NoPin {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        match *self {}
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        match *self {}
    }
}

impl PinBank for NoPins {
    type Id = u8;
    type Pin = NoPin;

    fn is_available(&self, _id: u8) -> bool {
        false
    }

    fn configure_pull_down(&mut self, _id: u8) -> Option<NoPin> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Press,
    Release,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Press => write!(f, "press"),
            Action::Release => write!(f, "release"),
        }
    }
}

pub(crate) struct Binding {
    chord: PinSet,
    action: Action,
    handler: Handler,
}

impl Binding {
    pub(crate) fn new(chord: PinSet, action: Action, handler: Handler) -> Self {
        Self {
            chord,
            action,
            handler,
        }
    }

    // every pin of the chord changed in the bound direction this poll;
    // other pins changing alongside does not prevent a match
    fn matches(&self, edges: &Edges) -> bool {
        match self.action {
            Action::Press => self.chord.is_subset(edges.down),
            Action::Release => self.chord.is_subset(edges.up),
        }
    }
}

pub struct Gamepad<B: PinBank> {
    pins: Vec<(B::Id, B::Pin)>,
    detector: EdgeDetector,
    bindings: Vec<Binding>,
}

impl<B: PinBank> Gamepad<B> {
    pub const fn new() -> Self {
        Self {
            pins: Vec::new(),
            detector: EdgeDetector::new(),
            bindings: Vec::new(),
        }
    }

    /// Map a chord of pin ids to tracked indices, configuring pins seen
    /// for the first time.
    ///
    /// All-or-nothing: on error no pin has been configured or tracked.
    pub(crate) fn track(&mut self, bank: &mut B, chord: &[B::Id]) -> Result<PinSet, Error> {
        let mut fresh: Vec<B::Id> = Vec::new();
        for &id in chord {
            if self.index_of(id).is_none() && !fresh.contains(&id) {
                fresh.push(id);
            }
        }

        if self.pins.len() + fresh.len() > MAX_PINS {
            return Err(Error::TooManyPins);
        }
        if let Some(id) = fresh.iter().find(|id| !bank.is_available(**id)) {
            warn!("input: pin {:?} not available", id);
            return Err(Error::PinUnavailable);
        }

        let mark = self.pins.len();
        for id in fresh {
            let Some(pin) = bank.configure_pull_down(id) else {
                warn!("input: configuring pin {:?} failed", id);
                self.pins.truncate(mark);
                return Err(Error::PinUnavailable);
            };
            debug!("input: tracking pin {:?} as #{}", id, self.pins.len());
            self.pins.push((id, pin));
        }

        let mut set = PinSet::EMPTY;
        for &id in chord {
            if let Some(index) = self.index_of(id) {
                set.insert(index);
            }
        }
        Ok(set)
    }

    pub(crate) fn bind(&mut self, binding: Binding) {
        self.bindings.push(binding);
    }

    pub fn index_of(&self, id: B::Id) -> Option<usize> {
        self.pins.iter().position(|(tracked, _)| *tracked == id)
    }

    pub fn tracked(&self) -> impl Iterator<Item = B::Id> + '_ {
        self.pins.iter().map(|(id, _)| *id)
    }

    pub fn bindings(&self) -> usize {
        self.bindings.len()
    }

    /// Debounced set of pins currently held down.
    pub fn held(&self) -> PinSet {
        self.detector.held()
    }

    /// One poll: sample, debounce, dispatch.
    pub(crate) fn poll(&mut self, cx: &mut Context<'_>) -> Result<(), Error> {
        let raw = self.sample()?;
        let edges = self.detector.update(raw);
        if edges.is_empty() {
            return Ok(());
        }

        debug!("input: down {:?} up {:?}", edges.down, edges.up);
        self.dispatch(&edges, cx);
        Ok(())
    }

    fn sample(&mut self) -> Result<PinSet, Error> {
        let mut raw = PinSet::EMPTY;
        for (index, (id, pin)) in self.pins.iter_mut().enumerate() {
            match pin.is_high() {
                Ok(true) => raw.insert(index),
                Ok(false) => {}
                Err(e) => {
                    warn!("input: reading pin {:?} failed: {:?}", id, e.kind());
                    return Err(Error::PinRead(index));
                }
            }
        }
        Ok(raw)
    }

    /// Run bindings in order against `edges`; returns the index of the
    /// binding that handled them, if any.
    pub(crate) fn dispatch(&mut self, edges: &Edges, cx: &mut Context<'_>) -> Option<usize> {
        if edges.is_empty() {
            return None;
        }

        for (index, binding) in self.bindings.iter_mut().enumerate() {
            if !binding.matches(edges) {
                continue;
            }
            if (binding.handler)(&mut *cx) == Outcome::Handled {
                debug!("input: {} {:?} handled by #{}", binding.action, binding.chord, index);
                return Some(index);
            }
        }

        None
    }
}

impl<B: PinBank> Default for Gamepad<B> {
    fn default() -> Self {
        Self::new()
    }
}
