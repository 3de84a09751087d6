// Errors surfaced by registration and by the running loop.
//
// Exhaustion (nothing registered) is not an error, see kernel::Exit.
// Handler panics are not caught anywhere.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Button binding registered with no pins
    EmptyChord,
    /// More distinct pins than a PinSet can hold
    TooManyPins,
    /// The pin bank could not hand out the requested pin
    PinUnavailable,
    /// Sampling a tracked pin failed, carries its tracked index
    PinRead(usize),
    /// `start()` called on a loop that already ran to completion
    Halted,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::EmptyChord => write!(f, "button chord needs at least one pin"),
            Error::TooManyPins => write!(
                f,
                "too many button pins (max {})",
                crate::drivers::edge::MAX_PINS
            ),
            Error::PinUnavailable => write!(f, "pin not available from bank"),
            Error::PinRead(index) => write!(f, "failed to read button pin #{}", index),
            Error::Halted => write!(f, "event loop already halted"),
        }
    }
}

impl core::error::Error for Error {}
