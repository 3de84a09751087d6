// Cooperative event loop for small boards: periodic tasks, one-shot
// timers and debounced button chords on a single thread, no OS.
//
// Hardware lives behind two traits (kernel::Clock, drivers::input::PinBank)
// so everything except `board` builds and tests on the host.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

#[cfg(feature = "esp32c3")]
pub mod board;
pub mod drivers;
pub mod error;
pub mod kernel;

#[cfg(test)]
mod mock;

pub use drivers::input::{Action, NoPins, PinBank};
pub use error::Error;
pub use kernel::{Clock, Config, Context, Exit, Instant, Outcome, Scheduler, State};
