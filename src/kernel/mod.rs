// Cooperative scheduler and the clock it runs against
// Single thread, no preemption. The loop sleeps through Clock::sleep
// between due times; handlers run to completion.

pub mod clock;
pub mod scheduler;

pub use clock::{Clock, Instant};
pub use scheduler::{Config, Context, Exit, Outcome, Scheduler, State};
