// Cooperative run loop: periodic tasks, one-shot timers, button polling
//
// Each cycle: sample the clock once, fire every due periodic task in
// registration order, then every due one-shot timer, then sleep until
// the earliest next due time. Sleeps may end early, so the loop re-reads
// the clock until the wake time has really passed. Nothing ever fires
// before it is due; a slow handler delays everything queued behind it.
//
// Button polling is just another periodic task ("buttons"), installed at
// start() when at least one binding exists.
//
// Identity: tasks and timers are keyed by name. Registering a name that
// is already present replaces the entry instead of adding a second one.
// The button poller is keyed by its job, so a user task may share its
// name.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;
use core::mem;
use core::time::Duration;

use log::{debug, info, trace, warn};

use crate::drivers::input::{Action, Binding, Gamepad, NoPins, PinBank};
use crate::error::Error;
use crate::kernel::clock::{Clock, Instant};

/// Button poll period unless overridden in [`Config`].
pub const DEFAULT_BUTTON_POLL: Duration = Duration::from_millis(20);

/// Name the button poller shows up under in logs.
pub const BUTTON_TASK: &str = "buttons";

/// What a handler did with the event it was given.
///
/// Only button dispatch looks at it: `Handled` stops the remaining
/// bindings from seeing this poll's edges, `Propagate` lets them try.
/// Periodic tasks and timers may return either.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Handled,
    Propagate,
}

impl From<()> for Outcome {
    fn from(_: ()) -> Self {
        Outcome::Handled
    }
}

pub(crate) type Handler = Box<dyn FnMut(&mut Context<'_>) -> Outcome>;

pub(crate) fn boxed<F, R>(mut handler: F) -> Handler
where
    F: FnMut(&mut Context<'_>) -> R + 'static,
    R: Into<Outcome>,
{
    Box::new(move |cx: &mut Context<'_>| handler(cx).into())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    button_poll: Duration,
}

impl Config {
    pub const fn new() -> Self {
        Self {
            button_poll: DEFAULT_BUTTON_POLL,
        }
    }

    pub const fn with_button_poll(mut self, period: Duration) -> Self {
        self.button_poll = period;
        self
    }

    pub const fn button_poll(&self) -> Duration {
        self.button_poll
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// registered, not started
    Stopped,
    Running,
    /// terminal
    Halted,
}

/// Why `start()` returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// a stop was requested
    Stopped,
    /// no periodic tasks and no timers left
    NothingToDo,
}

impl fmt::Display for Exit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exit::Stopped => write!(f, "stopped"),
            Exit::NothingToDo => write!(f, "nothing to do"),
        }
    }
}

enum Job {
    Handler(Handler),
    Buttons,
}

struct Task {
    name: &'static str,
    interval: Duration,
    // None until the first run, which makes it due on the first cycle
    last_fired: Option<Instant>,
    job: Job,
}

impl Task {
    fn new(name: &'static str, interval: Duration, job: Job) -> Self {
        Self {
            name,
            interval,
            last_fired: None,
            job,
        }
    }

    fn due_at(&self) -> Instant {
        match self.last_fired {
            Some(t) => t + self.interval,
            None => Instant::ZERO,
        }
    }

    fn is_poller(&self) -> bool {
        matches!(self.job, Job::Buttons)
    }

    fn same_slot(&self, other: &Task) -> bool {
        self.is_poller() == other.is_poller() && self.name == other.name
    }
}

pub(crate) struct Timer {
    name: &'static str,
    deadline: Instant,
    handler: Handler,
}

// replace in place if the name is known, else append
fn upsert_timer(table: &mut Vec<Timer>, timer: Timer) {
    match table.iter_mut().find(|t| t.name == timer.name) {
        Some(slot) => *slot = timer,
        None => table.push(timer),
    }
}

/// Handed to every handler invocation.
///
/// Carries the timestamp of the current cycle and lets the handler
/// schedule further one-shot timers or stop the loop. Timers scheduled
/// here join the table after the current firing pass, so they never
/// fire in the pass that created them.
pub struct Context<'a> {
    now: Instant,
    clock: &'a mut dyn Clock,
    staged: &'a mut Vec<Timer>,
    stop: &'a mut bool,
}

impl<'a> Context<'a> {
    pub(crate) fn new(
        now: Instant,
        clock: &'a mut dyn Clock,
        staged: &'a mut Vec<Timer>,
        stop: &'a mut bool,
    ) -> Self {
        Self {
            now,
            clock,
            staged,
            stop,
        }
    }

    /// Clock sample this cycle's due checks were made against.
    pub fn now(&self) -> Instant {
        self.now
    }

    /// Stop the loop once the current cycle's due work has fired.
    pub fn stop(&mut self) {
        *self.stop = true;
    }

    pub fn stop_requested(&self) -> bool {
        *self.stop
    }

    pub fn at<F, R>(&mut self, name: &'static str, deadline: Instant, handler: F)
    where
        F: FnMut(&mut Context<'_>) -> R + 'static,
        R: Into<Outcome>,
    {
        upsert_timer(
            self.staged,
            Timer {
                name,
                deadline,
                handler: boxed(handler),
            },
        );
    }

    /// Like [`Context::at`], with the deadline counted from the clock as
    /// it reads now, not from the cycle's timestamp.
    pub fn after<F, R>(&mut self, name: &'static str, delay: Duration, handler: F)
    where
        F: FnMut(&mut Context<'_>) -> R + 'static,
        R: Into<Outcome>,
    {
        let deadline = self.clock.now() + delay;
        self.at(name, deadline, handler);
    }
}

pub struct Scheduler<C: Clock, B: PinBank = NoPins> {
    clock: C,
    bank: B,
    config: Config,
    tasks: Vec<Task>,
    timers: Vec<Timer>,
    // timers scheduled from inside handlers during a firing pass
    staged: Vec<Timer>,
    gamepad: Option<Gamepad<B>>,
    state: State,
    stop_requested: bool,
}

impl<C: Clock> Scheduler<C, NoPins> {
    /// Loop without buttons.
    pub fn new(clock: C) -> Self {
        Self::with_pins(clock, NoPins)
    }
}

impl<C: Clock, B: PinBank> Scheduler<C, B> {
    pub fn with_pins(clock: C, bank: B) -> Self {
        Self {
            clock,
            bank,
            config: Config::new(),
            tasks: Vec::new(),
            timers: Vec::new(),
            staged: Vec::new(),
            gamepad: None,
            state: State::Stopped,
            stop_requested: false,
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    // ── registration ────────────────────────────────────────────────

    /// Run `handler` on every cycle.
    pub fn tick<F, R>(&mut self, name: &'static str, handler: F)
    where
        F: FnMut(&mut Context<'_>) -> R + 'static,
        R: Into<Outcome>,
    {
        self.every(name, Duration::ZERO, handler);
    }

    /// Run `handler` whenever `interval` has passed since it last ran.
    /// First run is on the first cycle.
    pub fn every<F, R>(&mut self, name: &'static str, interval: Duration, handler: F)
    where
        F: FnMut(&mut Context<'_>) -> R + 'static,
        R: Into<Outcome>,
    {
        debug!("loop: every {:?} -> {}", interval, name);
        self.insert_task(Task::new(name, interval, Job::Handler(boxed(handler))));
    }

    /// Run `handler` once, on the first cycle at or after `deadline`.
    pub fn at<F, R>(&mut self, name: &'static str, deadline: Instant, handler: F)
    where
        F: FnMut(&mut Context<'_>) -> R + 'static,
        R: Into<Outcome>,
    {
        debug!("loop: at {} -> {}", deadline, name);
        upsert_timer(
            &mut self.timers,
            Timer {
                name,
                deadline,
                handler: boxed(handler),
            },
        );
    }

    /// Run `handler` once, `delay` after now. The deadline is fixed
    /// here, not when the loop starts.
    pub fn after<F, R>(&mut self, name: &'static str, delay: Duration, handler: F)
    where
        F: FnMut(&mut Context<'_>) -> R + 'static,
        R: Into<Outcome>,
    {
        let deadline = self.clock.now() + delay;
        self.at(name, deadline, handler);
    }

    /// Bind `handler` to a chord of pins pressed (or released) together.
    ///
    /// Pins are configured as pulled-down inputs the first time any
    /// binding mentions them. Bindings are tried in registration order,
    /// so register larger chords before the chords they contain.
    pub fn on<F, R>(&mut self, chord: &[B::Id], action: Action, handler: F) -> Result<(), Error>
    where
        F: FnMut(&mut Context<'_>) -> R + 'static,
        R: Into<Outcome>,
    {
        if chord.is_empty() {
            return Err(Error::EmptyChord);
        }

        let pad = self.gamepad.get_or_insert_with(Gamepad::new);
        let pins = pad.track(&mut self.bank, chord)?;
        debug!("loop: on {} {:?}", action, chord);
        pad.bind(Binding::new(pins, action, boxed(handler)));
        Ok(())
    }

    fn insert_task(&mut self, task: Task) {
        match self.tasks.iter_mut().find(|t| t.same_slot(&task)) {
            Some(slot) => *slot = task,
            None => self.tasks.push(task),
        }
    }

    // ── lifecycle ───────────────────────────────────────────────────

    /// Ask the loop to exit at the top of its next cycle. Handlers use
    /// [`Context::stop`] instead.
    pub fn stop(&mut self) {
        self.stop_requested = true;
    }

    /// Run until stopped or out of work.
    pub fn start(&mut self) -> Result<Exit, Error> {
        if self.state == State::Halted {
            return Err(Error::Halted);
        }

        if self.gamepad.as_ref().is_some_and(|pad| pad.bindings() > 0) {
            self.insert_task(Task::new(BUTTON_TASK, self.config.button_poll, Job::Buttons));
        }

        info!(
            "loop: start ({} tasks, {} timers)",
            self.tasks.len(),
            self.timers.len()
        );
        self.state = State::Running;
        let result = self.run();
        self.state = State::Halted;

        match &result {
            Ok(exit) => info!("loop: exit, {}", exit),
            Err(e) => warn!("loop: aborted: {}", e),
        }
        result
    }

    fn run(&mut self) -> Result<Exit, Error> {
        loop {
            if self.stop_requested {
                return Ok(Exit::Stopped);
            }

            if self.tasks.is_empty() && self.timers.is_empty() {
                warn!("loop: no tasks or timers registered, nothing to do");
                return Ok(Exit::NothingToDo);
            }

            let now = self.clock.now();
            self.fire_tasks(now)?;
            self.fire_timers(now);
            self.merge_staged();

            // finish the cycle, skip the sleep
            if self.stop_requested {
                continue;
            }

            if let Some(wake) = self.next_wake() {
                self.park_until(wake);
            }
        }
    }

    fn fire_tasks(&mut self, now: Instant) -> Result<(), Error> {
        let mut cx = Context::new(
            now,
            &mut self.clock,
            &mut self.staged,
            &mut self.stop_requested,
        );

        for task in self.tasks.iter_mut() {
            if task.due_at() > now {
                continue;
            }

            trace!("loop: {} @ {}", task.name, now);
            match &mut task.job {
                Job::Handler(handler) => {
                    handler(&mut cx);
                }
                Job::Buttons => {
                    if let Some(pad) = self.gamepad.as_mut() {
                        pad.poll(&mut cx)?;
                    }
                }
            }
            task.last_fired = Some(now);
        }

        Ok(())
    }

    fn fire_timers(&mut self, now: Instant) {
        let mut cx = Context::new(
            now,
            &mut self.clock,
            &mut self.staged,
            &mut self.stop_requested,
        );

        // handlers can only stage timers, so the table holds still while
        // we walk it. Remove first, then call.
        let mut i = 0;
        while i < self.timers.len() {
            if self.timers[i].deadline > now {
                i += 1;
                continue;
            }

            let mut timer = self.timers.remove(i);
            trace!("loop: {} (due {}) @ {}", timer.name, timer.deadline, now);
            (timer.handler)(&mut cx);
        }
    }

    fn merge_staged(&mut self) {
        for timer in mem::take(&mut self.staged) {
            upsert_timer(&mut self.timers, timer);
        }
    }

    fn next_wake(&self) -> Option<Instant> {
        let tasks = self.tasks.iter().map(Task::due_at);
        let timers = self.timers.iter().map(|t| t.deadline);
        tasks.chain(timers).min()
    }

    fn park_until(&mut self, wake: Instant) {
        loop {
            let now = self.clock.now();
            if wake <= now {
                break;
            }
            self.clock.sleep(wake - now);
        }
    }

    // ── inspection ──────────────────────────────────────────────────

    pub fn now(&mut self) -> Instant {
        self.clock.now()
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn pending_tasks(&self) -> usize {
        self.tasks.len()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Deadline of the timer registered under `name`, if still pending.
    pub fn deadline(&self, name: &str) -> Option<Instant> {
        self.timers
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.deadline)
    }

    pub fn gamepad(&self) -> Option<&Gamepad<B>> {
        self.gamepad.as_ref()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn bank(&self) -> &B {
        &self.bank
    }
}
