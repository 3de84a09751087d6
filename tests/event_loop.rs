//! End-to-end runs of the event loop against a simulated board.

use std::cell::{Cell, RefCell};
use std::convert::Infallible;
use std::rc::Rc;
use std::time::Duration;

use embedded_hal::digital::{ErrorType, InputPin};
use pulp_loop::{Action, Clock, Context, Exit, Instant, Outcome, PinBank, Scheduler};

#[derive(Clone, Default)]
struct Board {
    now: Rc<Cell<u64>>,
    levels: Rc<RefCell<Vec<(char, Rc<Cell<bool>>)>>>,
}

impl Board {
    fn button(&self, name: char) -> Rc<Cell<bool>> {
        let level = Rc::new(Cell::new(false));
        self.levels.borrow_mut().push((name, level.clone()));
        level
    }
}

impl Clock for Board {
    fn now(&mut self) -> Instant {
        Instant::from_micros(self.now.get())
    }

    fn sleep(&mut self, duration: Duration) {
        self.now.set(self.now.get() + duration.as_micros() as u64);
    }
}

struct Button(Rc<Cell<bool>>);

impl ErrorType for Button {
    type Error = Infallible;
}

impl InputPin for Button {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.0.get())
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(!self.0.get())
    }
}

impl PinBank for Board {
    type Id = char;
    type Pin = Button;

    fn is_available(&self, id: char) -> bool {
        self.levels.borrow().iter().any(|(name, _)| *name == id)
    }

    fn configure_pull_down(&mut self, id: char) -> Option<Button> {
        let levels = self.levels.borrow();
        let (_, level) = levels.iter().find(|(name, _)| *name == id)?;
        Some(Button(level.clone()))
    }
}

type Log = Rc<RefCell<Vec<(String, u64)>>>;

fn record(
    log: &Log,
    what: &str,
    outcome: Outcome,
) -> impl FnMut(&mut Context<'_>) -> Outcome + 'static {
    let log = log.clone();
    let what = what.to_string();
    move |cx: &mut Context<'_>| {
        log.borrow_mut().push((what.clone(), cx.now().as_millis()));
        outcome
    }
}

fn press(level: &Rc<Cell<bool>>, high: bool) -> impl FnMut(&mut Context<'_>) + 'static {
    let level = level.clone();
    move |_: &mut Context<'_>| level.set(high)
}

#[test]
fn chords_timers_and_stop_in_one_loop() {
    let board = Board::default();
    let a = board.button('a');
    let b = board.button('b');
    let log = Log::default();

    let mut sched = Scheduler::with_pins(board.clone(), board.clone());
    sched.every("heartbeat", Duration::from_millis(250), record(&log, "beat", Outcome::Handled));

    // bigger chord first; it passes so the single-pin binding still runs
    sched
        .on(&['a', 'b'], Action::Press, record(&log, "ab", Outcome::Propagate))
        .unwrap();
    sched
        .on(&['a'], Action::Press, record(&log, "a", Outcome::Handled))
        .unwrap();
    sched
        .on(&['b'], Action::Release, record(&log, "b up", Outcome::Handled))
        .unwrap();

    sched.at("press both", Instant::from_millis(100), {
        let (a, b) = (a.clone(), b.clone());
        move |_: &mut Context<'_>| {
            a.set(true);
            b.set(true);
        }
    });
    sched.at("release b", Instant::from_millis(300), press(&b, false));
    sched.at("stop", Instant::from_millis(400), |cx: &mut Context<'_>| cx.stop());

    assert_eq!(sched.start(), Ok(Exit::Stopped));
    assert_eq!(sched.gamepad().map(|pad| pad.tracked().count()), Some(2));

    let log = log.borrow();
    let seen: Vec<(&str, u64)> = log.iter().map(|(w, t)| (w.as_str(), *t)).collect();
    assert_eq!(
        seen,
        vec![
            ("beat", 0),
            ("ab", 140),
            ("a", 140),
            ("beat", 250),
            ("b up", 340),
        ]
    );
}

#[test]
fn bounce_shorter_than_a_poll_is_filtered() {
    let board = Board::default();
    let a = board.button('a');
    let log = Log::default();

    let mut sched = Scheduler::with_pins(board.clone(), board.clone());
    sched
        .on(&['a'], Action::Press, record(&log, "a", Outcome::Handled))
        .unwrap();

    // high for a single poll only
    sched.at("glitch", Instant::from_millis(50), press(&a, true));
    sched.at("settle", Instant::from_millis(70), press(&a, false));
    sched.at("stop", Instant::from_millis(200), |cx: &mut Context<'_>| cx.stop());

    sched.start().unwrap();
    assert!(log.borrow().is_empty());
}

#[test]
fn timers_only_loop_runs_dry() {
    let board = Board::default();
    board.now.set(10_000_000);
    let log = Log::default();

    let mut sched = Scheduler::new(board.clone());
    sched.after("five", Duration::from_secs(5), record(&log, "five", Outcome::Handled));
    sched.at("past", Instant::from_secs(1), record(&log, "past", Outcome::Handled));

    assert_eq!(sched.start(), Ok(Exit::NothingToDo));
    assert_eq!(
        *log.borrow(),
        vec![("past".to_string(), 10_000), ("five".to_string(), 15_000)]
    );
}
