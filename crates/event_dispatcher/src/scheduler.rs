//! Timer scheduling used for deferred dispatch
//!
//! Dispatchers never touch a clock directly. They hand one-shot callbacks to a
//! [`Scheduler`] and keep the returned [`TimerId`]s so pending work can be
//! cancelled later. Two implementations ship with the crate:
//!
//! - [`TokioScheduler`] runs each timer as a local tokio task and must be used
//!   from inside a [`tokio::task::LocalSet`].
//! - [`ManualScheduler`] keeps a virtual clock that only moves when the owner
//!   calls [`ManualScheduler::advance`], which suits tests and hosts that drive
//!   their own frame or tick loop.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;
use tokio::task::AbortHandle;
use tracing::trace;

/// Handle identifying one scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

/// Callback run when a timer fires. Receives the id it was scheduled under.
pub type TimerTask = Box<dyn FnOnce(TimerId)>;

/// Schedule-after / cancel capability injected into dispatchers
pub trait Scheduler {
    /// Run `task` once, at or after `delay` from now.
    ///
    /// The task must not run before `schedule` returns, even for a zero delay.
    fn schedule(&self, delay: Duration, task: TimerTask) -> TimerId;

    /// Cancel a timer. Unknown or already fired timers are ignored.
    fn cancel(&self, id: TimerId);
}

#[derive(Debug, Default)]
struct IdAllocator(Cell<u64>);

impl IdAllocator {
    fn next(&self) -> TimerId {
        let id = self.0.get() + 1;
        self.0.set(id);
        TimerId(id)
    }
}

/// Scheduler backed by tokio timers on the current thread.
///
/// # Panics
///
/// [`schedule`](Scheduler::schedule) panics when called outside a
/// [`tokio::task::LocalSet`], since timer callbacks are not `Send`.
#[derive(Debug, Default)]
pub struct TokioScheduler {
    ids: IdAllocator,
    timers: Rc<RefCell<HashMap<TimerId, AbortHandle>>>,
}

impl TokioScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of timers that have neither fired nor been cancelled
    pub fn pending(&self) -> usize {
        self.timers.borrow().len()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: TimerTask) -> TimerId {
        let id = self.ids.next();
        let timers = Rc::clone(&self.timers);

        let handle = tokio::task::spawn_local(async move {
            tokio::time::sleep(delay).await;
            timers.borrow_mut().remove(&id);
            trace!(%id, "⏰ Timer fired");
            task(id);
        });

        self.timers.borrow_mut().insert(id, handle.abort_handle());
        id
    }

    fn cancel(&self, id: TimerId) {
        let handle = self.timers.borrow_mut().remove(&id);
        if let Some(handle) = handle {
            handle.abort();
            trace!(%id, "Timer cancelled");
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, handle) in self.timers.borrow_mut().drain() {
            handle.abort();
        }
    }
}

/// Scheduler with a virtual clock that only advances on request.
///
/// Timers due at the same instant fire in the order they were scheduled.
/// Timers scheduled by a firing callback are picked up by the same
/// [`advance`](Self::advance) call if they fall due before its deadline.
#[derive(Default)]
pub struct ManualScheduler {
    ids: IdAllocator,
    now: Cell<Duration>,
    queue: RefCell<BTreeMap<(Duration, TimerId), TimerTask>>,
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("now", &self.now.get())
            .field("pending", &self.pending())
            .finish()
    }
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time elapsed on the virtual clock
    pub fn now(&self) -> Duration {
        self.now.get()
    }

    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Move the clock forward by `by`, firing every timer that falls due.
    ///
    /// Returns the number of timers fired. The clock saturates at
    /// [`Duration::MAX`].
    pub fn advance(&self, by: Duration) -> usize {
        let deadline = self.now.get().saturating_add(by);
        let fired = self.fire_while(|due| due <= deadline);
        self.now.set(deadline);
        fired
    }

    /// Fire every pending timer, including ones scheduled while firing,
    /// moving the clock to each due time along the way.
    pub fn run_until_idle(&self) -> usize {
        self.fire_while(|_| true)
    }

    fn fire_while(&self, is_due: impl Fn(Duration) -> bool) -> usize {
        let mut fired = 0;
        loop {
            // The borrow must end before the task runs, tasks may schedule more timers
            let next = {
                let mut queue = self.queue.borrow_mut();
                match queue.first_key_value() {
                    Some((&(due, _), _)) if is_due(due) => queue.pop_first(),
                    _ => None,
                }
            };
            let Some(((due, id), task)) = next else {
                break;
            };

            if due > self.now.get() {
                self.now.set(due);
            }
            trace!(%id, "⏰ Timer fired");
            task(id);
            fired += 1;
        }
        fired
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: TimerTask) -> TimerId {
        let id = self.ids.next();
        let due = self.now.get().saturating_add(delay);
        self.queue.borrow_mut().insert((due, id), task);
        id
    }

    fn cancel(&self, id: TimerId) {
        let removed = {
            let mut queue = self.queue.borrow_mut();
            let key = queue.keys().find(|(_, timer)| *timer == id).copied();
            key.and_then(|key| queue.remove(&key))
        };
        if removed.is_some() {
            trace!(%id, "Timer cancelled");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Rc<RefCell<Vec<&'static str>>>, impl Fn(&'static str) -> TimerTask) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        let make = move |label: &'static str| -> TimerTask {
            let sink = sink.clone();
            Box::new(move |_| sink.borrow_mut().push(label))
        };
        (log, make)
    }

    #[test]
    fn test_manual_fires_in_due_order() {
        let scheduler = ManualScheduler::new();
        let (log, task) = recorder();

        scheduler.schedule(Duration::from_millis(30), task("late"));
        scheduler.schedule(Duration::from_millis(10), task("early"));
        scheduler.schedule(Duration::from_millis(10), task("early-second"));

        assert_eq!(scheduler.advance(Duration::from_millis(5)), 0);
        assert_eq!(scheduler.advance(Duration::from_millis(5)), 2);
        assert_eq!(*log.borrow(), vec!["early", "early-second"]);

        assert_eq!(scheduler.advance(Duration::from_millis(100)), 1);
        assert_eq!(*log.borrow(), vec!["early", "early-second", "late"]);
        assert_eq!(scheduler.now(), Duration::from_millis(110));
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_manual_cancel() {
        let scheduler = ManualScheduler::new();
        let (log, task) = recorder();

        let id = scheduler.schedule(Duration::ZERO, task("cancelled"));
        scheduler.schedule(Duration::ZERO, task("kept"));
        scheduler.cancel(id);
        // Unknown ids are ignored
        scheduler.cancel(id);

        assert_eq!(scheduler.run_until_idle(), 1);
        assert_eq!(*log.borrow(), vec!["kept"]);
    }

    #[test]
    fn test_manual_task_receives_its_id() {
        let scheduler = ManualScheduler::new();
        let seen = Rc::new(Cell::new(None));
        let sink = seen.clone();

        let id = scheduler.schedule(Duration::from_millis(1), Box::new(move |id| sink.set(Some(id))));
        scheduler.run_until_idle();

        assert_eq!(seen.get(), Some(id));
    }

    #[test]
    fn test_manual_nested_schedule() {
        let scheduler = Rc::new(ManualScheduler::new());
        let (log, task) = recorder();
        let inner = scheduler.clone();
        let follow_up = task("follow-up");

        scheduler.schedule(
            Duration::from_millis(10),
            Box::new(move |_| {
                inner.schedule(Duration::from_millis(5), follow_up);
            }),
        );

        scheduler.advance(Duration::from_millis(12));
        assert!(log.borrow().is_empty());
        scheduler.advance(Duration::from_millis(3));
        assert_eq!(*log.borrow(), vec!["follow-up"]);
    }

    #[test]
    fn test_manual_huge_delay_saturates() {
        let scheduler = ManualScheduler::new();
        let (log, task) = recorder();

        scheduler.advance(Duration::from_millis(1));
        let id = scheduler.schedule(Duration::MAX, task("far"));
        assert_eq!(scheduler.pending(), 1);
        assert_eq!(id.as_u64(), 1);

        assert_eq!(scheduler.advance(Duration::from_secs(3600)), 0);
        assert!(log.borrow().is_empty());

        // The clock tops out instead of overflowing
        assert_eq!(scheduler.advance(Duration::MAX), 1);
        assert_eq!(scheduler.now(), Duration::MAX);
        assert_eq!(scheduler.advance(Duration::MAX), 0);
        assert_eq!(*log.borrow(), vec!["far"]);
    }

    #[test]
    fn test_timer_id_display() {
        let scheduler = ManualScheduler::new();
        let first = scheduler.schedule(Duration::ZERO, Box::new(|_| {}));
        let second = scheduler.schedule(Duration::ZERO, Box::new(|_| {}));

        assert_eq!(first.as_u64(), 1);
        assert_eq!(second.as_u64(), 2);
        assert_eq!(second.to_string(), "timer#2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_fires_after_delay() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let scheduler = TokioScheduler::new();
                let fired = Rc::new(Cell::new(false));
                let flag = fired.clone();

                scheduler.schedule(Duration::from_millis(50), Box::new(move |_| flag.set(true)));
                assert_eq!(scheduler.pending(), 1);

                tokio::time::sleep(Duration::from_millis(10)).await;
                assert!(!fired.get());

                tokio::time::sleep(Duration::from_millis(100)).await;
                assert!(fired.get());
                assert_eq!(scheduler.pending(), 0);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_cancel() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let scheduler = TokioScheduler::new();
                let fired = Rc::new(Cell::new(false));
                let flag = fired.clone();

                let id = scheduler.schedule(Duration::ZERO, Box::new(move |_| flag.set(true)));
                scheduler.cancel(id);

                tokio::time::sleep(Duration::from_millis(50)).await;
                assert!(!fired.get());
                assert_eq!(scheduler.pending(), 0);
            })
            .await;
    }
}
