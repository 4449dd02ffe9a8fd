/// Core EventDispatcher implementation
use super::listeners::Listener;
use super::stats::DispatcherStats;
use crate::config::DispatcherSettings;
use crate::event::{Event, EventType, Target};
use crate::scheduler::{Scheduler, TimerId, TokioScheduler};
use smallvec::SmallVec;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

/// Announces events to listeners registered per event type.
///
/// A dispatcher is normally owned by one host object, whose identity is
/// stamped onto every event it dispatches as the event's current target.
/// Dispatch is synchronous: listeners run in registration order inside
/// [`dispatch_event`](Self::dispatch_event), after which events queued against
/// the dispatched type are released and, for bubbling events, the same event
/// instance is forwarded to the parent dispatcher.
///
/// `EventDispatcher` is a cheap handle. Clones share the same listeners,
/// timers and queues, which lets listeners call back into the dispatcher that
/// is invoking them. All state lives on one thread; every internal borrow is
/// released before user code runs, so re-entrant dispatch is supported.
///
/// Dropping the last handle cancels any deferred dispatches still pending.
#[derive(Clone)]
pub struct EventDispatcher {
    pub(super) inner: Rc<DispatcherInner>,
}

pub(super) struct DispatcherInner {
    /// Stamped onto every dispatched event
    pub(super) current_target: Option<Target>,
    /// Destination for bubbling events
    pub(super) parent: Option<EventDispatcher>,
    /// Listeners per event type, in call order
    pub(super) listeners: RefCell<HashMap<EventType, SmallVec<[Listener; 4]>>>,
    /// Deferred dispatches that have not fired yet
    pub(super) pending_timers: RefCell<HashSet<TimerId>>,
    /// Events held until their trigger type is dispatched, in queue order
    pub(super) queued_events: RefCell<HashMap<EventType, Vec<Rc<Event>>>>,
    pub(super) scheduler: Rc<dyn Scheduler>,
    pub(super) settings: DispatcherSettings,
    pub(super) stats: RefCell<DispatcherStats>,
}

impl DispatcherInner {
    pub(super) fn record(&self, update: impl FnOnce(&mut DispatcherStats)) {
        update(&mut self.stats.borrow_mut());
    }
}

impl Drop for DispatcherInner {
    fn drop(&mut self) {
        for id in self.pending_timers.get_mut().drain() {
            self.scheduler.cancel(id);
        }
    }
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("current_target", &self.inner.current_target)
            .field("has_parent", &self.inner.parent.is_some())
            .field("listener_types", &self.inner.listeners.borrow().len())
            .field("pending_timers", &self.inner.pending_timers.borrow().len())
            .field("queued_triggers", &self.inner.queued_events.borrow().len())
            .field("settings", &self.inner.settings)
            .finish()
    }
}

impl EventDispatcher {
    /// Creates a dispatcher with default settings and a [`TokioScheduler`].
    ///
    /// Deferred dispatch on such a dispatcher must happen inside a
    /// [`tokio::task::LocalSet`]; use [`builder`](Self::builder) to inject
    /// another scheduler.
    pub fn new(current_target: Option<Target>, parent: Option<EventDispatcher>) -> Self {
        let mut builder = Self::builder();
        builder.current_target = current_target;
        builder.parent = parent;
        builder.build()
    }

    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    /// The target stamped onto events dispatched here
    pub fn current_target(&self) -> Option<&Target> {
        self.inner.current_target.as_ref()
    }

    /// The dispatcher bubbling events are forwarded to
    pub fn parent(&self) -> Option<&EventDispatcher> {
        self.inner.parent.as_ref()
    }

    pub fn settings(&self) -> &DispatcherSettings {
        &self.inner.settings
    }

    /// Snapshot of the dispatcher counters
    pub fn stats(&self) -> DispatcherStats {
        self.inner.stats.borrow().clone()
    }

    /// Whether both handles refer to the same dispatcher
    pub fn ptr_eq(&self, other: &EventDispatcher) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Builder for dispatchers that need a custom scheduler or settings.
#[derive(Default)]
pub struct DispatcherBuilder {
    current_target: Option<Target>,
    parent: Option<EventDispatcher>,
    scheduler: Option<Rc<dyn Scheduler>>,
    settings: DispatcherSettings,
}

impl DispatcherBuilder {
    pub fn current_target(mut self, target: Target) -> Self {
        self.current_target = Some(target);
        self
    }

    pub fn parent(mut self, parent: &EventDispatcher) -> Self {
        self.parent = Some(parent.clone());
        self
    }

    /// Scheduler used for deferred dispatch. Defaults to [`TokioScheduler`].
    pub fn scheduler(mut self, scheduler: Rc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn settings(mut self, settings: DispatcherSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn build(self) -> EventDispatcher {
        let scheduler = self
            .scheduler
            .unwrap_or_else(|| Rc::new(TokioScheduler::new()));

        EventDispatcher {
            inner: Rc::new(DispatcherInner {
                current_target: self.current_target,
                parent: self.parent,
                listeners: RefCell::new(HashMap::new()),
                pending_timers: RefCell::new(HashSet::new()),
                queued_events: RefCell::new(HashMap::new()),
                scheduler,
                settings: self.settings,
                stats: RefCell::new(DispatcherStats::default()),
            }),
        }
    }
}
