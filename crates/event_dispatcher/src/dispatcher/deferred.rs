/// Timer-delayed dispatch
use super::core::EventDispatcher;
use crate::event::Event;
use crate::scheduler::TimerId;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, error};

impl EventDispatcher {
    /// Dispatches `event` on this dispatcher once `delay` has elapsed.
    ///
    /// Returns the timer handle, which can be passed to
    /// [`cancel_deferred_event`](Self::cancel_deferred_event). A listener error
    /// during the deferred dispatch cannot reach the caller and is logged
    /// instead. Timers do not keep the dispatcher alive; if it is dropped
    /// first the dispatch never happens.
    pub fn defer_event_dispatch(&self, event: Rc<Event>, delay: Duration) -> TimerId {
        let event_type = event.event_type().clone();
        let dispatcher = Rc::downgrade(&self.inner);

        let id = self.inner.scheduler.schedule(
            delay,
            Box::new(move |id| {
                if let Some(inner) = dispatcher.upgrade() {
                    EventDispatcher { inner }.fire_deferred(id, &event);
                }
            }),
        );

        self.inner.pending_timers.borrow_mut().insert(id);
        self.inner.record(|stats| stats.deferred_scheduled += 1);
        debug!(%id, event_type = %event_type, delay_ms = delay.as_millis() as u64, "⏳ Deferred event");
        id
    }

    /// [`defer_event_dispatch`](Self::defer_event_dispatch) with the configured
    /// default delay (1000 ms unless changed).
    pub fn defer_event_dispatch_default(&self, event: Rc<Event>) -> TimerId {
        let delay = self.inner.settings.default_defer_delay();
        self.defer_event_dispatch(event, delay)
    }

    /// Cancels one deferred dispatch. Returns `false` if it already fired or
    /// was cancelled.
    pub fn cancel_deferred_event(&self, id: TimerId) -> bool {
        if !self.inner.pending_timers.borrow_mut().remove(&id) {
            return false;
        }
        self.inner.scheduler.cancel(id);
        self.inner.record(|stats| stats.deferred_cancelled += 1);
        true
    }

    /// Cancels every deferred dispatch that has not fired yet.
    pub fn cancel_deferred_events(&self) {
        let ids: Vec<TimerId> = self.inner.pending_timers.borrow_mut().drain().collect();
        for id in &ids {
            self.inner.scheduler.cancel(*id);
        }

        self.inner
            .record(|stats| stats.deferred_cancelled += ids.len() as u64);
        debug!(count = ids.len(), "Cancelled deferred events");
    }

    /// Number of deferred dispatches that have not fired yet
    pub fn pending_deferred_count(&self) -> usize {
        self.inner.pending_timers.borrow().len()
    }

    fn fire_deferred(&self, id: TimerId, event: &Event) {
        // A timer that is no longer pending was cancelled after the
        // scheduler had already picked it up
        if !self.inner.pending_timers.borrow_mut().remove(&id) {
            return;
        }
        self.inner.record(|stats| stats.deferred_fired += 1);

        if let Err(e) = self.dispatch_event(event) {
            error!(%id, event_type = %event.event_type(), error = %e, "❌ Deferred dispatch failed");
        }
    }
}
