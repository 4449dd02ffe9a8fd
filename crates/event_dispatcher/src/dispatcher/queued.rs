/// Trigger-gated queuing
use super::core::EventDispatcher;
use crate::config::QueueRelease;
use crate::error::EventError;
use crate::event::{Event, EventType};
use std::rc::Rc;
use tracing::{debug, trace};

impl EventDispatcher {
    /// Holds `event` until an event of `trigger_type` is dispatched here.
    ///
    /// All events queued under one trigger are released together, on this
    /// dispatcher, right after the trigger's own listeners have run. The
    /// release order follows [`QueueRelease`] (FIFO unless configured).
    pub fn queue_event_dispatch(&self, trigger_type: impl Into<EventType>, event: Rc<Event>) {
        let trigger_type = trigger_type.into();
        debug!(
            trigger = %trigger_type,
            event_type = %event.event_type(),
            "📥 Queued event"
        );
        self.inner
            .queued_events
            .borrow_mut()
            .entry(trigger_type)
            .or_default()
            .push(event);
    }

    /// Discards every queued event without dispatching it.
    pub fn cancel_queued_events(&self) {
        let discarded = std::mem::take(&mut *self.inner.queued_events.borrow_mut());
        let count: usize = discarded.values().map(Vec::len).sum();

        self.inner
            .record(|stats| stats.queued_events_discarded += count as u64);
        debug!(count, "Discarded queued events");
    }

    /// Number of events waiting for a trigger
    pub fn queued_event_count(&self) -> usize {
        self.inner.queued_events.borrow().values().map(Vec::len).sum()
    }

    /// Releases the bucket queued under `trigger_type`.
    ///
    /// The bucket is detached before anything is dispatched, so events queued
    /// while releasing wait for the next trigger. If a released event fails,
    /// the ones not dispatched yet are put back in front of that bucket.
    pub(super) fn release_queued_events(&self, trigger_type: &EventType) -> Result<(), EventError> {
        let Some(mut bucket) = self.inner.queued_events.borrow_mut().remove(trigger_type) else {
            return Ok(());
        };

        let order = self.inner.settings.queue_release;
        if order == QueueRelease::Lifo {
            bucket.reverse();
        }
        trace!(trigger = %trigger_type, count = bucket.len(), ?order, "Releasing queued events");

        let mut pending = bucket.into_iter();
        while let Some(event) = pending.next() {
            self.inner.record(|stats| stats.queued_events_released += 1);
            if let Err(e) = self.dispatch_event(&event) {
                self.requeue_front(trigger_type, pending.collect(), order);
                return Err(e);
            }
        }

        Ok(())
    }

    fn requeue_front(&self, trigger_type: &EventType, mut remainder: Vec<Rc<Event>>, order: QueueRelease) {
        if remainder.is_empty() {
            return;
        }
        // Back to queue order
        if order == QueueRelease::Lifo {
            remainder.reverse();
        }

        let mut queued = self.inner.queued_events.borrow_mut();
        let bucket = queued.entry(trigger_type.clone()).or_default();
        remainder.append(bucket);
        *bucket = remainder;
    }
}
