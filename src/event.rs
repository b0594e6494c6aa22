//! In-kernel event bus, spec.md §4.5, sharing the dispatch fabric (C5)
//! with interrupt handling.
//!
//! Grounded on `examples/original_source/src/core/event.c`: `event_bind`
//! registers a (pre or post) callback for an event type, `event_enqueue`
//! pushes a type onto the kernel- or user-origin FIFO, `event_handle`
//! drains a queue and dispatches each popped type.
//!
//! The original's `event_handle` only drains whichever single queue
//! matches the origin of its caller-supplied pointer — a pointer-range
//! trick with no equivalent here. spec.md §9 resolves this by having
//! `handle` drain the kernel queue to empty before touching the user
//! queue at all, so kernel-origin events are never starved by a burst of
//! user-origin ones.

use crate::collections::SlQueue;
use crate::dispatch::{Callback, Dispatcher, Domain};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOrigin {
    Kernel = 0,
    User = 1,
}

/// Two FIFOs of pending event types, kernel-origin and user-origin.
pub struct EventBus {
    queue_kernel: SlQueue<u32>,
    queue_user: SlQueue<u32>,
}

impl EventBus {
    pub const fn new() -> Self {
        EventBus { queue_kernel: SlQueue::new(), queue_user: SlQueue::new() }
    }

    pub fn bind(dispatcher: &mut Dispatcher, event_type: u32, callback: Callback, post: bool) {
        dispatcher.register(Domain::Event, event_type, callback, post);
    }

    pub fn enqueue(&mut self, event_type: u32, origin: EventOrigin) {
        match origin {
            EventOrigin::Kernel => self.queue_kernel.push_back(event_type),
            EventOrigin::User => self.queue_user.push_back(event_type),
        }
    }

    /// Drain the kernel queue to empty, then the user queue, dispatching
    /// each popped event type with `data` set to the origin it came
    /// from.
    pub fn handle(&mut self, dispatcher: &Dispatcher) {
        while let Some(ev) = self.queue_kernel.pop_front() {
            dispatcher.dispatch(Domain::Event, ev, EventOrigin::Kernel as usize);
        }
        while let Some(ev) = self.queue_user.pop_front() {
            dispatcher.dispatch(Domain::Event, ev, EventOrigin::User as usize);
        }
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.queue_kernel.is_empty() && self.queue_user.is_empty()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    #[test]
    fn kernel_queue_drains_before_user_queue() {
        static SEEN: spinning_top::Spinlock<Vec<(u32, usize)>> = spinning_top::Spinlock::new(Vec::new());
        fn record(event_type: u32, data: usize) {
            SEEN.lock().push((event_type, data));
        }

        let mut dispatcher = Dispatcher::new();
        EventBus::bind(&mut dispatcher, 1, record, false);
        EventBus::bind(&mut dispatcher, 2, record, false);

        let mut bus = EventBus::new();
        bus.enqueue(2, EventOrigin::User);
        bus.enqueue(1, EventOrigin::Kernel);
        bus.handle(&dispatcher);

        let seen = SEEN.lock().clone();
        assert_eq!(seen, alloc::vec![(1, EventOrigin::Kernel as usize), (2, EventOrigin::User as usize)]);
        assert!(bus.is_empty());
    }

    #[test]
    fn unbound_event_type_is_silently_dropped() {
        let dispatcher = Dispatcher::new();
        let mut bus = EventBus::new();
        bus.enqueue(42, EventOrigin::Kernel);
        bus.handle(&dispatcher); // must not panic
        assert!(bus.is_empty());
    }
}
