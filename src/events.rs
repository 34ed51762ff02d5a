use std::{cmp::Ordering, collections::BinaryHeap};

use crate::plan::ContactId;

/// Events that can be scheduled in the simulation.
///
/// Events carry only identifiers; the state they act on (contact
/// queues, generator cursors) lives in the simulator's registries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A packet generator fires and injects packets.
    GeneratorFire {
        /// Index of the generator in registration order.
        generator: usize,
    },
    /// A contact reaches its `from_time` and activates.
    ContactStart {
        /// The contact that starts.
        contact: ContactId,
    },
    /// A contact examines the head of its transmission queue.
    ContactDrain {
        /// The contact that drains.
        contact: ContactId,
    },
    /// A transmission completes and the head packet is handed to the
    /// peer node.
    ContactHandover {
        /// The contact that finished transmitting.
        contact: ContactId,
    },
    /// A contact reaches its `to_time` and deactivates.
    ContactEnd {
        /// The contact that ends.
        contact: ContactId,
    },
}

/// An event scheduled for execution at a specific simulation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledEvent {
    time_ms: u64,
    event: Event,
    sequence: u64, // For deterministic ordering
}

impl ScheduledEvent {
    /// Creates a new scheduled event.
    pub fn new(time_ms: u64, event: Event, sequence: u64) -> Self {
        Self {
            time_ms,
            event,
            sequence,
        }
    }

    /// Returns the scheduled execution time in milliseconds.
    pub fn time_ms(&self) -> u64 {
        self.time_ms
    }

    /// Returns a reference to the event.
    pub fn event(&self) -> &Event {
        &self.event
    }

    /// Consumes the scheduled event and returns the event.
    pub fn into_event(self) -> Event {
        self.event
    }
}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max heap, but we want the earliest time first,
        // so the comparison is reversed. Events at the same time are
        // ordered by insertion sequence, the sole tie-breaker.
        match other.time_ms.cmp(&self.time_ms) {
            Ordering::Equal => other.sequence.cmp(&self.sequence),
            ordering => ordering,
        }
    }
}

/// A priority queue for scheduling events in chronological order.
///
/// Events are processed in time order, with deterministic ordering for
/// events scheduled at the same time using sequence numbers.
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<ScheduledEvent>,
}

impl EventQueue {
    /// Creates a new empty event queue.
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
        }
    }

    /// Schedules an event for execution.
    pub fn schedule(&mut self, event: ScheduledEvent) {
        self.heap.push(event);
    }

    /// Removes and returns the earliest scheduled event.
    pub fn pop_earliest(&mut self) -> Option<ScheduledEvent> {
        self.heap.pop()
    }

    /// Returns a reference to the earliest scheduled event without
    /// removing it.
    pub fn peek_earliest(&self) -> Option<&ScheduledEvent> {
        self.heap.peek()
    }

    /// Returns `true` if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Returns the number of events in the queue.
    pub fn len(&self) -> usize {
        self.heap.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fire(generator: usize) -> Event {
        Event::GeneratorFire { generator }
    }

    #[test]
    fn event_queue_ordering() {
        let mut queue = EventQueue::new();

        // Schedule events in random order
        queue.schedule(ScheduledEvent::new(300, fire(3), 2));
        queue.schedule(ScheduledEvent::new(100, fire(1), 0));
        queue.schedule(ScheduledEvent::new(200, fire(2), 1));

        // Should pop in time order
        let event1 = queue.pop_earliest().expect("event");
        assert_eq!(event1.time_ms(), 100);
        assert_eq!(event1.event(), &fire(1));

        let event2 = queue.pop_earliest().expect("event");
        assert_eq!(event2.time_ms(), 200);
        assert_eq!(event2.event(), &fire(2));

        let event3 = queue.pop_earliest().expect("event");
        assert_eq!(event3.time_ms(), 300);
        assert_eq!(event3.event(), &fire(3));

        assert!(queue.is_empty());
    }

    #[test]
    fn same_time_deterministic_ordering() {
        let mut queue = EventQueue::new();
        let same_time = 100;

        // Schedule multiple events at the same time with different
        // sequence numbers
        queue.schedule(ScheduledEvent::new(same_time, fire(3), 2));
        queue.schedule(ScheduledEvent::new(same_time, fire(1), 0));
        queue.schedule(ScheduledEvent::new(same_time, fire(2), 1));

        // Should pop in sequence order when times are equal
        let event1 = queue.pop_earliest().expect("event");
        assert_eq!(event1.event(), &fire(1));

        let event2 = queue.pop_earliest().expect("event");
        assert_eq!(event2.event(), &fire(2));

        let event3 = queue.pop_earliest().expect("event");
        assert_eq!(event3.event(), &fire(3));

        assert!(queue.is_empty());
    }
}
