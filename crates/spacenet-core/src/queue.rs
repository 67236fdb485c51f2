//! Event queue with deterministic ordering.

use crate::event::Event;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Key for ordering events in the queue.
///
/// Events are ordered by:
/// 1. Time (earlier first)
/// 2. Priority (lower first)
/// 3. Sequence number (FIFO for same time and priority)
#[derive(Debug, Clone, Copy)]
pub struct EventKey {
    pub time: f64,
    pub priority: i32,
    pub sequence: u64,
}

impl Ord for EventKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then(self.priority.cmp(&other.priority))
            .then(self.sequence.cmp(&other.sequence))
    }
}

impl PartialOrd for EventKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for EventKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for EventKey {}

/// Min-queue of pending events.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    events: BTreeMap<EventKey, Event>,
    next_sequence: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: Event) {
        let key = EventKey {
            time: event.time,
            priority: event.priority,
            sequence: self.next_sequence,
        };
        self.next_sequence += 1;
        self.events.insert(key, event);
    }

    /// Remove and return the earliest event.
    pub fn pop(&mut self) -> Option<Event> {
        self.events.pop_first().map(|(_, event)| event)
    }

    pub fn peek(&self) -> Option<&Event> {
        self.events.first_key_value().map(|(_, event)| event)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Drop all events and restart the sequence counter.
    pub fn clear(&mut self) {
        self.events.clear();
        self.next_sequence = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;

    fn event(name: &str, time: f64, priority: i32) -> Event {
        Event::new(name, time, EventKind::Remove { elements: vec![] }).with_priority(priority)
    }

    #[test]
    fn pops_in_time_order() {
        let mut queue = EventQueue::new();
        queue.push(event("b", 2.0, 0));
        queue.push(event("a", 1.0, 0));
        assert_eq!(queue.pop().unwrap().name, "a");
        assert_eq!(queue.pop().unwrap().name, "b");
        assert!(queue.pop().is_none());
    }

    #[test]
    fn priority_breaks_time_ties() {
        let mut queue = EventQueue::new();
        queue.push(event("late", 1.0, 5));
        queue.push(event("early", 1.0, -1));
        assert_eq!(queue.peek().unwrap().name, "early");
    }

    #[test]
    fn insertion_order_breaks_full_ties() {
        let mut queue = EventQueue::new();
        for name in ["first", "second", "third"] {
            queue.push(event(name, 3.0, 0));
        }
        let order: Vec<_> = std::iter::from_fn(|| queue.pop()).map(|e| e.name).collect();
        assert_eq!(order, vec!["first", "second", "third"]);
    }

    #[test]
    fn clear_empties_queue() {
        let mut queue = EventQueue::new();
        queue.push(event("a", 0.0, 0));
        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.len(), 0);
    }
}
