//! Multi-subscriber fan-out of typed change events. Accessed only by the
//! main loop (§5); not thread-safe by design, matching the teacher's
//! treatment of its console/tracker state as main-loop-only.

use std::collections::VecDeque;

use crate::world::{HandoffState, Metar};

/// Capacity of each subscriber's pending-event queue before the oldest
/// entries are dropped in favor of an `Overflow` marker.
const SUBSCRIBER_QUEUE_CAPACITY: usize = 512;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    AddedAircraft(String),
    ModifiedAircraft(String),
    RemovedAircraft(String),
    FlightPlanAmended(String),
    SquawkAssigned(String),
    ScratchpadSet(String),
    Handoff {
        callsign: String,
        from: String,
        to: String,
        state: HandoffState,
    },
    ControllerAdded(String),
    ControllerRemoved(String),
    TextMessage {
        from: String,
        text: String,
    },
    MetarUpdated(Metar),
    StatusMessage(String),
    /// Delivered once after an overflow, until the subscriber drains.
    Overflow,
}

pub type SubscriberId = u64;

struct Subscriber {
    id: SubscriberId,
    queue: VecDeque<Event>,
    overflowed: bool,
}

/// Fan-out hub. `post` enqueues a copy of the event to every live
/// subscriber; `drain` returns and clears one subscriber's pending events in
/// FIFO order. Events are immutable once posted (the type has no interior
/// mutability and `post` takes it by value, consuming the caller's copy).
#[derive(Default)]
pub struct EventStream {
    subscribers: Vec<Subscriber>,
    next_id: SubscriberId,
}

impl EventStream {
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
            next_id: 0,
        }
    }

    pub fn subscribe(&mut self) -> SubscriberId {
        let id = self.next_id;
        self.next_id += 1;
        self.subscribers.push(Subscriber {
            id,
            queue: VecDeque::new(),
            overflowed: false,
        });
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriberId) {
        self.subscribers.retain(|s| s.id != id);
    }

    /// Enqueues a copy of `event` to every live subscriber. On a full
    /// subscriber queue, the oldest event is dropped and an `Overflow`
    /// marker is queued for delivery once, until that subscriber drains.
    pub fn post(&mut self, event: Event) {
        for sub in self.subscribers.iter_mut() {
            if sub.queue.len() >= SUBSCRIBER_QUEUE_CAPACITY {
                sub.queue.pop_front();
                sub.overflowed = true;
                continue;
            }
            sub.queue.push_back(event.clone());
        }
    }

    /// Drains and returns a subscriber's pending events, in the order
    /// posted. If that subscriber overflowed since its last drain, the
    /// returned vector is prefixed with a single `Overflow` marker.
    pub fn drain(&mut self, id: SubscriberId) -> Vec<Event> {
        let sub = match self.subscribers.iter_mut().find(|s| s.id == id) {
            Some(s) => s,
            None => return Vec::new(),
        };
        let mut out = Vec::with_capacity(sub.queue.len() + 1);
        if sub.overflowed {
            out.push(Event::Overflow);
            sub.overflowed = false;
        }
        out.extend(sub.queue.drain(..));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drained_sequence_is_prefix_of_posting_order() {
        let mut stream = EventStream::new();
        let sub = stream.subscribe();

        stream.post(Event::AddedAircraft("AAL123".into()));
        stream.post(Event::ModifiedAircraft("AAL123".into()));

        let partial = stream.drain(sub);
        assert_eq!(
            partial,
            vec![
                Event::AddedAircraft("AAL123".into()),
                Event::ModifiedAircraft("AAL123".into()),
            ]
        );

        stream.post(Event::RemovedAircraft("AAL123".into()));
        let rest = stream.drain(sub);
        assert_eq!(rest, vec![Event::RemovedAircraft("AAL123".into())]);
    }

    #[test]
    fn subscribers_are_independent() {
        let mut stream = EventStream::new();
        let a = stream.subscribe();
        let b = stream.subscribe();

        stream.post(Event::StatusMessage("hello".into()));
        assert_eq!(stream.drain(a).len(), 1);
        assert_eq!(stream.drain(b).len(), 1);
        // a already drained, b should still have its own copy until drained
        assert_eq!(stream.drain(a).len(), 0);
    }

    #[test]
    fn overflow_marker_delivered_once() {
        let mut stream = EventStream::new();
        let sub = stream.subscribe();

        for i in 0..(SUBSCRIBER_QUEUE_CAPACITY + 5) {
            stream.post(Event::StatusMessage(i.to_string()));
        }

        let drained = stream.drain(sub);
        assert_eq!(drained[0], Event::Overflow);
        assert_eq!(drained.len(), SUBSCRIBER_QUEUE_CAPACITY + 1);

        // Draining again with no overflow since shouldn't re-add the marker.
        stream.post(Event::StatusMessage("ok".into()));
        let drained2 = stream.drain(sub);
        assert_eq!(drained2, vec![Event::StatusMessage("ok".into())]);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let mut stream = EventStream::new();
        let sub = stream.subscribe();
        stream.unsubscribe(sub);
        stream.post(Event::StatusMessage("ignored".into()));
        assert_eq!(stream.drain(sub), Vec::new());
    }
}
