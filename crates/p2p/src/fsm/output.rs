//! Protocol output.
//!
//! State transitions communicate with the driver by pushing events into an
//! [`Outbox`]; the driver drains it once per tick and forwards everything
//! to the diagnostic log. Message delivery itself needs no queue, since a
//! send runs the receiver's handler synchronously.
use std::collections::VecDeque;

use crate::fsm::event::Event;

/// Holds events emitted by state transitions until the driver drains them.
#[derive(Debug, Default)]
pub struct Outbox {
    events: VecDeque<Event>,
}

impl Iterator for Outbox {
    type Item = Event;

    /// Get the next event in the outbound queue.
    fn next(&mut self) -> Option<Event> {
        self.events.pop_front()
    }
}

impl Outbox {
    /// Push an event to the queue.
    pub fn event(&mut self, event: impl Into<Event>) {
        self.events.push_back(event.into());
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::id::PeerId;
    use crate::fsm::peermgr;

    #[test]
    fn test_events_drain_in_order() {
        let mut outbox = Outbox::default();
        let a = PeerId::from_bits(1);
        let b = PeerId::from_bits(2);

        outbox.event(peermgr::Event::Started(a));
        outbox.event(peermgr::Event::Started(b));
        assert_eq!(outbox.len(), 2);

        let drained: Vec<Event> = outbox.by_ref().collect();
        assert_eq!(drained.len(), 2);
        assert!(outbox.is_empty());
        assert!(
            matches!(drained[0], Event::Peer(peermgr::Event::Started(id)) if id == a)
        );
    }
}
