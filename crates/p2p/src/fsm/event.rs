//! State machine events.
use std::fmt;

use crate::fsm::{addrmgr, peermgr, seeder};

/// An overlay event.
#[derive(Debug, Clone)]
pub enum Event {
    /// A connection management event.
    Peer(peermgr::Event),
    /// An address gossip event.
    Address(addrmgr::Event),
    /// A seeder event.
    Seeder(seeder::Event),
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Peer(event) => write!(f, "{}", event),
            Self::Address(event) => write!(f, "{}", event),
            Self::Seeder(event) => write!(f, "{}", event),
        }
    }
}

impl From<peermgr::Event> for Event {
    fn from(event: peermgr::Event) -> Self {
        Self::Peer(event)
    }
}

impl From<addrmgr::Event> for Event {
    fn from(event: addrmgr::Event) -> Self {
        Self::Address(event)
    }
}

impl From<seeder::Event> for Event {
    fn from(event: seeder::Event) -> Self {
        Self::Seeder(event)
    }
}
