//! Discrete-event simulation of the peer discovery and connection-formation
//! layer of a Bitcoin-style unstructured overlay.
//!
//! The simulation advances in integer ticks of a tenth of a second. Peers
//! discover each other through a bootstrap DNS oracle backed by a crawler,
//! gossip addresses over a trickled `addr` relay, and keep their outbound
//! slots filled from a local known-peer table. At the horizon the driver
//! exports the live connection graph for analysis.
//!
//! Everything is single-threaded and deterministic for a given RNG seed:
//! message delivery is a synchronous call into the receiver's handler, and
//! the only scheduling boundary is the tick.
pub mod common;
pub mod fsm;
pub mod sim;

pub use common::id::PeerId;
pub use common::time::Tick;
pub use fsm::Overlay;
pub use sim::{Config, Simulation, Snapshot};
