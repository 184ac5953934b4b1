//! Message vocabulary of the simulated wire protocol.
use std::fmt;

use crate::common::id::PeerId;

/// A protocol message.
///
/// Delivery is synchronous: the receiver's handler runs on the sender's
/// stack, within the same tick. The only deferred path is the per-target
/// `pending_addr` queue drained by the trickle step of maintenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Handshake announcement, sent on connect and echoed by the acceptor.
    Version,
    /// Request for a sample of the receiver's known addresses.
    GetAddr,
    /// A batch of advertised addresses.
    Addr(Vec<PeerId>),
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Version => write!(f, "version"),
            Self::GetAddr => write!(f, "getaddr"),
            Self::Addr(batch) => write!(f, "addr({})", batch.len()),
        }
    }
}
