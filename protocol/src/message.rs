//! # Wire Messages
//!
//! The raw unit flowing through the ingestion pipeline: an immutable byte
//! buffer paired with the peer that sent it. Nothing here parses message
//! bodies — that's the owning component's job. This module only knows enough
//! about the layout to classify a message: the type byte at [`TYPE_OFFSET`],
//! the instruction starting at [`INST_OFFSET`], and the minimum length
//! [`BODY_OFFSET`] below which a message cannot be routed at all.
//!
//! Ownership is linear: the network receive path allocates a [`WireMessage`],
//! hands it to the dispatch queue, the dispatch loop hands it to a worker
//! job, and the router consumes it. Rust's move semantics make the "freed
//! exactly once, on every path" property structural rather than disciplined.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::config::{BODY_OFFSET, TYPE_OFFSET};

// ---------------------------------------------------------------------------
// Peer
// ---------------------------------------------------------------------------

/// A remote node: network address plus listening port.
///
/// Immutable value type. Used both as the sender identity attached to every
/// incoming message and as a broadcast target when computing gossip relay
/// sets. Cheap to copy, hashable, and totally ordered so peer sets behave
/// deterministically in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Peer {
    /// IP address the peer is reachable at.
    pub addr: IpAddr,
    /// Port the peer listens on.
    pub port: u16,
}

impl Peer {
    /// Creates a peer from an address and listening port.
    pub fn new(addr: IpAddr, port: u16) -> Self {
        Self { addr, port }
    }

    /// A loopback peer, handy in tests and as a placeholder self-identity.
    pub fn loopback(port: u16) -> Self {
        Self {
            addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port,
        }
    }

    /// The peer as a connectable socket address.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.addr, self.port)
    }
}

impl From<SocketAddr> for Peer {
    fn from(sa: SocketAddr) -> Self {
        Self {
            addr: sa.ip(),
            port: sa.port(),
        }
    }
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.addr, self.port)
    }
}

// ---------------------------------------------------------------------------
// Message Kind
// ---------------------------------------------------------------------------

/// The closed set of protocol components a message can be routed to.
///
/// The wire type byte maps one-to-one onto this enumeration. Keeping it a
/// closed enum (instead of an index into an array of handlers) means the
/// router's dispatch is exhaustive-checked at compile time; the only runtime
/// failure mode left is a type byte outside the known range, which
/// [`MessageKind::from_byte`] reports as `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageKind {
    /// Peer connection management.
    PeerManager = 0,
    /// Directory service (the DS committee in chain terms).
    Directory = 1,
    /// The shard node itself.
    Node = 2,
    /// Consensus participant glue.
    ConsensusUser = 3,
    /// Lookup / archival service.
    Lookup = 4,
}

impl MessageKind {
    /// Number of routable component kinds. Any type byte at or above this
    /// value is unknown.
    pub const COUNT: usize = 5;

    /// Maps a wire type byte onto a component kind. Returns `None` for
    /// anything outside the known range — the caller decides how loudly to
    /// complain.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::PeerManager),
            1 => Some(Self::Directory),
            2 => Some(Self::Node),
            3 => Some(Self::ConsensusUser),
            4 => Some(Self::Lookup),
            _ => None,
        }
    }

    /// The wire type byte for this kind.
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Short lowercase name for log fields.
    pub fn name(self) -> &'static str {
        match self {
            Self::PeerManager => "peer_manager",
            Self::Directory => "directory",
            Self::Node => "node",
            Self::ConsensusUser => "consensus_user",
            Self::Lookup => "lookup",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Wire Message
// ---------------------------------------------------------------------------

/// A raw network message: payload bytes plus the peer that sent them.
///
/// The payload is a [`Bytes`] buffer so handing a view of it to a handler is
/// a refcount bump, not a copy. The struct itself is the unit of ownership
/// through the pipeline — whoever holds the `WireMessage` is responsible for
/// it, and dropping it is the one and only "free".
#[derive(Debug, Clone)]
pub struct WireMessage {
    /// Immutable message bytes as received from the network.
    pub payload: Bytes,
    /// The peer this message arrived from.
    pub sender: Peer,
}

impl WireMessage {
    /// Wraps received bytes and their sender into a wire message.
    pub fn new(payload: impl Into<Bytes>, sender: Peer) -> Self {
        Self {
            payload: payload.into(),
            sender,
        }
    }

    /// Whether the payload is long enough to carry a type byte and an
    /// instruction. Messages failing this check must be dropped, not routed.
    pub fn is_well_formed(&self) -> bool {
        self.payload.len() >= BODY_OFFSET
    }

    /// The raw type byte, if the message is long enough to have one.
    pub fn type_byte(&self) -> Option<u8> {
        self.payload.get(TYPE_OFFSET).copied()
    }

    /// The component kind this message claims to target. `None` when the
    /// message is undersized or the type byte is out of range.
    pub fn kind(&self) -> Option<MessageKind> {
        if !self.is_well_formed() {
            return None;
        }
        self.type_byte().and_then(MessageKind::from_byte)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_byte() {
        for kind in [
            MessageKind::PeerManager,
            MessageKind::Directory,
            MessageKind::Node,
            MessageKind::ConsensusUser,
            MessageKind::Lookup,
        ] {
            assert_eq!(MessageKind::from_byte(kind.as_byte()), Some(kind));
        }
    }

    #[test]
    fn out_of_range_bytes_are_unknown() {
        assert_eq!(MessageKind::from_byte(MessageKind::COUNT as u8), None);
        assert_eq!(MessageKind::from_byte(0x7F), None);
        assert_eq!(MessageKind::from_byte(0xFF), None);
    }

    #[test]
    fn undersized_message_is_malformed() {
        let sender = Peer::loopback(7210);
        assert!(!WireMessage::new(vec![], sender).is_well_formed());
        assert!(!WireMessage::new(vec![0x02], sender).is_well_formed());
        assert!(WireMessage::new(vec![0x02, 0x00], sender).is_well_formed());
    }

    #[test]
    fn kind_extraction_uses_type_offset() {
        let sender = Peer::loopback(7210);
        let msg = WireMessage::new(vec![0x02, 0x09, 0xAA, 0xBB], sender);
        assert_eq!(msg.type_byte(), Some(0x02));
        assert_eq!(msg.kind(), Some(MessageKind::Node));

        let unknown = WireMessage::new(vec![0x2A, 0x00], sender);
        assert_eq!(unknown.kind(), None);
    }

    #[test]
    fn peer_display_is_addr_port() {
        let peer = Peer::loopback(7210);
        assert_eq!(peer.to_string(), "127.0.0.1:7210");
        assert_eq!(Peer::from(peer.socket_addr()), peer);
    }
}
