//! # Component Capability Contracts
//!
//! The dispatch core does not know what a peer manager or a directory
//! service *does* — it only knows two things about every protocol component:
//! how to hand it a message ([`Executable`]) and how to ask it who else
//! should hear about one ([`Broadcastable`]). Keeping both capabilities on
//! one object lets a component's gossip policy depend on its own protocol
//! state (e.g. only relay what it hasn't already seen).
//!
//! ## Failure handling
//!
//! Handlers return a typed [`HandlerOutcome`] instead of a bare boolean.
//! The router does not interpret the outcome beyond counting it — reaction
//! is delegated to a pluggable [`FailurePolicy`]. The shipped default,
//! [`LogAndDrop`], logs and does nothing else: there is deliberately no
//! retry or dead-letter path today, only the seam where one would go.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{error, warn};

use crate::message::{MessageKind, Peer};

// ---------------------------------------------------------------------------
// Handler Outcome
// ---------------------------------------------------------------------------

/// Result of a single handler invocation.
///
/// `Retryable` and `Fatal` both end the message's life under the default
/// policy; the split exists so a future policy can treat them differently
/// without every component changing its signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// The component consumed the message successfully.
    Completed,
    /// Processing failed for a transient reason; a retry policy could
    /// plausibly redeliver this message.
    Retryable(String),
    /// Processing failed permanently; redelivery would fail the same way.
    Fatal(String),
}

impl HandlerOutcome {
    /// `true` only for [`HandlerOutcome::Completed`].
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for HandlerOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => f.write_str("completed"),
            Self::Retryable(reason) => write!(f, "retryable: {}", reason),
            Self::Fatal(reason) => write!(f, "fatal: {}", reason),
        }
    }
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// A component that can process messages routed to it.
///
/// `payload` is the full wire buffer; `body_offset` is where the
/// instruction/body begins. Handlers parse from the offset and must not
/// assume anything about bytes before it beyond what the router already
/// validated (the payload is at least `BODY_OFFSET` long).
#[async_trait]
pub trait Executable: Send + Sync {
    /// Processes one message body. Runs inside a worker-pool job, so it may
    /// execute concurrently with any other handler including itself —
    /// internal thread-safety is the component's problem, not the router's.
    async fn execute(&self, payload: Bytes, body_offset: usize, sender: Peer) -> HandlerOutcome;
}

/// A component that can name the peers a message should be relayed to.
pub trait Broadcastable: Send + Sync {
    /// Computes the gossip relay targets for a message of the given
    /// instruction type from the given sender. An empty vec means "relay to
    /// nobody". Must not block and must not fail.
    fn broadcast_list(&self, instruction: u8, sender: &Peer) -> Vec<Peer>;
}

/// The full contract a protocol component satisfies toward the dispatch
/// core: message execution, broadcast resolution, and a fire-and-forget
/// synchronization entry point used once at startup.
pub trait ProtocolComponent: Executable + Broadcastable {
    /// The routing slot this component occupies.
    fn kind(&self) -> MessageKind;

    /// Begins the component's own synchronization procedure. Called at most
    /// once, from the sync selector. The component is expected to spawn its
    /// own background work; the orchestrator never waits on it.
    fn start_synchronization(&self);
}

/// Contract for the lookup-role RPC server. The core starts it and checks
/// the boolean; everything else about the server is the node binary's
/// business.
pub trait RpcListener: Send + Sync {
    /// Starts serving. Returns `false` when the listener could not bind.
    fn start_listening(&self) -> bool;
}

// ---------------------------------------------------------------------------
// Component Table
// ---------------------------------------------------------------------------

/// The fixed routing table: one component per [`MessageKind`].
///
/// Built once at node construction and read-only afterwards, so it is shared
/// freely across every worker task without locking. The `match` in [`get`]
/// replaces the original's array-index dispatch — there is no bounds check
/// to forget because there is no index.
///
/// [`get`]: ComponentTable::get
pub struct ComponentTable {
    peer_manager: Arc<dyn ProtocolComponent>,
    directory: Arc<dyn ProtocolComponent>,
    node: Arc<dyn ProtocolComponent>,
    consensus_user: Arc<dyn ProtocolComponent>,
    lookup: Arc<dyn ProtocolComponent>,
}

impl ComponentTable {
    /// Assembles the routing table from the five protocol components.
    pub fn new(
        peer_manager: Arc<dyn ProtocolComponent>,
        directory: Arc<dyn ProtocolComponent>,
        node: Arc<dyn ProtocolComponent>,
        consensus_user: Arc<dyn ProtocolComponent>,
        lookup: Arc<dyn ProtocolComponent>,
    ) -> Self {
        Self {
            peer_manager,
            directory,
            node,
            consensus_user,
            lookup,
        }
    }

    /// The component owning the given message kind.
    pub fn get(&self, kind: MessageKind) -> &Arc<dyn ProtocolComponent> {
        match kind {
            MessageKind::PeerManager => &self.peer_manager,
            MessageKind::Directory => &self.directory,
            MessageKind::Node => &self.node,
            MessageKind::ConsensusUser => &self.consensus_user,
            MessageKind::Lookup => &self.lookup,
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Policy
// ---------------------------------------------------------------------------

/// Pluggable reaction to a handler reporting failure.
///
/// The router calls this once per non-completed outcome, after its own
/// bookkeeping. Implementations must be cheap and must not block — they run
/// on the worker task that just executed the handler.
pub trait FailurePolicy: Send + Sync {
    /// Reacts to a failed handler invocation.
    fn on_failure(&self, kind: MessageKind, outcome: &HandlerOutcome, sender: &Peer);
}

/// The default policy: log the failure, drop the message.
///
/// Matches the system's only behavior to date. Retry-N, dead-lettering, or
/// escalation would slot in here without touching the router.
pub struct LogAndDrop;

impl FailurePolicy for LogAndDrop {
    fn on_failure(&self, kind: MessageKind, outcome: &HandlerOutcome, sender: &Peer) {
        match outcome {
            HandlerOutcome::Completed => {}
            HandlerOutcome::Retryable(reason) => {
                warn!(component = %kind, %sender, %reason, "handler failed, dropping message");
            }
            HandlerOutcome::Fatal(reason) => {
                error!(component = %kind, %sender, %reason, "handler failed fatally, dropping message");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_classification() {
        assert!(HandlerOutcome::Completed.is_completed());
        assert!(!HandlerOutcome::Retryable("busy".into()).is_completed());
        assert!(!HandlerOutcome::Fatal("bad signature".into()).is_completed());
    }

    #[test]
    fn outcome_display_carries_reason() {
        let outcome = HandlerOutcome::Retryable("mempool full".into());
        assert_eq!(outcome.to_string(), "retryable: mempool full");
        assert_eq!(HandlerOutcome::Completed.to_string(), "completed");
    }
}
