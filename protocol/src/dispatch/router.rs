//! # Message Router
//!
//! Classifies a wire message by its leading type byte and hands it to the
//! owning protocol component; resolves gossip broadcast lists off the same
//! routing table. The router is where a message's life ends, whichever way
//! processing goes: undersized and unknown-type messages are dropped with a
//! warning, handler failures are counted and delegated to the failure
//! policy, and on every path the message is consumed exactly once.
//!
//! The router never retries and never escalates. If that ever changes it
//! changes inside a [`FailurePolicy`] implementation, not here.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tracing::warn;

use crate::component::{ComponentTable, FailurePolicy, LogAndDrop};
use crate::config::{INST_OFFSET, TYPE_OFFSET};
use crate::message::{MessageKind, Peer, WireMessage};

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Atomic counters describing the router's life so far.
///
/// Written by worker tasks, read by the metrics endpoint and by tests. The
/// counters are independent; `processed_total` counts handler invocations
/// only, so dropped messages never inflate it.
#[derive(Default)]
pub struct RouterStats {
    processed_total: AtomicU64,
    malformed_dropped: AtomicU64,
    unknown_dropped: AtomicU64,
    handler_failures: AtomicU64,
}

/// Point-in-time copy of [`RouterStats`], serializable for the stats API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Messages that reached a component handler.
    pub processed_total: u64,
    /// Messages dropped for being shorter than the minimum body offset.
    pub malformed_dropped: u64,
    /// Messages dropped for carrying an out-of-range type byte.
    pub unknown_dropped: u64,
    /// Handler invocations that reported a non-completed outcome.
    pub handler_failures: u64,
}

impl RouterStats {
    fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            processed_total: self.processed_total.load(Ordering::Relaxed),
            malformed_dropped: self.malformed_dropped.load(Ordering::Relaxed),
            unknown_dropped: self.unknown_dropped.load(Ordering::Relaxed),
            handler_failures: self.handler_failures.load(Ordering::Relaxed),
        }
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Routes wire messages to protocol components and resolves broadcast
/// targets from the same table.
///
/// Shared read-only across every worker task. The table never changes after
/// construction; the stats are atomics; the policy is immutable. No locks
/// anywhere on the hot path.
pub struct MessageRouter {
    table: ComponentTable,
    policy: Box<dyn FailurePolicy>,
    stats: RouterStats,
}

impl MessageRouter {
    /// Creates a router over the given table with the default log-and-drop
    /// failure policy.
    pub fn new(table: ComponentTable) -> Self {
        Self::with_policy(table, Box::new(LogAndDrop))
    }

    /// Creates a router with a custom failure policy.
    pub fn with_policy(table: ComponentTable, policy: Box<dyn FailurePolicy>) -> Self {
        Self {
            table,
            policy,
            stats: RouterStats::default(),
        }
    }

    /// The routing table, for collaborators that address components by kind
    /// (the sync selector, orchestration wiring).
    pub fn table(&self) -> &ComponentTable {
        &self.table
    }

    /// Current counter values.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Processes one message to completion, consuming it.
    ///
    /// Undersized payloads and unknown type bytes are logged and dropped
    /// without touching any handler. A known type byte invokes exactly the
    /// component registered for it, passing the instruction offset and the
    /// sender. Handler failure is logged via the policy and the message is
    /// dropped; nothing propagates and nothing is retried.
    pub async fn process_message(&self, message: WireMessage) {
        if !message.is_well_formed() {
            warn!(
                len = message.payload.len(),
                sender = %message.sender,
                "dropping undersized message"
            );
            self.stats.malformed_dropped.fetch_add(1, Ordering::Relaxed);
            return;
        }

        let type_byte = message.payload[TYPE_OFFSET];
        match MessageKind::from_byte(type_byte) {
            Some(kind) => {
                let component = self.table.get(kind);
                let outcome = component
                    .execute(message.payload.clone(), INST_OFFSET, message.sender)
                    .await;
                self.stats.processed_total.fetch_add(1, Ordering::Relaxed);

                if !outcome.is_completed() {
                    self.stats.handler_failures.fetch_add(1, Ordering::Relaxed);
                    self.policy.on_failure(kind, &outcome, &message.sender);
                }
            }
            None => {
                warn!(
                    sender = %message.sender,
                    "unknown message type 0x{:02x}", type_byte
                );
                self.stats.unknown_dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Computes the gossip relay set for a message of the given type and
    /// instruction from the given sender.
    ///
    /// Same table as routing, second capability of the same component — a
    /// component's relay policy may depend on its own protocol state.
    /// Unknown type bytes warn once and resolve to an empty set; this path
    /// never blocks and never fails.
    pub fn broadcast_list(&self, type_byte: u8, instruction: u8, sender: &Peer) -> Vec<Peer> {
        match MessageKind::from_byte(type_byte) {
            Some(kind) => self.table.get(kind).broadcast_list(instruction, sender),
            None => {
                warn!(%sender, "unknown message type 0x{:02x}", type_byte);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{Broadcastable, Executable, HandlerOutcome, ProtocolComponent};
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Mutex};

    /// Records every invocation so tests can assert exactly which component
    /// ran and with what arguments.
    struct Probe {
        kind: MessageKind,
        outcome: HandlerOutcome,
        calls: AtomicUsize,
        last_offset: AtomicUsize,
        last_sender: Mutex<Option<Peer>>,
        relay: Vec<Peer>,
    }

    impl Probe {
        fn new(kind: MessageKind) -> Arc<Self> {
            Arc::new(Self {
                kind,
                outcome: HandlerOutcome::Completed,
                calls: AtomicUsize::new(0),
                last_offset: AtomicUsize::new(usize::MAX),
                last_sender: Mutex::new(None),
                relay: Vec::new(),
            })
        }

        fn failing(kind: MessageKind, outcome: HandlerOutcome) -> Arc<Self> {
            Arc::new(Self {
                kind,
                outcome,
                calls: AtomicUsize::new(0),
                last_offset: AtomicUsize::new(usize::MAX),
                last_sender: Mutex::new(None),
                relay: Vec::new(),
            })
        }

        fn relaying(kind: MessageKind, relay: Vec<Peer>) -> Arc<Self> {
            Arc::new(Self {
                kind,
                outcome: HandlerOutcome::Completed,
                calls: AtomicUsize::new(0),
                last_offset: AtomicUsize::new(usize::MAX),
                last_sender: Mutex::new(None),
                relay,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Executable for Probe {
        async fn execute(&self, _payload: Bytes, body_offset: usize, sender: Peer) -> HandlerOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.last_offset.store(body_offset, Ordering::SeqCst);
            *self.last_sender.lock().unwrap() = Some(sender);
            self.outcome.clone()
        }
    }

    impl Broadcastable for Probe {
        fn broadcast_list(&self, _instruction: u8, _sender: &Peer) -> Vec<Peer> {
            self.relay.clone()
        }
    }

    impl ProtocolComponent for Probe {
        fn kind(&self) -> MessageKind {
            self.kind
        }

        fn start_synchronization(&self) {}
    }

    fn table_of(probes: &[Arc<Probe>; 5]) -> ComponentTable {
        ComponentTable::new(
            probes[0].clone(),
            probes[1].clone(),
            probes[2].clone(),
            probes[3].clone(),
            probes[4].clone(),
        )
    }

    fn probes() -> [Arc<Probe>; 5] {
        [
            Probe::new(MessageKind::PeerManager),
            Probe::new(MessageKind::Directory),
            Probe::new(MessageKind::Node),
            Probe::new(MessageKind::ConsensusUser),
            Probe::new(MessageKind::Lookup),
        ]
    }

    fn sender() -> Peer {
        Peer::loopback(7210)
    }

    #[tokio::test]
    async fn undersized_message_reaches_no_handler() {
        let probes = probes();
        let router = MessageRouter::new(table_of(&probes));

        router.process_message(WireMessage::new(vec![0x02], sender())).await;

        assert!(probes.iter().all(|p| p.calls() == 0));
        let stats = router.stats();
        assert_eq!(stats.processed_total, 0);
        assert_eq!(stats.malformed_dropped, 1);
    }

    #[tokio::test]
    async fn unknown_type_reaches_no_handler() {
        let probes = probes();
        let router = MessageRouter::new(table_of(&probes));

        router
            .process_message(WireMessage::new(vec![0x2A, 0x00, 0x01], sender()))
            .await;

        assert!(probes.iter().all(|p| p.calls() == 0));
        let stats = router.stats();
        assert_eq!(stats.processed_total, 0);
        assert_eq!(stats.unknown_dropped, 1);
    }

    #[tokio::test]
    async fn valid_type_invokes_exactly_that_handler() {
        let probes = probes();
        let router = MessageRouter::new(table_of(&probes));
        let from = sender();

        // Type 2 routes to the node component, body offset is INST_OFFSET.
        router
            .process_message(WireMessage::new(
                vec![0x02, 0x07, 0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x00, 0x00, 0x00],
                from,
            ))
            .await;

        assert_eq!(probes[2].calls(), 1);
        assert_eq!(probes[2].last_offset.load(Ordering::SeqCst), INST_OFFSET);
        assert_eq!(*probes[2].last_sender.lock().unwrap(), Some(from));
        for (i, probe) in probes.iter().enumerate() {
            if i != 2 {
                assert_eq!(probe.calls(), 0, "component {} must not run", i);
            }
        }
        assert_eq!(router.stats().processed_total, 1);
    }

    #[tokio::test]
    async fn handler_failure_is_counted_not_propagated() {
        let mut probes = probes();
        probes[2] = Probe::failing(
            MessageKind::Node,
            HandlerOutcome::Retryable("mempool full".into()),
        );
        let router = MessageRouter::new(table_of(&probes));

        router
            .process_message(WireMessage::new(vec![0x02, 0x00], sender()))
            .await;

        let stats = router.stats();
        assert_eq!(stats.processed_total, 1);
        assert_eq!(stats.handler_failures, 1);
    }

    #[tokio::test]
    async fn broadcast_list_delegates_to_owning_component() {
        let mut probes = probes();
        let targets = vec![Peer::loopback(7001), Peer::loopback(7002)];
        probes[1] = Probe::relaying(MessageKind::Directory, targets.clone());
        let router = MessageRouter::new(table_of(&probes));

        let resolved = router.broadcast_list(0x01, 0x05, &sender());
        assert_eq!(resolved, targets);
    }

    #[tokio::test]
    async fn broadcast_list_for_unknown_type_is_empty() {
        let probes = probes();
        let router = MessageRouter::new(table_of(&probes));

        let resolved = router.broadcast_list(0xEE, 0x00, &sender());
        assert!(resolved.is_empty());
        assert!(probes.iter().all(|p| p.calls() == 0));
    }
}
