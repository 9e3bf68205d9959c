//! # Startup Sync Selection
//!
//! A node joining the network has to decide, exactly once, how it catches
//! up: not at all, as a brand-new node, as a returning node, as a directory
//! committee member, or as a lookup/archival node. That decision is a pure
//! function of the node's role and boot circumstance, so it runs before any
//! steady-state message processing begins and never transitions afterwards.
//! Mixing it into the dispatch path would entangle two very different
//! failure domains; keeping it a one-shot selector keeps sync failures out
//! of the hot loop entirely.
//!
//! The selector's side effects go through the mediator's [`SyncContext`]
//! (recording the lookup collaborator's mode, flagging the node as
//! late-starting) and through at most one component's
//! `start_synchronization` call.
//!
//! [`SyncContext`]: crate::mediator::SyncContext

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::component::ComponentTable;
use crate::mediator::Mediator;
use crate::message::{MessageKind, Peer};

// ---------------------------------------------------------------------------
// Modes & Roles
// ---------------------------------------------------------------------------

/// How this node synchronizes at startup. Fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// No catch-up needed; initialize access control and go.
    NoSync,
    /// Joining as a brand-new node. Incompatible with history retrieval —
    /// a new node has no history to retrieve.
    NewSync,
    /// Rejoining after downtime; catch up from peers.
    NormalSync,
    /// Joining as a directory committee member.
    DsSync,
    /// Lookup/archival node catching up. Lookup role only.
    LookupSync,
}

impl SyncMode {
    /// Short lowercase name for log fields.
    pub fn name(self) -> &'static str {
        match self {
            Self::NoSync => "no_sync",
            Self::NewSync => "new_sync",
            Self::NormalSync => "normal_sync",
            Self::DsSync => "ds_sync",
            Self::LookupSync => "lookup_sync",
        }
    }
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Which kind of node this process runs as.
///
/// A runtime value rather than a build-time split: one binary serves both
/// roles, and the valid-mode check is an ordinary branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    /// Full participant: processes shard messages, may join consensus.
    Validator,
    /// Lookup/archival node: serves queries, runs the RPC listener.
    Lookup,
}

impl NodeRole {
    /// Whether the given sync mode is available to this role.
    pub fn supports(self, mode: SyncMode) -> bool {
        match (self, mode) {
            (_, SyncMode::NoSync) => true,
            (NodeRole::Validator, SyncMode::NewSync)
            | (NodeRole::Validator, SyncMode::NormalSync)
            | (NodeRole::Validator, SyncMode::DsSync) => true,
            (NodeRole::Lookup, SyncMode::LookupSync) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for NodeRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Validator => "validator",
            Self::Lookup => "lookup",
        })
    }
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// What the selector decided, for logging and tests. The side effects have
/// already happened by the time this is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// No synchronization required; the whitelist was initialized.
    NotRequired,
    /// Exactly one component's `start_synchronization` was invoked.
    Started(MessageKind),
    /// The mode/flag combination was invalid; nothing was started.
    Rejected,
    /// The mode is not available to this node's role; nothing was started.
    Unsupported,
}

/// Runs the one-shot startup sync selection.
///
/// `whitelist_seeds` is only consulted on the [`SyncMode::NoSync`] path,
/// where the access whitelist is initialized. Every other path records the
/// lookup collaborator's sync mode and starts at most one component's
/// synchronization. Invalid combinations are logged and skipped — a node
/// that fails to start sync still starts.
pub fn select_sync(
    mode: SyncMode,
    retrieve_history: bool,
    role: NodeRole,
    table: &ComponentTable,
    mediator: &Mediator,
    whitelist_seeds: &[Peer],
) -> SyncOutcome {
    if !role.supports(mode) {
        warn!(%mode, %role, "sync mode not available to this node role");
        return SyncOutcome::Unsupported;
    }

    match mode {
        SyncMode::NoSync => {
            info!("no sync needed");
            mediator.network().whitelist().init(whitelist_seeds);
            SyncOutcome::NotRequired
        }
        SyncMode::NewSync => {
            if retrieve_history {
                warn!("sync as a new node must not retrieve history; sync not started");
                return SyncOutcome::Rejected;
            }
            info!("sync as a new node");
            mediator.sync().set_lookup_sync_mode(SyncMode::NewSync);
            mediator.sync().mark_node_late_start();
            table.get(MessageKind::Node).start_synchronization();
            SyncOutcome::Started(MessageKind::Node)
        }
        SyncMode::NormalSync => {
            info!("sync as a normal node");
            mediator.sync().set_lookup_sync_mode(SyncMode::NormalSync);
            mediator.sync().mark_node_late_start();
            table.get(MessageKind::Node).start_synchronization();
            SyncOutcome::Started(MessageKind::Node)
        }
        SyncMode::DsSync => {
            info!("sync as a directory node");
            mediator.sync().set_lookup_sync_mode(SyncMode::DsSync);
            table.get(MessageKind::Directory).start_synchronization();
            SyncOutcome::Started(MessageKind::Directory)
        }
        SyncMode::LookupSync => {
            info!("sync as a lookup node");
            mediator.sync().set_lookup_sync_mode(SyncMode::LookupSync);
            table.get(MessageKind::Lookup).start_synchronization();
            SyncOutcome::Started(MessageKind::Lookup)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::NetworkContext;
    use crate::component::{
        Broadcastable, ComponentTable, Executable, HandlerOutcome, ProtocolComponent,
    };
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct SyncProbe {
        kind: MessageKind,
        starts: AtomicUsize,
    }

    impl SyncProbe {
        fn new(kind: MessageKind) -> Arc<Self> {
            Arc::new(Self {
                kind,
                starts: AtomicUsize::new(0),
            })
        }

        fn starts(&self) -> usize {
            self.starts.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Executable for SyncProbe {
        async fn execute(&self, _p: Bytes, _o: usize, _s: Peer) -> HandlerOutcome {
            HandlerOutcome::Completed
        }
    }

    impl Broadcastable for SyncProbe {
        fn broadcast_list(&self, _i: u8, _s: &Peer) -> Vec<Peer> {
            Vec::new()
        }
    }

    impl ProtocolComponent for SyncProbe {
        fn kind(&self) -> MessageKind {
            self.kind
        }

        fn start_synchronization(&self) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Fixture {
        probes: [Arc<SyncProbe>; 5],
        table: ComponentTable,
        mediator: Arc<Mediator>,
    }

    fn fixture() -> Fixture {
        let probes = [
            SyncProbe::new(MessageKind::PeerManager),
            SyncProbe::new(MessageKind::Directory),
            SyncProbe::new(MessageKind::Node),
            SyncProbe::new(MessageKind::ConsensusUser),
            SyncProbe::new(MessageKind::Lookup),
        ];
        let table = ComponentTable::new(
            probes[0].clone(),
            probes[1].clone(),
            probes[2].clone(),
            probes[3].clone(),
            probes[4].clone(),
        );
        Fixture {
            probes,
            table,
            mediator: Mediator::new(NetworkContext::new()),
        }
    }

    fn total_starts(f: &Fixture) -> usize {
        f.probes.iter().map(|p| p.starts()).sum()
    }

    #[test]
    fn no_sync_initializes_whitelist_and_starts_nothing() {
        let f = fixture();
        let seeds = [Peer::loopback(7000)];
        let outcome = select_sync(
            SyncMode::NoSync,
            false,
            NodeRole::Validator,
            &f.table,
            &f.mediator,
            &seeds,
        );
        assert_eq!(outcome, SyncOutcome::NotRequired);
        assert!(f.mediator.network().whitelist().is_initialized());
        assert_eq!(total_starts(&f), 0);
    }

    #[test]
    fn new_sync_with_history_is_rejected() {
        let f = fixture();
        let outcome = select_sync(
            SyncMode::NewSync,
            true,
            NodeRole::Validator,
            &f.table,
            &f.mediator,
            &[],
        );
        assert_eq!(outcome, SyncOutcome::Rejected);
        assert_eq!(total_starts(&f), 0);
        assert!(!f.mediator.sync().node_runs_from_late_start());
    }

    #[test]
    fn new_sync_without_history_starts_node_late() {
        let f = fixture();
        let outcome = select_sync(
            SyncMode::NewSync,
            false,
            NodeRole::Validator,
            &f.table,
            &f.mediator,
            &[],
        );
        assert_eq!(outcome, SyncOutcome::Started(MessageKind::Node));
        assert_eq!(f.probes[2].starts(), 1);
        assert_eq!(total_starts(&f), 1);
        assert!(f.mediator.sync().node_runs_from_late_start());
        assert_eq!(f.mediator.sync().lookup_sync_mode(), SyncMode::NewSync);
    }

    #[test]
    fn normal_sync_starts_node_unconditionally() {
        let f = fixture();
        // History retrieval does not gate a normal sync.
        let outcome = select_sync(
            SyncMode::NormalSync,
            true,
            NodeRole::Validator,
            &f.table,
            &f.mediator,
            &[],
        );
        assert_eq!(outcome, SyncOutcome::Started(MessageKind::Node));
        assert_eq!(f.probes[2].starts(), 1);
        assert!(f.mediator.sync().node_runs_from_late_start());
    }

    #[test]
    fn ds_sync_starts_directory_without_late_flag() {
        let f = fixture();
        let outcome = select_sync(
            SyncMode::DsSync,
            false,
            NodeRole::Validator,
            &f.table,
            &f.mediator,
            &[],
        );
        assert_eq!(outcome, SyncOutcome::Started(MessageKind::Directory));
        assert_eq!(f.probes[1].starts(), 1);
        assert_eq!(total_starts(&f), 1);
        assert!(!f.mediator.sync().node_runs_from_late_start());
        assert_eq!(f.mediator.sync().lookup_sync_mode(), SyncMode::DsSync);
    }

    #[test]
    fn lookup_sync_requires_lookup_role() {
        let f = fixture();
        let outcome = select_sync(
            SyncMode::LookupSync,
            false,
            NodeRole::Validator,
            &f.table,
            &f.mediator,
            &[],
        );
        assert_eq!(outcome, SyncOutcome::Unsupported);
        assert_eq!(total_starts(&f), 0);

        let outcome = select_sync(
            SyncMode::LookupSync,
            false,
            NodeRole::Lookup,
            &f.table,
            &f.mediator,
            &[],
        );
        assert_eq!(outcome, SyncOutcome::Started(MessageKind::Lookup));
        assert_eq!(f.probes[4].starts(), 1);
    }

    #[test]
    fn validator_modes_are_unsupported_for_lookup_role() {
        let f = fixture();
        for mode in [SyncMode::NewSync, SyncMode::NormalSync, SyncMode::DsSync] {
            let outcome = select_sync(mode, false, NodeRole::Lookup, &f.table, &f.mediator, &[]);
            assert_eq!(outcome, SyncOutcome::Unsupported, "mode {} must be refused", mode);
        }
        assert_eq!(total_starts(&f), 0);
    }
}
