//! # Mediator
//!
//! The shared context that lets protocol components reach each other
//! without owning each other. The directory service, node, and lookup
//! service all need to call across subsystem lines (and the validator is
//! consulted by several of them); giving them owning pointers to each other
//! would be a reference cycle with extra steps. Instead, everyone gets an
//! `Arc<Mediator>` and the mediator holds `Weak` handles back to the
//! registered colleagues — upgrade on use, and a component that has been
//! torn down simply reads as absent.
//!
//! The mediator also owns the state that is written by one subsystem and
//! read by another: the sync context (written by the sync selector, read by
//! the lookup and node components) and the network context (self peer,
//! whitelist).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::debug;

use crate::access::NetworkContext;
use crate::component::ProtocolComponent;
use crate::config::BODY_OFFSET;
use crate::sync::SyncMode;

// ---------------------------------------------------------------------------
// Validator collaborator
// ---------------------------------------------------------------------------

/// Message-validation collaborator registered alongside the components.
///
/// The dispatch core only defines the contract; the depth of validation
/// (signature checks, replay windows) belongs to the implementation.
pub trait Validator: Send + Sync {
    /// Structural sanity check on a raw payload. `false` means the message
    /// should not be trusted further.
    fn validate_message(&self, payload: &[u8]) -> bool;
}

/// Default validator: accepts any payload long enough to be routable.
///
/// Holds a weak handle back to the mediator like every other colleague, so
/// richer implementations can consult shared state without changing the
/// wiring.
pub struct ProtocolValidator {
    mediator: Weak<Mediator>,
}

impl ProtocolValidator {
    /// Creates a validator bound to the mediator.
    pub fn new(mediator: Weak<Mediator>) -> Self {
        Self { mediator }
    }

    /// The mediator, if it is still alive.
    pub fn mediator(&self) -> Option<Arc<Mediator>> {
        self.mediator.upgrade()
    }
}

impl Validator for ProtocolValidator {
    fn validate_message(&self, payload: &[u8]) -> bool {
        payload.len() >= BODY_OFFSET
    }
}

// ---------------------------------------------------------------------------
// Sync Context
// ---------------------------------------------------------------------------

/// Startup-synchronization state shared through the mediator.
///
/// The sync selector writes here exactly once, at construction; the lookup
/// component reads which mode it is serving and the node component reads
/// whether it is running from a late start.
pub struct SyncContext {
    lookup_sync_mode: RwLock<SyncMode>,
    node_late_start: AtomicBool,
}

impl SyncContext {
    fn new() -> Self {
        Self {
            lookup_sync_mode: RwLock::new(SyncMode::NoSync),
            node_late_start: AtomicBool::new(false),
        }
    }

    /// Records the sync mode the lookup collaborator should serve.
    pub fn set_lookup_sync_mode(&self, mode: SyncMode) {
        *self.lookup_sync_mode.write() = mode;
    }

    /// The sync mode recorded for the lookup collaborator.
    pub fn lookup_sync_mode(&self) -> SyncMode {
        *self.lookup_sync_mode.read()
    }

    /// Flags the node as running from a late start (it joined after the
    /// network was already underway).
    pub fn mark_node_late_start(&self) {
        self.node_late_start.store(true, Ordering::Release);
    }

    /// Whether the node was flagged as late-starting.
    pub fn node_runs_from_late_start(&self) -> bool {
        self.node_late_start.load(Ordering::Acquire)
    }
}

// ---------------------------------------------------------------------------
// Mediator
// ---------------------------------------------------------------------------

/// Weak handles to the registered colleagues.
struct Colleagues {
    directory: Weak<dyn ProtocolComponent>,
    node: Weak<dyn ProtocolComponent>,
    lookup: Weak<dyn ProtocolComponent>,
    validator: Weak<dyn Validator>,
}

/// Shared registry and context for the node's protocol components.
pub struct Mediator {
    network: NetworkContext,
    sync: SyncContext,
    colleagues: RwLock<Option<Colleagues>>,
}

impl Mediator {
    /// Creates the mediator around a network context. Components are
    /// registered afterwards, once they exist.
    pub fn new(network: NetworkContext) -> Arc<Self> {
        Arc::new(Self {
            network,
            sync: SyncContext::new(),
            colleagues: RwLock::new(None),
        })
    }

    /// Registers the colleagues that need to be reachable across subsystem
    /// lines. Called once during orchestration, after construction of all
    /// parties; only weak handles are stored.
    pub fn register_colleagues(
        &self,
        directory: &Arc<dyn ProtocolComponent>,
        node: &Arc<dyn ProtocolComponent>,
        lookup: &Arc<dyn ProtocolComponent>,
        validator: &Arc<dyn Validator>,
    ) {
        *self.colleagues.write() = Some(Colleagues {
            directory: Arc::downgrade(directory),
            node: Arc::downgrade(node),
            lookup: Arc::downgrade(lookup),
            validator: Arc::downgrade(validator),
        });
        debug!("colleagues registered with mediator");
    }

    /// The directory service, if registered and alive.
    pub fn directory(&self) -> Option<Arc<dyn ProtocolComponent>> {
        self.colleagues.read().as_ref()?.directory.upgrade()
    }

    /// The node component, if registered and alive.
    pub fn node(&self) -> Option<Arc<dyn ProtocolComponent>> {
        self.colleagues.read().as_ref()?.node.upgrade()
    }

    /// The lookup service, if registered and alive.
    pub fn lookup(&self) -> Option<Arc<dyn ProtocolComponent>> {
        self.colleagues.read().as_ref()?.lookup.upgrade()
    }

    /// The validator collaborator, if registered and alive.
    pub fn validator(&self) -> Option<Arc<dyn Validator>> {
        self.colleagues.read().as_ref()?.validator.upgrade()
    }

    /// Shared startup-synchronization state.
    pub fn sync(&self) -> &SyncContext {
        &self.sync
    }

    /// Shared networking context (self peer, whitelist).
    pub fn network(&self) -> &NetworkContext {
        &self.network
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{Broadcastable, Executable, HandlerOutcome};
    use crate::message::{MessageKind, Peer};
    use async_trait::async_trait;
    use bytes::Bytes;

    struct Stub(MessageKind);

    #[async_trait]
    impl Executable for Stub {
        async fn execute(&self, _p: Bytes, _o: usize, _s: Peer) -> HandlerOutcome {
            HandlerOutcome::Completed
        }
    }

    impl Broadcastable for Stub {
        fn broadcast_list(&self, _i: u8, _s: &Peer) -> Vec<Peer> {
            Vec::new()
        }
    }

    impl ProtocolComponent for Stub {
        fn kind(&self) -> MessageKind {
            self.0
        }
        fn start_synchronization(&self) {}
    }

    #[test]
    fn colleagues_are_weakly_held() {
        let mediator = Mediator::new(NetworkContext::new());

        let directory: Arc<dyn ProtocolComponent> = Arc::new(Stub(MessageKind::Directory));
        let node: Arc<dyn ProtocolComponent> = Arc::new(Stub(MessageKind::Node));
        let lookup: Arc<dyn ProtocolComponent> = Arc::new(Stub(MessageKind::Lookup));
        let validator: Arc<dyn Validator> =
            Arc::new(ProtocolValidator::new(Arc::downgrade(&mediator)));

        mediator.register_colleagues(&directory, &node, &lookup, &validator);
        assert!(mediator.directory().is_some());
        assert!(mediator.node().is_some());
        assert!(mediator.lookup().is_some());
        assert!(mediator.validator().is_some());

        // Dropping the strong refs leaves the mediator with dead handles,
        // not dangling ones.
        drop(node);
        assert!(mediator.node().is_none());
        assert!(mediator.directory().is_some());
    }

    #[test]
    fn unregistered_mediator_reads_as_absent() {
        let mediator = Mediator::new(NetworkContext::new());
        assert!(mediator.directory().is_none());
        assert!(mediator.validator().is_none());
    }

    #[test]
    fn sync_context_round_trip() {
        let mediator = Mediator::new(NetworkContext::new());
        assert_eq!(mediator.sync().lookup_sync_mode(), SyncMode::NoSync);
        assert!(!mediator.sync().node_runs_from_late_start());

        mediator.sync().set_lookup_sync_mode(SyncMode::NormalSync);
        mediator.sync().mark_node_late_start();
        assert_eq!(mediator.sync().lookup_sync_mode(), SyncMode::NormalSync);
        assert!(mediator.sync().node_runs_from_late_start());
    }

    #[test]
    fn default_validator_checks_routability() {
        let mediator = Mediator::new(NetworkContext::new());
        let validator = ProtocolValidator::new(Arc::downgrade(&mediator));
        assert!(validator.validate_message(&[0x00, 0x01]));
        assert!(!validator.validate_message(&[0x00]));
        assert!(validator.mediator().is_some());
    }
}
