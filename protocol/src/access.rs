//! # Network Context & Access Whitelist
//!
//! Explicit replacements for what used to be process-wide singletons: the
//! node's own peer identity and the access-control whitelist both live in a
//! [`NetworkContext`] that is constructed once and threaded through the
//! mediator to whoever needs it. No global state, no init-order puzzles.
//!
//! The whitelist starts permissive. Until `init` runs (which only happens on
//! the no-sync startup path), every peer is allowed; after `init`, only
//! seeded and later-admitted peers pass `is_allowed`.

use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashSet;
use parking_lot::RwLock;
use tracing::info;

use crate::message::Peer;

// ---------------------------------------------------------------------------
// Whitelist
// ---------------------------------------------------------------------------

/// Concurrent peer allow-set.
///
/// Reads vastly outnumber writes (every inbound connection checks, admission
/// happens rarely), so the set is a `DashSet` — shard-locked, no global
/// write lock on the check path.
pub struct Whitelist {
    initialized: AtomicBool,
    allowed: DashSet<Peer>,
}

impl Whitelist {
    /// Creates an uninitialized, permissive whitelist.
    pub fn new() -> Self {
        Self {
            initialized: AtomicBool::new(false),
            allowed: DashSet::new(),
        }
    }

    /// Seeds the allow-set and switches the whitelist to enforcing mode.
    /// Idempotent in effect; later calls add seeds to the same set.
    pub fn init(&self, seeds: &[Peer]) {
        for peer in seeds {
            self.allowed.insert(*peer);
        }
        self.initialized.store(true, Ordering::Release);
        info!(seeds = seeds.len(), "access whitelist initialized");
    }

    /// Whether `init` has run.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Admits a single peer.
    pub fn admit(&self, peer: Peer) {
        self.allowed.insert(peer);
    }

    /// Removes a peer from the allow-set.
    pub fn revoke(&self, peer: &Peer) {
        self.allowed.remove(peer);
    }

    /// Whether the peer may talk to us.
    ///
    /// Always `true` before `init`, and also when the allow-set is empty —
    /// an empty whitelist means "no restriction configured", not "reject
    /// the whole network".
    pub fn is_allowed(&self, peer: &Peer) -> bool {
        !self.is_initialized() || self.allowed.is_empty() || self.allowed.contains(peer)
    }

    /// Number of explicitly allowed peers.
    pub fn len(&self) -> usize {
        self.allowed.len()
    }

    /// Whether the allow-set is empty.
    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }
}

impl Default for Whitelist {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Network Context
// ---------------------------------------------------------------------------

/// Networking facts shared across components: who we are on the wire and
/// who is allowed to talk to us.
///
/// The self-peer is installed once during orchestrator startup, after the
/// components exist but before synchronization begins, mirroring the
/// lifecycle position the old singleton assignment occupied.
pub struct NetworkContext {
    self_peer: RwLock<Option<Peer>>,
    whitelist: Whitelist,
}

impl NetworkContext {
    /// Creates an empty context: no self-peer yet, permissive whitelist.
    pub fn new() -> Self {
        Self {
            self_peer: RwLock::new(None),
            whitelist: Whitelist::new(),
        }
    }

    /// Installs this node's own peer identity. Later installs overwrite —
    /// the orchestrator calls this exactly once.
    pub fn install_self_peer(&self, peer: Peer) {
        *self.self_peer.write() = Some(peer);
        info!(%peer, "self peer installed");
    }

    /// This node's own peer identity, once installed.
    pub fn self_peer(&self) -> Option<Peer> {
        *self.self_peer.read()
    }

    /// The access-control whitelist.
    pub fn whitelist(&self) -> &Whitelist {
        &self.whitelist
    }
}

impl Default for NetworkContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uninitialized_whitelist_allows_everyone() {
        let wl = Whitelist::new();
        assert!(!wl.is_initialized());
        assert!(wl.is_allowed(&Peer::loopback(1)));
        assert!(wl.is_allowed(&Peer::loopback(2)));
    }

    #[test]
    fn initialized_whitelist_enforces_seeds() {
        let wl = Whitelist::new();
        let seed = Peer::loopback(7210);
        wl.init(&[seed]);

        assert!(wl.is_initialized());
        assert!(wl.is_allowed(&seed));
        assert!(!wl.is_allowed(&Peer::loopback(9999)));

        let late = Peer::loopback(8000);
        wl.admit(late);
        assert!(wl.is_allowed(&late));
        wl.revoke(&late);
        assert!(!wl.is_allowed(&late));
    }

    #[test]
    fn empty_initialized_whitelist_stays_permissive() {
        let wl = Whitelist::new();
        wl.init(&[]);
        assert!(wl.is_initialized());
        assert!(wl.is_allowed(&Peer::loopback(7210)));
    }

    #[test]
    fn self_peer_install_is_visible() {
        let ctx = NetworkContext::new();
        assert_eq!(ctx.self_peer(), None);

        let me = Peer::loopback(7210);
        ctx.install_self_peer(me);
        assert_eq!(ctx.self_peer(), Some(me));
    }
}
