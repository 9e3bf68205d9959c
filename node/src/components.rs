//! # Shell Protocol Components
//!
//! Boundary-minimal implementations of the five protocol components. The
//! dispatch core only consumes the capability contracts; the real peer
//! manager, directory service, shard node, consensus glue, and lookup
//! service are large subsystems that live outside this binary's scope.
//! These shells satisfy the contracts so the pipeline runs end to end:
//! they validate, log, and acknowledge — nothing more.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, info};

use lattice_protocol::{
    Broadcastable, Executable, HandlerOutcome, Mediator, MessageKind, Peer, ProtocolComponent,
};

/// A protocol component shell bound to the shared mediator.
///
/// One type serves all five routing slots; the slot is carried as data.
/// Per-kind behavior beyond logging belongs to the real subsystems.
pub struct ShellComponent {
    kind: MessageKind,
    mediator: Arc<Mediator>,
    handled: AtomicU64,
    sync_running: AtomicBool,
}

impl ShellComponent {
    /// Creates the shell for one routing slot.
    pub fn new(kind: MessageKind, mediator: Arc<Mediator>) -> Arc<Self> {
        Arc::new(Self {
            kind,
            mediator,
            handled: AtomicU64::new(0),
            sync_running: AtomicBool::new(false),
        })
    }

    /// Builds all five shells against one mediator, in routing-slot order.
    pub fn full_set(mediator: &Arc<Mediator>) -> [Arc<Self>; 5] {
        [
            Self::new(MessageKind::PeerManager, Arc::clone(mediator)),
            Self::new(MessageKind::Directory, Arc::clone(mediator)),
            Self::new(MessageKind::Node, Arc::clone(mediator)),
            Self::new(MessageKind::ConsensusUser, Arc::clone(mediator)),
            Self::new(MessageKind::Lookup, Arc::clone(mediator)),
        ]
    }

    /// Messages this shell has handled.
    #[allow(dead_code)]
    pub fn handled(&self) -> u64 {
        self.handled.load(Ordering::Relaxed)
    }

    /// Whether `start_synchronization` has run.
    #[allow(dead_code)]
    pub fn sync_running(&self) -> bool {
        self.sync_running.load(Ordering::Acquire)
    }
}

#[async_trait]
impl Executable for ShellComponent {
    async fn execute(&self, payload: Bytes, body_offset: usize, sender: Peer) -> HandlerOutcome {
        if let Some(validator) = self.mediator.validator() {
            if !validator.validate_message(&payload) {
                return HandlerOutcome::Fatal("payload failed validation".into());
            }
        }

        let instruction = payload.get(body_offset).copied();
        self.handled.fetch_add(1, Ordering::Relaxed);
        debug!(
            component = %self.kind,
            %sender,
            ?instruction,
            len = payload.len(),
            "message handled"
        );
        HandlerOutcome::Completed
    }
}

impl Broadcastable for ShellComponent {
    fn broadcast_list(&self, _instruction: u8, _sender: &Peer) -> Vec<Peer> {
        // Relay policy is protocol state the real subsystems own; the shell
        // relays to nobody.
        Vec::new()
    }
}

impl ProtocolComponent for ShellComponent {
    fn kind(&self) -> MessageKind {
        self.kind
    }

    fn start_synchronization(&self) {
        self.sync_running.store(true, Ordering::Release);
        let mode = self.mediator.sync().lookup_sync_mode();
        let late = self.mediator.sync().node_runs_from_late_start();
        info!(component = %self.kind, %mode, late_start = late, "synchronization started");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_protocol::access::NetworkContext;

    #[tokio::test]
    async fn shell_handles_and_counts() {
        let mediator = Mediator::new(NetworkContext::new());
        let shell = ShellComponent::new(MessageKind::Node, mediator);

        let outcome = shell
            .execute(Bytes::from_static(&[0x02, 0x07]), 1, Peer::loopback(7210))
            .await;
        assert_eq!(outcome, HandlerOutcome::Completed);
        assert_eq!(shell.handled(), 1);
    }

    #[tokio::test]
    async fn shell_sync_flag_flips_once_started() {
        let mediator = Mediator::new(NetworkContext::new());
        let shell = ShellComponent::new(MessageKind::Lookup, mediator);
        assert!(!shell.sync_running());
        shell.start_synchronization();
        assert!(shell.sync_running());
    }
}
