//! # Node Orchestrator
//!
//! Owns the whole ingestion core and wires it together: the dispatch queue,
//! the dispatch loop, the worker pool, the router, the mediator
//! registration, the one-shot sync selection, and — for lookup nodes — the
//! RPC listener. Construction order is dependency order:
//!
//! 1. Protocol components exist (built by the caller, bound to the
//!    mediator).
//! 2. The bounded dispatch queue is created and the dispatch loop starts.
//! 3. The validator collaborator is constructed and registered with the
//!    mediator alongside the directory, node, and lookup components.
//! 4. The node's self-peer is installed into the shared network context and
//!    the identity line is logged.
//! 5. The sync selector runs.
//! 6. Lookup role only: the RPC listener is started.
//!
//! Shutdown reverses the interesting parts: stop the loop, discard
//! everything still queued (unprocessed, counted, logged), then wait for
//! in-flight worker jobs to finish. Nothing is ever half-processed across
//! the shutdown boundary.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::component::RpcListener;
use crate::config::{DISPATCH_QUEUE_CAPACITY, WORKER_POOL_SIZE};
use crate::dispatch::{DispatchQueue, MessageRouter, StatsSnapshot, WorkerPool};
use crate::identity::NodeIdentity;
use crate::mediator::{Mediator, ProtocolValidator, Validator};
use crate::message::{MessageKind, Peer, WireMessage};
use crate::sync::{select_sync, NodeRole, SyncMode, SyncOutcome};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Everything the orchestrator needs to know at construction.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Which kind of node this process runs as.
    pub role: NodeRole,
    /// The one-shot startup synchronization mode.
    pub sync_mode: SyncMode,
    /// Whether historical data retrieval precedes synchronization.
    pub retrieve_history: bool,
    /// This node's own network identity (advertised address + port).
    pub self_peer: Peer,
    /// Dispatch queue capacity.
    pub queue_capacity: usize,
    /// Worker pool concurrency.
    pub pool_size: usize,
    /// Peers seeded into the access whitelist on the no-sync path.
    pub whitelist_seeds: Vec<Peer>,
    /// Diagnostic opt-in: dump raw key material to the debug log.
    pub log_key_material: bool,
}

impl OrchestratorConfig {
    /// A sensible default configuration for the given role, mode, and
    /// self-peer. Capacities come from [`crate::config`].
    pub fn new(role: NodeRole, sync_mode: SyncMode, self_peer: Peer) -> Self {
        Self {
            role,
            sync_mode,
            retrieve_history: false,
            self_peer,
            queue_capacity: DISPATCH_QUEUE_CAPACITY,
            pool_size: WORKER_POOL_SIZE,
            whitelist_seeds: Vec::new(),
            log_key_material: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// The assembled ingestion core of a running node.
pub struct NodeOrchestrator {
    config: OrchestratorConfig,
    mediator: Arc<Mediator>,
    router: Arc<MessageRouter>,
    queue: Arc<DispatchQueue>,
    pool: WorkerPool,
    shutdown: watch::Sender<bool>,
    dispatch_loop: Mutex<Option<JoinHandle<()>>>,
    // Kept alive so the mediator's weak handle stays valid for the node's
    // lifetime.
    _validator: Arc<dyn Validator>,
    sync_outcome: SyncOutcome,
}

impl NodeOrchestrator {
    /// Builds and starts the ingestion core. Must run inside a tokio
    /// runtime — the dispatch loop is spawned here.
    ///
    /// The caller has already constructed the five protocol components
    /// (bound to `mediator`) and assembled them into the router's table;
    /// this constructor performs the remaining lifecycle steps in order.
    pub fn new(
        config: OrchestratorConfig,
        identity: &NodeIdentity,
        mediator: Arc<Mediator>,
        router: Arc<MessageRouter>,
        rpc_listener: Option<Arc<dyn RpcListener>>,
    ) -> Self {
        // Step 2: queue + dispatch loop.
        let queue = Arc::new(DispatchQueue::new(config.queue_capacity));
        let pool = WorkerPool::new(config.pool_size);
        let (shutdown, shutdown_rx) = watch::channel(false);
        let dispatch_loop = spawn_dispatch_loop(
            Arc::clone(&queue),
            pool.clone(),
            Arc::clone(&router),
            shutdown_rx,
        );

        // Step 3: validator + colleague registration.
        let validator: Arc<dyn Validator> =
            Arc::new(ProtocolValidator::new(Arc::downgrade(&mediator)));
        {
            let table = router.table();
            mediator.register_colleagues(
                table.get(MessageKind::Directory),
                table.get(MessageKind::Node),
                table.get(MessageKind::Lookup),
                &validator,
            );
        }

        // Step 4: self-peer + identity line.
        identity.log_self_info(&config.self_peer, config.log_key_material);
        mediator.network().install_self_peer(config.self_peer);

        // Step 5: one-shot sync selection.
        let sync_outcome = select_sync(
            config.sync_mode,
            config.retrieve_history,
            config.role,
            router.table(),
            &mediator,
            &config.whitelist_seeds,
        );

        // Step 6: lookup nodes serve an RPC API.
        info!(role = %config.role, "node role selected");
        if config.role == NodeRole::Lookup {
            match &rpc_listener {
                Some(listener) if listener.start_listening() => {
                    info!("rpc listener started");
                }
                Some(_) => warn!("rpc listener failed to start"),
                None => warn!("lookup node has no rpc listener configured"),
            }
        }

        Self {
            config,
            mediator,
            router,
            queue,
            pool,
            shutdown,
            dispatch_loop: Mutex::new(Some(dispatch_loop)),
            _validator: validator,
            sync_outcome,
        }
    }

    /// Hands a received wire message to the dispatch queue.
    ///
    /// This is the producer entry point for the network layer. It blocks
    /// (asynchronously) while the queue is full; it never fails.
    pub async fn dispatch(&self, message: WireMessage) {
        self.queue.enqueue(message).await;
    }

    /// Computes the gossip relay targets for a message type/instruction and
    /// sender. Queried by the networking layer independently of the queue.
    pub fn broadcast_list(&self, type_byte: u8, instruction: u8, sender: &Peer) -> Vec<Peer> {
        self.router.broadcast_list(type_byte, instruction, sender)
    }

    /// Router counter snapshot.
    pub fn stats(&self) -> StatsSnapshot {
        self.router.stats()
    }

    /// What the startup sync selection decided.
    pub fn sync_outcome(&self) -> SyncOutcome {
        self.sync_outcome
    }

    /// The shared mediator.
    pub fn mediator(&self) -> &Arc<Mediator> {
        &self.mediator
    }

    /// The orchestrator's configuration.
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Stops the dispatch loop, discards every message still queued, and
    /// waits for in-flight handlers to finish.
    ///
    /// Discarded messages never reach a handler; the processed counter is
    /// untouched by the drain. Safe to call once; later calls are no-ops.
    pub async fn shutdown(&self) {
        let _ = self.shutdown.send(true);

        let handle = self.dispatch_loop.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }

        let discarded = self.queue.close_and_drain().await;
        if discarded > 0 {
            info!(discarded, "discarded queued messages on shutdown");
        }

        self.pool.quiesce().await;
        info!("dispatch core stopped");
    }
}

/// The dispatch loop: continuously pops messages and fans each out as a
/// worker-pool job. Never processes inline — receive latency stays
/// decoupled from processing latency. Job submission order matches dequeue
/// order; completion order is the pool's business.
fn spawn_dispatch_loop(
    queue: Arc<DispatchQueue>,
    pool: WorkerPool,
    router: Arc<MessageRouter>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                next = queue.dequeue() => match next {
                    Some(message) => {
                        let router = Arc::clone(&router);
                        pool.submit(async move {
                            router.process_message(message).await;
                        })
                        .await;
                    }
                    // Queue closed and empty: nothing left to dispatch.
                    None => break,
                },
            }
        }
    })
}
