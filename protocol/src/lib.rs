// Copyright (c) 2026 Lattice Works. MIT License.
// See LICENSE for details.

//! # LATTICE Protocol — Core Library
//!
//! This is the front door of a LATTICE node: the message-ingestion and
//! dispatch core. Every byte a peer sends us flows through here — into a
//! bounded queue, out through a dispatch loop, onto a worker pool, and into
//! exactly one protocol component's handler. Get this layer wrong and you
//! don't break one call path, you corrupt the node's participation in the
//! network. So it's small, explicit, and heavily tested.
//!
//! ## Architecture
//!
//! The crate is split into modules that mirror the actual concerns of the
//! ingestion core:
//!
//! - **message** — Wire messages, peers, and the closed set of routable
//!   component kinds.
//! - **component** — The capability contracts every protocol component
//!   satisfies (execute, broadcast-list, start-sync), the routing table,
//!   and the pluggable failure policy.
//! - **dispatch** — The pipeline: bounded queue, worker pool, router.
//! - **mediator** — The shared registry components use to reach each other
//!   without ownership cycles.
//! - **sync** — The one-shot startup synchronization selector.
//! - **orchestrator** — Owns all of the above; lifecycle from construction
//!   to drain-on-shutdown.
//! - **identity** — Keypair-to-address derivation and self-info logging.
//! - **access** — The network context: self-peer and access whitelist.
//! - **txstore** — Flat-file retrieval of fixed-size transaction records.
//! - **config** — Protocol constants and wire-layout offsets.
//!
//! ## Design Philosophy
//!
//! 1. Backpressure over message loss: a full queue stalls producers.
//! 2. A message is consumed exactly once, on every path, including
//!    shutdown.
//! 3. Failures are terminal for the message, never for the pipeline.
//! 4. Ordering ends where the worker pool begins; anyone who needs more
//!    serializes internally.

pub mod access;
pub mod component;
pub mod config;
pub mod dispatch;
pub mod identity;
pub mod mediator;
pub mod message;
pub mod orchestrator;
pub mod sync;
pub mod txstore;

pub use component::{
    Broadcastable, ComponentTable, Executable, FailurePolicy, HandlerOutcome, LogAndDrop,
    ProtocolComponent, RpcListener,
};
pub use dispatch::{DispatchQueue, MessageRouter, StatsSnapshot, WorkerPool};
pub use mediator::{Mediator, ProtocolValidator, SyncContext, Validator};
pub use message::{MessageKind, Peer, WireMessage};
pub use orchestrator::{NodeOrchestrator, OrchestratorConfig};
pub use sync::{select_sync, NodeRole, SyncMode, SyncOutcome};
