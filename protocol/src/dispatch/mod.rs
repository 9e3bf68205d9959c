//! # Dispatch Pipeline
//!
//! The path a message takes between the network socket and a component
//! handler:
//!
//! ```text
//! network recv ──▶ DispatchQueue ──▶ dispatch loop ──▶ WorkerPool job ──▶ MessageRouter
//!   (producer)      (bounded FIFO)     (one task)        (N concurrent)     (classify + execute)
//! ```
//!
//! ## Ordering
//!
//! Arrival order is preserved through the queue and up to the point a job is
//! submitted to the pool. Once jobs fan out, completion order is
//! unspecified — two messages of different types have no ordering guarantee
//! relative to each other. A component that needs ordering among its own
//! messages serializes internally; this layer does not.
//!
//! ## Backpressure
//!
//! The queue is bounded and `enqueue` awaits for space instead of failing.
//! A slow consumer therefore stalls producers rather than dropping
//! messages. There is no timeout on that stall — it is the system's only
//! backpressure mechanism and its primary producer-side risk under load.

pub mod pool;
pub mod queue;
pub mod router;

pub use pool::WorkerPool;
pub use queue::DispatchQueue;
pub use router::{MessageRouter, RouterStats, StatsSnapshot};
