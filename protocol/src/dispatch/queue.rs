//! # Dispatch Queue
//!
//! Bounded, thread-safe FIFO buffering incoming wire messages between
//! network receipt and processing. Built on a bounded `tokio::sync::mpsc`
//! channel: a full queue parks the producer in `enqueue` until the consumer
//! drains — the channel's native backpressure replaces the busy-retry loop
//! a lock-free ring would need, without ever dropping or rejecting a
//! message.
//!
//! The consumer side is poll-friendly: `try_dequeue` returns immediately
//! and an empty queue is a normal, frequent result. The dispatch loop uses
//! the awaiting `dequeue` instead so an idle node burns no CPU.
//!
//! At shutdown, `close_and_drain` shuts the intake and discards everything
//! still buffered, unprocessed. Messages die in the queue; they are never
//! half-processed across the shutdown boundary.

use tokio::sync::mpsc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::message::WireMessage;

/// Bounded FIFO of wire messages awaiting dispatch.
///
/// Multiple producers may enqueue concurrently; the dispatch loop is the
/// single consumer. The receiver sits behind an async `Mutex` purely to make
/// the queue shareable through one `Arc` — the lock is uncontended in
/// steady state because only the loop takes it.
pub struct DispatchQueue {
    tx: mpsc::Sender<WireMessage>,
    rx: Mutex<mpsc::Receiver<WireMessage>>,
    capacity: usize,
}

impl DispatchQueue {
    /// Creates a queue holding at most `capacity` messages.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            tx,
            rx: Mutex::new(rx),
            capacity,
        }
    }

    /// Maximum number of buffered messages.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Enqueues a message, waiting for space when the queue is full.
    ///
    /// Never surfaces an error to the caller: backpressure saturates the
    /// producer instead of propagating a rejection. After the queue has been
    /// closed for shutdown the message is silently discarded — by that point
    /// every queued message is being discarded anyway.
    pub async fn enqueue(&self, message: WireMessage) {
        if let Err(rejected) = self.tx.send(message).await {
            debug!(sender = %rejected.0.sender, "queue closed, discarding message");
        }
    }

    /// Waits for the next message. Returns `None` once the queue is closed
    /// and empty.
    pub async fn dequeue(&self) -> Option<WireMessage> {
        self.rx.lock().await.recv().await
    }

    /// Non-blocking poll. Returns `None` when the queue is empty or the
    /// receiver is momentarily held by the dispatch loop.
    pub fn try_dequeue(&self) -> Option<WireMessage> {
        self.rx.try_lock().ok()?.try_recv().ok()
    }

    /// Closes the intake and discards every message still buffered.
    ///
    /// Returns how many messages were thrown away. Intended for shutdown,
    /// after the dispatch loop has stopped; none of the discarded messages
    /// will have reached a handler.
    pub async fn close_and_drain(&self) -> usize {
        let mut rx = self.rx.lock().await;
        rx.close();
        let mut discarded = 0;
        while rx.try_recv().is_ok() {
            discarded += 1;
        }
        discarded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Peer;

    fn msg(tag: u8) -> WireMessage {
        WireMessage::new(vec![tag, 0x00], Peer::loopback(7210))
    }

    #[tokio::test]
    async fn fifo_order_is_preserved() {
        let queue = DispatchQueue::new(16);
        for tag in 0..10u8 {
            queue.enqueue(msg(tag)).await;
        }
        for tag in 0..10u8 {
            let out = queue.dequeue().await.expect("message present");
            assert_eq!(out.payload[0], tag);
        }
        assert!(queue.try_dequeue().is_none());
    }

    #[tokio::test]
    async fn try_dequeue_on_empty_is_none() {
        let queue = DispatchQueue::new(4);
        assert!(queue.try_dequeue().is_none());
        queue.enqueue(msg(1)).await;
        assert!(queue.try_dequeue().is_some());
        assert!(queue.try_dequeue().is_none());
    }

    #[tokio::test]
    async fn full_queue_blocks_producer_until_space() {
        let queue = std::sync::Arc::new(DispatchQueue::new(1));
        queue.enqueue(msg(0)).await;

        // Second enqueue must park until the consumer makes room.
        let producer = {
            let queue = std::sync::Arc::clone(&queue);
            tokio::spawn(async move { queue.enqueue(msg(1)).await })
        };
        tokio::task::yield_now().await;
        assert!(!producer.is_finished());

        assert_eq!(queue.dequeue().await.expect("first").payload[0], 0);
        producer.await.expect("producer completes");
        assert_eq!(queue.dequeue().await.expect("second").payload[0], 1);
    }

    #[tokio::test]
    async fn drain_discards_and_counts() {
        let queue = DispatchQueue::new(8);
        for tag in 0..5u8 {
            queue.enqueue(msg(tag)).await;
        }
        assert_eq!(queue.close_and_drain().await, 5);
        // Closed queue: enqueue is swallowed, dequeue reports exhaustion.
        queue.enqueue(msg(9)).await;
        assert!(queue.dequeue().await.is_none());
    }
}
