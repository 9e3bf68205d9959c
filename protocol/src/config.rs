//! # Protocol Configuration & Constants
//!
//! Every magic number in LATTICE lives here. If you're hardcoding a constant
//! somewhere else, you're doing it wrong and you owe the team coffee.
//!
//! These values define the shape of every message on the wire and the
//! capacity of the ingestion pipeline. Changing the offsets after peers are
//! deployed is a network-wide flag day, so don't.

// ---------------------------------------------------------------------------
// Network Identifiers
// ---------------------------------------------------------------------------

/// Mainnet — the real deal. Mistakes here cost real money.
pub const NETWORK_ID_MAINNET: u32 = 0x4C545443; // "LTTC"

/// Testnet — where we break things on purpose and call it "testing."
pub const NETWORK_ID_TESTNET: u32 = 0x4C545454; // "LTTT"

/// Devnet — the wild west. Reset weekly, no promises, no survivors.
pub const NETWORK_ID_DEVNET: u32 = 0x4C545444; // "LTTD"

// ---------------------------------------------------------------------------
// Wire Message Layout
// ---------------------------------------------------------------------------

/// Byte index of the message-type byte in every wire message. The router
/// reads this single byte to pick the owning protocol component.
pub const TYPE_OFFSET: usize = 0;

/// Byte index where the instruction/body begins. Handlers receive the full
/// payload plus this offset and parse from here.
pub const INST_OFFSET: usize = 1;

/// Minimum total payload length before a message is considered well-formed.
/// Anything shorter cannot carry a type byte and an instruction byte, and is
/// dropped before routing.
pub const BODY_OFFSET: usize = 2;

/// Hard cap on a single wire message. Frames larger than this are a protocol
/// violation and the connection that sent them gets dropped.
pub const MAX_WIRE_MESSAGE_SIZE: usize = 1024 * 1024; // 1 MiB

// ---------------------------------------------------------------------------
// Dispatch Pipeline
// ---------------------------------------------------------------------------

/// Capacity of the bounded dispatch queue between the network receive path
/// and the dispatch loop. When full, producers block on enqueue until the
/// consumer catches up. Backpressure, not message loss.
pub const DISPATCH_QUEUE_CAPACITY: usize = 1024;

/// Number of concurrent message-processing jobs the worker pool runs.
/// Submission order follows queue order; completion order does not.
pub const WORKER_POOL_SIZE: usize = 8;

// ---------------------------------------------------------------------------
// Cryptographic Parameters
// ---------------------------------------------------------------------------

/// Ed25519 public key length in bytes.
pub const PUB_KEY_SIZE: usize = 32;

/// Ed25519 secret key length in bytes.
pub const PRIV_KEY_SIZE: usize = 32;

/// Account address length in bytes. An address is the trailing slice of the
/// SHA-256 digest of the public key — 20 bytes, rendered as 40 hex chars.
pub const ACC_ADDR_SIZE: usize = 20;

// ---------------------------------------------------------------------------
// Network Parameters
// ---------------------------------------------------------------------------

/// Default P2P listening port.
pub const DEFAULT_P2P_PORT: u16 = 7210;

/// Default RPC API port (lookup nodes only).
pub const DEFAULT_RPC_PORT: u16 = 7211;

/// Default metrics (Prometheus) port.
pub const DEFAULT_METRICS_PORT: u16 = 7212;

// ---------------------------------------------------------------------------
// Transaction Store
// ---------------------------------------------------------------------------

/// Size in bytes of one serialized transaction record in the flat-file
/// transaction store. Records are fixed-width so lookups are a single seek.
pub const TXN_RECORD_SIZE: usize = 317;

/// File extension for per-address transaction record files.
pub const TXN_FILE_EXT: &str = "txn";

// ---------------------------------------------------------------------------
// Utility
// ---------------------------------------------------------------------------

/// Returns a friendly name for a network ID, mainly for logging.
/// Unknown networks get a hex dump because we're helpful like that.
pub fn network_name(network_id: u32) -> String {
    match network_id {
        NETWORK_ID_MAINNET => "mainnet".to_string(),
        NETWORK_ID_TESTNET => "testnet".to_string(),
        NETWORK_ID_DEVNET => "devnet".to_string(),
        other => format!("unknown(0x{:08X})", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_ids_are_distinct() {
        assert_ne!(NETWORK_ID_MAINNET, NETWORK_ID_TESTNET);
        assert_ne!(NETWORK_ID_MAINNET, NETWORK_ID_DEVNET);
        assert_ne!(NETWORK_ID_TESTNET, NETWORK_ID_DEVNET);
    }

    #[test]
    fn network_ids_are_valid_ascii() {
        for id in [NETWORK_ID_MAINNET, NETWORK_ID_TESTNET, NETWORK_ID_DEVNET] {
            let bytes = id.to_be_bytes();
            assert!(bytes.iter().all(|b| b.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn message_offsets_are_ordered() {
        // The type byte comes first, the instruction follows, and the
        // well-formedness threshold covers both.
        assert!(TYPE_OFFSET < INST_OFFSET);
        assert!(INST_OFFSET < BODY_OFFSET);
        assert!(BODY_OFFSET <= MAX_WIRE_MESSAGE_SIZE);
    }

    #[test]
    fn pipeline_capacities_are_nonzero() {
        assert!(DISPATCH_QUEUE_CAPACITY > 0);
        assert!(WORKER_POOL_SIZE > 0);
    }

    #[test]
    fn network_name_formatting() {
        assert_eq!(network_name(NETWORK_ID_MAINNET), "mainnet");
        assert_eq!(network_name(0xCAFEBABE), "unknown(0xCAFEBABE)");
    }
}
