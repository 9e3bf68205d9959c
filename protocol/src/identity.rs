//! # Node Identity
//!
//! Every node is an Ed25519 keypair; its network-visible account address is
//! the trailing 20 bytes of the SHA-256 digest of the public key. This
//! module derives that address and logs the node's self-info at startup.
//!
//! Key material never hits the logs by default. The `log_key_material`
//! opt-in exists for bring-up diagnostics on throwaway devnet keys and for
//! nothing else — the flag name is deliberately blunt about what it does.

use std::fmt;

use ed25519_dalek::{SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::config::{ACC_ADDR_SIZE, PRIV_KEY_SIZE};
use crate::message::Peer;

// ---------------------------------------------------------------------------
// Account Address
// ---------------------------------------------------------------------------

/// A 20-byte account address derived from a public key.
///
/// Rendered as 40 lowercase hex characters. Derivation: SHA-256 over the
/// 32-byte public key, keep the trailing [`ACC_ADDR_SIZE`] bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccountAddress([u8; ACC_ADDR_SIZE]);

impl AccountAddress {
    /// Derives the address for a public key.
    pub fn from_public_key(public_key: &VerifyingKey) -> Self {
        let digest = Sha256::digest(public_key.as_bytes());
        let mut addr = [0u8; ACC_ADDR_SIZE];
        addr.copy_from_slice(&digest[digest.len() - ACC_ADDR_SIZE..]);
        Self(addr)
    }

    /// Wraps raw address bytes.
    pub fn from_bytes(bytes: [u8; ACC_ADDR_SIZE]) -> Self {
        Self(bytes)
    }

    /// Parses a 40-char hex rendering back into an address.
    pub fn from_hex(s: &str) -> Option<Self> {
        let decoded = hex::decode(s).ok()?;
        let bytes: [u8; ACC_ADDR_SIZE] = decoded.try_into().ok()?;
        Some(Self(bytes))
    }

    /// The raw address bytes.
    pub fn as_bytes(&self) -> &[u8; ACC_ADDR_SIZE] {
        &self.0
    }

    /// Lowercase hex rendering, no prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountAddress({})", self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// Node Identity
// ---------------------------------------------------------------------------

/// This node's keypair and derived account address.
pub struct NodeIdentity {
    signing_key: SigningKey,
    address: AccountAddress,
}

impl NodeIdentity {
    /// Generates a fresh identity from the OS cryptographic RNG.
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::generate(&mut OsRng))
    }

    /// Reconstructs an identity from a stored 32-byte secret key.
    pub fn from_secret_bytes(bytes: &[u8; PRIV_KEY_SIZE]) -> Self {
        Self::from_signing_key(SigningKey::from_bytes(bytes))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let address = AccountAddress::from_public_key(&signing_key.verifying_key());
        Self {
            signing_key,
            address,
        }
    }

    /// The derived account address.
    pub fn address(&self) -> &AccountAddress {
        &self.address
    }

    /// The public half of the identity.
    pub fn public_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// The raw secret key bytes, for explicit persistence only.
    pub fn secret_key_bytes(&self) -> [u8; PRIV_KEY_SIZE] {
        self.signing_key.to_bytes()
    }

    /// Logs this node's identity (address and listening port), and — only
    /// when `log_key_material` is set — a debug-level hex dump of the raw
    /// keys.
    pub fn log_self_info(&self, peer: &Peer, log_key_material: bool) {
        info!(address = %self.address, port = peer.port, "node identity");

        if log_key_material {
            debug!(
                public_key = %hex::encode(self.public_key().as_bytes()),
                secret_key = %hex::encode(self.signing_key.to_bytes()),
                "key material dump (diagnostic opt-in)"
            );
        }
    }
}
