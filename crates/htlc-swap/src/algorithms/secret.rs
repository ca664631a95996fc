//! # Secret Generation and Verification
//!
//! Preimages come from the OS CSPRNG; hashlocks are the digest of the
//! preimage under the payout hash both escrow programs agree on.

use crate::domain::{Hash, SecureSecret};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use sha3::{Digest, Keccak256};
use std::fmt;

/// Hash function an escrow program applies to the secret at payout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayoutHash {
    /// SHA-256 (the default for both supported escrow programs)
    #[default]
    Sha256,
    /// Keccak-256 (some EVM deployments)
    Keccak256,
}

impl PayoutHash {
    /// Digest `data`.
    pub fn digest(&self, data: &[u8]) -> Hash {
        match self {
            PayoutHash::Sha256 => Sha256::digest(data).into(),
            PayoutHash::Keccak256 => Keccak256::digest(data).into(),
        }
    }
}

impl fmt::Display for PayoutHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayoutHash::Sha256 => f.write_str("sha256"),
            PayoutHash::Keccak256 => f.write_str("keccak256"),
        }
    }
}

/// Draw a fresh 32-byte secret from the OS random source.
pub fn generate_secret() -> SecureSecret {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    let secret = SecureSecret::new(bytes);
    zeroize::Zeroize::zeroize(&mut bytes);
    secret
}

/// Hashlock for `secret` under `hash`.
pub fn create_hashlock(secret: &SecureSecret, hash: PayoutHash) -> Hash {
    hash.digest(secret.as_bytes())
}

/// Whether `secret` opens `hashlock` under `hash`.
pub fn verify_secret(secret: &[u8; 32], hashlock: &Hash, hash: PayoutHash) -> bool {
    hash.digest(secret) == *hashlock
}
