//! # Swap Identifier Derivation
//!
//! Each escrow program recomputes the swap id from the lock parameters and
//! refuses ids that do not match, so the coordinator must derive ids with
//! exactly the same encoding the target ledger uses.
//!
//! | Ledger | Hash | Encoding |
//! |--------|------|----------|
//! | EVM | keccak256 | `hashlock[32] ‖ initiator[20] ‖ uint256_be(timelock_secs)` |
//! | NEAR | sha256 | `hashlock[32] ‖ initiator[32] ‖ u64_le(timelock_ns)` |

use crate::domain::{Hash, LedgerKind, SwapId};
use primitive_types::U256;
use sha2::Sha256;
use sha3::{Digest, Keccak256};

/// Ledger-specific swap id encoding.
pub trait SwapIdScheme: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Derive the id. `initiator` is the canonical account bytes and
    /// `timelock` is in the ledger's native time unit.
    fn derive(&self, hashlock: &Hash, initiator: &[u8], timelock: u64) -> SwapId;
}

/// keccak256 over Solidity `abi.encodePacked(bytes32, address, uint256)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeccakPackedScheme;

impl SwapIdScheme for KeccakPackedScheme {
    fn name(&self) -> &'static str {
        "keccak256-packed"
    }

    fn derive(&self, hashlock: &Hash, initiator: &[u8], timelock: u64) -> SwapId {
        let mut timelock_word = [0u8; 32];
        U256::from(timelock).to_big_endian(&mut timelock_word);

        let mut hasher = Keccak256::new();
        hasher.update(hashlock);
        hasher.update(fixed_width::<20>(initiator));
        hasher.update(timelock_word);
        hasher.finalize().into()
    }
}

/// sha256 over the Borsh encoding of `([u8; 32], [u8; 32], u64)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256BorshScheme;

impl SwapIdScheme for Sha256BorshScheme {
    fn name(&self) -> &'static str {
        "sha256-borsh"
    }

    fn derive(&self, hashlock: &Hash, initiator: &[u8], timelock: u64) -> SwapId {
        let mut hasher = Sha256::new();
        hasher.update(hashlock);
        hasher.update(fixed_width::<32>(initiator));
        hasher.update(timelock.to_le_bytes());
        hasher.finalize().into()
    }
}

/// Right-align `bytes` into `N` bytes: shorter input is left-padded with
/// zeros, longer input keeps its trailing `N` bytes.
fn fixed_width<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    if bytes.len() >= N {
        out.copy_from_slice(&bytes[bytes.len() - N..]);
    } else {
        out[N - bytes.len()..].copy_from_slice(bytes);
    }
    out
}

/// Scheme used by a ledger family.
pub fn scheme_for(kind: LedgerKind) -> &'static dyn SwapIdScheme {
    match kind {
        LedgerKind::Evm => &KeccakPackedScheme,
        LedgerKind::Near => &Sha256BorshScheme,
    }
}

/// Derive the swap id `kind` will assign, from a timelock in unix seconds.
pub fn derive_swap_id(
    kind: LedgerKind,
    hashlock: &Hash,
    initiator: &[u8],
    timelock_secs: u64,
) -> SwapId {
    let native = timelock_secs.saturating_mul(kind.time_units_per_sec());
    scheme_for(kind).derive(hashlock, initiator, native)
}
