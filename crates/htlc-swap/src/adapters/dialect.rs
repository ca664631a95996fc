//! # Ledger Dialects
//!
//! Everything that differs between the two ledger families at the wire:
//! address width and format, byte string encoding, time units, and the
//! wording of escrow rejections.
//!
//! | | EVM | NEAR |
//! |---|---|---|
//! | Address | 20 bytes, `0x` hex | 32 bytes, bare hex |
//! | Bytes | `0x` hex string | byte vector |
//! | Time | seconds | nanoseconds |
//! | Rejection | `execution reverted: HTLC: ...` | `Smart contract panicked: ...` |

use crate::domain::{LedgerError, LedgerKind};
use crate::ports::WireBytes;

/// Escrow rejection categories shared by both programs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RejectionKind {
    /// No entry under the id
    SwapNotFound,
    /// Id already used
    SwapExists,
    /// Secret does not open the hashlock
    InvalidSecret,
    /// Already paid out
    AlreadyCompleted,
    /// Already returned
    AlreadyRefunded,
    /// Refund before expiry
    NotYetExpired,
    /// Completion after expiry
    Expired,
    /// Balance too low
    InsufficientBalance,
    /// Token allowance too low
    InsufficientAllowance,
    /// Timelock outside the program's window
    TimelockOutOfRange,
    /// Id does not match the lock parameters
    SwapIdMismatch,
    /// Zero or malformed amount
    InvalidAmount,
}

impl RejectionKind {
    /// Every kind, for table-driven lookups.
    pub const ALL: [RejectionKind; 12] = [
        RejectionKind::SwapNotFound,
        RejectionKind::SwapExists,
        RejectionKind::InvalidSecret,
        RejectionKind::AlreadyCompleted,
        RejectionKind::AlreadyRefunded,
        RejectionKind::NotYetExpired,
        RejectionKind::Expired,
        RejectionKind::InsufficientBalance,
        RejectionKind::InsufficientAllowance,
        RejectionKind::TimelockOutOfRange,
        RejectionKind::SwapIdMismatch,
        RejectionKind::InvalidAmount,
    ];
}

/// Wire conventions of one ledger family.
pub trait LedgerDialect: Send + Sync {
    /// Ledger family.
    fn kind(&self) -> LedgerKind;

    /// Parse an address into canonical-width bytes. Foreign formats are
    /// padded or stripped where the mapping is unambiguous.
    fn parse_address(&self, raw: &str) -> Result<Vec<u8>, LedgerError>;

    /// Render canonical bytes in the ledger's address format.
    fn format_address(&self, bytes: &[u8]) -> String;

    /// Encode a byte string for a call argument.
    fn encode_bytes(&self, bytes: &[u8]) -> WireBytes;

    /// Render a transaction digest the way the ledger shows it.
    fn format_tx(&self, digest: &[u8; 32]) -> String;

    /// Message core the escrow program uses for `kind`.
    fn rejection_phrase(&self, kind: RejectionKind) -> &'static str;

    /// Full rejection text as it reaches a client.
    fn rejection_text(&self, kind: RejectionKind) -> String;

    /// Canonical textual form of an address.
    fn canonicalize(&self, raw: &str) -> Result<String, LedgerError> {
        Ok(self.format_address(&self.parse_address(raw)?))
    }

    /// Decode a 32-byte value from either wire encoding.
    fn decode_bytes32(&self, value: &WireBytes) -> Option<[u8; 32]> {
        match value {
            WireBytes::Hex(s) => {
                let bytes = hex::decode(strip_hex_prefix(s)).ok()?;
                bytes.as_slice().try_into().ok()
            }
            WireBytes::Raw(bytes) => bytes.as_slice().try_into().ok(),
        }
    }

    /// Unix seconds to ledger-native units.
    fn to_native_time(&self, unix_secs: u64) -> u64 {
        unix_secs.saturating_mul(self.kind().time_units_per_sec())
    }

    /// Ledger-native units to unix seconds (truncating).
    fn from_native_time(&self, native: u64) -> u64 {
        native / self.kind().time_units_per_sec()
    }

    /// Map raw rejection text to a known kind.
    fn classify(&self, raw: &str) -> Option<RejectionKind> {
        let lowered = raw.to_ascii_lowercase();
        RejectionKind::ALL
            .into_iter()
            .find(|kind| lowered.contains(&self.rejection_phrase(*kind).to_ascii_lowercase()))
    }
}

fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

fn decode_hex(raw: &str) -> Result<Vec<u8>, LedgerError> {
    hex::decode(strip_hex_prefix(raw.trim()))
        .map_err(|e| LedgerError::InvalidAddress(format!("{raw}: {e}")))
}

/// EVM conventions.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvmDialect;

impl LedgerDialect for EvmDialect {
    fn kind(&self) -> LedgerKind {
        LedgerKind::Evm
    }

    fn parse_address(&self, raw: &str) -> Result<Vec<u8>, LedgerError> {
        let bytes = decode_hex(raw)?;
        match bytes.len() {
            20 => Ok(bytes),
            // 32-byte word with a 20-byte address right-aligned
            32 if bytes[..12].iter().all(|b| *b == 0) => Ok(bytes[12..].to_vec()),
            n => Err(LedgerError::InvalidAddress(format!(
                "{raw}: expected 20 bytes, got {n}"
            ))),
        }
    }

    fn format_address(&self, bytes: &[u8]) -> String {
        format!("0x{}", hex::encode(bytes))
    }

    fn encode_bytes(&self, bytes: &[u8]) -> WireBytes {
        WireBytes::Hex(format!("0x{}", hex::encode(bytes)))
    }

    fn format_tx(&self, digest: &[u8; 32]) -> String {
        format!("0x{}", hex::encode(digest))
    }

    fn rejection_phrase(&self, kind: RejectionKind) -> &'static str {
        match kind {
            RejectionKind::SwapNotFound => "HTLC: swap not found",
            RejectionKind::SwapExists => "HTLC: swap already exists",
            RejectionKind::InvalidSecret => "HTLC: invalid secret",
            RejectionKind::AlreadyCompleted => "HTLC: already completed",
            RejectionKind::AlreadyRefunded => "HTLC: already refunded",
            RejectionKind::NotYetExpired => "HTLC: timelock not expired",
            RejectionKind::Expired => "HTLC: swap expired",
            RejectionKind::InsufficientBalance => "transfer amount exceeds balance",
            RejectionKind::InsufficientAllowance => "insufficient allowance",
            RejectionKind::TimelockOutOfRange => "HTLC: timelock out of range",
            RejectionKind::SwapIdMismatch => "HTLC: swap id mismatch",
            RejectionKind::InvalidAmount => "HTLC: amount must be positive",
        }
    }

    fn rejection_text(&self, kind: RejectionKind) -> String {
        format!("execution reverted: {}", self.rejection_phrase(kind))
    }
}

/// NEAR-style conventions (implicit 32-byte accounts).
#[derive(Debug, Clone, Copy, Default)]
pub struct NearDialect;

impl LedgerDialect for NearDialect {
    fn kind(&self) -> LedgerKind {
        LedgerKind::Near
    }

    fn parse_address(&self, raw: &str) -> Result<Vec<u8>, LedgerError> {
        let bytes = decode_hex(raw)?;
        match bytes.len() {
            32 => Ok(bytes),
            // EVM address: left-pad into the 32-byte account space
            20 => {
                let mut padded = vec![0u8; 12];
                padded.extend_from_slice(&bytes);
                Ok(padded)
            }
            n => Err(LedgerError::InvalidAddress(format!(
                "{raw}: expected 32 bytes, got {n}"
            ))),
        }
    }

    fn format_address(&self, bytes: &[u8]) -> String {
        hex::encode(bytes)
    }

    fn encode_bytes(&self, bytes: &[u8]) -> WireBytes {
        WireBytes::Raw(bytes.to_vec())
    }

    fn format_tx(&self, digest: &[u8; 32]) -> String {
        hex::encode(digest)
    }

    fn rejection_phrase(&self, kind: RejectionKind) -> &'static str {
        match kind {
            RejectionKind::SwapNotFound => "Swap not found",
            RejectionKind::SwapExists => "Swap already exists",
            RejectionKind::InvalidSecret => "Invalid secret",
            RejectionKind::AlreadyCompleted => "Swap already completed",
            RejectionKind::AlreadyRefunded => "Swap already refunded",
            RejectionKind::NotYetExpired => "Timelock not yet expired",
            RejectionKind::Expired => "Swap has expired",
            RejectionKind::InsufficientBalance => "Not enough balance",
            RejectionKind::InsufficientAllowance => "Storage deposit required",
            RejectionKind::TimelockOutOfRange => "Timelock out of range",
            RejectionKind::SwapIdMismatch => "Swap id does not match parameters",
            RejectionKind::InvalidAmount => "Amount must be positive",
        }
    }

    fn rejection_text(&self, kind: RejectionKind) -> String {
        format!("Smart contract panicked: {}", self.rejection_phrase(kind))
    }
}
