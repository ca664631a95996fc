//! # Domain Errors
//!
//! Two layers of failure: [`LedgerError`] is what a single ledger adapter
//! reports, [`SwapError`] is what swap-level callers see.

use super::value_objects::{LedgerSide, SwapPhase};
use thiserror::Error;

/// Hash type (32-byte digest).
pub type Hash = [u8; 32];

/// Ledger-local swap identifier (32 bytes, derived per ledger).
pub type SwapId = [u8; 32];

/// Secret preimage type (32 bytes).
pub type Secret = [u8; 32];

/// Failure reported by one ledger adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The signing account cannot cover the lock amount.
    #[error("Insufficient balance")]
    InsufficientBalance,

    /// A token spending allowance must be granted before locking.
    #[error("Allowance required before lock")]
    AllowanceRequired,

    /// No swap under this identifier on the ledger.
    #[error("Swap not found: {}", hex::encode(.0))]
    SwapNotFound(SwapId),

    /// The supplied secret does not hash to the recorded hashlock.
    #[error("Invalid secret")]
    InvalidSecret,

    /// A lock already exists under this swap id.
    #[error("Swap already exists")]
    AlreadyLocked,

    /// The swap was already completed.
    #[error("Swap already completed")]
    AlreadyCompleted,

    /// The swap was already refunded.
    #[error("Swap already refunded")]
    AlreadyRefunded,

    /// Refund attempted at or before the timelock.
    #[error("Timelock not yet expired")]
    NotYetExpired,

    /// Timelock outside the ledger's accepted window, caught before submission.
    #[error("Timelock {timelock} outside ledger bounds [{earliest}, {latest}]")]
    TimelockOutOfBounds {
        /// Requested timelock (unix seconds)
        timelock: u64,
        /// Earliest accepted instant
        earliest: u64,
        /// Latest accepted instant
        latest: u64,
    },

    /// Address could not be parsed or canonicalized for this ledger.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Amount is zero or does not fit the ledger's encoding.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// The signer could not produce a signature.
    #[error("Signing failed: {0}")]
    Signer(String),

    /// Rejection the adapter could not classify; carries the raw ledger text.
    #[error("Rejected by ledger: {0}")]
    Rejected(String),

    /// Transport failure or call timeout. Safe to retry.
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),
}

impl LedgerError {
    /// Whether the failure is transient and the call may be retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Swap-level error taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SwapError {
    /// Request rejected before anything was submitted.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A ledger rejected a call. `reason` keeps the ledger's own wording.
    #[error("{ledger} ledger rejected call: {reason}")]
    LedgerRejection {
        /// Which side rejected
        ledger: LedgerSide,
        /// Ledger-provided reason
        reason: String,
    },

    /// A ledger stayed unreachable past the retry budget.
    #[error("{ledger} ledger unavailable: {reason}")]
    TransientUnavailable {
        /// Which side was unreachable
        ledger: LedgerSide,
        /// Last transport error
        reason: String,
    },

    /// No timelock pair satisfies both ledgers' bounds and the ordering rule.
    #[error("Timelocks unsatisfiable: {0}")]
    TimelockUnsatisfiable(String),

    /// A ledger contradicted what the coordinator observed earlier.
    #[error("Protocol inconsistency: {0}")]
    ProtocolInconsistency(String),

    /// Unknown swap identifier.
    #[error("Swap not found: {}", hex::encode(.0))]
    SwapNotFound(SwapId),

    /// Cancellation arrived after a lock was submitted.
    #[error("Cancellation rejected in phase {phase}")]
    CancellationRejected {
        /// Phase at the time of the request
        phase: SwapPhase,
    },

    /// Mutation attempted on a swap that already reached a terminal phase.
    #[error("Swap is terminal ({phase})")]
    TerminalPhase {
        /// Terminal phase the swap is in
        phase: SwapPhase,
    },

    /// Illegal phase transition.
    #[error("Invalid phase transition: {from} -> {to}")]
    InvalidTransition {
        /// Current phase
        from: SwapPhase,
        /// Attempted phase
        to: SwapPhase,
    },
}

impl SwapError {
    /// Lift a ledger failure on `side` into the swap-level taxonomy.
    pub fn from_ledger(side: LedgerSide, err: LedgerError) -> Self {
        match err {
            LedgerError::Unavailable(reason) => Self::TransientUnavailable {
                ledger: side,
                reason,
            },
            LedgerError::InvalidAddress(_)
            | LedgerError::InvalidAmount(_)
            | LedgerError::TimelockOutOfBounds { .. } => {
                Self::Validation(format!("{side} ledger: {err}"))
            }
            LedgerError::Rejected(reason) => Self::LedgerRejection {
                ledger: side,
                reason,
            },
            other => Self::LedgerRejection {
                ledger: side,
                reason: other.to_string(),
            },
        }
    }

    /// Whether the error is transient and the caller may retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientUnavailable { .. })
    }
}

impl From<(LedgerSide, LedgerError)> for SwapError {
    fn from((side, err): (LedgerSide, LedgerError)) -> Self {
        Self::from_ledger(side, err)
    }
}

/// Result alias for swap-level operations.
pub type SwapResult<T> = Result<T, SwapError>;
