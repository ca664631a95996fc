//! # Domain Entities
//!
//! The swap record and the values that flow in and out of it.

use super::errors::{Hash, SwapError, SwapId, SwapResult};
use super::secure_secret::SecureSecret;
use super::value_objects::{LedgerKind, LedgerSide, PerLedger, SwapPhase, TxKind, TxRef};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ledger-independent snapshot of one escrow entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapView {
    /// Recorded hashlock
    pub hashlock: Hash,
    /// Expiry instant (unix seconds)
    pub timelock: u64,
    /// Canonical address of the locker
    pub initiator: String,
    /// Canonical address of the payee
    pub recipient: String,
    /// Locked amount in ledger base units
    pub amount: u128,
    /// Neither completed nor refunded
    pub active: bool,
    /// Paid out to the recipient
    pub completed: bool,
    /// Returned to the initiator
    pub refunded: bool,
}

impl SwapView {
    /// Whether the lock still holds funds.
    pub fn is_outstanding(&self) -> bool {
        !self.completed && !self.refunded
    }
}

/// Secret, hashlock and the timelock pair for one swap.
#[derive(Clone, Debug)]
pub struct Commitment {
    /// The preimage; only the initiator holds it before the reveal.
    pub secret: SecureSecret,
    /// Digest of the secret under the ledgers' payout hash
    pub hashlock: Hash,
    /// Expiry on each ledger (unix seconds)
    pub timelocks: PerLedger<u64>,
    /// Margin that separated the two timelocks
    pub safety_margin_secs: u64,
}

/// How the caller wants the timelocks chosen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimelockRequest {
    /// Durations from each ledger's current time. Clamped into bounds and
    /// the destination shrunk if needed.
    Relative {
        /// Seconds until source expiry
        source_secs: u64,
        /// Seconds until destination expiry
        destination_secs: u64,
    },
    /// Absolute instants (unix seconds). Must satisfy bounds and ordering as given.
    Explicit {
        /// Source expiry
        source: u64,
        /// Destination expiry
        destination: u64,
    },
}

/// Parameters for a new swap.
///
/// The source adapter's signer is the initiator; the destination adapter's
/// signer is the counterparty providing destination funds.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SwapRequest {
    /// Counterparty's address on the source ledger (receives source funds)
    pub source_recipient: String,
    /// Initiator's address on the destination ledger (receives destination funds)
    pub destination_recipient: String,
    /// Source lock amount in source base units
    pub source_amount: u128,
    /// Destination lock amount in destination base units
    pub destination_amount: u128,
    /// Timelock choice; `None` uses the configured defaults
    pub timelocks: Option<TimelockRequest>,
}

/// One submitted ledger call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxEntry {
    /// Ledger the call went to
    pub side: LedgerSide,
    /// Call kind
    pub kind: TxKind,
    /// Ledger reference
    pub tx: TxRef,
}

/// Mutable state of one swap, owned by its orchestrator.
#[derive(Clone, Debug)]
pub struct SwapRecord {
    /// Log correlation id
    pub correlation_id: Uuid,
    /// Swap identifier on each ledger
    pub swap_ids: PerLedger<SwapId>,
    /// Ledger family on each side
    pub kinds: PerLedger<LedgerKind>,
    /// Preimage held by the initiator
    pub secret: SecureSecret,
    /// Shared hashlock
    pub hashlock: Hash,
    /// Expiry on each ledger (unix seconds)
    pub timelocks: PerLedger<u64>,
    /// Lock amount on each ledger
    pub amounts: PerLedger<u128>,
    /// Canonical payee address on each ledger
    pub recipients: PerLedger<String>,
    /// Current phase
    pub phase: SwapPhase,
    /// Every call submitted, in order
    pub tx_history: Vec<TxEntry>,
    /// Lock submission has started on this side
    pub lock_submitted: PerLedger<bool>,
    /// Lock confirmed on this side
    pub lock_confirmed: PerLedger<bool>,
    /// The secret has been sent to a ledger and may be public
    pub secret_submitted: bool,
    /// Operator asked to cancel
    pub cancel_requested: bool,
    /// Detail for `Failed`, or the last notable anomaly
    pub error_detail: Option<String>,
    /// Creation instant (unix seconds, local clock)
    pub created_at: u64,
}

impl SwapRecord {
    /// New record in `Created`.
    pub fn new(
        commitment: Commitment,
        swap_ids: PerLedger<SwapId>,
        kinds: PerLedger<LedgerKind>,
        amounts: PerLedger<u128>,
        recipients: PerLedger<String>,
        created_at: u64,
    ) -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
            swap_ids,
            kinds,
            secret: commitment.secret,
            hashlock: commitment.hashlock,
            timelocks: commitment.timelocks,
            amounts,
            recipients,
            phase: SwapPhase::Created,
            tx_history: Vec::new(),
            lock_submitted: PerLedger::default(),
            lock_confirmed: PerLedger::default(),
            secret_submitted: false,
            cancel_requested: false,
            error_detail: None,
            created_at,
        }
    }

    /// Primary identifier (the source-ledger swap id).
    pub fn id(&self) -> SwapId {
        self.swap_ids.source
    }

    /// Primary identifier as lowercase hex.
    pub fn id_hex(&self) -> String {
        hex::encode(self.swap_ids.source)
    }

    fn ensure_mutable(&self) -> SwapResult<()> {
        if self.phase.is_terminal() {
            return Err(SwapError::TerminalPhase { phase: self.phase });
        }
        Ok(())
    }

    /// Move to `next`, enforcing the phase graph.
    pub fn transition_to(&mut self, next: SwapPhase) -> SwapResult<()> {
        self.ensure_mutable()?;
        if !self.phase.can_transition_to(next) {
            return Err(SwapError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }
        self.phase = next;
        Ok(())
    }

    /// Stop in `Failed` with `detail`.
    pub fn fail(&mut self, detail: impl Into<String>) -> SwapResult<()> {
        self.transition_to(SwapPhase::Failed)?;
        self.error_detail = Some(detail.into());
        Ok(())
    }

    /// Append a submitted call to the history.
    pub fn record_tx(&mut self, side: LedgerSide, kind: TxKind, tx: TxRef) -> SwapResult<()> {
        self.ensure_mutable()?;
        self.tx_history.push(TxEntry { side, kind, tx });
        Ok(())
    }

    /// Note an anomaly without changing phase.
    pub fn note(&mut self, detail: impl Into<String>) -> SwapResult<()> {
        self.ensure_mutable()?;
        self.error_detail = Some(detail.into());
        Ok(())
    }

    /// Latest submitted call of `kind` on `side`.
    pub fn last_tx(&self, side: LedgerSide, kind: TxKind) -> Option<&TxRef> {
        self.tx_history
            .iter()
            .rev()
            .find(|entry| entry.side == side && entry.kind == kind)
            .map(|entry| &entry.tx)
    }

    /// Public snapshot without the secret.
    pub fn status(&self) -> SwapStatus {
        SwapStatus {
            id: self.id_hex(),
            correlation_id: self.correlation_id,
            phase: self.phase,
            swap_ids: PerLedger::new(
                hex::encode(self.swap_ids.source),
                hex::encode(self.swap_ids.destination),
            ),
            hashlock: hex::encode(self.hashlock),
            timelocks: self.timelocks.clone(),
            amounts: self.amounts.clone(),
            source_tx: self.last_tx(LedgerSide::Source, TxKind::Lock).cloned(),
            destination_tx: self.last_tx(LedgerSide::Destination, TxKind::Lock).cloned(),
            tx_history: self.tx_history.clone(),
            error_detail: self.error_detail.clone(),
        }
    }
}

/// Serializable status report of one swap.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapStatus {
    /// Primary identifier (hex)
    pub id: String,
    /// Log correlation id
    pub correlation_id: Uuid,
    /// Current phase
    pub phase: SwapPhase,
    /// Per-ledger swap ids (hex)
    pub swap_ids: PerLedger<String>,
    /// Hashlock (hex)
    pub hashlock: String,
    /// Expiry on each ledger (unix seconds)
    pub timelocks: PerLedger<u64>,
    /// Lock amount on each ledger
    pub amounts: PerLedger<u128>,
    /// Source lock transaction
    pub source_tx: Option<TxRef>,
    /// Destination lock transaction
    pub destination_tx: Option<TxRef>,
    /// Every call submitted, in order
    pub tx_history: Vec<TxEntry>,
    /// Failure or anomaly detail
    pub error_detail: Option<String>,
}

/// An asset on one ledger, as seen by the quote adapter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Ledger the asset lives on
    pub ledger: LedgerKind,
    /// Ticker shared across ledgers for the same underlying asset
    pub symbol: String,
    /// Base-unit decimals on this ledger
    pub decimals: u8,
}

impl Asset {
    /// Create an asset.
    pub fn new(ledger: LedgerKind, symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            ledger,
            symbol: symbol.into(),
            decimals,
        }
    }
}

/// Amount estimate for moving value across.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    /// Input amount in source base units
    pub source_amount: u128,
    /// Output amount in destination base units
    pub destination_amount: u128,
    /// Expected wall time for the full happy path (seconds)
    pub estimated_secs: u64,
}
