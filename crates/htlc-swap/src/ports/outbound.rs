//! # Outbound Ports (Driven)
//!
//! Traits the coordinator calls out through.
//!
//! - [`LedgerAdapter`]: one ledger, spoken in domain types
//! - [`EscrowProgram`]: the raw escrow program behind an adapter, spoken in
//!   the ledger's wire encodings
//! - [`Signer`]: key custody for submitted calls
//! - [`PriceSource`]: cross-asset pricing for quotes

use crate::algorithms::PayoutHash;
use crate::domain::{
    Asset, Hash, LedgerError, LedgerKind, LedgerSide, SecureSecret, SwapId, SwapResult, SwapView,
    TimelockBounds, TxRef,
};
use async_trait::async_trait;
use tokio::sync::broadcast;

// =============================================================================
// WIRE LEVEL
// =============================================================================

/// Byte strings as a ledger's call interface carries them.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum WireBytes {
    /// `0x`-prefixed hex (EVM ABI JSON)
    Hex(String),
    /// Plain byte vector (Borsh/JSON arrays)
    Raw(Vec<u8>),
}

/// Arguments of an escrow `initiate` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InitiateCall {
    /// Swap id the program will verify
    pub swap_id: WireBytes,
    /// Hashlock
    pub hashlock: WireBytes,
    /// Payee, in the ledger's address format
    pub recipient: String,
    /// Amount as a decimal string (uint256 / U128 JSON)
    pub amount: String,
    /// Expiry in ledger-native time units
    pub timelock: u64,
}

/// Escrow entry as returned by the program's view call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawSwapDetails {
    /// Hashlock
    pub hashlock: WireBytes,
    /// Expiry in ledger-native time units
    pub timelock: u64,
    /// Locker, in the ledger's address format
    pub initiator: String,
    /// Payee, in the ledger's address format
    pub recipient: String,
    /// Decimal amount string
    pub amount: String,
    /// Neither completed nor refunded
    pub active: bool,
    /// Paid to the recipient
    pub completed: bool,
    /// Returned to the initiator
    pub refunded: bool,
}

/// Events an escrow program publishes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EscrowEvent {
    /// Lock created
    Initiated {
        /// Swap id
        swap_id: WireBytes,
        /// Transaction
        tx: String,
    },
    /// Paid out; the secret is now public
    Completed {
        /// Swap id
        swap_id: WireBytes,
        /// Revealed preimage
        secret: WireBytes,
        /// Transaction
        tx: String,
    },
    /// Returned to the locker
    Refunded {
        /// Swap id
        swap_id: WireBytes,
        /// Transaction
        tx: String,
    },
}

/// Failure at the escrow program boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EscrowFault {
    /// The program executed and refused; raw revert/panic text.
    Rejected(String),
    /// Transport failure; the call may or may not have landed.
    Unavailable(String),
}

/// Signature attached to a state-changing call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallAuth {
    /// Signer's ledger address
    pub signer: String,
    /// Signature over the canonical call payload
    pub signature: Vec<u8>,
}

/// Raw escrow program on one ledger.
#[async_trait]
pub trait EscrowProgram: Send + Sync {
    /// Lock funds under the given swap id.
    async fn initiate(&self, auth: &CallAuth, call: InitiateCall) -> Result<String, EscrowFault>;

    /// Pay out with the secret.
    async fn complete(
        &self,
        auth: &CallAuth,
        swap_id: WireBytes,
        secret: WireBytes,
    ) -> Result<String, EscrowFault>;

    /// Return funds to the locker after expiry.
    async fn refund(&self, auth: &CallAuth, swap_id: WireBytes) -> Result<String, EscrowFault>;

    /// Grant the escrow a token allowance.
    async fn approve(&self, auth: &CallAuth, amount: String) -> Result<String, EscrowFault>;

    /// View call; `None` when the program has no such entry.
    async fn get_swap_details(
        &self,
        swap_id: WireBytes,
    ) -> Result<Option<RawSwapDetails>, EscrowFault>;

    /// Secret recorded by a past completion, read from the event log.
    async fn completion_secret(&self, swap_id: WireBytes) -> Result<Option<WireBytes>, EscrowFault>;

    /// Latest block time, in ledger-native units.
    async fn block_time(&self) -> Result<u64, EscrowFault>;

    /// Event stream, where the transport supports one.
    fn subscribe(&self) -> Option<broadcast::Receiver<EscrowEvent>>;
}

/// Key custody. Keys never leave the implementation.
pub trait Signer: Send + Sync {
    /// Signature scheme name.
    fn scheme(&self) -> &'static str;

    /// Public account identity bytes (20 for EVM, 32 for NEAR).
    fn identity(&self) -> Vec<u8>;

    /// Sign `payload`.
    fn sign(&self, payload: &[u8]) -> Result<Vec<u8>, LedgerError>;
}

// =============================================================================
// DOMAIN LEVEL
// =============================================================================

/// Ledger event decoded into domain types.
#[derive(Clone, Debug)]
pub enum LedgerEvent {
    /// Lock created
    Locked {
        /// Swap id
        swap_id: SwapId,
        /// Transaction
        tx: TxRef,
    },
    /// Paid out with the revealed secret
    Completed {
        /// Swap id
        swap_id: SwapId,
        /// Revealed secret
        secret: SecureSecret,
        /// Transaction
        tx: TxRef,
    },
    /// Returned to the locker
    Refunded {
        /// Swap id
        swap_id: SwapId,
        /// Transaction
        tx: TxRef,
    },
}

impl LedgerEvent {
    /// Swap id the event concerns.
    pub fn swap_id(&self) -> &SwapId {
        match self {
            LedgerEvent::Locked { swap_id, .. }
            | LedgerEvent::Completed { swap_id, .. }
            | LedgerEvent::Refunded { swap_id, .. } => swap_id,
        }
    }
}

/// Lock parameters in domain terms.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LockParams {
    /// Swap id derived for this ledger
    pub swap_id: SwapId,
    /// Hashlock
    pub hashlock: Hash,
    /// Payee address (any format the adapter can canonicalize)
    pub recipient: String,
    /// Amount in base units
    pub amount: u128,
    /// Expiry (unix seconds)
    pub timelock: u64,
}

/// One ledger, spoken in domain types. Implementations translate addresses,
/// time units, byte encodings and error texts.
#[async_trait]
pub trait LedgerAdapter: Send + Sync {
    /// Role of this ledger in the swaps it serves.
    fn side(&self) -> LedgerSide;

    /// Ledger family.
    fn kind(&self) -> LedgerKind;

    /// Accepted timelock window.
    fn timelock_bounds(&self) -> TimelockBounds;

    /// Typical time to confirm a transaction (seconds).
    fn confirmation_latency_secs(&self) -> u64;

    /// Hash the escrow applies to the secret.
    fn payout_hash(&self) -> PayoutHash;

    /// Signer's canonical account bytes.
    fn identity(&self) -> Vec<u8>;

    /// Swap id this ledger will assign when the signer locks.
    fn derive_swap_id(&self, hashlock: &Hash, timelock: u64) -> SwapId;

    /// Canonical form of an address, padding or parsing foreign formats.
    fn canonicalize_address(&self, raw: &str) -> Result<String, LedgerError>;

    /// Lock funds.
    async fn lock(&self, params: LockParams) -> Result<TxRef, LedgerError>;

    /// Pay out with the secret.
    async fn complete(&self, swap_id: SwapId, secret: &SecureSecret) -> Result<TxRef, LedgerError>;

    /// Return funds after expiry.
    async fn refund(&self, swap_id: SwapId) -> Result<TxRef, LedgerError>;

    /// Grant the escrow a spending allowance.
    async fn approve(&self, amount: u128) -> Result<TxRef, LedgerError>;

    /// Read the escrow entry. `Ok(None)` may be transient after a lock.
    async fn query(&self, swap_id: SwapId) -> Result<Option<SwapView>, LedgerError>;

    /// Secret revealed by a completion, if any.
    async fn revealed_secret(&self, swap_id: SwapId) -> Result<Option<SecureSecret>, LedgerError>;

    /// Ledger time (unix seconds).
    async fn current_time(&self) -> Result<u64, LedgerError>;

    /// Subscribe to the escrow event stream, if supported.
    fn events(&self) -> Option<broadcast::Receiver<EscrowEvent>>;

    /// Decode a raw event into domain terms.
    fn decode_event(&self, event: &EscrowEvent) -> Option<LedgerEvent>;
}

/// Cross-asset pricing.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Convert `amount` of `from` (base units) into base units of `to`.
    async fn convert(&self, from: &Asset, to: &Asset, amount: u128) -> SwapResult<u128>;
}
