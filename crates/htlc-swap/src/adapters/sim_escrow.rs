//! # Simulated Escrow Program
//!
//! In-memory escrow that behaves like the deployed programs: it verifies
//! swap ids with the ledger's own scheme, enforces timelock windows, keeps
//! balances, emits events, and speaks the ledger dialect's encodings and
//! rejection texts. Fault knobs let tests inject lag, outages and stalls.

use super::dialect::{LedgerDialect, RejectionKind};
use crate::algorithms::{scheme_for, PayoutHash};
use crate::domain::{Hash, LedgerKind, TimelockBounds};
use crate::ports::{
    CallAuth, EscrowEvent, EscrowFault, EscrowProgram, InitiateCall, RawSwapDetails, WireBytes,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info};

const EVENT_CAPACITY: usize = 256;

#[derive(Clone, Debug)]
struct EscrowEntry {
    hashlock: Hash,
    timelock: u64,
    initiator: String,
    recipient: String,
    amount: u128,
    completed: bool,
    refunded: bool,
    secret: Option<[u8; 32]>,
    hidden_reads: u32,
}

#[derive(Debug, Default)]
struct EscrowState {
    base_secs: u64,
    offset_secs: u64,
    tokio_origin: Option<tokio::time::Instant>,
    entries: HashMap<[u8; 32], EscrowEntry>,
    balances: HashMap<String, u128>,
    allowances: HashMap<String, u128>,
    escrowed: u128,
    tx_nonce: u64,
    read_lag: u32,
    failing_calls: u32,
    stalled_calls: u32,
    pending_rejection: Option<(String, u32)>,
}

impl EscrowState {
    fn now_secs(&self) -> u64 {
        let elapsed = self
            .tokio_origin
            .map(|origin| origin.elapsed().as_secs())
            .unwrap_or(0);
        self.base_secs
            .saturating_add(self.offset_secs)
            .saturating_add(elapsed)
    }
}

enum Injected {
    Fail,
    Stall,
    Reject(String),
}

/// In-memory escrow program for one ledger.
pub struct SimulatedEscrow {
    dialect: Arc<dyn LedgerDialect>,
    bounds: TimelockBounds,
    payout_hash: PayoutHash,
    allowance_required: bool,
    state: RwLock<EscrowState>,
    events: broadcast::Sender<EscrowEvent>,
}

impl SimulatedEscrow {
    /// Escrow speaking `dialect`, accepting timelocks within `bounds`,
    /// with its clock at `now_secs`.
    pub fn new(dialect: Arc<dyn LedgerDialect>, bounds: TimelockBounds, now_secs: u64) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            dialect,
            bounds,
            payout_hash: PayoutHash::Sha256,
            allowance_required: false,
            state: RwLock::new(EscrowState {
                base_secs: now_secs,
                ..EscrowState::default()
            }),
            events,
        }
    }

    /// Use a different payout hash.
    pub fn with_payout_hash(mut self, payout_hash: PayoutHash) -> Self {
        self.payout_hash = payout_hash;
        self
    }

    /// Require a token allowance before `initiate` (ERC-20 style).
    pub fn with_allowance_required(mut self) -> Self {
        self.allowance_required = true;
        self
    }

    /// Let the ledger clock run with the tokio clock from now on.
    pub fn follow_tokio_clock(&self) {
        let mut state = self.state.write();
        let now = state.now_secs();
        state.base_secs = now;
        state.offset_secs = 0;
        state.tokio_origin = Some(tokio::time::Instant::now());
    }

    /// Ledger family.
    pub fn kind(&self) -> LedgerKind {
        self.dialect.kind()
    }

    /// Ledger time (unix seconds).
    pub fn now_secs(&self) -> u64 {
        self.state.read().now_secs()
    }

    /// Set the ledger clock.
    pub fn set_time(&self, now_secs: u64) {
        let mut state = self.state.write();
        state.base_secs = now_secs;
        state.offset_secs = 0;
        if state.tokio_origin.is_some() {
            state.tokio_origin = Some(tokio::time::Instant::now());
        }
    }

    /// Move the ledger clock forward.
    pub fn advance_time(&self, secs: u64) {
        let mut state = self.state.write();
        state.offset_secs = state.offset_secs.saturating_add(secs);
    }

    /// Give an account funds.
    pub fn credit(&self, account: &[u8], amount: u128) {
        let key = self.dialect.format_address(account);
        let mut state = self.state.write();
        let balance = state.balances.entry(key).or_default();
        *balance = balance.saturating_add(amount);
    }

    /// Account balance.
    pub fn balance_of(&self, account: &[u8]) -> u128 {
        let key = self.dialect.format_address(account);
        self.state.read().balances.get(&key).copied().unwrap_or(0)
    }

    /// Funds currently held by the escrow.
    pub fn escrowed(&self) -> u128 {
        self.state.read().escrowed
    }

    /// New locks stay invisible to the next `reads` view calls.
    pub fn set_read_lag(&self, reads: u32) {
        self.state.write().read_lag = reads;
    }

    /// The next `calls` calls of any kind fail as unreachable.
    pub fn fail_next_calls(&self, calls: u32) {
        self.state.write().failing_calls = calls;
    }

    /// The next `calls` calls of any kind never answer.
    pub fn stall_next_calls(&self, calls: u32) {
        self.state.write().stalled_calls = calls;
    }

    /// The next state-changing call is rejected with `raw` text.
    pub fn reject_next(&self, raw: impl Into<String>) {
        self.reject_next_calls(raw, 1);
    }

    /// The next `calls` state-changing calls are rejected with `raw` text.
    pub fn reject_next_calls(&self, raw: impl Into<String>, calls: u32) {
        self.state.write().pending_rejection = (calls > 0).then(|| (raw.into(), calls));
    }

    fn injected(&self, mutating: bool) -> Option<Injected> {
        let mut state = self.state.write();
        if state.stalled_calls > 0 {
            state.stalled_calls -= 1;
            return Some(Injected::Stall);
        }
        if state.failing_calls > 0 {
            state.failing_calls -= 1;
            return Some(Injected::Fail);
        }
        if mutating {
            if let Some((raw, remaining)) = state.pending_rejection.take() {
                if remaining > 1 {
                    state.pending_rejection = Some((raw.clone(), remaining - 1));
                }
                return Some(Injected::Reject(raw));
            }
        }
        None
    }

    async fn gate(&self, mutating: bool) -> Result<(), EscrowFault> {
        match self.injected(mutating) {
            None => Ok(()),
            Some(Injected::Fail) => Err(EscrowFault::Unavailable("connection refused".into())),
            Some(Injected::Reject(raw)) => Err(EscrowFault::Rejected(raw)),
            Some(Injected::Stall) => {
                tokio::time::sleep(Duration::from_secs(24 * 3_600)).await;
                Err(EscrowFault::Unavailable("stalled call gave up".into()))
            }
        }
    }

    fn reject(&self, kind: RejectionKind) -> EscrowFault {
        EscrowFault::Rejected(self.dialect.rejection_text(kind))
    }

    fn decode32(&self, value: &WireBytes, kind: RejectionKind) -> Result<[u8; 32], EscrowFault> {
        self.dialect
            .decode_bytes32(value)
            .ok_or_else(|| self.reject(kind))
    }

    fn next_tx(state: &mut EscrowState, method: &str, swap_id: &[u8; 32]) -> [u8; 32] {
        state.tx_nonce += 1;
        let mut hasher = Sha256::new();
        hasher.update(method.as_bytes());
        hasher.update(swap_id);
        hasher.update(state.tx_nonce.to_be_bytes());
        hasher.finalize().into()
    }

    fn caller(&self, auth: &CallAuth) -> Result<(Vec<u8>, String), EscrowFault> {
        if auth.signature.is_empty() {
            return Err(EscrowFault::Rejected("missing signature".into()));
        }
        let bytes = self
            .dialect
            .parse_address(&auth.signer)
            .map_err(|e| EscrowFault::Rejected(e.to_string()))?;
        let key = self.dialect.format_address(&bytes);
        Ok((bytes, key))
    }

    fn publish(&self, event: EscrowEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn details(&self, entry: &EscrowEntry) -> RawSwapDetails {
        RawSwapDetails {
            hashlock: self.dialect.encode_bytes(&entry.hashlock),
            timelock: entry.timelock,
            initiator: entry.initiator.clone(),
            recipient: entry.recipient.clone(),
            amount: entry.amount.to_string(),
            active: !entry.completed && !entry.refunded,
            completed: entry.completed,
            refunded: entry.refunded,
        }
    }
}

#[async_trait]
impl EscrowProgram for SimulatedEscrow {
    async fn initiate(&self, auth: &CallAuth, call: InitiateCall) -> Result<String, EscrowFault> {
        self.gate(true).await?;
        let swap_id = self.decode32(&call.swap_id, RejectionKind::SwapIdMismatch)?;
        let hashlock = self.decode32(&call.hashlock, RejectionKind::SwapIdMismatch)?;
        let amount: u128 = call
            .amount
            .parse()
            .map_err(|_| self.reject(RejectionKind::InvalidAmount))?;
        if amount == 0 {
            return Err(self.reject(RejectionKind::InvalidAmount));
        }
        let (initiator_bytes, initiator) = self.caller(auth)?;
        let recipient = self
            .dialect
            .canonicalize(&call.recipient)
            .map_err(|e| EscrowFault::Rejected(e.to_string()))?;

        let expected = scheme_for(self.kind()).derive(&hashlock, &initiator_bytes, call.timelock);
        if expected != swap_id {
            return Err(self.reject(RejectionKind::SwapIdMismatch));
        }

        let tx = {
            let mut state = self.state.write();
            let now = state.now_secs();
            let timelock_secs = self.dialect.from_native_time(call.timelock);
            if !self.bounds.contains(now, timelock_secs) {
                return Err(self.reject(RejectionKind::TimelockOutOfRange));
            }
            if state.entries.contains_key(&swap_id) {
                return Err(self.reject(RejectionKind::SwapExists));
            }
            if self.allowance_required {
                let allowance = state.allowances.get(&initiator).copied().unwrap_or(0);
                if allowance < amount {
                    return Err(self.reject(RejectionKind::InsufficientAllowance));
                }
            }
            let balance = state.balances.get(&initiator).copied().unwrap_or(0);
            if balance < amount {
                return Err(self.reject(RejectionKind::InsufficientBalance));
            }

            if self.allowance_required {
                if let Some(allowance) = state.allowances.get_mut(&initiator) {
                    *allowance -= amount;
                }
            }
            state.balances.insert(initiator.clone(), balance - amount);
            state.escrowed += amount;
            let hidden_reads = state.read_lag;
            state.entries.insert(
                swap_id,
                EscrowEntry {
                    hashlock,
                    timelock: call.timelock,
                    initiator,
                    recipient,
                    amount,
                    completed: false,
                    refunded: false,
                    secret: None,
                    hidden_reads,
                },
            );
            self.dialect
                .format_tx(&Self::next_tx(&mut state, "initiate", &swap_id))
        };

        info!(
            ledger = %self.kind(),
            swap = %hex::encode(swap_id),
            "[sim-escrow] lock created"
        );
        self.publish(EscrowEvent::Initiated {
            swap_id: self.dialect.encode_bytes(&swap_id),
            tx: tx.clone(),
        });
        Ok(tx)
    }

    async fn complete(
        &self,
        _auth: &CallAuth,
        swap_id: WireBytes,
        secret: WireBytes,
    ) -> Result<String, EscrowFault> {
        self.gate(true).await?;
        let id = self.decode32(&swap_id, RejectionKind::SwapNotFound)?;
        let preimage = self.decode32(&secret, RejectionKind::InvalidSecret)?;

        let tx = {
            let mut state = self.state.write();
            let now_native = self.dialect.to_native_time(state.now_secs());
            let entry = state
                .entries
                .get(&id)
                .cloned()
                .ok_or_else(|| self.reject(RejectionKind::SwapNotFound))?;
            if entry.completed {
                return Err(self.reject(RejectionKind::AlreadyCompleted));
            }
            if entry.refunded {
                return Err(self.reject(RejectionKind::AlreadyRefunded));
            }
            if now_native > entry.timelock {
                return Err(self.reject(RejectionKind::Expired));
            }
            if self.payout_hash.digest(&preimage) != entry.hashlock {
                return Err(self.reject(RejectionKind::InvalidSecret));
            }

            let balance = state.balances.entry(entry.recipient.clone()).or_default();
            *balance = balance.saturating_add(entry.amount);
            state.escrowed -= entry.amount;
            if let Some(stored) = state.entries.get_mut(&id) {
                stored.completed = true;
                stored.secret = Some(preimage);
            }
            self.dialect
                .format_tx(&Self::next_tx(&mut state, "complete", &id))
        };

        info!(ledger = %self.kind(), swap = %hex::encode(id), "[sim-escrow] swap completed");
        self.publish(EscrowEvent::Completed {
            swap_id,
            secret,
            tx: tx.clone(),
        });
        Ok(tx)
    }

    async fn refund(&self, _auth: &CallAuth, swap_id: WireBytes) -> Result<String, EscrowFault> {
        self.gate(true).await?;
        let id = self.decode32(&swap_id, RejectionKind::SwapNotFound)?;

        let tx = {
            let mut state = self.state.write();
            let now_native = self.dialect.to_native_time(state.now_secs());
            let entry = state
                .entries
                .get(&id)
                .cloned()
                .ok_or_else(|| self.reject(RejectionKind::SwapNotFound))?;
            if entry.completed {
                return Err(self.reject(RejectionKind::AlreadyCompleted));
            }
            if entry.refunded {
                return Err(self.reject(RejectionKind::AlreadyRefunded));
            }
            if now_native <= entry.timelock {
                return Err(self.reject(RejectionKind::NotYetExpired));
            }

            let balance = state.balances.entry(entry.initiator.clone()).or_default();
            *balance = balance.saturating_add(entry.amount);
            state.escrowed -= entry.amount;
            if let Some(stored) = state.entries.get_mut(&id) {
                stored.refunded = true;
            }
            self.dialect
                .format_tx(&Self::next_tx(&mut state, "refund", &id))
        };

        info!(ledger = %self.kind(), swap = %hex::encode(id), "[sim-escrow] swap refunded");
        self.publish(EscrowEvent::Refunded {
            swap_id,
            tx: tx.clone(),
        });
        Ok(tx)
    }

    async fn approve(&self, auth: &CallAuth, amount: String) -> Result<String, EscrowFault> {
        self.gate(true).await?;
        let amount: u128 = amount
            .parse()
            .map_err(|_| self.reject(RejectionKind::InvalidAmount))?;
        let (_, owner) = self.caller(auth)?;
        let mut state = self.state.write();
        state.allowances.insert(owner, amount);
        Ok(self
            .dialect
            .format_tx(&Self::next_tx(&mut state, "approve", &[0u8; 32])))
    }

    async fn get_swap_details(
        &self,
        swap_id: WireBytes,
    ) -> Result<Option<RawSwapDetails>, EscrowFault> {
        self.gate(false).await?;
        let Some(id) = self.dialect.decode_bytes32(&swap_id) else {
            return Ok(None);
        };
        let mut state = self.state.write();
        let Some(entry) = state.entries.get_mut(&id) else {
            return Ok(None);
        };
        if entry.hidden_reads > 0 {
            entry.hidden_reads -= 1;
            debug!(swap = %hex::encode(id), "[sim-escrow] lock not yet visible");
            return Ok(None);
        }
        let entry = entry.clone();
        drop(state);
        Ok(Some(self.details(&entry)))
    }

    async fn completion_secret(
        &self,
        swap_id: WireBytes,
    ) -> Result<Option<WireBytes>, EscrowFault> {
        self.gate(false).await?;
        let Some(id) = self.dialect.decode_bytes32(&swap_id) else {
            return Ok(None);
        };
        let secret = self.state.read().entries.get(&id).and_then(|e| e.secret);
        Ok(secret.map(|s| self.dialect.encode_bytes(&s)))
    }

    async fn block_time(&self) -> Result<u64, EscrowFault> {
        self.gate(false).await?;
        Ok(self.dialect.to_native_time(self.now_secs()))
    }

    fn subscribe(&self) -> Option<broadcast::Receiver<EscrowEvent>> {
        Some(self.events.subscribe())
    }
}
