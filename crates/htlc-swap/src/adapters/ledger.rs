//! # Escrow Ledger Adapter
//!
//! Implements [`LedgerAdapter`] on top of any [`EscrowProgram`], using a
//! [`LedgerDialect`] for encodings and error texts.
//!
//! - Every program call runs under a timeout; expiry surfaces as
//!   [`LedgerError::Unavailable`].
//! - State-changing calls for one swap id are serialized through a
//!   per-id async mutex.
//! - Timelock bounds are checked against ledger time before submission.

use super::dialect::{EvmDialect, LedgerDialect, NearDialect, RejectionKind};
use crate::algorithms::{scheme_for, PayoutHash};
use crate::domain::{
    Hash, LedgerError, LedgerKind, LedgerSide, SecureSecret, SwapId, SwapView, TimelockBounds,
    TxRef,
};
use crate::metrics;
use crate::ports::{
    CallAuth, EscrowEvent, EscrowFault, EscrowProgram, InitiateCall, LedgerAdapter, LedgerEvent,
    LockParams, RawSwapDetails, Signer, WireBytes,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, OwnedMutexGuard};
use tracing::{debug, info, warn};

/// Static description of one ledger as the coordinator uses it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerProfile {
    /// Ledger family
    pub kind: LedgerKind,
    /// Role in swaps
    pub side: LedgerSide,
    /// Accepted timelock window
    pub bounds: TimelockBounds,
    /// Typical time to confirm a transaction (seconds)
    pub confirmation_latency_secs: u64,
    /// Hash the escrow applies to the secret
    pub payout_hash: PayoutHash,
    /// Ceiling on one program call (milliseconds)
    pub call_timeout_ms: u64,
    /// Base-unit decimals of the swapped asset
    pub decimals: u8,
}

impl LedgerProfile {
    /// EVM escrow: 5 minutes to 24 hours, ~3 minutes to finality.
    pub fn evm(side: LedgerSide) -> Self {
        Self {
            kind: LedgerKind::Evm,
            side,
            bounds: TimelockBounds::new(5 * 60, 24 * 3_600),
            confirmation_latency_secs: 180,
            payout_hash: PayoutHash::Sha256,
            call_timeout_ms: 30_000,
            decimals: 18,
        }
    }

    /// NEAR-style escrow: at least 2 hours, at most 7 days, fast finality.
    pub fn near(side: LedgerSide) -> Self {
        Self {
            kind: LedgerKind::Near,
            side,
            bounds: TimelockBounds::new(2 * 3_600, 7 * 24 * 3_600),
            confirmation_latency_secs: 5,
            payout_hash: PayoutHash::Sha256,
            call_timeout_ms: 30_000,
            decimals: 24,
        }
    }

    /// Override the per-call timeout.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Per-call timeout.
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

/// Dialect for a ledger family.
pub fn dialect_for(kind: LedgerKind) -> Arc<dyn LedgerDialect> {
    match kind {
        LedgerKind::Evm => Arc::new(EvmDialect),
        LedgerKind::Near => Arc::new(NearDialect),
    }
}

/// [`LedgerAdapter`] over an [`EscrowProgram`].
pub struct EscrowLedgerAdapter {
    profile: LedgerProfile,
    dialect: Arc<dyn LedgerDialect>,
    program: Arc<dyn EscrowProgram>,
    signer: Arc<dyn Signer>,
    in_flight: Mutex<HashMap<SwapId, Arc<tokio::sync::Mutex<()>>>>,
}

impl EscrowLedgerAdapter {
    /// Adapter for `profile`, calling `program` and signing with `signer`.
    pub fn new(
        profile: LedgerProfile,
        program: Arc<dyn EscrowProgram>,
        signer: Arc<dyn Signer>,
    ) -> Self {
        Self {
            dialect: dialect_for(profile.kind),
            profile,
            program,
            signer,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Profile in use.
    pub fn profile(&self) -> &LedgerProfile {
        &self.profile
    }

    async fn acquire(&self, swap_id: SwapId) -> OwnedMutexGuard<()> {
        let lock = self.in_flight.lock().entry(swap_id).or_default().clone();
        lock.lock_owned().await
    }

    fn release(&self, swap_id: &SwapId, guard: OwnedMutexGuard<()>) {
        drop(guard);
        let mut in_flight = self.in_flight.lock();
        if in_flight
            .get(swap_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            in_flight.remove(swap_id);
        }
    }

    fn auth(&self, method: &str, args: &[&[u8]]) -> Result<CallAuth, LedgerError> {
        let mut payload = Vec::with_capacity(64);
        payload.extend_from_slice(method.as_bytes());
        for arg in args {
            payload.extend_from_slice(&(arg.len() as u32).to_be_bytes());
            payload.extend_from_slice(arg);
        }
        Ok(CallAuth {
            signer: self.dialect.format_address(&self.signer.identity()),
            signature: self.signer.sign(&payload)?,
        })
    }

    async fn call<T, F>(&self, op: &'static str, swap_id: Option<SwapId>, fut: F) -> Result<T, LedgerError>
    where
        F: Future<Output = Result<T, EscrowFault>> + Send,
    {
        let result = match tokio::time::timeout(self.profile.call_timeout(), fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(fault)) => Err(self.map_fault(fault, swap_id)),
            Err(_) => Err(LedgerError::Unavailable(format!(
                "{op} timed out after {}ms",
                self.profile.call_timeout_ms
            ))),
        };
        if let Err(err) = &result {
            metrics::record_ledger_failure(&self.profile.kind.to_string(), error_label(err));
            debug!(ledger = %self.profile.kind, op, error = %err, "[xl-swap] ledger call failed");
        }
        result
    }

    fn map_fault(&self, fault: EscrowFault, swap_id: Option<SwapId>) -> LedgerError {
        let raw = match fault {
            EscrowFault::Unavailable(reason) => return LedgerError::Unavailable(reason),
            EscrowFault::Rejected(raw) => raw,
        };
        match self.dialect.classify(&raw) {
            Some(RejectionKind::SwapNotFound) => {
                LedgerError::SwapNotFound(swap_id.unwrap_or_default())
            }
            Some(RejectionKind::SwapExists) => LedgerError::AlreadyLocked,
            Some(RejectionKind::InvalidSecret) => LedgerError::InvalidSecret,
            Some(RejectionKind::AlreadyCompleted) => LedgerError::AlreadyCompleted,
            Some(RejectionKind::AlreadyRefunded) => LedgerError::AlreadyRefunded,
            Some(RejectionKind::NotYetExpired) => LedgerError::NotYetExpired,
            Some(RejectionKind::InsufficientBalance) => LedgerError::InsufficientBalance,
            Some(RejectionKind::InsufficientAllowance) => LedgerError::AllowanceRequired,
            _ => LedgerError::Rejected(raw),
        }
    }

    fn view_from_raw(&self, raw: RawSwapDetails) -> Result<SwapView, LedgerError> {
        let hashlock = self
            .dialect
            .decode_bytes32(&raw.hashlock)
            .ok_or_else(|| LedgerError::Rejected("malformed hashlock in swap view".into()))?;
        let amount = raw
            .amount
            .parse::<u128>()
            .map_err(|_| LedgerError::Rejected(format!("malformed amount {}", raw.amount)))?;
        Ok(SwapView {
            hashlock,
            timelock: self.dialect.from_native_time(raw.timelock),
            initiator: self
                .dialect
                .canonicalize(&raw.initiator)
                .unwrap_or(raw.initiator),
            recipient: self
                .dialect
                .canonicalize(&raw.recipient)
                .unwrap_or(raw.recipient),
            amount,
            active: raw.active,
            completed: raw.completed,
            refunded: raw.refunded,
        })
    }

    fn encode_amount(&self, amount: u128) -> String {
        match self.profile.kind {
            // uint256 on the wire
            LedgerKind::Evm => U256::from(amount).to_string(),
            // U128 JSON string
            LedgerKind::Near => amount.to_string(),
        }
    }
}

fn error_label(err: &LedgerError) -> &'static str {
    match err {
        LedgerError::Unavailable(_) => "unavailable",
        LedgerError::Rejected(_) => "rejected",
        LedgerError::NotYetExpired => "not_yet_expired",
        LedgerError::SwapNotFound(_) => "not_found",
        _ => "other",
    }
}

#[async_trait]
impl LedgerAdapter for EscrowLedgerAdapter {
    fn side(&self) -> LedgerSide {
        self.profile.side
    }

    fn kind(&self) -> LedgerKind {
        self.profile.kind
    }

    fn timelock_bounds(&self) -> TimelockBounds {
        self.profile.bounds
    }

    fn confirmation_latency_secs(&self) -> u64 {
        self.profile.confirmation_latency_secs
    }

    fn payout_hash(&self) -> PayoutHash {
        self.profile.payout_hash
    }

    fn identity(&self) -> Vec<u8> {
        self.signer.identity()
    }

    fn derive_swap_id(&self, hashlock: &Hash, timelock: u64) -> SwapId {
        scheme_for(self.profile.kind).derive(
            hashlock,
            &self.signer.identity(),
            self.dialect.to_native_time(timelock),
        )
    }

    fn canonicalize_address(&self, raw: &str) -> Result<String, LedgerError> {
        self.dialect.canonicalize(raw)
    }

    async fn lock(&self, params: LockParams) -> Result<TxRef, LedgerError> {
        if params.amount == 0 {
            return Err(LedgerError::InvalidAmount("amount must be positive".into()));
        }
        let recipient = self.dialect.canonicalize(&params.recipient)?;
        if self.derive_swap_id(&params.hashlock, params.timelock) != params.swap_id {
            return Err(LedgerError::Rejected(
                "swap id does not match lock parameters".into(),
            ));
        }

        let guard = self.acquire(params.swap_id).await;
        let result = async {
            let now = self.current_time().await?;
            let bounds = self.profile.bounds;
            if !bounds.contains(now, params.timelock) {
                return Err(LedgerError::TimelockOutOfBounds {
                    timelock: params.timelock,
                    earliest: bounds.earliest(now),
                    latest: bounds.latest(now),
                });
            }

            let native_timelock = self.dialect.to_native_time(params.timelock);
            let amount = self.encode_amount(params.amount);
            let auth = self.auth(
                "initiate",
                &[
                    &params.swap_id,
                    &params.hashlock,
                    recipient.as_bytes(),
                    amount.as_bytes(),
                    &native_timelock.to_be_bytes(),
                ],
            )?;
            let call = InitiateCall {
                swap_id: self.dialect.encode_bytes(&params.swap_id),
                hashlock: self.dialect.encode_bytes(&params.hashlock),
                recipient,
                amount,
                timelock: native_timelock,
            };
            self.call("initiate", Some(params.swap_id), self.program.initiate(&auth, call))
                .await
        }
        .await;
        self.release(&params.swap_id, guard);

        let tx = TxRef(result?);
        info!(
            ledger = %self.profile.kind,
            swap = %hex::encode(params.swap_id),
            tx = %tx,
            "[xl-swap] lock submitted"
        );
        Ok(tx)
    }

    async fn complete(&self, swap_id: SwapId, secret: &SecureSecret) -> Result<TxRef, LedgerError> {
        let guard = self.acquire(swap_id).await;
        let result = async {
            let auth = self.auth("complete", &[&swap_id, secret.as_bytes()])?;
            let fut = self.program.complete(
                &auth,
                self.dialect.encode_bytes(&swap_id),
                self.dialect.encode_bytes(secret.as_bytes()),
            );
            self.call("complete", Some(swap_id), fut).await
        }
        .await;
        self.release(&swap_id, guard);
        result.map(TxRef)
    }

    async fn refund(&self, swap_id: SwapId) -> Result<TxRef, LedgerError> {
        let guard = self.acquire(swap_id).await;
        let result = async {
            let auth = self.auth("refund", &[&swap_id])?;
            let fut = self
                .program
                .refund(&auth, self.dialect.encode_bytes(&swap_id));
            self.call("refund", Some(swap_id), fut).await
        }
        .await;
        self.release(&swap_id, guard);
        result.map(TxRef)
    }

    async fn approve(&self, amount: u128) -> Result<TxRef, LedgerError> {
        let encoded = self.encode_amount(amount);
        let auth = self.auth("approve", &[encoded.as_bytes()])?;
        let tx = self
            .call("approve", None, self.program.approve(&auth, encoded))
            .await?;
        Ok(TxRef(tx))
    }

    async fn query(&self, swap_id: SwapId) -> Result<Option<SwapView>, LedgerError> {
        let raw = self
            .call(
                "get_swap_details",
                Some(swap_id),
                self.program
                    .get_swap_details(self.dialect.encode_bytes(&swap_id)),
            )
            .await?;
        raw.map(|details| self.view_from_raw(details)).transpose()
    }

    async fn revealed_secret(&self, swap_id: SwapId) -> Result<Option<SecureSecret>, LedgerError> {
        let raw = self
            .call(
                "completion_secret",
                Some(swap_id),
                self.program
                    .completion_secret(self.dialect.encode_bytes(&swap_id)),
            )
            .await?;
        match raw {
            None => Ok(None),
            Some(wire) => match self.dialect.decode_bytes32(&wire) {
                Some(bytes) => Ok(Some(SecureSecret::new(bytes))),
                None => {
                    warn!(swap = %hex::encode(swap_id), "[xl-swap] malformed revealed secret");
                    Ok(None)
                }
            },
        }
    }

    async fn current_time(&self) -> Result<u64, LedgerError> {
        let native = self
            .call("block_time", None, self.program.block_time())
            .await?;
        Ok(self.dialect.from_native_time(native))
    }

    fn events(&self) -> Option<broadcast::Receiver<EscrowEvent>> {
        self.program.subscribe()
    }

    fn decode_event(&self, event: &EscrowEvent) -> Option<LedgerEvent> {
        let decode = |bytes: &WireBytes| self.dialect.decode_bytes32(bytes);
        match event {
            EscrowEvent::Initiated { swap_id, tx } => Some(LedgerEvent::Locked {
                swap_id: decode(swap_id)?,
                tx: TxRef(tx.clone()),
            }),
            EscrowEvent::Completed {
                swap_id,
                secret,
                tx,
            } => Some(LedgerEvent::Completed {
                swap_id: decode(swap_id)?,
                secret: SecureSecret::new(decode(secret)?),
                tx: TxRef(tx.clone()),
            }),
            EscrowEvent::Refunded { swap_id, tx } => Some(LedgerEvent::Refunded {
                swap_id: decode(swap_id)?,
                tx: TxRef(tx.clone()),
            }),
        }
    }
}
