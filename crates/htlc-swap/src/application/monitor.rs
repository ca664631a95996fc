//! # Cross-Ledger State Monitor
//!
//! Polls ledgers until a lock, payout or refund is visible, and watches for
//! the secret to become public. Every wait is bounded by the retry policy
//! or by a ledger-time deadline, so nothing here can hang a swap.

use crate::algorithms::{verify_secret, PayoutHash};
use crate::config::RetryPolicy;
use crate::domain::{
    ConfirmationTarget, Hash, LedgerSide, SecureSecret, SwapError, SwapId, SwapResult, SwapView,
};
use crate::ports::{EscrowEvent, LedgerAdapter, LedgerEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, warn};

/// Upper bound on a single sleep while waiting for ledger time to pass.
const EXPIRY_RECHECK: Duration = Duration::from_secs(60);

/// Result of waiting for a ledger to reach a state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Confirmation {
    /// Target state observed.
    Confirmed(SwapView),
    /// The deadline passed on the ledger's clock first.
    Expired,
    /// Gave up; the reason keeps the last thing observed.
    Failed(String),
}

/// Ledger poller.
#[derive(Clone, Debug)]
pub struct StateMonitor {
    policy: RetryPolicy,
}

impl StateMonitor {
    /// Monitor polling with `policy`.
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Polling policy.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Poll `swap_id` until it reaches `target`.
    ///
    /// An absent entry is treated as read lag, not as an answer. `deadline`
    /// is checked against the ledger's own clock after each unsuccessful
    /// poll.
    pub async fn await_confirmation(
        &self,
        adapter: &dyn LedgerAdapter,
        swap_id: SwapId,
        target: ConfirmationTarget,
        deadline: Option<u64>,
    ) -> Confirmation {
        let side = adapter.side();
        let mut last_seen = String::from("nothing observed");

        for attempt in 0..self.policy.max_attempts {
            match adapter.query(swap_id).await {
                Ok(Some(view)) => {
                    if reached(target, &view) {
                        debug!(%side, %target, attempt, "[xl-swap] confirmed");
                        return Confirmation::Confirmed(view);
                    }
                    if let Some(reason) = diverged(target, &view) {
                        return Confirmation::Failed(reason);
                    }
                    last_seen = format!("entry present, waiting for {target}");
                }
                Ok(None) => last_seen = "entry not visible yet".into(),
                Err(e) if e.is_transient() => {
                    warn!(%side, error = %e, attempt, "[xl-swap] poll failed, retrying");
                    last_seen = e.to_string();
                }
                Err(e) => return Confirmation::Failed(e.to_string()),
            }

            if let Some(deadline) = deadline {
                if let Ok(now) = adapter.current_time().await {
                    if now > deadline {
                        return Confirmation::Expired;
                    }
                }
            }
            tokio::time::sleep(self.policy.delay_for(attempt)).await;
        }

        Confirmation::Failed(format!(
            "{target} not observed on {side} after {} polls: {last_seen}",
            self.policy.max_attempts
        ))
    }

    /// Run [`Self::await_confirmation`] as its own task and report through
    /// a one-shot channel.
    pub fn spawn_confirmation(
        &self,
        adapter: Arc<dyn LedgerAdapter>,
        swap_id: SwapId,
        target: ConfirmationTarget,
        deadline: Option<u64>,
    ) -> oneshot::Receiver<Confirmation> {
        let (tx, rx) = oneshot::channel();
        let monitor = self.clone();
        tokio::spawn(async move {
            let outcome = monitor
                .await_confirmation(adapter.as_ref(), swap_id, target, deadline)
                .await;
            // Receiver gone means the swap stopped caring.
            let _ = tx.send(outcome);
        });
        rx
    }

    /// Wait until the secret for `swap_id` is public on this ledger.
    ///
    /// Listens to the event stream where there is one and polls the ledger
    /// in between. Candidates that do not hash to `hashlock` are ignored.
    pub async fn await_secret_reveal(
        &self,
        adapter: &dyn LedgerAdapter,
        swap_id: SwapId,
        hashlock: &Hash,
        payout_hash: PayoutHash,
        deadline: Option<u64>,
    ) -> Option<SecureSecret> {
        let side = adapter.side();
        let mut events = adapter.events();

        for attempt in 0..self.policy.max_attempts {
            match adapter.revealed_secret(swap_id).await {
                Ok(Some(secret)) => {
                    if verify_secret(secret.as_bytes(), hashlock, payout_hash) {
                        return Some(secret);
                    }
                    warn!(%side, "[xl-swap] revealed secret does not match hashlock");
                }
                Ok(None) => {}
                Err(e) => debug!(%side, error = %e, "[xl-swap] secret lookup failed"),
            }

            if let Some(deadline) = deadline {
                if let Ok(now) = adapter.current_time().await {
                    if now > deadline {
                        return None;
                    }
                }
            }

            let delay = self.policy.delay_for(attempt);
            let mut closed = false;
            match events.as_mut() {
                Some(rx) => {
                    match tokio::time::timeout(delay, next_reveal(rx, adapter, swap_id)).await {
                        Ok(Some(secret)) => {
                            if verify_secret(secret.as_bytes(), hashlock, payout_hash) {
                                return Some(secret);
                            }
                        }
                        Ok(None) => closed = true,
                        Err(_) => {}
                    }
                }
                None => tokio::time::sleep(delay).await,
            }
            if closed {
                events = None;
            }
        }
        None
    }

    /// Sleep until the ledger's clock is strictly past `instant`.
    ///
    /// Returns the ledger time observed. Fails once consecutive clock reads
    /// exhaust the retry budget.
    pub async fn await_ledger_time(&self, adapter: &dyn LedgerAdapter, instant: u64) -> SwapResult<u64> {
        let side = adapter.side();
        let mut failures = 0u32;
        loop {
            match adapter.current_time().await {
                Ok(now) if now > instant => return Ok(now),
                Ok(now) => {
                    failures = 0;
                    let remaining = Duration::from_secs(instant - now + 1);
                    debug!(%side, now, instant, "[xl-swap] waiting for ledger time");
                    tokio::time::sleep(remaining.min(EXPIRY_RECHECK)).await;
                }
                Err(e) if e.is_transient() && failures + 1 < self.policy.max_attempts => {
                    warn!(%side, error = %e, "[xl-swap] clock read failed, retrying");
                    tokio::time::sleep(self.policy.delay_for(failures)).await;
                    failures += 1;
                }
                Err(e) => return Err(SwapError::from_ledger(side, e)),
            }
        }
    }

    /// Read an entry, riding out read lag and transient failures.
    ///
    /// `Ok(None)` means the ledger consistently reported no entry.
    pub async fn observe(
        &self,
        adapter: &dyn LedgerAdapter,
        swap_id: SwapId,
    ) -> SwapResult<Option<SwapView>> {
        let side: LedgerSide = adapter.side();
        let mut answered = false;
        let mut last_error = None;
        for attempt in 0..self.policy.max_attempts {
            match adapter.query(swap_id).await {
                Ok(Some(view)) => return Ok(Some(view)),
                Ok(None) => answered = true,
                Err(e) if e.is_transient() => last_error = Some(e),
                Err(e) => return Err(SwapError::from_ledger(side, e)),
            }
            tokio::time::sleep(self.policy.delay_for(attempt)).await;
        }
        match (answered, last_error) {
            (false, Some(e)) => Err(SwapError::from_ledger(side, e)),
            _ => Ok(None),
        }
    }
}

fn reached(target: ConfirmationTarget, view: &SwapView) -> bool {
    match target {
        ConfirmationTarget::Locked => true,
        ConfirmationTarget::Completed => view.completed,
        ConfirmationTarget::Refunded => view.refunded,
    }
}

fn diverged(target: ConfirmationTarget, view: &SwapView) -> Option<String> {
    match target {
        ConfirmationTarget::Completed if view.refunded => {
            Some("entry was refunded instead of completed".into())
        }
        ConfirmationTarget::Refunded if view.completed => {
            Some("entry was completed instead of refunded".into())
        }
        _ => None,
    }
}

async fn next_reveal(
    rx: &mut broadcast::Receiver<EscrowEvent>,
    adapter: &dyn LedgerAdapter,
    swap_id: SwapId,
) -> Option<SecureSecret> {
    loop {
        match rx.recv().await {
            Ok(event) => {
                if let Some(LedgerEvent::Completed {
                    swap_id: id,
                    secret,
                    ..
                }) = adapter.decode_event(&event)
                {
                    if id == swap_id {
                        return Some(secret);
                    }
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!(skipped, "[xl-swap] event stream lagged");
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}
