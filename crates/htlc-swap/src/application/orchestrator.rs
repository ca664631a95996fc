//! # Phase Orchestrator
//!
//! Drives one swap through its phases:
//!
//! ```text
//! Created ──lock source──► SourceLocked ──lock destination──► DestinationLocked
//!    │                          │                                   │
//!    ▼                          ▼                                   ▼
//!  Failed                   Refunding ◄──── completion failed ── complete both
//!                               │                                   │
//!                               ├──► Refunded                       ▼
//!                               └──► Completed (secret public)  Completed
//! ```
//!
//! The orchestrator is the only writer of its swap's phase, apart from
//! operator cancellation before any lock was submitted.

use super::monitor::{Confirmation, StateMonitor};
use super::refund::{RefundManager, RefundPlan};
use crate::algorithms::PayoutHash;
use crate::config::{RetryPolicy, SwapConfig};
use crate::domain::{
    invariant_view_matches, ConfirmationTarget, LedgerError, LedgerSide, PerLedger,
    SecureSecret, SwapError, SwapPhase, SwapRecord, TxKind, TxRef,
};
use crate::metrics;
use crate::ports::{LedgerAdapter, LockParams};
use parking_lot::RwLock;
use std::future::Future;
use std::sync::Arc;
use swap_telemetry::log_swap_event;
use tokio::sync::watch;
use tracing::{debug, error};

/// Swap record shared between the orchestrator task and status readers.
pub type SharedRecord = Arc<RwLock<SwapRecord>>;

enum Step {
    Advance(SwapPhase),
    Fail(String),
}

enum LockOutcome {
    Submitted(TxRef),
    /// An earlier attempt landed; its transaction is unknown.
    Landed,
}

/// Runs one swap to a terminal phase.
pub struct PhaseOrchestrator {
    adapters: PerLedger<Arc<dyn LedgerAdapter>>,
    monitor: StateMonitor,
    refunds: RefundManager,
    policy: RetryPolicy,
    payout_hash: PayoutHash,
    record: SharedRecord,
    phase_tx: Arc<watch::Sender<SwapPhase>>,
}

impl PhaseOrchestrator {
    /// Orchestrator for `record`, publishing phase changes on `phase_tx`.
    pub fn new(
        adapters: PerLedger<Arc<dyn LedgerAdapter>>,
        config: &SwapConfig,
        payout_hash: PayoutHash,
        record: SharedRecord,
        phase_tx: Arc<watch::Sender<SwapPhase>>,
    ) -> Self {
        let monitor = StateMonitor::new(config.retry.clone());
        Self {
            adapters,
            refunds: RefundManager::new(monitor.clone()),
            monitor,
            policy: config.retry.clone(),
            payout_hash,
            record,
            phase_tx,
        }
    }

    /// Drive the swap until it reaches a terminal phase.
    pub async fn run(self) -> SwapPhase {
        loop {
            let phase = self.record.read().phase;
            let step = match phase {
                SwapPhase::Created => self.lock_source().await,
                SwapPhase::SourceLocked => self.lock_destination().await,
                SwapPhase::DestinationLocked => self.complete().await,
                SwapPhase::Refunding => self.refund().await,
                SwapPhase::Completed | SwapPhase::Refunded | SwapPhase::Failed => {
                    metrics::record_swap_finished(&phase.to_string());
                    return phase;
                }
            };
            self.apply(step);
        }
    }

    fn swap_hex(&self) -> String {
        self.record.read().id_hex()
    }

    fn apply(&self, step: Step) {
        let mut record = self.record.write();
        if record.phase.is_terminal() {
            // Cancelled while the step ran.
            debug!(swap = %record.id_hex(), phase = %record.phase, "[xl-swap] step result dropped");
            self.phase_tx.send_replace(record.phase);
            return;
        }
        let from = record.phase;
        let result = match step {
            Step::Advance(next) => record.transition_to(next),
            Step::Fail(detail) => record.fail(detail),
        };
        if let Err(e) = result {
            error!(swap = %record.id_hex(), error = %e, "[xl-swap] illegal step, failing swap");
            let _ = record.fail(e.to_string());
        }
        let to = record.phase;
        metrics::record_phase_transition(&to.to_string());
        log_swap_event!(
            info,
            record.id_hex(),
            "phase transition",
            correlation_id = %record.correlation_id,
            from = %from,
            to = %to,
            detail = record.error_detail.as_deref().unwrap_or("")
        );
        self.phase_tx.send_replace(to);
    }

    fn record_tx(&self, side: LedgerSide, kind: TxKind, tx: TxRef) {
        let mut record = self.record.write();
        if let Err(e) = record.record_tx(side, kind, tx) {
            debug!(error = %e, "[xl-swap] tx not recorded");
        }
    }

    fn note(&self, detail: String) {
        let mut record = self.record.write();
        let _ = record.note(detail);
    }

    fn lock_params(record: &SwapRecord, side: LedgerSide) -> LockParams {
        LockParams {
            swap_id: *record.swap_ids.get(side),
            hashlock: record.hashlock,
            recipient: record.recipients.get(side).clone(),
            amount: *record.amounts.get(side),
            timelock: *record.timelocks.get(side),
        }
    }

    /// Retry `op` while it fails transiently, within the policy's budget.
    async fn retry_ledger<T, F, Fut>(&self, side: LedgerSide, op_name: &str, mut op: F) -> Result<T, LedgerError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LedgerError>>,
    {
        let mut attempt = 0u32;
        loop {
            match op().await {
                Err(e) if e.is_transient() && attempt + 1 < self.policy.max_attempts => {
                    log_swap_event!(
                        warn,
                        self.swap_hex(),
                        "ledger call failed, retrying",
                        side = %side,
                        op = op_name,
                        error = %e
                    );
                    tokio::time::sleep(self.policy.delay_for(attempt)).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    /// Submit a lock, granting an allowance once if the ledger asks for it.
    /// Transient failures are retried, checking first whether the failed
    /// call landed anyway.
    async fn submit_lock(&self, side: LedgerSide, params: LockParams) -> Result<LockOutcome, LedgerError> {
        let adapter = self.adapters.get(side).as_ref();
        let amount = params.amount;
        let mut approved = false;
        let mut attempt = 0u32;
        let mut uncertain = false;
        loop {
            match adapter.lock(params.clone()).await {
                Ok(tx) => return Ok(LockOutcome::Submitted(tx)),
                Err(LedgerError::AllowanceRequired) if !approved => {
                    approved = true;
                    let tx = self
                        .retry_ledger(side, "approve", move || adapter.approve(amount))
                        .await?;
                    self.record_tx(side, TxKind::Approve, tx);
                }
                Err(LedgerError::AlreadyLocked) if uncertain => return Ok(LockOutcome::Landed),
                Err(e) if e.is_transient() && attempt + 1 < self.policy.max_attempts => {
                    uncertain = true;
                    tokio::time::sleep(self.policy.delay_for(attempt)).await;
                    attempt += 1;
                    if let Ok(Some(_)) = adapter.query(params.swap_id).await {
                        return Ok(LockOutcome::Landed);
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn confirm(
        &self,
        side: LedgerSide,
        target: ConfirmationTarget,
        deadline: Option<u64>,
    ) -> Confirmation {
        let swap_id = *self.record.read().swap_ids.get(side);
        let rx = self.monitor.spawn_confirmation(
            self.adapters.get(side).clone(),
            swap_id,
            target,
            deadline,
        );
        rx.await
            .unwrap_or_else(|_| Confirmation::Failed("confirmation task dropped".into()))
    }

    async fn lock_source(&self) -> Step {
        let params = {
            let mut record = self.record.write();
            if record.cancel_requested {
                return Step::Fail("cancelled by operator".into());
            }
            record.lock_submitted.source = true;
            Self::lock_params(&record, LedgerSide::Source)
        };
        let timelock = params.timelock;
        let hashlock = params.hashlock;

        match self.submit_lock(LedgerSide::Source, params).await {
            Ok(LockOutcome::Submitted(tx)) => self.record_tx(LedgerSide::Source, TxKind::Lock, tx),
            Ok(LockOutcome::Landed) => {}
            Err(e) => {
                return Step::Fail(format!(
                    "source lock failed: {}",
                    SwapError::from_ledger(LedgerSide::Source, e)
                ))
            }
        }

        match self
            .confirm(LedgerSide::Source, ConfirmationTarget::Locked, Some(timelock))
            .await
        {
            Confirmation::Confirmed(view) => {
                if let Err(e) = invariant_view_matches(&view, &hashlock, timelock) {
                    metrics::record_protocol_inconsistency();
                    return Step::Fail(e.to_string());
                }
                self.record.write().lock_confirmed.source = true;
                Step::Advance(SwapPhase::SourceLocked)
            }
            Confirmation::Expired => {
                let swap_id = *self.record.read().swap_ids.get(LedgerSide::Source);
                match self.monitor.observe(self.adapters.source.as_ref(), swap_id).await {
                    // Too late to continue, but funds are locked; refund them.
                    Ok(Some(_)) => {
                        self.record.write().lock_confirmed.source = true;
                        Step::Advance(SwapPhase::SourceLocked)
                    }
                    _ => Step::Fail("source lock not observed before its timelock expired".into()),
                }
            }
            Confirmation::Failed(reason) => Step::Fail(format!(
                "source lock unconfirmed, may still be pending until {timelock}: {reason}"
            )),
        }
    }

    async fn lock_destination(&self) -> Step {
        let params = {
            let mut record = self.record.write();
            record.lock_submitted.destination = true;
            Self::lock_params(&record, LedgerSide::Destination)
        };
        let timelock = params.timelock;
        let hashlock = params.hashlock;

        match self.submit_lock(LedgerSide::Destination, params).await {
            Ok(LockOutcome::Submitted(tx)) => {
                self.record_tx(LedgerSide::Destination, TxKind::Lock, tx)
            }
            Ok(LockOutcome::Landed) => {}
            Err(e) => {
                self.note(format!(
                    "destination lock failed: {}",
                    SwapError::from_ledger(LedgerSide::Destination, e)
                ));
                return Step::Advance(SwapPhase::Refunding);
            }
        }

        match self
            .confirm(LedgerSide::Destination, ConfirmationTarget::Locked, Some(timelock))
            .await
        {
            Confirmation::Confirmed(view) => {
                if let Err(e) = invariant_view_matches(&view, &hashlock, timelock) {
                    metrics::record_protocol_inconsistency();
                    self.note(e.to_string());
                    return Step::Advance(SwapPhase::Refunding);
                }
                self.record.write().lock_confirmed.destination = true;
                Step::Advance(SwapPhase::DestinationLocked)
            }
            Confirmation::Expired => {
                self.note("destination lock not observed before its timelock expired".into());
                Step::Advance(SwapPhase::Refunding)
            }
            Confirmation::Failed(reason) => {
                self.note(format!("destination lock unconfirmed: {reason}"));
                Step::Advance(SwapPhase::Refunding)
            }
        }
    }

    async fn complete(&self) -> Step {
        let (swap_ids, secret, hashlock, timelocks) = {
            let mut record = self.record.write();
            record.secret_submitted = true;
            (
                record.swap_ids.clone(),
                record.secret.clone(),
                record.hashlock,
                record.timelocks.clone(),
            )
        };

        // Paying out the destination reveals the secret.
        let destination = self.adapters.destination.as_ref();
        let destination_id = swap_ids.destination;
        let secret_ref = &secret;
        match self
            .retry_ledger(LedgerSide::Destination, "complete", move || {
                destination.complete(destination_id, secret_ref)
            })
            .await
        {
            Ok(tx) => self.record_tx(LedgerSide::Destination, TxKind::Complete, tx),
            Err(LedgerError::AlreadyCompleted) => {}
            Err(e) => {
                self.note(format!(
                    "destination completion failed: {}",
                    SwapError::from_ledger(LedgerSide::Destination, e)
                ));
                return Step::Advance(SwapPhase::Refunding);
            }
        }

        match self
            .confirm(LedgerSide::Destination, ConfirmationTarget::Completed, None)
            .await
        {
            Confirmation::Confirmed(_) => {}
            Confirmation::Expired | Confirmation::Failed(_) => {
                self.note("destination completion unconfirmed".into());
                return Step::Advance(SwapPhase::Refunding);
            }
        }

        let public = self
            .monitor
            .await_secret_reveal(
                destination,
                destination_id,
                &hashlock,
                self.payout_hash,
                Some(timelocks.source),
            )
            .await;
        let payout = match public {
            Some(revealed) => revealed,
            None => {
                log_swap_event!(
                    warn,
                    self.swap_hex(),
                    "revealed secret not observed, completing source with held secret"
                );
                secret.clone()
            }
        };
        self.complete_source(payout).await
    }

    /// Ledger time on the source, once it is past `timelock`.
    async fn source_expired(&self, timelock: u64) -> Option<u64> {
        match self.adapters.source.current_time().await {
            Ok(now) if now > timelock => Some(now),
            _ => None,
        }
    }

    /// Claim the source with a secret that is already public.
    ///
    /// Transient failures are retried until the source ledger's own clock
    /// passes its timelock, not just within the retry budget.
    async fn complete_source(&self, secret: SecureSecret) -> Step {
        let (swap_id, timelock) = {
            let record = self.record.read();
            (record.swap_ids.source, record.timelocks.source)
        };
        let source = self.adapters.source.as_ref();
        let secret_ref = &secret;
        loop {
            match self
                .retry_ledger(LedgerSide::Source, "complete", move || {
                    source.complete(swap_id, secret_ref)
                })
                .await
            {
                Ok(tx) => {
                    self.record_tx(LedgerSide::Source, TxKind::Complete, tx);
                    break;
                }
                Err(LedgerError::AlreadyCompleted) => break,
                Err(e) if e.is_transient() => {
                    if let Ok(Some(view)) = source.query(swap_id).await {
                        if view.completed {
                            break;
                        }
                    }
                    if let Some(now) = self.source_expired(timelock).await {
                        return Step::Fail(format!(
                            "source lock expired at {timelock} (ledger time {now}) before completion landed: {}",
                            SwapError::from_ledger(LedgerSide::Source, e)
                        ));
                    }
                    log_swap_event!(
                        warn,
                        self.swap_hex(),
                        "source unreachable after secret reveal, retrying until its timelock",
                        timelock = timelock,
                        error = %e
                    );
                    tokio::time::sleep(self.policy.max_interval()).await;
                }
                Err(e) => {
                    return Step::Fail(format!(
                        "source completion failed after secret reveal, source lock open until {timelock}: {}",
                        SwapError::from_ledger(LedgerSide::Source, e)
                    ))
                }
            }
        }

        loop {
            match self
                .confirm(LedgerSide::Source, ConfirmationTarget::Completed, Some(timelock))
                .await
            {
                Confirmation::Confirmed(_) => return Step::Advance(SwapPhase::Completed),
                Confirmation::Expired => {
                    return match self.monitor.observe(source, swap_id).await {
                        Ok(Some(view)) if view.completed => Step::Advance(SwapPhase::Completed),
                        _ => Step::Fail(
                            "source completion not confirmed before its timelock expired".into(),
                        ),
                    }
                }
                Confirmation::Failed(reason) => {
                    match source.query(swap_id).await {
                        Ok(Some(view)) if view.completed => {
                            return Step::Advance(SwapPhase::Completed)
                        }
                        Ok(Some(view)) if view.refunded => {
                            return Step::Fail(format!("source lock refunded before completion: {reason}"))
                        }
                        _ => {}
                    }
                    if self.source_expired(timelock).await.is_some() {
                        return Step::Fail(format!("source completion not confirmed: {reason}"));
                    }
                    log_swap_event!(
                        warn,
                        self.swap_hex(),
                        "source completion unconfirmed, polling again",
                        reason = %reason
                    );
                    tokio::time::sleep(self.policy.max_interval()).await;
                }
            }
        }
    }

    /// Refund passes until every outstanding lock is settled.
    ///
    /// A side that cannot be reached is retried on later passes. An
    /// unconfirmed lock on an unreachable ledger is given up after the
    /// retry budget; a confirmed one, or any lock once the secret may be
    /// public, is retried for as long as it takes.
    async fn refund(&self) -> Step {
        let (mut plan, confirmed, held) = {
            let record = self.record.read();
            (
                RefundPlan::for_record(&record, self.payout_hash),
                record.lock_confirmed.clone(),
                record.secret.clone(),
            )
        };

        let mut pass = 0u32;
        loop {
            pass += 1;
            let mut report = self.refunds.refund_outstanding(&self.adapters, &plan).await;
            for (side, tx) in report.refunded.drain(..) {
                self.record_tx(side, TxKind::Refund, tx);
            }
            for anomaly in report.anomalies.drain(..) {
                self.note(anomaly);
            }
            if report.destination_completed {
                let secret = report.complete_source_with.take().unwrap_or(held);
                return self.complete_source(secret).await;
            }
            if report.is_settled() {
                return Step::Advance(SwapPhase::Refunded);
            }
            if let Some((side, e)) = report.unresolved.iter().find(|(_, e)| !e.is_transient()) {
                return Step::Fail(format!("refund failed on {side}: {e}"));
            }

            let sides = report.unresolved_sides();
            let blocking = plan.secret_submitted || sides.iter().any(|side| *confirmed.get(*side));
            if !blocking && pass >= self.policy.max_attempts {
                let detail = report
                    .unresolved
                    .iter()
                    .map(|(side, e)| format!("{side}: {e}"))
                    .collect::<Vec<_>>()
                    .join("; ");
                self.note(format!(
                    "gave up on unconfirmed lock after {pass} refund passes, ledger unreachable ({detail})"
                ));
                return Step::Advance(SwapPhase::Refunded);
            }

            log_swap_event!(
                warn,
                self.swap_hex(),
                "refund pass left locks outstanding, retrying",
                pass = pass,
                unresolved = ?sides
            );
            plan = plan.only(&sides);
            tokio::time::sleep(self.policy.max_interval()).await;
        }
    }
}
