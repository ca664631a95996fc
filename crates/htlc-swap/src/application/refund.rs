//! # Refund / Timeout Manager
//!
//! Returns outstanding locks to their lockers once each has expired on its
//! own ledger. Destination first, then source: the destination expires
//! earlier, and a destination found completed means the secret is public
//! and the source should be completed rather than refunded.
//!
//! A pass settles each side on its own. A side whose ledger cannot be
//! reached is reported as unresolved and does not stop the other side,
//! unless the secret may already be public on the destination.

use super::monitor::StateMonitor;
use crate::algorithms::PayoutHash;
use crate::domain::{
    Hash, LedgerError, LedgerSide, PerLedger, SecureSecret, SwapError, SwapId, SwapRecord,
    SwapResult, TxRef,
};
use crate::metrics;
use crate::ports::LedgerAdapter;
use std::sync::Arc;
use tracing::{error, info, warn};

/// What the refund manager needs to know about a swap.
#[derive(Clone, Debug)]
pub struct RefundPlan {
    /// Swap id on each ledger
    pub swap_ids: PerLedger<SwapId>,
    /// Shared hashlock
    pub hashlock: Hash,
    /// Expiry on each ledger (unix seconds)
    pub timelocks: PerLedger<u64>,
    /// Sides where a lock may exist
    pub lock_submitted: PerLedger<bool>,
    /// The secret was sent to the destination and may be public there
    pub secret_submitted: bool,
    /// Payout hash both ledgers apply
    pub payout_hash: PayoutHash,
}

impl RefundPlan {
    /// Plan for `record`.
    pub fn for_record(record: &SwapRecord, payout_hash: PayoutHash) -> Self {
        Self {
            swap_ids: record.swap_ids.clone(),
            hashlock: record.hashlock,
            timelocks: record.timelocks.clone(),
            lock_submitted: record.lock_submitted.clone(),
            secret_submitted: record.secret_submitted,
            payout_hash,
        }
    }

    /// Same plan restricted to `sides`.
    pub fn only(&self, sides: &[LedgerSide]) -> Self {
        let mut plan = self.clone();
        for side in LedgerSide::REFUND_ORDER {
            *plan.lock_submitted.get_mut(side) = sides.contains(&side);
        }
        plan
    }
}

/// Outcome of a refund pass.
#[derive(Clone, Debug, Default)]
pub struct RefundReport {
    /// Refund transactions submitted, in order
    pub refunded: Vec<(LedgerSide, TxRef)>,
    /// Anomalies seen along the way
    pub anomalies: Vec<String>,
    /// The destination was paid out: the source must be completed, not
    /// refunded.
    pub destination_completed: bool,
    /// Secret read back from the destination, when it could be observed.
    pub complete_source_with: Option<SecureSecret>,
    /// Sides this pass could not settle, with the reason.
    pub unresolved: Vec<(LedgerSide, SwapError)>,
}

impl RefundReport {
    /// Every side was settled.
    pub fn is_settled(&self) -> bool {
        self.unresolved.is_empty() && !self.destination_completed
    }

    /// Sides left for a later pass.
    pub fn unresolved_sides(&self) -> Vec<LedgerSide> {
        self.unresolved.iter().map(|(side, _)| *side).collect()
    }
}

enum RefundStep {
    Refunded(TxRef),
    AlreadyRefunded,
    CompletedElsewhere,
}

enum SideOutcome {
    Settled,
    DestinationCompleted,
}

/// Drives refunds for swaps in `Refunding`.
#[derive(Clone, Debug)]
pub struct RefundManager {
    monitor: StateMonitor,
}

impl RefundManager {
    /// Manager polling through `monitor`.
    pub fn new(monitor: StateMonitor) -> Self {
        Self { monitor }
    }

    /// One pass over every outstanding lock in `plan`.
    pub async fn refund_outstanding(
        &self,
        adapters: &PerLedger<Arc<dyn LedgerAdapter>>,
        plan: &RefundPlan,
    ) -> RefundReport {
        let mut report = RefundReport::default();

        for side in LedgerSide::REFUND_ORDER {
            if !*plan.lock_submitted.get(side) {
                continue;
            }
            if side == LedgerSide::Source && plan.secret_submitted {
                // The destination may have paid out; its fate decides this side.
                if let Some((_, cause)) = report
                    .unresolved
                    .iter()
                    .find(|(s, _)| *s == LedgerSide::Destination)
                {
                    let cause = cause.clone();
                    warn!(error = %cause, "[xl-swap] source refund deferred, destination state unknown");
                    report.unresolved.push((side, cause));
                    continue;
                }
            }

            match self
                .settle_side(adapters.get(side).as_ref(), side, plan, &mut report)
                .await
            {
                Ok(SideOutcome::Settled) => {}
                Ok(SideOutcome::DestinationCompleted) => {
                    report.destination_completed = true;
                    return report;
                }
                Err(e) => {
                    warn!(%side, error = %e, "[xl-swap] refund left unresolved");
                    report.unresolved.push((side, e));
                }
            }
        }
        report
    }

    async fn settle_side(
        &self,
        adapter: &dyn LedgerAdapter,
        side: LedgerSide,
        plan: &RefundPlan,
        report: &mut RefundReport,
    ) -> SwapResult<SideOutcome> {
        let swap_id = *plan.swap_ids.get(side);

        let Some(view) = self.monitor.observe(adapter, swap_id).await? else {
            info!(%side, "[xl-swap] no lock on ledger, nothing to refund");
            return Ok(SideOutcome::Settled);
        };
        if view.hashlock != plan.hashlock {
            return Err(SwapError::ProtocolInconsistency(format!(
                "{side} entry carries a different hashlock"
            )));
        }
        if view.refunded {
            info!(%side, "[xl-swap] lock already refunded");
            return Ok(SideOutcome::Settled);
        }
        if view.completed {
            return Ok(self.paid_out(adapter, side, plan, report).await);
        }

        match self.refund_one(adapter, swap_id, view.timelock, report).await? {
            RefundStep::Refunded(tx) => report.refunded.push((side, tx)),
            RefundStep::AlreadyRefunded => {}
            RefundStep::CompletedElsewhere => {
                return Ok(self.paid_out(adapter, side, plan, report).await)
            }
        }
        Ok(SideOutcome::Settled)
    }

    async fn paid_out(
        &self,
        adapter: &dyn LedgerAdapter,
        side: LedgerSide,
        plan: &RefundPlan,
        report: &mut RefundReport,
    ) -> SideOutcome {
        if side == LedgerSide::Source {
            report
                .anomalies
                .push("source lock was completed while refunding".into());
            return SideOutcome::Settled;
        }
        info!("[xl-swap] destination completed, secret is public");
        report.complete_source_with = self
            .monitor
            .await_secret_reveal(
                adapter,
                *plan.swap_ids.get(side),
                &plan.hashlock,
                plan.payout_hash,
                None,
            )
            .await;
        SideOutcome::DestinationCompleted
    }

    async fn refund_one(
        &self,
        adapter: &dyn LedgerAdapter,
        swap_id: SwapId,
        timelock: u64,
        report: &mut RefundReport,
    ) -> SwapResult<RefundStep> {
        let side = adapter.side();
        let policy = self.monitor.policy();
        self.monitor.await_ledger_time(adapter, timelock).await?;

        let mut rechecked = false;
        let mut transient = 0u32;
        loop {
            match adapter.refund(swap_id).await {
                Ok(tx) => {
                    info!(%side, tx = %tx, "[xl-swap] refund submitted");
                    return Ok(RefundStep::Refunded(tx));
                }
                Err(LedgerError::AlreadyRefunded) => return Ok(RefundStep::AlreadyRefunded),
                Err(LedgerError::AlreadyCompleted) => return Ok(RefundStep::CompletedElsewhere),
                Err(LedgerError::NotYetExpired) => {
                    metrics::record_protocol_inconsistency();
                    let detail = format!(
                        "{side} refused refund as not expired after its clock passed {timelock}"
                    );
                    error!(%side, timelock, "[xl-swap] {detail}");
                    if rechecked {
                        return Err(SwapError::ProtocolInconsistency(detail));
                    }
                    report.anomalies.push(detail);
                    rechecked = true;
                    self.monitor.await_ledger_time(adapter, timelock).await?;
                }
                Err(e) if e.is_transient() && transient + 1 < policy.max_attempts => {
                    warn!(%side, error = %e, "[xl-swap] refund failed, retrying");
                    tokio::time::sleep(policy.delay_for(transient)).await;
                    transient += 1;
                    // The failed call may have landed.
                    if let Ok(Some(view)) = adapter.query(swap_id).await {
                        if view.refunded {
                            return Ok(RefundStep::AlreadyRefunded);
                        }
                    }
                }
                Err(e) => return Err(SwapError::from_ledger(side, e)),
            }
        }
    }
}
