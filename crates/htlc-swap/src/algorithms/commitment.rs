//! # Commitment Generation
//!
//! Produces the secret, hashlock and timelock pair for a new swap.

use super::secret::{create_hashlock, generate_secret, PayoutHash};
use super::timelock::{compute_timelocks, lock_headroom, safety_margin, LedgerClock};
use crate::domain::{Commitment, PerLedger, SwapError, SwapResult, TimelockRequest};
use tracing::debug;

/// Generates swap commitments for one ledger pair.
#[derive(Clone, Debug)]
pub struct CommitmentGenerator {
    payout_hash: PayoutHash,
    min_margin_secs: u64,
    min_headroom_secs: u64,
}

impl CommitmentGenerator {
    /// Generator for ledgers that both pay out under `payout_hash`.
    pub fn new(payout_hash: PayoutHash, min_margin_secs: u64) -> Self {
        Self {
            payout_hash,
            min_margin_secs,
            min_headroom_secs: 0,
        }
    }

    /// Require at least `secs` of submission headroom above each ledger's
    /// earliest accepted timelock, even where latencies suggest less.
    pub fn with_lock_headroom(mut self, secs: u64) -> Self {
        self.min_headroom_secs = secs;
        self
    }

    /// Generator for a ledger pair; fails closed if they disagree on the
    /// payout hash.
    pub fn for_ledgers(
        payout_hashes: &PerLedger<PayoutHash>,
        min_margin_secs: u64,
    ) -> SwapResult<Self> {
        if payout_hashes.source != payout_hashes.destination {
            return Err(SwapError::Validation(format!(
                "ledgers disagree on payout hash: source {} vs destination {}",
                payout_hashes.source, payout_hashes.destination
            )));
        }
        Ok(Self::new(payout_hashes.source, min_margin_secs))
    }

    /// Payout hash in use.
    pub fn payout_hash(&self) -> PayoutHash {
        self.payout_hash
    }

    /// Build a commitment. Timelocks are chosen first so an unsatisfiable
    /// request never produces a secret.
    pub fn generate(
        &self,
        request: TimelockRequest,
        clocks: &PerLedger<LedgerClock>,
        confirmation_latency_secs: &PerLedger<u64>,
    ) -> SwapResult<Commitment> {
        let margin = safety_margin(confirmation_latency_secs, self.min_margin_secs);
        let headroom = lock_headroom(confirmation_latency_secs, self.min_headroom_secs);
        let timelocks = compute_timelocks(request, clocks, margin, headroom)?;

        let secret = generate_secret();
        let hashlock = create_hashlock(&secret, self.payout_hash);
        debug!(
            source_timelock = timelocks.source,
            destination_timelock = timelocks.destination,
            margin,
            headroom,
            "[xl-swap] commitment generated"
        );

        Ok(Commitment {
            secret,
            hashlock,
            timelocks,
            safety_margin_secs: margin,
        })
    }
}
