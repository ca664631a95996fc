//! # Domain Invariants
//!
//! Checks that hold for every swap regardless of ledger.

use super::entities::SwapView;
use super::errors::{Hash, SwapError, SwapResult};

/// Floor for the gap between destination and source expiry (30 minutes).
pub const MIN_SAFETY_MARGIN_SECS: u64 = 30 * 60;

/// Destination must expire strictly before source minus the safety margin.
///
/// Leaves the counterparty time to complete the source lock after the
/// secret becomes public on the destination ledger.
pub fn invariant_timelock_ordering(
    source_timelock: u64,
    destination_timelock: u64,
    safety_margin_secs: u64,
) -> SwapResult<()> {
    let ordered = source_timelock
        .checked_sub(safety_margin_secs)
        .is_some_and(|limit| destination_timelock < limit);
    if !ordered {
        return Err(SwapError::TimelockUnsatisfiable(format!(
            "destination {destination_timelock} must be before source {source_timelock} minus margin {safety_margin_secs}"
        )));
    }
    Ok(())
}

/// Both ledgers must record the same hashlock.
pub fn invariant_hashlock_match(source: &Hash, destination: &Hash) -> bool {
    source == destination
}

/// A ledger snapshot must agree with what the coordinator submitted.
pub fn invariant_view_matches(view: &SwapView, hashlock: &Hash, timelock: u64) -> SwapResult<()> {
    if &view.hashlock != hashlock {
        return Err(SwapError::ProtocolInconsistency(format!(
            "ledger reports hashlock {} but {} was locked",
            hex::encode(view.hashlock),
            hex::encode(hashlock)
        )));
    }
    if view.timelock != timelock {
        return Err(SwapError::ProtocolInconsistency(format!(
            "ledger reports timelock {} but {} was locked",
            view.timelock, timelock
        )));
    }
    Ok(())
}

/// Refund is only valid strictly after expiry on a lock that still holds funds.
pub fn invariant_refund_allowed(view: &SwapView, ledger_now: u64) -> bool {
    view.is_outstanding() && ledger_now > view.timelock
}
