//! # Timelock Selection
//!
//! Picks the source/destination expiry pair. Both values are unix seconds;
//! each ledger's bounds are applied against that ledger's own clock.

use crate::domain::{
    invariant_timelock_ordering, PerLedger, SwapError, SwapResult, TimelockBounds,
    TimelockRequest,
};

/// A ledger's clock reading and accepted timelock window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LedgerClock {
    /// Ledger time (unix seconds)
    pub now: u64,
    /// Accepted timelock window
    pub bounds: TimelockBounds,
}

/// Margin between the two expiries: the configured floor, or the time both
/// ledgers need to confirm a transaction, whichever is larger.
pub fn safety_margin(confirmation_latency_secs: &PerLedger<u64>, floor_secs: u64) -> u64 {
    floor_secs.max(
        confirmation_latency_secs
            .source
            .saturating_add(confirmation_latency_secs.destination),
    )
}

/// Ledger time that may pass between reading the clocks and a lock being
/// submitted. The destination lock waits for the source to confirm, so both
/// latencies count.
pub fn lock_headroom(confirmation_latency_secs: &PerLedger<u64>, floor_secs: u64) -> u64 {
    safety_margin(confirmation_latency_secs, floor_secs)
}

/// Choose the timelock pair for `request`.
///
/// Each timelock must sit at least `headroom_secs` above its ledger's
/// earliest accepted value, so it is still accepted when submitted later.
/// Relative requests are clamped into that window. If the pair then
/// violates the ordering, the destination is shrunk first and the source
/// extended second. Explicit requests are validated as given.
pub fn compute_timelocks(
    request: TimelockRequest,
    clocks: &PerLedger<LedgerClock>,
    margin_secs: u64,
    headroom_secs: u64,
) -> SwapResult<PerLedger<u64>> {
    let (src, dst) = (&clocks.source, &clocks.destination);
    let (src_lo, src_hi) = window(src, headroom_secs);
    let (dst_lo, dst_hi) = window(dst, headroom_secs);

    let (source, destination) = match request {
        TimelockRequest::Explicit {
            source,
            destination,
        } => (source, destination),
        TimelockRequest::Relative {
            source_secs,
            destination_secs,
        } => {
            let mut source = src
                .now
                .saturating_add(source_secs)
                .clamp(src_lo, src_hi.max(src_lo));
            let mut destination = dst
                .now
                .saturating_add(destination_secs)
                .clamp(dst_lo, dst_hi.max(dst_lo));

            let limit = source.saturating_sub(margin_secs);
            if destination >= limit {
                destination = limit.saturating_sub(1);
            }
            if destination < dst_lo || destination > dst_hi {
                destination = dst_lo;
                source = destination.saturating_add(margin_secs).saturating_add(1);
            }
            (source, destination)
        }
    };

    check_within(src, src_lo, source, "source")?;
    check_within(dst, dst_lo, destination, "destination")?;
    invariant_timelock_ordering(source, destination, margin_secs)?;
    Ok(PerLedger::new(source, destination))
}

fn window(clock: &LedgerClock, headroom_secs: u64) -> (u64, u64) {
    (
        clock.bounds.earliest(clock.now).saturating_add(headroom_secs),
        clock.bounds.latest(clock.now),
    )
}

fn check_within(clock: &LedgerClock, floor: u64, timelock: u64, side: &str) -> SwapResult<()> {
    let latest = clock.bounds.latest(clock.now);
    if timelock >= floor && timelock <= latest {
        return Ok(());
    }
    Err(SwapError::TimelockUnsatisfiable(format!(
        "{side} timelock {timelock} outside [{floor}, {latest}] (ledger window [{}, {latest}])",
        clock.bounds.earliest(clock.now),
    )))
}
