//! # Domain Value Objects
//!
//! Immutable value types shared by every layer of the coordinator.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ledger families the coordinator can talk to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LedgerKind {
    /// Account-based EVM ledger: 20-byte addresses, timestamps in seconds.
    Evm,
    /// NEAR-style ledger: 32-byte account keys, timestamps in nanoseconds.
    Near,
}

impl LedgerKind {
    /// Width of a canonical account identifier in bytes.
    pub fn address_width(&self) -> usize {
        match self {
            LedgerKind::Evm => 20,
            LedgerKind::Near => 32,
        }
    }

    /// Ledger-native time units per second.
    pub fn time_units_per_sec(&self) -> u64 {
        match self {
            LedgerKind::Evm => 1,
            LedgerKind::Near => 1_000_000_000,
        }
    }
}

impl fmt::Display for LedgerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerKind::Evm => f.write_str("evm"),
            LedgerKind::Near => f.write_str("near"),
        }
    }
}

/// Role a ledger plays in one swap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LedgerSide {
    /// Ledger where the initiator locks first.
    Source,
    /// Ledger where the counterparty locks second.
    Destination,
}

impl LedgerSide {
    /// Both sides, destination first (the order refunds become possible).
    pub const REFUND_ORDER: [LedgerSide; 2] = [LedgerSide::Destination, LedgerSide::Source];

    /// The opposite side.
    pub fn other(&self) -> LedgerSide {
        match self {
            LedgerSide::Source => LedgerSide::Destination,
            LedgerSide::Destination => LedgerSide::Source,
        }
    }
}

impl fmt::Display for LedgerSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerSide::Source => f.write_str("source"),
            LedgerSide::Destination => f.write_str("destination"),
        }
    }
}

/// A pair of values, one per side of the swap.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerLedger<T> {
    /// Value for the source ledger
    pub source: T,
    /// Value for the destination ledger
    pub destination: T,
}

impl<T> PerLedger<T> {
    /// Build from both sides.
    pub fn new(source: T, destination: T) -> Self {
        Self {
            source,
            destination,
        }
    }

    /// Borrow one side.
    pub fn get(&self, side: LedgerSide) -> &T {
        match side {
            LedgerSide::Source => &self.source,
            LedgerSide::Destination => &self.destination,
        }
    }

    /// Mutably borrow one side.
    pub fn get_mut(&mut self, side: LedgerSide) -> &mut T {
        match side {
            LedgerSide::Source => &mut self.source,
            LedgerSide::Destination => &mut self.destination,
        }
    }
}

/// Swap lifecycle phase.
///
/// ```text
/// Created -> SourceLocked -> DestinationLocked -> Completed
///               |                  |
///               +--> Refunding <---+--> Refunded
/// (any non-terminal) -> Failed
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwapPhase {
    /// Commitment generated, nothing submitted yet.
    #[default]
    Created,
    /// Source lock confirmed.
    SourceLocked,
    /// Destination lock confirmed.
    DestinationLocked,
    /// Both sides paid out.
    Completed,
    /// Waiting for timelocks to pass so locks can be reclaimed.
    Refunding,
    /// Every outstanding lock returned to its locker.
    Refunded,
    /// Stopped with an error; see the swap's error detail.
    Failed,
}

impl SwapPhase {
    /// Check if a transition is legal.
    pub fn can_transition_to(&self, next: SwapPhase) -> bool {
        use SwapPhase::*;
        match (self, next) {
            (Created, SourceLocked) => true,
            (SourceLocked, DestinationLocked) => true,
            (SourceLocked, Refunding) => true,
            (DestinationLocked, Completed) => true,
            (DestinationLocked, Refunding) => true,
            (Refunding, Refunded) => true,
            // Destination was completed by a third party while refunding;
            // the public secret lets the source side complete as well.
            (Refunding, Completed) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }

    /// Check if terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Refunded | Self::Failed)
    }

    /// Whether a lock has been confirmed on at least the source ledger.
    pub fn has_locked_funds(&self) -> bool {
        matches!(
            self,
            Self::SourceLocked | Self::DestinationLocked | Self::Refunding
        )
    }
}

impl fmt::Display for SwapPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SwapPhase::Created => "Created",
            SwapPhase::SourceLocked => "SourceLocked",
            SwapPhase::DestinationLocked => "DestinationLocked",
            SwapPhase::Completed => "Completed",
            SwapPhase::Refunding => "Refunding",
            SwapPhase::Refunded => "Refunded",
            SwapPhase::Failed => "Failed",
        };
        f.write_str(name)
    }
}

/// Ledger transaction reference (hash or receipt id, ledger formatted).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxRef(pub String);

impl fmt::Display for TxRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of ledger call recorded in a swap's history.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxKind {
    /// Token allowance grant
    Approve,
    /// Escrow lock
    Lock,
    /// Payout with the secret
    Complete,
    /// Return to locker after expiry
    Refund,
}

/// Window of timelocks a ledger accepts, relative to its own clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelockBounds {
    /// Minimum distance from now, in seconds (exclusive).
    pub min_secs: u64,
    /// Maximum distance from now, in seconds (inclusive).
    pub max_secs: u64,
}

impl TimelockBounds {
    /// Create bounds.
    pub const fn new(min_secs: u64, max_secs: u64) -> Self {
        Self { min_secs, max_secs }
    }

    /// Earliest acceptable timelock given the ledger's current time.
    pub fn earliest(&self, now: u64) -> u64 {
        now.saturating_add(self.min_secs).saturating_add(1)
    }

    /// Latest acceptable timelock given the ledger's current time.
    pub fn latest(&self, now: u64) -> u64 {
        now.saturating_add(self.max_secs)
    }

    /// Whether `timelock` is accepted when the ledger reads `now`.
    pub fn contains(&self, now: u64, timelock: u64) -> bool {
        timelock >= self.earliest(now) && timelock <= self.latest(now)
    }

    /// Pull `timelock` into the accepted window.
    pub fn clamp(&self, now: u64, timelock: u64) -> u64 {
        timelock.clamp(self.earliest(now), self.latest(now).max(self.earliest(now)))
    }
}

/// What the monitor waits for on a ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfirmationTarget {
    /// Lock exists and is durable.
    Locked,
    /// Swap shows completed.
    Completed,
    /// Swap shows refunded.
    Refunded,
}

impl fmt::Display for ConfirmationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfirmationTarget::Locked => f.write_str("locked"),
            ConfirmationTarget::Completed => f.write_str("completed"),
            ConfirmationTarget::Refunded => f.write_str("refunded"),
        }
    }
}
