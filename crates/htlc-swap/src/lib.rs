//! # Crosslock HTLC Swap Coordinator
//!
//! Coordinates hash time-locked swaps between an EVM ledger and a
//! NEAR-style ledger.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! Move value across two ledgers that share no trust:
//! - One secret, one SHA-256 hashlock, recorded on both escrows
//! - Destination timelock strictly earlier than source, by a safety margin
//! - Secret revealed only by paying out the destination
//! - Every lock ends completed or refunded on its own ledger's clock
//!
//! ## Safety Rules
//!
//! | Rule | Enforcement |
//! |------|-------------|
//! | Timelock ordering | `destination < source - margin`, margin >= 30 min |
//! | Ledger bounds | Each timelock inside its own ledger's window |
//! | Payout hash | Both ledgers must apply the same hash, else refuse |
//! | Refund timing | Only after expiry on the refunding ledger's clock |
//! | Secret custody | Zeroized on drop, never serialized into status |
//!
//! ## Module Structure
//!
//! ```text
//! htlc-swap/
//! ├── domain/          # Swap record, phases, errors, invariants
//! ├── algorithms/      # Secrets, timelocks, per-ledger swap ids
//! ├── ports/           # SwapApi, LedgerAdapter, EscrowProgram, Signer
//! ├── adapters/        # Ledger dialects, escrow adapter, signers, quotes
//! ├── application/     # Service, orchestrator, monitor, refunds
//! ├── config.rs        # SwapConfig, RetryPolicy
//! └── metrics.rs       # Prometheus metrics (feature "metrics")
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod metrics;
pub mod ports;

// Re-exports
pub use adapters::{
    EscrowLedgerAdapter, EvmDialect, FixedRatePriceSource, LedgerProfile, NearDialect,
    QuoteAdapter, Secp256k1Signer, Ed25519Signer, SimulatedEscrow,
};
pub use algorithms::{create_hashlock, generate_secret, verify_secret, CommitmentGenerator, PayoutHash};
pub use application::{PhaseOrchestrator, StateMonitor, SwapService};
pub use config::{RetryPolicy, SwapConfig};
pub use domain::{
    Asset, LedgerError, LedgerKind, LedgerSide, PerLedger, Quote, SecureSecret, SwapError,
    SwapId, SwapPhase, SwapRecord, SwapRequest, SwapResult, SwapStatus, SwapView,
    TimelockBounds, TimelockRequest, MIN_SAFETY_MARGIN_SECS,
};
pub use ports::{EscrowProgram, LedgerAdapter, PriceSource, Signer, SwapApi};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
