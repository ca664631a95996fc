//! # Adapters Module
//!
//! Concrete implementations of the outbound ports.

pub mod dialect;
pub mod ledger;
pub mod quote;
pub mod signer;
pub mod sim_escrow;

pub use dialect::{EvmDialect, LedgerDialect, NearDialect, RejectionKind};
pub use ledger::{dialect_for, EscrowLedgerAdapter, LedgerProfile};
pub use quote::{rescale, FixedRatePriceSource, QuoteAdapter};
pub use signer::{Ed25519Signer, Secp256k1Signer};
pub use sim_escrow::SimulatedEscrow;
