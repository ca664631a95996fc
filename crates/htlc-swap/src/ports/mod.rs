//! # Ports Module
//!
//! Inbound (driving) and outbound (driven) interfaces.

pub mod inbound;
pub mod outbound;

pub use inbound::SwapApi;
pub use outbound::{
    CallAuth, EscrowEvent, EscrowFault, EscrowProgram, InitiateCall, LedgerAdapter, LedgerEvent,
    LockParams, PriceSource, RawSwapDetails, Signer, WireBytes,
};
