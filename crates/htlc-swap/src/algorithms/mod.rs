//! # Algorithms Module
//!
//! Pure swap computations: secrets, timelocks, swap ids.

pub mod commitment;
pub mod secret;
pub mod swap_id;
pub mod timelock;

pub use commitment::CommitmentGenerator;
pub use secret::{create_hashlock, generate_secret, verify_secret, PayoutHash};
pub use swap_id::{
    derive_swap_id, scheme_for, KeccakPackedScheme, Sha256BorshScheme, SwapIdScheme,
};
pub use timelock::{compute_timelocks, lock_headroom, safety_margin, LedgerClock};
