//! # Crosslock Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── harness.rs        # Two simulated ledgers wired into a SwapService
//! │
//! └── integration/      # End-to-end swap behaviour
//!     ├── scenarios.rs  # Happy path, source-only refund, invalid secret, bad timelocks
//!     ├── safety.rs     # Atomicity, idempotent payout, refund safety
//!     ├── concurrency.rs# Many swaps at once, cancellation, flaky ledgers
//!     └── properties.rs # proptest: timelock ordering, swap id determinism
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p swap-tests
//!
//! # By category
//! cargo test -p swap-tests integration::scenarios::
//! cargo test -p swap-tests integration::properties::
//!
//! # Benchmarks
//! cargo bench -p swap-tests
//! ```

#![allow(dead_code)]

pub mod harness;
pub mod integration;
