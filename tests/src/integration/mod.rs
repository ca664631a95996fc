//! End-to-end swap tests against the simulated escrows.

mod concurrency;
mod properties;
mod safety;
mod scenarios;
