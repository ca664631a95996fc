//! # Swap Metrics
//!
//! Prometheus metrics for the swap coordinator.
//!
//! ## Usage
//!
//! Enable with the `metrics` feature:
//! ```toml
//! htlc-swap = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `xl_swaps_started_total` - Counter of swaps accepted by `initiate`
//! - `xl_swap_phase_transitions_total` - Counter of phase transitions (by phase)
//! - `xl_swaps_finished_total` - Counter of swaps reaching a terminal phase (by phase)
//! - `xl_ledger_call_failures_total` - Counter of failed ledger calls (by ledger, reason)
//! - `xl_protocol_inconsistencies_total` - Counter of ledger answers that contradicted earlier observations
//! - `xl_active_swaps` - Gauge of swaps not yet terminal

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{
    register_counter_vec, register_gauge, register_int_counter, CounterVec, Gauge, IntCounter,
};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Swaps accepted by initiate
    pub static ref SWAPS_STARTED: IntCounter = register_int_counter!(
        "xl_swaps_started_total",
        "Total number of swaps accepted"
    )
    .expect("Failed to create SWAPS_STARTED metric");

    /// Phase transitions, labeled by the phase entered
    pub static ref PHASE_TRANSITIONS: CounterVec = register_counter_vec!(
        "xl_swap_phase_transitions_total",
        "Total number of swap phase transitions",
        &["phase"]
    )
    .expect("Failed to create PHASE_TRANSITIONS metric");

    /// Terminal outcomes, labeled by terminal phase
    pub static ref SWAPS_FINISHED: CounterVec = register_counter_vec!(
        "xl_swaps_finished_total",
        "Total number of swaps that reached a terminal phase",
        &["phase"]
    )
    .expect("Failed to create SWAPS_FINISHED metric");

    /// Failed ledger calls, labeled by ledger and reason
    pub static ref LEDGER_CALL_FAILURES: CounterVec = register_counter_vec!(
        "xl_ledger_call_failures_total",
        "Total number of failed ledger calls",
        &["ledger", "reason"]
    )
    .expect("Failed to create LEDGER_CALL_FAILURES metric");

    /// Ledger answers that contradicted earlier observations
    pub static ref PROTOCOL_INCONSISTENCIES: IntCounter = register_int_counter!(
        "xl_protocol_inconsistencies_total",
        "Total number of protocol inconsistencies observed"
    )
    .expect("Failed to create PROTOCOL_INCONSISTENCIES metric");

    /// Swaps not yet terminal
    pub static ref ACTIVE_SWAPS: Gauge = register_gauge!(
        "xl_active_swaps",
        "Number of swaps not yet in a terminal phase"
    )
    .expect("Failed to create ACTIVE_SWAPS metric");
}

// =============================================================================
// METRIC RECORDING FUNCTIONS
// =============================================================================

/// Record a swap accepted
#[cfg(feature = "metrics")]
pub fn record_swap_started() {
    SWAPS_STARTED.inc();
}

/// Record a phase transition
#[cfg(feature = "metrics")]
pub fn record_phase_transition(phase: &str) {
    PHASE_TRANSITIONS.with_label_values(&[phase]).inc();
}

/// Record a terminal outcome
#[cfg(feature = "metrics")]
pub fn record_swap_finished(phase: &str) {
    SWAPS_FINISHED.with_label_values(&[phase]).inc();
}

/// Record a failed ledger call
#[cfg(feature = "metrics")]
pub fn record_ledger_failure(ledger: &str, reason: &str) {
    LEDGER_CALL_FAILURES.with_label_values(&[ledger, reason]).inc();
}

/// Record a protocol inconsistency
#[cfg(feature = "metrics")]
pub fn record_protocol_inconsistency() {
    PROTOCOL_INCONSISTENCIES.inc();
}

/// Update the active swaps gauge
#[cfg(feature = "metrics")]
pub fn set_active_swaps(count: usize) {
    ACTIVE_SWAPS.set(count as f64);
}

// =============================================================================
// NO-OP IMPLEMENTATIONS (when metrics feature disabled)
// =============================================================================

#[cfg(not(feature = "metrics"))]
pub fn record_swap_started() {}

#[cfg(not(feature = "metrics"))]
pub fn record_phase_transition(_phase: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_swap_finished(_phase: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_ledger_failure(_ledger: &str, _reason: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_protocol_inconsistency() {}

#[cfg(not(feature = "metrics"))]
pub fn set_active_swaps(_count: usize) {}
