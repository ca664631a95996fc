//! Structured log macros.
//!
//! Every record carries `component = "xl-swap"` plus the swap identifier so
//! a single swap can be followed across both ledgers in aggregated logs.

/// Component label stamped on every swap log record.
pub const COMPONENT: &str = "xl-swap";

/// Log a swap-scoped event with the standard fields.
///
/// ```rust,ignore
/// log_swap_event!(info, swap_hex, "source lock confirmed", tx = %tx_ref);
/// ```
#[macro_export]
macro_rules! log_swap_event {
    ($level:ident, $swap_id:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = $crate::logging::COMPONENT,
            swap_id = %$swap_id,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a ledger-scoped event (one side of a swap) with the standard fields.
#[macro_export]
macro_rules! log_ledger_event {
    ($level:ident, $swap_id:expr, $ledger:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = $crate::logging::COMPONENT,
            swap_id = %$swap_id,
            ledger = %$ledger,
            $($($field)*,)?
            $msg
        )
    };
}
