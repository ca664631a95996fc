//! # Swap Telemetry
//!
//! Logging setup shared by the Crosslock crates.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use swap_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() {
//!     let _guard = init_telemetry(TelemetryConfig::from_env()).expect("telemetry");
//!     // swap coordinator runs here
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `XL_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `XL_JSON_LOGS` | `false` | JSON formatted output |
//! | `XL_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `XL_SERVICE_NAME` | `crosslock` | Service name in the startup record |
//! | `XL_NETWORK` | `testnet` | Deployment label |

#![warn(missing_docs)]

mod config;
pub mod logging;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use tracing_setup::{init_test_tracing, init_tracing, TracingGuard};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// A global subscriber was already installed, or installation failed.
    #[error("Failed to install tracing subscriber: {0}")]
    SubscriberInit(String),

    /// The log filter or another setting could not be parsed.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging for the process.
///
/// Hold the returned guard for the lifetime of the application.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TracingGuard, TelemetryError> {
    init_tracing(&config)
}
