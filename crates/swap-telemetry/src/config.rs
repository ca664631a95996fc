//! Telemetry configuration from environment variables.

use std::env;

/// Configuration for log output of the swap coordinator.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to the startup record
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error)
    pub log_level: String,

    /// Whether to write log lines to stdout at all
    pub console_output: bool,

    /// Whether to emit JSON formatted logs
    pub json_logs: bool,

    /// Deployment label (devnet, testnet, mainnet)
    pub network: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "crosslock".to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
            network: "testnet".to_string(),
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `XL_SERVICE_NAME`: Service name (default: crosslock)
    /// - `XL_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `XL_CONSOLE_OUTPUT`: Enable console output (default: true)
    /// - `XL_JSON_LOGS`: Enable JSON logs (default: false in dev, true in containers)
    /// - `XL_NETWORK`: Network name (default: testnet)
    pub fn from_env() -> Self {
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();

        Self {
            service_name: env::var("XL_SERVICE_NAME").unwrap_or_else(|_| "crosslock".to_string()),

            log_level: env::var("XL_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            console_output: env::var("XL_CONSOLE_OUTPUT")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(true),

            json_logs: env::var("XL_JSON_LOGS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(is_container),

            network: env::var("XL_NETWORK").unwrap_or_else(|_| "testnet".to_string()),
        }
    }

    /// Configuration used by test harnesses: debug level, plain output.
    pub fn for_testing() -> Self {
        Self {
            service_name: "crosslock-test".to_string(),
            log_level: "debug".to_string(),
            ..Self::default()
        }
    }

    /// Service name qualified with the network label.
    pub fn full_service_name(&self) -> String {
        format!("{}-{}", self.service_name, self.network)
    }
}
