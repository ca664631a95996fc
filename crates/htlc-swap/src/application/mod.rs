//! # Application Layer
//!
//! Swap lifecycle: the service accepting requests, one orchestrator task
//! per swap, and the monitor and refund manager they drive.

pub mod monitor;
pub mod orchestrator;
pub mod refund;
pub mod service;

pub use monitor::{Confirmation, StateMonitor};
pub use orchestrator::{PhaseOrchestrator, SharedRecord};
pub use refund::{RefundManager, RefundPlan, RefundReport};
pub use service::SwapService;
