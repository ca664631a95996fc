//! # Inbound Ports (Driving)
//!
//! What callers of the coordinator can ask for.

use crate::domain::{Asset, Quote, SwapId, SwapRequest, SwapResult, SwapStatus};
use async_trait::async_trait;

/// Swap coordinator API.
#[async_trait]
pub trait SwapApi: Send + Sync {
    /// Validate, commit and start a swap. Returns the primary swap id.
    async fn initiate(&self, request: SwapRequest) -> SwapResult<SwapId>;

    /// Current status of a swap.
    async fn status(&self, id: SwapId) -> SwapResult<SwapStatus>;

    /// Cancel a swap that has not submitted a lock yet.
    async fn cancel(&self, id: SwapId) -> SwapResult<SwapStatus>;

    /// Wait until the swap reaches a terminal phase.
    async fn wait_terminal(&self, id: SwapId) -> SwapResult<SwapStatus>;

    /// Estimate the destination amount for `amount` of `from`.
    async fn quote(&self, from: &Asset, to: &Asset, amount: u128) -> SwapResult<Quote>;
}
