//! # Quote Adapter
//!
//! Amount estimates for a swap. The same asset on both ledgers converts
//! 1:1 after rescaling between base-unit decimals; different assets go
//! through a [`PriceSource`].

use crate::domain::{Asset, PerLedger, Quote, SwapError, SwapResult};
use crate::ports::PriceSource;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Move `amount` between base units with different decimals. Scaling down
/// truncates.
pub fn rescale(amount: u128, from_decimals: u8, to_decimals: u8) -> SwapResult<u128> {
    let diff = u32::from(from_decimals.abs_diff(to_decimals));
    let factor = 10u128
        .checked_pow(diff)
        .ok_or_else(|| SwapError::Validation(format!("decimal gap {diff} too large")))?;
    if to_decimals >= from_decimals {
        amount
            .checked_mul(factor)
            .ok_or_else(|| SwapError::Validation(format!("amount {amount} overflows on rescale")))
    } else {
        Ok(amount / factor)
    }
}

/// Quotes for one ledger pair.
pub struct QuoteAdapter {
    price_source: Option<Arc<dyn PriceSource>>,
    confirmation_latency_secs: PerLedger<u64>,
}

impl QuoteAdapter {
    /// Quote adapter with no cross-asset pricing.
    pub fn new(confirmation_latency_secs: PerLedger<u64>) -> Self {
        Self {
            price_source: None,
            confirmation_latency_secs,
        }
    }

    /// Attach a price source for cross-asset quotes.
    pub fn with_price_source(mut self, source: Arc<dyn PriceSource>) -> Self {
        self.price_source = Some(source);
        self
    }

    /// Happy path: two locks and two completions, each waiting for its
    /// ledger to confirm.
    pub fn estimated_secs(&self) -> u64 {
        2 * (self.confirmation_latency_secs.source + self.confirmation_latency_secs.destination)
    }

    /// Estimate the destination amount for `amount` of `from`.
    pub async fn quote(&self, from: &Asset, to: &Asset, amount: u128) -> SwapResult<Quote> {
        if amount == 0 {
            return Err(SwapError::Validation("quote amount must be positive".into()));
        }
        let destination_amount = if from.symbol == to.symbol {
            rescale(amount, from.decimals, to.decimals)?
        } else {
            let source = self.price_source.as_ref().ok_or_else(|| {
                SwapError::Validation(format!(
                    "no price source for {} -> {}",
                    from.symbol, to.symbol
                ))
            })?;
            source.convert(from, to, amount).await?
        };
        Ok(Quote {
            source_amount: amount,
            destination_amount,
            estimated_secs: self.estimated_secs(),
        })
    }
}

/// Price source with fixed whole-unit exchange rates.
#[derive(Debug, Default, Clone)]
pub struct FixedRatePriceSource {
    rates: HashMap<(String, String), (u128, u128)>,
}

impl FixedRatePriceSource {
    /// Empty rate table.
    pub fn new() -> Self {
        Self::default()
    }

    /// One whole `from` buys `numerator / denominator` whole `to`.
    pub fn with_rate(
        mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        numerator: u128,
        denominator: u128,
    ) -> Self {
        self.rates
            .insert((from.into(), to.into()), (numerator, denominator));
        self
    }
}

#[async_trait]
impl PriceSource for FixedRatePriceSource {
    async fn convert(&self, from: &Asset, to: &Asset, amount: u128) -> SwapResult<u128> {
        let (numerator, denominator) = self
            .rates
            .get(&(from.symbol.clone(), to.symbol.clone()))
            .copied()
            .ok_or_else(|| {
                SwapError::Validation(format!("no rate for {} -> {}", from.symbol, to.symbol))
            })?;
        if denominator == 0 {
            return Err(SwapError::Validation("rate denominator is zero".into()));
        }
        let priced = amount
            .checked_mul(numerator)
            .ok_or_else(|| SwapError::Validation("amount overflows rate".into()))?
            / denominator;
        rescale(priced, from.decimals, to.decimals)
    }
}
