//! # Swap Service
//!
//! Entry point for callers. Validates requests, generates the commitment,
//! spawns one [`PhaseOrchestrator`] task per swap and answers status,
//! cancellation and quote requests.

use super::orchestrator::{PhaseOrchestrator, SharedRecord};
use crate::adapters::QuoteAdapter;
use crate::algorithms::{CommitmentGenerator, LedgerClock};
use crate::config::SwapConfig;
use crate::domain::{
    Asset, LedgerSide, PerLedger, Quote, SwapError, SwapId, SwapPhase, SwapRecord,
    SwapRequest, SwapResult, SwapStatus,
};
use crate::metrics;
use crate::ports::{LedgerAdapter, SwapApi};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use swap_telemetry::log_swap_event;
use tokio::sync::watch;
use tokio::task::JoinHandle;

struct ActiveSwap {
    record: SharedRecord,
    phase: Arc<watch::Sender<SwapPhase>>,
    task: JoinHandle<SwapPhase>,
}

/// Swap coordinator for one source/destination ledger pair.
pub struct SwapService {
    config: SwapConfig,
    adapters: PerLedger<Arc<dyn LedgerAdapter>>,
    generator: CommitmentGenerator,
    quotes: QuoteAdapter,
    active: RwLock<HashMap<SwapId, ActiveSwap>>,
    archive: RwLock<HashMap<SwapId, SwapStatus>>,
}

impl SwapService {
    /// Service over `source` and `destination`.
    ///
    /// Fails if the config is invalid, the adapters are wired to the wrong
    /// sides, or the ledgers disagree on the payout hash.
    pub fn new(
        config: SwapConfig,
        source: Arc<dyn LedgerAdapter>,
        destination: Arc<dyn LedgerAdapter>,
    ) -> SwapResult<Self> {
        config.validate()?;
        if source.side() != LedgerSide::Source || destination.side() != LedgerSide::Destination {
            return Err(SwapError::Validation(
                "adapters must serve the source and destination sides respectively".into(),
            ));
        }
        let generator = CommitmentGenerator::for_ledgers(
            &PerLedger::new(source.payout_hash(), destination.payout_hash()),
            config.min_safety_margin_secs,
        )?
        .with_lock_headroom(config.min_lock_headroom_secs);
        let quotes = QuoteAdapter::new(PerLedger::new(
            source.confirmation_latency_secs(),
            destination.confirmation_latency_secs(),
        ));
        Ok(Self {
            config,
            adapters: PerLedger::new(source, destination),
            generator,
            quotes,
            active: RwLock::new(HashMap::new()),
            archive: RwLock::new(HashMap::new()),
        })
    }

    /// Replace the quote adapter (to attach a price source).
    pub fn with_quotes(mut self, quotes: QuoteAdapter) -> Self {
        self.quotes = quotes;
        self
    }

    /// Configuration in use.
    pub fn config(&self) -> &SwapConfig {
        &self.config
    }

    /// Validate `request`, commit to a secret and timelocks, and start the
    /// swap in the background. Returns the swap id on the source ledger.
    pub async fn initiate(&self, request: SwapRequest) -> SwapResult<SwapId> {
        if request.source_amount == 0 || request.destination_amount == 0 {
            return Err(SwapError::Validation("amounts must be positive".into()));
        }
        let recipients = PerLedger::new(
            self.adapters
                .source
                .canonicalize_address(&request.source_recipient)
                .map_err(|e| SwapError::from_ledger(LedgerSide::Source, e))?,
            self.adapters
                .destination
                .canonicalize_address(&request.destination_recipient)
                .map_err(|e| SwapError::from_ledger(LedgerSide::Destination, e))?,
        );

        let clocks = PerLedger::new(
            self.clock(LedgerSide::Source).await?,
            self.clock(LedgerSide::Destination).await?,
        );
        let latencies = PerLedger::new(
            self.adapters.source.confirmation_latency_secs(),
            self.adapters.destination.confirmation_latency_secs(),
        );
        let timelock_request = request
            .timelocks
            .unwrap_or_else(|| self.config.default_timelocks());
        let commitment = self
            .generator
            .generate(timelock_request, &clocks, &latencies)?;

        let swap_ids = PerLedger::new(
            self.adapters
                .source
                .derive_swap_id(&commitment.hashlock, commitment.timelocks.source),
            self.adapters
                .destination
                .derive_swap_id(&commitment.hashlock, commitment.timelocks.destination),
        );
        let id = swap_ids.source;
        if self.active.read().contains_key(&id) || self.archive.read().contains_key(&id) {
            return Err(SwapError::Validation("swap id already in use".into()));
        }

        let record = SwapRecord::new(
            commitment,
            swap_ids,
            PerLedger::new(self.adapters.source.kind(), self.adapters.destination.kind()),
            PerLedger::new(request.source_amount, request.destination_amount),
            recipients,
            unix_now(),
        );
        log_swap_event!(
            info,
            record.id_hex(),
            "swap initiated",
            correlation_id = %record.correlation_id,
            source_timelock = record.timelocks.source,
            destination_timelock = record.timelocks.destination
        );

        let record = Arc::new(RwLock::new(record));
        let (phase_tx, _) = watch::channel(SwapPhase::Created);
        let phase = Arc::new(phase_tx);
        let orchestrator = PhaseOrchestrator::new(
            self.adapters.clone(),
            &self.config,
            self.generator.payout_hash(),
            record.clone(),
            phase.clone(),
        );
        let task = tokio::spawn(orchestrator.run());

        let active_count = {
            let mut active = self.active.write();
            active.insert(
                id,
                ActiveSwap {
                    record,
                    phase,
                    task,
                },
            );
            active.len()
        };
        metrics::record_swap_started();
        metrics::set_active_swaps(active_count);
        Ok(id)
    }

    async fn clock(&self, side: LedgerSide) -> SwapResult<LedgerClock> {
        let adapter = self.adapters.get(side);
        let mut attempt = 0u32;
        let now = loop {
            match adapter.current_time().await {
                Ok(now) => break now,
                Err(e) if e.is_transient() && attempt + 1 < self.config.retry.max_attempts => {
                    tokio::time::sleep(self.config.retry.delay_for(attempt)).await;
                    attempt += 1;
                }
                Err(e) => return Err(SwapError::from_ledger(side, e)),
            }
        };
        Ok(LedgerClock {
            now,
            bounds: adapter.timelock_bounds(),
        })
    }

    /// Current status of a swap.
    pub fn status(&self, id: &SwapId) -> SwapResult<SwapStatus> {
        if let Some(swap) = self.active.read().get(id) {
            return Ok(swap.record.read().status());
        }
        self.archive
            .read()
            .get(id)
            .cloned()
            .ok_or(SwapError::SwapNotFound(*id))
    }

    /// Cancel a swap. Only possible before the source lock was submitted.
    pub fn cancel(&self, id: &SwapId) -> SwapResult<SwapStatus> {
        let active = self.active.read();
        let Some(swap) = active.get(id) else {
            return match self.archive.read().get(id) {
                Some(status) => Err(SwapError::TerminalPhase {
                    phase: status.phase,
                }),
                None => Err(SwapError::SwapNotFound(*id)),
            };
        };

        let mut record = swap.record.write();
        if record.phase.is_terminal() {
            return Err(SwapError::TerminalPhase {
                phase: record.phase,
            });
        }
        if record.phase != SwapPhase::Created || record.lock_submitted.source {
            return Err(SwapError::CancellationRejected {
                phase: record.phase,
            });
        }
        record.cancel_requested = true;
        record.fail("cancelled by operator")?;
        swap.phase.send_replace(record.phase);
        log_swap_event!(info, record.id_hex(), "swap cancelled");
        Ok(record.status())
    }

    /// Wait until a swap reaches a terminal phase and return its status.
    pub async fn wait_terminal(&self, id: &SwapId) -> SwapResult<SwapStatus> {
        let rx = match self.active.read().get(id) {
            Some(swap) => Some(swap.phase.subscribe()),
            None => None,
        };
        if let Some(mut rx) = rx {
            loop {
                if rx.borrow_and_update().is_terminal() {
                    break;
                }
                if rx.changed().await.is_err() {
                    break;
                }
            }
        }
        self.status(id)
    }

    /// Move finished swaps out of the active set, keeping only their
    /// status. Drops each swap's secret. Returns how many were archived.
    pub fn archive_terminal(&self) -> usize {
        let mut active = self.active.write();
        let finished: Vec<SwapId> = active
            .iter()
            .filter(|(_, swap)| swap.task.is_finished() && swap.record.read().phase.is_terminal())
            .map(|(id, _)| *id)
            .collect();

        let mut archive = self.archive.write();
        for id in &finished {
            if let Some(swap) = active.remove(id) {
                archive.insert(*id, swap.record.read().status());
            }
        }
        metrics::set_active_swaps(active.len());
        finished.len()
    }

    /// Number of swaps not yet archived.
    pub fn active_count(&self) -> usize {
        self.active.read().len()
    }

    /// Estimate the destination amount for `amount` of `from`.
    pub async fn quote(&self, from: &Asset, to: &Asset, amount: u128) -> SwapResult<Quote> {
        self.quotes.quote(from, to, amount).await
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[async_trait]
impl SwapApi for SwapService {
    async fn initiate(&self, request: SwapRequest) -> SwapResult<SwapId> {
        SwapService::initiate(self, request).await
    }

    async fn status(&self, id: SwapId) -> SwapResult<SwapStatus> {
        SwapService::status(self, &id)
    }

    async fn cancel(&self, id: SwapId) -> SwapResult<SwapStatus> {
        SwapService::cancel(self, &id)
    }

    async fn wait_terminal(&self, id: SwapId) -> SwapResult<SwapStatus> {
        SwapService::wait_terminal(self, &id).await
    }

    async fn quote(&self, from: &Asset, to: &Asset, amount: u128) -> SwapResult<Quote> {
        SwapService::quote(self, from, to, amount).await
    }
}
