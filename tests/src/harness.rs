//! # Test Harness
//!
//! An EVM source ledger and a NEAR destination ledger, each backed by a
//! [`SimulatedEscrow`] whose clock follows tokio's. Run tests with
//! `#[tokio::test(start_paused = true)]` and hours of ledger time pass in
//! milliseconds.

use htlc_swap::adapters::{EscrowLedgerAdapter, LedgerProfile, SimulatedEscrow};
use htlc_swap::{
    EvmDialect, Ed25519Signer, LedgerAdapter, LedgerSide, NearDialect, Secp256k1Signer,
    SwapConfig, SwapRequest, SwapService, SwapView, TimelockRequest,
};
use std::sync::Arc;

/// Ledger time at the start of every test.
pub const GENESIS: u64 = 1_700_000_000;

/// Funds each locker starts with.
pub const STARTING_BALANCE: u128 = 1_000_000_000;

/// Counterparty's EVM account, receiving the source funds.
pub const SOURCE_RECIPIENT: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

/// Initiator's NEAR implicit account, receiving the destination funds.
pub const DESTINATION_RECIPIENT: [u8; 32] = [0x44; 32];

/// Two simulated ledgers and a service over them.
pub struct TestBed {
    /// Source-side escrow program
    pub source_escrow: Arc<SimulatedEscrow>,
    /// Destination-side escrow program
    pub destination_escrow: Arc<SimulatedEscrow>,
    /// Source ledger adapter (initiator signs)
    pub source: Arc<EscrowLedgerAdapter>,
    /// Destination ledger adapter (counterparty signs)
    pub destination: Arc<EscrowLedgerAdapter>,
    /// Initiator's EVM key
    pub initiator: Arc<Secp256k1Signer>,
    /// Counterparty's NEAR key
    pub counterparty: Arc<Ed25519Signer>,
    /// Coordinator under test
    pub service: Arc<SwapService>,
}

impl TestBed {
    /// Test bed with fast retry settings.
    pub fn new() -> Self {
        Self::with_config(SwapConfig::for_testing())
    }

    /// Test bed with `config`.
    pub fn with_config(config: SwapConfig) -> Self {
        swap_telemetry::init_test_tracing();

        let source_profile = LedgerProfile::evm(LedgerSide::Source);
        let destination_profile = LedgerProfile::near(LedgerSide::Destination);
        let source_escrow = Arc::new(SimulatedEscrow::new(
            Arc::new(EvmDialect),
            source_profile.bounds,
            GENESIS,
        ));
        let destination_escrow = Arc::new(SimulatedEscrow::new(
            Arc::new(NearDialect),
            destination_profile.bounds,
            GENESIS,
        ));
        source_escrow.follow_tokio_clock();
        destination_escrow.follow_tokio_clock();

        let initiator = Arc::new(Secp256k1Signer::random());
        let counterparty = Arc::new(Ed25519Signer::random());
        source_escrow.credit(&initiator.address(), STARTING_BALANCE);
        destination_escrow.credit(&counterparty.public_key(), STARTING_BALANCE);

        let source = Arc::new(EscrowLedgerAdapter::new(
            source_profile,
            source_escrow.clone(),
            initiator.clone(),
        ));
        let destination = Arc::new(EscrowLedgerAdapter::new(
            destination_profile,
            destination_escrow.clone(),
            counterparty.clone(),
        ));
        let service = match SwapService::new(config, source.clone(), destination.clone()) {
            Ok(service) => Arc::new(service),
            Err(e) => panic!("test bed misconfigured: {e}"),
        };

        Self {
            source_escrow,
            destination_escrow,
            source,
            destination,
            initiator,
            counterparty,
            service,
        }
    }

    /// Swap request with default timelocks.
    pub fn request(&self, source_amount: u128, destination_amount: u128) -> SwapRequest {
        SwapRequest {
            source_recipient: SOURCE_RECIPIENT.into(),
            destination_recipient: hex::encode(DESTINATION_RECIPIENT),
            source_amount,
            destination_amount,
            timelocks: None,
        }
    }

    /// Swap request with explicit absolute timelocks.
    pub fn explicit_request(&self, amount: u128, source: u64, destination: u64) -> SwapRequest {
        SwapRequest {
            timelocks: Some(TimelockRequest::Explicit {
                source,
                destination,
            }),
            ..self.request(amount, amount)
        }
    }

    /// Counterparty's EVM address bytes.
    pub fn source_recipient_bytes() -> Vec<u8> {
        hex::decode(SOURCE_RECIPIENT.trim_start_matches("0x")).unwrap_or_default()
    }

    /// Entries for one swap on both ledgers, read straight from the adapters.
    pub async fn views(
        &self,
        swap_ids: (&str, &str),
    ) -> (Option<SwapView>, Option<SwapView>) {
        let source = self.source.query(decode_id(swap_ids.0)).await.ok().flatten();
        let destination = self
            .destination
            .query(decode_id(swap_ids.1))
            .await
            .ok()
            .flatten();
        (source, destination)
    }
}

impl Default for TestBed {
    fn default() -> Self {
        Self::new()
    }
}

/// Hex swap id back to bytes.
pub fn decode_id(hex_id: &str) -> [u8; 32] {
    let mut id = [0u8; 32];
    if let Ok(bytes) = hex::decode(hex_id) {
        if bytes.len() == 32 {
            id.copy_from_slice(&bytes);
        }
    }
    id
}
