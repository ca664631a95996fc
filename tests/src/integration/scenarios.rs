//! # Swap Scenarios
//!
//! The canonical flows, end to end:
//!
//! 1. **Happy path**: EVM source, NEAR destination, both sides paid out
//! 2. **Source-only refund**: destination never locks, source refunded after expiry
//! 3. **Invalid secret**: payout with the wrong preimage is refused, lock untouched
//! 4. **Bad timelocks**: rejected before any ledger call

#[cfg(test)]
mod tests {
    use crate::harness::{TestBed, DESTINATION_RECIPIENT, GENESIS, STARTING_BALANCE};
    use htlc_swap::ports::LockParams;
    use htlc_swap::{
        create_hashlock, generate_secret, LedgerAdapter, LedgerError, PayoutHash, SwapApi,
        SwapError, SwapPhase, MIN_SAFETY_MARGIN_SECS,
    };
    use std::sync::Arc;

    // =========================================================================
    // HAPPY PATH
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_happy_path_evm_to_near() {
        let bed = TestBed::new();
        let id = bed.service.initiate(bed.request(1_000, 2_500)).await.unwrap();

        let status = bed.service.wait_terminal(&id).await.unwrap();
        assert_eq!(status.phase, SwapPhase::Completed, "{:?}", status.error_detail);

        // Both payees received their funds, nothing left in escrow.
        assert_eq!(
            bed.source_escrow.balance_of(&TestBed::source_recipient_bytes()),
            1_000
        );
        assert_eq!(bed.destination_escrow.balance_of(&DESTINATION_RECIPIENT), 2_500);
        assert_eq!(bed.source_escrow.escrowed(), 0);
        assert_eq!(bed.destination_escrow.escrowed(), 0);
        assert_eq!(
            bed.source_escrow.balance_of(&bed.initiator.address()),
            STARTING_BALANCE - 1_000
        );

        // Destination expires first, by at least the margin.
        assert!(
            status.timelocks.destination + MIN_SAFETY_MARGIN_SECS < status.timelocks.source
        );
        assert!(status.source_tx.is_some());
        assert!(status.destination_tx.is_some());
        assert_eq!(status.tx_history.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_happy_path_through_api_trait() {
        let bed = TestBed::new();
        let api: Arc<dyn SwapApi> = bed.service.clone();

        let id = api.initiate(bed.request(10, 10)).await.unwrap();
        let status = api.wait_terminal(id).await.unwrap();
        assert_eq!(status.phase, SwapPhase::Completed);
        assert_eq!(api.status(id).await.unwrap(), status);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ledger_records_match_status() {
        let bed = TestBed::new();
        let id = bed.service.initiate(bed.request(700, 900)).await.unwrap();
        let status = bed.service.wait_terminal(&id).await.unwrap();

        let (source, destination) = bed
            .views((status.swap_ids.source.as_str(), status.swap_ids.destination.as_str()))
            .await;
        let source = source.unwrap();
        let destination = destination.unwrap();
        assert_eq!(source.hashlock, destination.hashlock);
        assert_eq!(hex::encode(source.hashlock), status.hashlock);
        assert_eq!(source.timelock, status.timelocks.source);
        assert_eq!(destination.timelock, status.timelocks.destination);
        assert!(source.completed && destination.completed);
    }

    // =========================================================================
    // SOURCE-ONLY REFUND
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_destination_never_locks_source_refunded() {
        let bed = TestBed::new();
        // Counterparty cannot cover the destination amount.
        let id = bed
            .service
            .initiate(bed.request(1_000, STARTING_BALANCE + 1))
            .await
            .unwrap();

        let status = bed.service.wait_terminal(&id).await.unwrap();
        assert_eq!(status.phase, SwapPhase::Refunded);
        assert!(status
            .error_detail
            .as_deref()
            .is_some_and(|d| d.contains("destination lock failed")));

        assert_eq!(bed.source_escrow.escrowed(), 0);
        assert_eq!(
            bed.source_escrow.balance_of(&bed.initiator.address()),
            STARTING_BALANCE
        );
        // Refunded only after the source lock expired on its own clock.
        assert!(bed.source_escrow.now_secs() > status.timelocks.source);
        assert_eq!(
            bed.source_escrow.balance_of(&crate::harness::TestBed::source_recipient_bytes()),
            0
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_source_rejection_fails_with_raw_reason() {
        let bed = TestBed::new();
        bed.source_escrow
            .reject_next("execution reverted: Pausable: paused");
        let id = bed.service.initiate(bed.request(1_000, 1_000)).await.unwrap();

        let status = bed.service.wait_terminal(&id).await.unwrap();
        assert_eq!(status.phase, SwapPhase::Failed);
        let detail = status.error_detail.unwrap();
        assert!(detail.contains("Pausable: paused"), "{detail}");
        assert_eq!(bed.destination_escrow.escrowed(), 0);
    }

    // =========================================================================
    // INVALID SECRET
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_wrong_secret_refused_and_lock_untouched() {
        let bed = TestBed::new();
        let secret = generate_secret();
        let hashlock = create_hashlock(&secret, PayoutHash::Sha256);
        let timelock = GENESIS + 3 * 3_600;
        let swap_id = bed.destination.derive_swap_id(&hashlock, timelock);
        bed.destination
            .lock(LockParams {
                swap_id,
                hashlock,
                recipient: hex::encode(DESTINATION_RECIPIENT),
                amount: 50,
                timelock,
            })
            .await
            .unwrap();

        let wrong = generate_secret();
        assert_eq!(
            bed.destination.complete(swap_id, &wrong).await,
            Err(LedgerError::InvalidSecret)
        );
        let view = bed.destination.query(swap_id).await.unwrap().unwrap();
        assert!(view.active && !view.completed);
        assert_eq!(bed.destination_escrow.escrowed(), 50);

        bed.destination.complete(swap_id, &secret).await.unwrap();
        assert_eq!(bed.destination_escrow.balance_of(&DESTINATION_RECIPIENT), 50);
    }

    // =========================================================================
    // BAD TIMELOCKS
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_inverted_explicit_timelocks_rejected_before_ledger_calls() {
        let bed = TestBed::new();
        let request = bed.explicit_request(100, GENESIS + 3 * 3_600, GENESIS + 4 * 3_600);

        let result = bed.service.initiate(request).await;
        assert!(matches!(result, Err(SwapError::TimelockUnsatisfiable(_))));
        assert_eq!(bed.service.active_count(), 0);
        assert_eq!(bed.source_escrow.escrowed(), 0);
        assert_eq!(bed.destination_escrow.escrowed(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_explicit_destination_below_near_minimum_rejected() {
        let bed = TestBed::new();
        // One hour is below the NEAR two-hour floor, ordering is fine.
        let request = bed.explicit_request(100, GENESIS + 3 * 3_600, GENESIS + 3_600);
        assert!(matches!(
            bed.service.initiate(request).await,
            Err(SwapError::TimelockUnsatisfiable(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_explicit_margin_too_small_rejected() {
        let bed = TestBed::new();
        let destination = GENESIS + 2 * 3_600 + 600;
        let request = bed.explicit_request(100, destination + MIN_SAFETY_MARGIN_SECS, destination);
        assert!(matches!(
            bed.service.initiate(request).await,
            Err(SwapError::TimelockUnsatisfiable(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_valid_explicit_timelocks_used_verbatim() {
        let bed = TestBed::new();
        let source = GENESIS + 5 * 3_600;
        let destination = GENESIS + 2 * 3_600 + 600;
        let id = bed
            .service
            .initiate(bed.explicit_request(100, source, destination))
            .await
            .unwrap();
        let status = bed.service.wait_terminal(&id).await.unwrap();
        assert_eq!(status.phase, SwapPhase::Completed);
        assert_eq!(status.timelocks.source, source);
        assert_eq!(status.timelocks.destination, destination);
    }
}
