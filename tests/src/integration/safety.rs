//! # Safety Properties
//!
//! - **Atomicity**: every swap ends with both sides paid out, or with no
//!   funds left locked on either side
//! - **Idempotent payout**: a second completion is answered `AlreadyCompleted`
//! - **Refund safety**: never before expiry, never after completion
//! - **Liveness**: an unreachable ledger delays a swap but does not strand
//!   funds that the other ledger can still settle

#[cfg(test)]
mod tests {
    use crate::harness::{TestBed, DESTINATION_RECIPIENT, GENESIS, STARTING_BALANCE};
    use htlc_swap::ports::LockParams;
    use htlc_swap::{
        create_hashlock, generate_secret, LedgerAdapter, LedgerError, PayoutHash, RetryPolicy,
        SwapConfig, SwapPhase, SwapStatus,
    };
    use std::time::Duration;

    async fn assert_atomic(bed: &TestBed, status: &SwapStatus) {
        let (source, destination) = bed
            .views((status.swap_ids.source.as_str(), status.swap_ids.destination.as_str()))
            .await;
        let paid = |view: &Option<htlc_swap::SwapView>| view.as_ref().is_some_and(|v| v.completed);
        let open = |view: &Option<htlc_swap::SwapView>| {
            view.as_ref().is_some_and(|v| v.is_outstanding())
        };

        match status.phase {
            SwapPhase::Completed => {
                assert!(paid(&source) && paid(&destination), "half-completed swap");
            }
            SwapPhase::Refunded | SwapPhase::Failed => {
                assert!(!paid(&source) && !paid(&destination), "one-sided payout");
                assert!(!open(&source) && !open(&destination), "funds left locked");
            }
            phase => panic!("swap not terminal: {phase}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_atomic_on_happy_path() {
        let bed = TestBed::new();
        let id = bed.service.initiate(bed.request(100, 100)).await.unwrap();
        let status = bed.service.wait_terminal(&id).await.unwrap();
        assert_eq!(status.phase, SwapPhase::Completed);
        assert_atomic(&bed, &status).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_atomic_when_destination_rejects() {
        let bed = TestBed::new();
        bed.destination_escrow
            .reject_next("Smart contract panicked: Contract is paused");
        let id = bed.service.initiate(bed.request(100, 100)).await.unwrap();
        let status = bed.service.wait_terminal(&id).await.unwrap();
        assert_eq!(status.phase, SwapPhase::Refunded);
        assert_atomic(&bed, &status).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_atomic_when_source_rejects() {
        let bed = TestBed::new();
        bed.source_escrow
            .reject_next("execution reverted: ERC20: transfer amount exceeds balance");
        let id = bed.service.initiate(bed.request(100, 100)).await.unwrap();
        let status = bed.service.wait_terminal(&id).await.unwrap();
        assert_eq!(status.phase, SwapPhase::Failed);
        assert_atomic(&bed, &status).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_atomic_through_ledger_outages() {
        let bed = TestBed::new();
        bed.source_escrow.fail_next_calls(4);
        bed.destination_escrow.fail_next_calls(4);
        bed.destination_escrow.set_read_lag(3);
        let id = bed.service.initiate(bed.request(100, 100)).await.unwrap();
        let status = bed.service.wait_terminal(&id).await.unwrap();
        assert_eq!(status.phase, SwapPhase::Completed, "{:?}", status.error_detail);
        assert_atomic(&bed, &status).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_is_idempotent() {
        let bed = TestBed::new();
        let secret = generate_secret();
        let hashlock = create_hashlock(&secret, PayoutHash::Sha256);
        let timelock = GENESIS + 3_600;
        let swap_id = bed.source.derive_swap_id(&hashlock, timelock);
        bed.source
            .lock(LockParams {
                swap_id,
                hashlock,
                recipient: crate::harness::SOURCE_RECIPIENT.into(),
                amount: 10,
                timelock,
            })
            .await
            .unwrap();

        bed.source.complete(swap_id, &secret).await.unwrap();
        assert_eq!(
            bed.source.complete(swap_id, &secret).await,
            Err(LedgerError::AlreadyCompleted)
        );
        assert_eq!(
            bed.source_escrow
                .balance_of(&TestBed::source_recipient_bytes()),
            10
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_refund_refused_before_expiry_and_after_completion() {
        let bed = TestBed::new();
        let secret = generate_secret();
        let hashlock = create_hashlock(&secret, PayoutHash::Sha256);
        let timelock = GENESIS + 2 * 3_600 + 60;
        let swap_id = bed.destination.derive_swap_id(&hashlock, timelock);
        bed.destination
            .lock(LockParams {
                swap_id,
                hashlock,
                recipient: hex::encode(DESTINATION_RECIPIENT),
                amount: 10,
                timelock,
            })
            .await
            .unwrap();

        // At the timelock itself the lock is still live.
        bed.destination_escrow.set_time(timelock);
        assert_eq!(
            bed.destination.refund(swap_id).await,
            Err(LedgerError::NotYetExpired)
        );

        bed.destination.complete(swap_id, &secret).await.unwrap();
        bed.destination_escrow.set_time(timelock + 10);
        assert_eq!(
            bed.destination.refund(swap_id).await,
            Err(LedgerError::AlreadyCompleted)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_refund_after_expiry_returns_funds_once() {
        let bed = TestBed::new();
        let secret = generate_secret();
        let hashlock = create_hashlock(&secret, PayoutHash::Sha256);
        let timelock = GENESIS + 600;
        let swap_id = bed.source.derive_swap_id(&hashlock, timelock);
        bed.source
            .lock(LockParams {
                swap_id,
                hashlock,
                recipient: crate::harness::SOURCE_RECIPIENT.into(),
                amount: 10,
                timelock,
            })
            .await
            .unwrap();

        bed.source_escrow.set_time(timelock + 1);
        bed.source.refund(swap_id).await.unwrap();
        assert_eq!(
            bed.source.refund(swap_id).await,
            Err(LedgerError::AlreadyRefunded)
        );
        assert_eq!(
            bed.source.complete(swap_id, &secret).await,
            Err(LedgerError::AlreadyRefunded)
        );
        assert_eq!(bed.source_escrow.escrowed(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_destination_down_for_whole_swap_refunds_source() {
        let bed = TestBed::new();
        let id = bed.service.initiate(bed.request(100, 100)).await.unwrap();
        bed.destination_escrow.fail_next_calls(u32::MAX);

        let status = bed.service.wait_terminal(&id).await.unwrap();
        assert_eq!(status.phase, SwapPhase::Refunded, "{:?}", status.error_detail);
        assert_eq!(bed.source_escrow.escrowed(), 0);
        assert_eq!(
            bed.source_escrow.balance_of(&bed.initiator.address()),
            STARTING_BALANCE
        );

        bed.destination_escrow.fail_next_calls(0);
        assert_atomic(&bed, &status).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_source_outage_after_reveal_completes_on_recovery() {
        let bed = TestBed::new();
        // Keeps the destination lock unconfirmed for a few polls.
        bed.destination_escrow.set_read_lag(3);
        let id = bed.service.initiate(bed.request(100, 100)).await.unwrap();
        while bed.destination_escrow.escrowed() == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        // Far longer than the retry budget, well short of the source timelock.
        bed.source_escrow.fail_next_calls(u32::MAX);
        tokio::time::sleep(Duration::from_secs(3_600)).await;
        assert_eq!(bed.destination_escrow.balance_of(&DESTINATION_RECIPIENT), 100);
        assert_eq!(
            bed.service.status(&id).unwrap().phase,
            SwapPhase::DestinationLocked
        );

        bed.source_escrow.fail_next_calls(0);
        let status = bed.service.wait_terminal(&id).await.unwrap();
        assert_eq!(status.phase, SwapPhase::Completed, "{:?}", status.error_detail);
        assert_atomic(&bed, &status).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_destination_survives_slow_source_confirmation() {
        let bed = TestBed::with_config(SwapConfig {
            default_destination_timelock_secs: 2 * 3_600,
            retry: RetryPolicy {
                max_attempts: 20,
                initial_interval_ms: 2_000,
                max_interval_ms: 30_000,
                multiplier: 2,
            },
            ..SwapConfig::for_testing()
        });
        // Source lock confirms only after several seconds of ledger time.
        bed.source_escrow.set_read_lag(2);

        let id = bed.service.initiate(bed.request(100, 100)).await.unwrap();
        let status = bed.service.wait_terminal(&id).await.unwrap();
        assert_eq!(status.phase, SwapPhase::Completed, "{:?}", status.error_detail);
        assert!(status.timelocks.destination >= GENESIS + 7_201 + 300);
        assert_atomic(&bed, &status).await;
    }
}
