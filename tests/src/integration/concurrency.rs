//! # Concurrency and Cancellation
//!
//! Many swaps share the same adapters; each runs its own orchestrator task
//! and none may observe another's state.

#[cfg(test)]
mod tests {
    use crate::harness::{TestBed, DESTINATION_RECIPIENT, STARTING_BALANCE};
    use htlc_swap::{LedgerAdapter, SwapError, SwapPhase};
    use std::collections::HashSet;
    use tokio::task::JoinSet;

    #[tokio::test(start_paused = true)]
    async fn test_many_swaps_complete_independently() {
        let bed = TestBed::new();
        let mut ids = Vec::new();
        for i in 1..=8u128 {
            let id = bed
                .service
                .initiate(bed.request(100 * i, 10 * i))
                .await
                .unwrap();
            ids.push(id);
        }
        let distinct: HashSet<_> = ids.iter().collect();
        assert_eq!(distinct.len(), ids.len());

        let mut waits = JoinSet::new();
        for id in ids.clone() {
            let service = bed.service.clone();
            waits.spawn(async move { service.wait_terminal(&id).await });
        }
        while let Some(result) = waits.join_next().await {
            let status = result.unwrap().unwrap();
            assert_eq!(status.phase, SwapPhase::Completed, "{:?}", status.error_detail);
        }

        let total_source: u128 = (1..=8u128).map(|i| 100 * i).sum();
        let total_destination: u128 = (1..=8u128).map(|i| 10 * i).sum();
        assert_eq!(
            bed.source_escrow.balance_of(&TestBed::source_recipient_bytes()),
            total_source
        );
        assert_eq!(
            bed.destination_escrow.balance_of(&DESTINATION_RECIPIENT),
            total_destination
        );
        assert_eq!(bed.source_escrow.escrowed(), 0);
        assert_eq!(bed.destination_escrow.escrowed(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_initiation_from_tasks() {
        let bed = TestBed::new();
        let mut set = JoinSet::new();
        for _ in 0..6 {
            let service = bed.service.clone();
            let request = bed.request(5, 5);
            set.spawn(async move {
                let id = service.initiate(request).await?;
                service.wait_terminal(&id).await
            });
        }
        let mut completed = 0;
        while let Some(result) = set.join_next().await {
            if result.unwrap().unwrap().phase == SwapPhase::Completed {
                completed += 1;
            }
        }
        assert_eq!(completed, 6);
        assert!(bed.service.archive_terminal() <= 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mixed_outcomes_do_not_interfere() {
        let bed = TestBed::new();
        let good = bed.service.initiate(bed.request(100, 100)).await.unwrap();
        // More than the counterparty holds: this one must refund.
        let bad = bed
            .service
            .initiate(bed.request(100, STARTING_BALANCE + 1))
            .await
            .unwrap();

        let good = bed.service.wait_terminal(&good).await.unwrap();
        let bad = bed.service.wait_terminal(&bad).await.unwrap();
        assert_eq!(good.phase, SwapPhase::Completed);
        assert_eq!(bad.phase, SwapPhase::Refunded);
        assert_eq!(bed.source_escrow.escrowed(), 0);
        assert_eq!(
            bed.source_escrow.balance_of(&bed.initiator.address()),
            STARTING_BALANCE - 100
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_lock_leaves_no_lock() {
        let bed = TestBed::new();
        let id = bed.service.initiate(bed.request(100, 100)).await.unwrap();

        // The orchestrator task has not been polled yet.
        let status = bed.service.cancel(&id).unwrap();
        assert_eq!(status.phase, SwapPhase::Failed);
        assert_eq!(status.error_detail.as_deref(), Some("cancelled by operator"));

        let status = bed.service.wait_terminal(&id).await.unwrap();
        assert_eq!(status.phase, SwapPhase::Failed);
        assert!(status.tx_history.is_empty());
        assert_eq!(bed.source.query(id).await.unwrap(), None);
        assert_eq!(bed.source_escrow.escrowed(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_after_lock_submitted_rejected() {
        let bed = TestBed::new();
        // Slow the source ledger so the lock stays in flight.
        bed.source_escrow.set_read_lag(5);
        let id = bed.service.initiate(bed.request(100, 100)).await.unwrap();

        // Let the orchestrator reach the source lock.
        while bed.source_escrow.escrowed() == 0 {
            tokio::task::yield_now().await;
        }
        let err = bed.service.cancel(&id).unwrap_err();
        assert!(matches!(err, SwapError::CancellationRejected { .. }));

        let status = bed.service.wait_terminal(&id).await.unwrap();
        assert_eq!(status.phase, SwapPhase::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_archive_keeps_status_and_drops_active_entry() {
        let bed = TestBed::new();
        let id = bed.service.initiate(bed.request(1, 1)).await.unwrap();
        let status = bed.service.wait_terminal(&id).await.unwrap();

        while bed.service.archive_terminal() == 0 {
            tokio::task::yield_now().await;
        }
        assert_eq!(bed.service.active_count(), 0);
        assert_eq!(bed.service.status(&id).unwrap(), status);
        assert!(matches!(
            bed.service.cancel(&id),
            Err(SwapError::TerminalPhase { .. })
        ));
    }
}
