//! # Properties
//!
//! proptest checks over the pure swap computations.

#[cfg(test)]
mod tests {
    use htlc_swap::adapters::LedgerProfile;
    use htlc_swap::algorithms::{compute_timelocks, derive_swap_id, LedgerClock};
    use htlc_swap::{
        create_hashlock, verify_secret, LedgerKind, LedgerSide, PayoutHash, PerLedger,
        SecureSecret, SwapError, TimelockRequest, MIN_SAFETY_MARGIN_SECS,
    };
    use proptest::prelude::*;

    const NOW: u64 = 1_700_000_000;
    const DAY: u64 = 24 * 3_600;

    fn clocks(source_now: u64, destination_now: u64) -> PerLedger<LedgerClock> {
        PerLedger::new(
            LedgerClock {
                now: source_now,
                bounds: LedgerProfile::evm(LedgerSide::Source).bounds,
            },
            LedgerClock {
                now: destination_now,
                bounds: LedgerProfile::near(LedgerSide::Destination).bounds,
            },
        )
    }

    proptest! {
        #[test]
        fn prop_relative_timelocks_ordered_and_in_bounds(
            source_secs in 0u64..10 * DAY,
            destination_secs in 0u64..10 * DAY,
            skew in 0u64..600,
            headroom in 0u64..600,
        ) {
            let clocks = clocks(NOW, NOW + skew);
            let request = TimelockRequest::Relative { source_secs, destination_secs };
            match compute_timelocks(request, &clocks, MIN_SAFETY_MARGIN_SECS, headroom) {
                Ok(locks) => {
                    prop_assert!(locks.destination + MIN_SAFETY_MARGIN_SECS < locks.source);
                    prop_assert!(
                        locks.source >= clocks.source.bounds.earliest(clocks.source.now) + headroom
                    );
                    prop_assert!(
                        locks.destination
                            >= clocks.destination.bounds.earliest(clocks.destination.now) + headroom
                    );
                    prop_assert!(clocks.source.bounds.contains(clocks.source.now, locks.source));
                    prop_assert!(clocks
                        .destination
                        .bounds
                        .contains(clocks.destination.now, locks.destination));
                }
                Err(e) => prop_assert!(matches!(e, SwapError::TimelockUnsatisfiable(_))),
            }
        }

        #[test]
        fn prop_explicit_timelocks_never_adjusted(
            source_offset in 0u64..2 * DAY,
            destination_offset in 0u64..2 * DAY,
            headroom in 0u64..600,
        ) {
            let clocks = clocks(NOW, NOW);
            let source = NOW + source_offset;
            let destination = NOW + destination_offset;
            let request = TimelockRequest::Explicit { source, destination };

            let (src_bounds, dst_bounds) = (clocks.source.bounds, clocks.destination.bounds);
            let acceptable = source >= src_bounds.earliest(NOW) + headroom
                && source <= src_bounds.latest(NOW)
                && destination >= dst_bounds.earliest(NOW) + headroom
                && destination <= dst_bounds.latest(NOW)
                && destination + MIN_SAFETY_MARGIN_SECS < source;
            match compute_timelocks(request, &clocks, MIN_SAFETY_MARGIN_SECS, headroom) {
                Ok(locks) => {
                    prop_assert!(acceptable);
                    prop_assert_eq!(locks.source, source);
                    prop_assert_eq!(locks.destination, destination);
                }
                Err(_) => prop_assert!(!acceptable),
            }
        }

        #[test]
        fn prop_swap_id_deterministic_and_timelock_sensitive(
            hashlock in any::<[u8; 32]>(),
            initiator in any::<[u8; 32]>(),
            timelock in NOW..NOW + 30 * DAY,
        ) {
            for kind in [LedgerKind::Evm, LedgerKind::Near] {
                let id = derive_swap_id(kind, &hashlock, &initiator, timelock);
                prop_assert_eq!(id, derive_swap_id(kind, &hashlock, &initiator, timelock));
                prop_assert_ne!(id, derive_swap_id(kind, &hashlock, &initiator, timelock + 1));
            }
            prop_assert_ne!(
                derive_swap_id(LedgerKind::Evm, &hashlock, &initiator, timelock),
                derive_swap_id(LedgerKind::Near, &hashlock, &initiator, timelock)
            );
        }

        #[test]
        fn prop_hashlock_verifies_only_its_secret(
            secret in any::<[u8; 32]>(),
            other in any::<[u8; 32]>(),
        ) {
            let hashlock = create_hashlock(&SecureSecret::new(secret), PayoutHash::Sha256);
            prop_assert!(verify_secret(&secret, &hashlock, PayoutHash::Sha256));
            prop_assert!(!verify_secret(&secret, &hashlock, PayoutHash::Keccak256));
            if other != secret {
                prop_assert!(!verify_secret(&other, &hashlock, PayoutHash::Sha256));
            }
        }
    }
}
