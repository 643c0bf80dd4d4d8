//! Reconstruct final totals from a persisted adjustment trail.

use crate::pass::RunningTotals;
use dsh_core::incentives::{IncentiveAdjustment, IncentiveContext, IncentivesCalculationResult};
use dsh_core::money::MinorUnits;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuditMismatch {
    #[error("adjustment {id} has non-positive amount {amount}")]
    NonPositiveAmount { id: String, amount: MinorUnits },

    #[error("subtotal mismatch: replayed {replayed}, recorded {recorded}")]
    Subtotal {
        replayed: MinorUnits,
        recorded: MinorUnits,
    },

    #[error("delivery fee mismatch: replayed {replayed}, recorded {recorded}")]
    DeliveryFee {
        replayed: MinorUnits,
        recorded: MinorUnits,
    },

    #[error("subtotal {subtotal} + delivery fee {delivery_fee} overflows")]
    Overflow {
        subtotal: MinorUnits,
        delivery_fee: MinorUnits,
    },

    #[error("total {total} is not subtotal + delivery fee ({expected})")]
    Total {
        total: MinorUnits,
        expected: MinorUnits,
    },
}

/// Apply `adjustments` in order to the base totals.
pub fn replay(
    base_subtotal: MinorUnits,
    base_delivery_fee: MinorUnits,
    adjustments: &[IncentiveAdjustment],
) -> RunningTotals {
    adjustments.iter().fold(
        RunningTotals::new(base_subtotal, base_delivery_fee),
        |totals, adjustment| totals.shifted(adjustment.target, adjustment.signed_amount()),
    )
}

/// Check that `result` is exactly what its own adjustment trail produces.
pub fn verify(
    context: &IncentiveContext,
    result: &IncentivesCalculationResult,
) -> Result<RunningTotals, AuditMismatch> {
    if let Some(bad) = result.adjustments.iter().find(|adj| adj.amount.amount <= 0) {
        return Err(AuditMismatch::NonPositiveAmount {
            id: bad.id.clone(),
            amount: bad.amount.amount,
        });
    }

    let (subtotal, delivery_fee) = (result.subtotal.amount, result.delivery_fee.amount);
    let expected = subtotal
        .checked_add(delivery_fee)
        .ok_or(AuditMismatch::Overflow {
            subtotal,
            delivery_fee,
        })?;
    if result.total.amount != expected {
        return Err(AuditMismatch::Total {
            total: result.total.amount,
            expected,
        });
    }

    let replayed = replay(
        context.base_subtotal,
        context.base_delivery_fee,
        &result.adjustments,
    );
    if replayed.subtotal != result.subtotal.amount {
        return Err(AuditMismatch::Subtotal {
            replayed: replayed.subtotal,
            recorded: result.subtotal.amount,
        });
    }
    if replayed.delivery_fee != result.delivery_fee.amount {
        return Err(AuditMismatch::DeliveryFee {
            replayed: replayed.delivery_fee,
            recorded: result.delivery_fee.amount,
        });
    }
    Ok(replayed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::IncentivesEngine;
    use crate::testkit::{context, default_snapshot, weekday_noon};
    use dsh_core::incentives::UserType;

    fn stacked_result() -> (IncentiveContext, IncentivesCalculationResult) {
        let mut ctx = context(6000, 500);
        ctx.coupon_code = Some("WELCOME10".to_string());
        ctx.user_type = UserType::New;
        ctx.points_to_redeem = Some(2000);

        let mut snapshot = default_snapshot();
        snapshot.stacking_policy.guards.min_net_total = Some(5000);
        let result = IncentivesEngine::new(snapshot).apply_at(&ctx, weekday_noon());
        (ctx, result)
    }

    #[test]
    fn test_replay_reproduces_engine_totals() {
        let (ctx, result) = stacked_result();
        let totals = verify(&ctx, &result).unwrap();
        assert_eq!(totals.total(), result.total.amount);
    }

    #[test]
    fn test_tampered_amount_is_detected() {
        let (ctx, mut result) = stacked_result();
        let coupon = result
            .adjustments
            .iter_mut()
            .find(|adj| adj.id == "coupon:WELCOME10")
            .unwrap();
        coupon.amount.amount += 1;
        assert!(matches!(
            verify(&ctx, &result),
            Err(AuditMismatch::Subtotal { .. })
        ));
    }

    #[test]
    fn test_inconsistent_total_is_detected() {
        let (ctx, mut result) = stacked_result();
        result.total.amount += 10;
        assert!(matches!(
            verify(&ctx, &result),
            Err(AuditMismatch::Total { .. })
        ));
    }

    #[test]
    fn test_overflowing_recorded_totals_are_rejected() {
        let (ctx, mut result) = stacked_result();
        result.subtotal.amount = i64::MAX;
        result.delivery_fee.amount = 1;
        assert_eq!(
            verify(&ctx, &result),
            Err(AuditMismatch::Overflow {
                subtotal: i64::MAX,
                delivery_fee: 1,
            })
        );
    }

    #[test]
    fn test_empty_trail_replays_to_base() {
        assert_eq!(replay(1200, 300, &[]), RunningTotals::new(1200, 300));
    }
}
