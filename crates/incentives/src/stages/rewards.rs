use super::StageEnv;
use crate::pass::{Pass, ProposedAdjustment};
use dsh_core::incentives::{AdjustmentTarget, IncentiveNotice, IncentiveSource};
use dsh_core::money::percent_of_floor;
use tracing::info;

/// Loyalty-point redemption.
///
/// The allowance is the requested value capped by a share of the base gross
/// total. It is spread over delivery fee and basket according to `apply_to`,
/// and `points_redeemed` reflects only what was actually applied.
pub(crate) fn apply(env: &StageEnv<'_>, pass: Pass) -> Pass {
    let points = match env.context.points_to_redeem {
        Some(points) if points > 0 => points,
        _ => return pass,
    };

    let program = &env.snapshot.rewards_program;
    let rules = &program.redemption;
    if !program.enabled || !rules.enabled {
        return pass.notice(IncentiveNotice::RewardsDisabled {
            points_requested: points,
        });
    }

    let limits = &rules.limits;
    if let Some(min_basket) = limits.min_basket_total_to_redeem {
        if env.context.base_subtotal < min_basket {
            return pass.notice(IncentiveNotice::RewardsBelowMinimumBasket {
                min_basket_total: min_basket,
                basket_total: env.context.base_subtotal,
            });
        }
    }

    let ratio = rules.conversion;
    if !ratio.is_valid() {
        return pass.notice(IncentiveNotice::RewardsInvalidConversion {
            points: ratio.points,
            currency_units: ratio.currency_units,
        });
    }

    let requested = ratio.value_of(points);
    if requested <= 0 {
        return pass;
    }

    let allowance = match limits.max_discount_pct_per_order {
        Some(pct) => requested.min(percent_of_floor(env.context.gross_total(), pct)),
        None => requested,
    };
    if allowance <= 0 {
        return pass;
    }

    let mut pass = pass;
    let mut remaining = allowance;
    let apply_to = limits.apply_to;

    if apply_to.delivery_fee_first() {
        let proposed = leg(AdjustmentTarget::DeliveryFee, remaining, points);
        let (next, applied) = pass.apply(proposed);
        pass = next;
        remaining -= applied;
    }
    if apply_to.allows_basket() && remaining > 0 {
        let proposed = leg(AdjustmentTarget::BasketTotal, remaining, points);
        let (next, applied) = pass.apply(proposed);
        pass = next;
        remaining -= applied;
    }

    let applied_total = allowance - remaining;
    let redeemed = ratio.points_for(applied_total);
    if redeemed > 0 {
        info!(
            points_requested = points,
            points_redeemed = redeemed,
            value = applied_total,
            "Rewards points redeemed"
        );
        metrics::counter!("incentives.points_redeemed").increment(redeemed.unsigned_abs());
        pass.points_redeemed = redeemed;
    }
    pass
}

fn leg(target: AdjustmentTarget, amount: i64, points_requested: i64) -> ProposedAdjustment {
    let (id, label, label_en) = match target {
        AdjustmentTarget::DeliveryFee => (
            "rewards:delivery",
            "استبدال النقاط (التوصيل)",
            "Rewards Redemption (delivery)",
        ),
        AdjustmentTarget::BasketTotal => (
            "rewards:basket",
            "استبدال النقاط (السلة)",
            "Rewards Redemption (basket)",
        ),
    };
    ProposedAdjustment::discount(id, label, IncentiveSource::Rewards, target, amount)
        .label_en(Some(label_en.to_string()))
        .meta("points_requested", points_requested)
}
