use super::StageEnv;
use crate::calculator::effect_amount;
use crate::pass::{Pass, ProposedAdjustment};
use dsh_core::incentives::{AdjustmentTarget, EffectKind, IncentiveNotice, IncentiveSource};
use rust_decimal::Decimal;

/// Delivery-fee benefits of the customer's subscription plan.
///
/// The percentage discount respects the plan's delivery-fee floor. The flat
/// discount is applied on its own, whether or not the percentage fired.
pub(crate) fn apply(env: &StageEnv<'_>, pass: Pass) -> Pass {
    let Some(plan_id) = env.context.plan_id() else {
        return pass;
    };

    let Some(plan) = env.snapshot.active_plan(plan_id) else {
        return pass.notice(IncentiveNotice::SubscriptionPlanUnavailable {
            subscription_plan_id: plan_id.to_string(),
        });
    };

    let mut pass = pass;
    let features = &plan.features;

    if let Some(pct) = features
        .delivery_fee_pct_discount
        .filter(|pct| *pct > Decimal::ZERO)
    {
        let delivery_fee = pass.totals.delivery_fee;
        let discount = effect_amount(&EffectKind::Percent { value_pct: pct }, None, delivery_fee);
        if discount > 0 {
            let floor = features.min_delivery_fee_after_discount.unwrap_or(0);
            let max_possible = delivery_fee.saturating_sub(floor).max(0);
            let proposed = ProposedAdjustment::discount(
                format!("subscription:{}", plan.id),
                format!("Subscription ({})", plan.name_ar),
                IncentiveSource::Subscription,
                AdjustmentTarget::DeliveryFee,
                discount.min(max_possible),
            )
            .label_en(plan.name_en.as_ref().map(|name| format!("Subscription ({name})")))
            .meta("plan_id", plan.id.as_str())
            .meta("max_discount_possible", max_possible);
            pass = pass.apply(proposed).0;
        }
    }

    if let Some(flat) = features.delivery_fee_flat_discount.filter(|flat| *flat > 0) {
        let proposed = ProposedAdjustment::discount(
            format!("subscription-flat:{}", plan.id),
            format!("Subscription flat discount ({})", plan.name_ar),
            IncentiveSource::Subscription,
            AdjustmentTarget::DeliveryFee,
            flat,
        )
        .label_en(
            plan.name_en
                .as_ref()
                .map(|name| format!("Subscription flat discount ({name})")),
        )
        .meta("plan_id", plan.id.as_str());
        pass = pass.apply(proposed).0;
    }

    pass
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pass::RunningTotals;
    use crate::testkit::{context, default_snapshot};

    fn run(snapshot: &dsh_core::IncentivesSnapshot, subtotal: i64, fee: i64, plan: &str) -> Pass {
        let mut ctx = context(subtotal, fee);
        ctx.subscription_plan_id = Some(plan.to_string());
        let env = StageEnv::new(snapshot, &ctx, chrono::Utc::now());
        apply(&env, Pass::start(RunningTotals::new(subtotal, fee), "YER"))
    }

    #[test]
    fn test_percentage_discount_on_delivery_fee() {
        let snapshot = default_snapshot();
        let pass = run(&snapshot, 20000, 5000, "sub_user_pro_monthly");

        assert_eq!(pass.totals, RunningTotals::new(20000, 3500));
        assert_eq!(pass.adjustments.len(), 1);
        assert_eq!(pass.adjustments[0].id, "subscription:sub_user_pro_monthly");
        assert_eq!(pass.adjustments[0].amount.amount, 1500);
    }

    #[test]
    fn test_floor_limits_percentage_discount() {
        let snapshot = default_snapshot();
        // 30% of 600 is 180, but the plan keeps at least 500.
        let pass = run(&snapshot, 20000, 600, "sub_user_pro_monthly");

        assert_eq!(pass.totals.delivery_fee, 500);
        assert_eq!(pass.adjustments[0].amount.amount, 100);
    }

    #[test]
    fn test_fee_already_at_floor_records_nothing() {
        let snapshot = default_snapshot();
        let pass = run(&snapshot, 20000, 500, "sub_user_pro_monthly");

        assert!(pass.adjustments.is_empty());
        assert_eq!(pass.totals.delivery_fee, 500);
    }

    #[test]
    fn test_flat_discount_applies_independently() {
        let mut snapshot = default_snapshot();
        let plan = snapshot
            .subscription_plans
            .iter_mut()
            .find(|plan| plan.id == "sub_user_pro_monthly")
            .unwrap();
        plan.features.delivery_fee_flat_discount = Some(500);
        plan.features.min_delivery_fee_after_discount = Some(1000);

        // Percentage is fully blocked by the floor, the flat discount still fires.
        let pass = run(&snapshot, 10000, 1000, "sub_user_pro_monthly");
        assert_eq!(pass.totals.delivery_fee, 500);
        assert_eq!(pass.adjustments.len(), 1);
        assert!(pass.adjustments[0].id.starts_with("subscription-flat"));
    }

    #[test]
    fn test_blank_plan_id_is_ignored() {
        let snapshot = default_snapshot();
        let pass = run(&snapshot, 10000, 2000, "   ");

        assert!(pass.adjustments.is_empty());
        assert!(pass.notices.is_empty());
    }

    #[test]
    fn test_plan_id_is_trimmed_before_lookup() {
        let snapshot = default_snapshot();
        let pass = run(&snapshot, 20000, 5000, " sub_user_pro_monthly ");
        assert_eq!(pass.totals.delivery_fee, 3500);
    }

    #[test]
    fn test_inactive_plan_emits_notice() {
        let snapshot = default_snapshot();
        let pass = run(&snapshot, 10000, 2000, "sub_user_legacy");

        assert!(pass.adjustments.is_empty());
        assert_eq!(
            pass.notices,
            vec![IncentiveNotice::SubscriptionPlanUnavailable {
                subscription_plan_id: "sub_user_legacy".to_string()
            }]
        );
    }
}
