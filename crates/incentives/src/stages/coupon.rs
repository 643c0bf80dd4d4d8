use super::StageEnv;
use crate::calculator::calculate_effect_amount;
use crate::pass::{Pass, ProposedAdjustment};
use crate::scope::matches_string_scope;
use dsh_core::incentives::{
    CouponDefinition, EligibleUserType, IncentiveContext, IncentiveNotice, IncentiveSource,
    UserType,
};

/// Customer-submitted coupon, applied last among the promotional stages.
pub(crate) fn apply(env: &StageEnv<'_>, pass: Pass) -> Pass {
    let Some(requested) = env
        .context
        .coupon_code
        .as_deref()
        .filter(|code| !code.trim().is_empty())
    else {
        return pass;
    };

    let Some(coupon) = env.snapshot.find_active_coupon(requested) else {
        return pass.notice(IncentiveNotice::CouponUnavailable {
            coupon_code: requested.to_string(),
        });
    };

    if !is_eligible(coupon, env) {
        return pass.notice(IncentiveNotice::CouponIneligible {
            coupon_code: requested.to_string(),
            user_type: env.context.user_type,
        });
    }

    let target = coupon.effect.target;
    let amount = calculate_effect_amount(&coupon.effect, pass.totals.value_of(target));
    if amount <= 0 {
        return pass;
    }

    let proposed = ProposedAdjustment::discount(
        format!("coupon:{}", coupon.code),
        coupon.name_ar.as_str(),
        IncentiveSource::Coupon,
        target,
        amount,
    )
    .label_en(coupon.name_en.clone())
    .meta("coupon_code", coupon.code.as_str())
    .meta_opt("funding", coupon.funding.as_ref());

    let (mut pass, applied) = pass.apply(proposed);
    if applied > 0 {
        pass.applied_coupon_code = Some(coupon.code.clone());
    }
    pass
}

fn is_eligible(coupon: &CouponDefinition, env: &StageEnv<'_>) -> bool {
    let context = env.context;
    let scope = &coupon.scope;

    if !matches_string_scope(&scope.cities, context.city.as_deref())
        || !matches_string_scope(&scope.categories, context.category.as_deref())
    {
        return false;
    }
    if !scope
        .eligible_user_types
        .iter()
        .any(|eligible| user_type_matches(*eligible, context))
    {
        return false;
    }
    if let Some(min) = coupon.limits.min_basket_total {
        if context.base_subtotal < min {
            return false;
        }
    }
    coupon
        .validity
        .map(|window| window.contains(env.now))
        .unwrap_or(true)
}

fn user_type_matches(eligible: EligibleUserType, context: &IncentiveContext) -> bool {
    match eligible {
        EligibleUserType::All => true,
        EligibleUserType::NewUsersOnly => context.user_type == UserType::New,
        EligibleUserType::SubscribersOnly => context.has_subscription(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pass::RunningTotals;
    use crate::testkit::{context, default_snapshot};
    use chrono::{TimeZone, Utc};
    use dsh_core::incentives::{AdjustmentTarget, IncentivesSnapshot};

    fn run(snapshot: &IncentivesSnapshot, ctx: &IncentiveContext) -> Pass {
        let env = StageEnv::new(snapshot, ctx, Utc::now());
        apply(
            &env,
            Pass::start(
                RunningTotals::new(ctx.base_subtotal, ctx.base_delivery_fee),
                "YER",
            ),
        )
    }

    fn with_coupon(subtotal: i64, fee: i64, code: &str, user_type: UserType) -> IncentiveContext {
        let mut ctx = context(subtotal, fee);
        ctx.coupon_code = Some(code.to_string());
        ctx.user_type = user_type;
        ctx
    }

    #[test]
    fn test_welcome_coupon_for_new_user() {
        let snapshot = default_snapshot();
        let pass = run(&snapshot, &with_coupon(15000, 5000, "WELCOME10", UserType::New));

        assert_eq!(pass.totals, RunningTotals::new(13500, 5000));
        assert_eq!(pass.adjustments[0].id, "coupon:WELCOME10");
        assert_eq!(pass.applied_coupon_code.as_deref(), Some("WELCOME10"));
    }

    #[test]
    fn test_code_lookup_ignores_case_and_returns_canonical_code() {
        let snapshot = default_snapshot();
        let pass = run(&snapshot, &with_coupon(15000, 5000, "  welcome10 ", UserType::New));

        assert_eq!(pass.applied_coupon_code.as_deref(), Some("WELCOME10"));
    }

    #[test]
    fn test_existing_user_is_ineligible_for_welcome() {
        let snapshot = default_snapshot();
        let pass = run(&snapshot, &with_coupon(12000, 4000, "WELCOME10", UserType::Existing));

        assert!(pass.adjustments.is_empty());
        assert!(pass.applied_coupon_code.is_none());
        assert_eq!(
            pass.notices,
            vec![IncentiveNotice::CouponIneligible {
                coupon_code: "WELCOME10".to_string(),
                user_type: UserType::Existing,
            }]
        );
    }

    #[test]
    fn test_inactive_or_unknown_coupon_emits_notice() {
        let snapshot = default_snapshot();
        for code in ["EXPIRED", "NOPE"] {
            let pass = run(&snapshot, &with_coupon(20000, 3000, code, UserType::New));
            assert!(pass.adjustments.is_empty());
            assert_eq!(pass.notices[0].kind(), "coupon_unavailable");
        }
    }

    #[test]
    fn test_min_basket_uses_base_subtotal() {
        let snapshot = default_snapshot();
        let pass = run(&snapshot, &with_coupon(4999, 3000, "WELCOME10", UserType::New));
        assert_eq!(pass.notices[0].kind(), "coupon_ineligible");
    }

    #[test]
    fn test_city_scope_fails_closed() {
        let snapshot = default_snapshot();
        let mut ctx = with_coupon(10000, 3000, "FREESHIP", UserType::Existing);
        let pass = run(&snapshot, &ctx);
        assert_eq!(pass.notices[0].kind(), "coupon_ineligible");

        ctx.city = Some("Aden".to_string());
        let pass = run(&snapshot, &ctx);
        assert_eq!(pass.adjustments[0].target, AdjustmentTarget::DeliveryFee);
        assert_eq!(pass.totals, RunningTotals::new(10000, 0));
    }

    #[test]
    fn test_subscribers_only_needs_plan_id() {
        let snapshot = default_snapshot();
        let mut ctx = with_coupon(12000, 3000, "SAVE2000", UserType::Subscriber);
        assert_eq!(run(&snapshot, &ctx).notices[0].kind(), "coupon_ineligible");

        ctx.subscription_plan_id = Some("sub_user_pro_monthly".to_string());
        let pass = run(&snapshot, &ctx);
        assert_eq!(pass.totals.subtotal, 10000);
    }

    #[test]
    fn test_validity_window_uses_calculation_time() {
        let snapshot = default_snapshot();
        let mut ctx = with_coupon(12000, 3000, "SAVE2000", UserType::Subscriber);
        ctx.subscription_plan_id = Some("sub_user_pro_monthly".to_string());
        ctx.timestamp = Some(Utc.with_ymd_and_hms(2031, 1, 1, 0, 0, 0).unwrap());

        let pass = run(&snapshot, &ctx);
        assert!(pass.adjustments.is_empty());
        assert_eq!(pass.notices[0].kind(), "coupon_ineligible");
    }

    #[test]
    fn test_nothing_applied_leaves_code_unset() {
        let snapshot = default_snapshot();
        // Free delivery on a zero fee computes to nothing.
        let mut ctx = with_coupon(10000, 0, "FREESHIP", UserType::Existing);
        ctx.city = Some("Sanaa".to_string());
        let pass = run(&snapshot, &ctx);

        assert!(pass.adjustments.is_empty());
        assert!(pass.applied_coupon_code.is_none());
        assert!(pass.notices.is_empty());
    }
}
