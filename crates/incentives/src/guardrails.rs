//! Aggregate guards enforced after every promotional stage.
//!
//! Guards only ever add surcharges to the delivery fee; they never touch the
//! discounts already recorded. Each guard sees the totals left by the one
//! before it.

use crate::pass::{Pass, ProposedAdjustment};
use dsh_core::incentives::{AdjustmentTarget, GuardrailViolation, Guardrails, IncentiveContext};
use dsh_core::money::remaining_after_percent_ceil;

pub(crate) fn enforce(guards: &Guardrails, context: &IncentiveContext, pass: Pass) -> Pass {
    let pass = enforce_max_discount_pct(guards, context, pass);
    let pass = enforce_min_net_total(guards, pass);
    enforce_positive_total(guards, pass)
}

/// Keep the total at or above `ceil(gross * (1 - pct / 100))`.
fn enforce_max_discount_pct(guards: &Guardrails, context: &IncentiveContext, pass: Pass) -> Pass {
    let Some(pct) = guards.max_total_discount_pct else {
        return pass;
    };
    let gross = context.gross_total();
    if gross <= 0 {
        return pass;
    }

    let min_allowed = remaining_after_percent_ceil(gross, pct);
    let shortfall = min_allowed.saturating_sub(pass.totals.total());
    if shortfall <= 0 {
        return pass;
    }

    let proposed = ProposedAdjustment::surcharge(
        "guard:max_discount_pct",
        "ضبط الحد الأقصى للخصم",
        AdjustmentTarget::DeliveryFee,
        shortfall,
    )
    .label_en(Some("Guardrail rollback (max discount %)".to_string()))
    .meta("max_pct", pct.to_string())
    .meta("min_allowed_total", min_allowed);
    surcharge(pass, proposed, GuardrailViolation::MaxTotalDiscountPct)
}

fn enforce_min_net_total(guards: &Guardrails, pass: Pass) -> Pass {
    let Some(min_net) = guards.min_net_total else {
        return pass;
    };
    let shortfall = min_net.saturating_sub(pass.totals.total());
    if shortfall <= 0 {
        return pass;
    }

    let proposed = ProposedAdjustment::surcharge(
        "guard:min_net_total",
        "ضبط الحد الأدنى للإجمالي",
        AdjustmentTarget::DeliveryFee,
        shortfall,
    )
    .label_en(Some("Guardrail rollback (min net total)".to_string()))
    .meta("min_net_total", min_net);
    surcharge(pass, proposed, GuardrailViolation::MinNetTotal)
}

fn enforce_positive_total(guards: &Guardrails, pass: Pass) -> Pass {
    if !guards.prevent_negative_or_zero_price || pass.totals.total() > 0 {
        return pass;
    }

    let proposed = ProposedAdjustment::surcharge(
        "guard:prevent_negative",
        "منع السعر الصفري",
        AdjustmentTarget::DeliveryFee,
        1,
    )
    .label_en(Some("Guardrail rollback (non-positive total)".to_string()));
    surcharge(pass, proposed, GuardrailViolation::PreventNegativeOrZeroPrice)
}

fn surcharge(pass: Pass, proposed: ProposedAdjustment, violation: GuardrailViolation) -> Pass {
    let (pass, applied) = pass.apply(proposed);
    if applied > 0 {
        pass.violation(violation)
    } else {
        pass
    }
}
