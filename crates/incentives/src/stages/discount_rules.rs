use super::StageEnv;
use crate::calculator::calculate_effect_amount;
use crate::pass::{Pass, ProposedAdjustment};
use crate::scope::{matches_condition, matches_scope};
use dsh_core::incentives::{DiscountRule, IncentiveSource};

/// Every active, in-scope rule applies, in configured order, each one seeing
/// the totals left by the rules before it.
pub(crate) fn apply(env: &StageEnv<'_>, pass: Pass) -> Pass {
    env.snapshot
        .discount_rules
        .iter()
        .fold(pass, |pass, rule| apply_rule(env, pass, rule))
}

fn apply_rule(env: &StageEnv<'_>, pass: Pass, rule: &DiscountRule) -> Pass {
    if !rule.active
        || !matches_scope(rule, env.service, env.context, env.clock)
        || !matches_condition(rule, env.context)
    {
        return pass;
    }

    let target = rule.effect.target.resolve();
    let amount = calculate_effect_amount(&rule.effect, pass.totals.value_of(target));
    if amount <= 0 {
        return pass;
    }

    let proposed = ProposedAdjustment::discount(
        format!("discount:{}", rule.id),
        rule.name_ar.as_str(),
        IncentiveSource::DiscountRule,
        target,
        amount,
    )
    .label_en(rule.name_en.clone())
    .meta("rule_id", rule.id.as_str())
    .meta_opt("funding", rule.funding.as_ref())
    .meta_opt("ledger", rule.ledger.as_ref());
    pass.apply(proposed).0
}
