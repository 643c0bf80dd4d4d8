//! Scope and condition predicates for discount rules and coupons.
//!
//! Every predicate fails closed: a restricted field with no matching context
//! value rejects the rule. Absent or empty restrictions always match.

use chrono::{DateTime, Datelike, FixedOffset, NaiveTime, Timelike, Utc, Weekday};
use dsh_core::incentives::{DiscountRule, IncentiveContext, SCOPE_ALL};

/// Day and minute-resolution time of the calculation, in service-local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalClock {
    pub day: Weekday,
    pub time: NaiveTime,
}

impl LocalClock {
    pub fn at(timestamp: DateTime<Utc>, offset: FixedOffset) -> Self {
        let local = timestamp.with_timezone(&offset);
        Self {
            day: local.weekday(),
            time: NaiveTime::from_hms_opt(local.hour(), local.minute(), 0).unwrap_or_default(),
        }
    }
}

/// Empty lists and the `ALL` sentinel match anything; otherwise the candidate
/// must be present and listed.
pub fn matches_string_scope(values: &[String], candidate: Option<&str>) -> bool {
    if values.is_empty() || values.iter().any(|value| value == SCOPE_ALL) {
        return true;
    }
    match candidate {
        Some(candidate) => values.iter().any(|value| value == candidate),
        None => false,
    }
}

pub fn matches_scope(
    rule: &DiscountRule,
    service: &str,
    context: &IncentiveContext,
    clock: LocalClock,
) -> bool {
    let scope = &rule.scope;
    if let Some(rule_service) = scope.service.as_deref() {
        if rule_service != service {
            return false;
        }
    }
    if !matches_string_scope(&scope.cities, context.city.as_deref()) {
        return false;
    }
    if !matches_string_scope(&scope.categories, context.category.as_deref()) {
        return false;
    }
    if !scope.days_of_week.is_empty() && !scope.days_of_week.contains(&clock.day) {
        return false;
    }
    if let Some(range) = scope.time_range {
        if !range.contains(clock.time) {
            return false;
        }
    }
    true
}

/// Inclusive bounds on the base subtotal.
pub fn matches_condition(rule: &DiscountRule, context: &IncentiveContext) -> bool {
    let condition = &rule.condition;
    if let Some(min) = condition.min_basket_total {
        if context.base_subtotal < min {
            return false;
        }
    }
    if let Some(max) = condition.max_basket_total {
        if context.base_subtotal > max {
            return false;
        }
    }
    true
}
