//! Running state threaded through the pricing stages.
//!
//! A [`Pass`] is moved into each stage and a new one is returned; stages
//! never share a mutable reference to the totals. All adjustments go through
//! [`Pass::apply`], which clamps discounts to the current value of their
//! target and records only what was actually applied.

use dsh_core::incentives::{
    AdjustmentMode, AdjustmentTarget, GuardrailViolation, IncentiveAdjustment, IncentiveNotice,
    IncentiveSource,
};
use dsh_core::money::{clamp_amount, MinorUnits, MoneyAmount, MAX_AMOUNT};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Current subtotal and delivery fee, each kept within `[0, MAX_AMOUNT]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunningTotals {
    pub subtotal: MinorUnits,
    pub delivery_fee: MinorUnits,
}

impl RunningTotals {
    pub fn new(subtotal: MinorUnits, delivery_fee: MinorUnits) -> Self {
        Self {
            subtotal: clamp_amount(subtotal),
            delivery_fee: clamp_amount(delivery_fee),
        }
    }

    pub fn value_of(&self, target: AdjustmentTarget) -> MinorUnits {
        match target {
            AdjustmentTarget::BasketTotal => self.subtotal,
            AdjustmentTarget::DeliveryFee => self.delivery_fee,
        }
    }

    /// Exact: both sides are bounded by `MAX_AMOUNT`.
    pub fn total(&self) -> MinorUnits {
        self.subtotal + self.delivery_fee
    }

    /// Shift one target by `delta`, clamped back into `[0, MAX_AMOUNT]`.
    pub fn shifted(self, target: AdjustmentTarget, delta: MinorUnits) -> Self {
        let next = |value: MinorUnits| clamp_amount(value.saturating_add(delta));
        match target {
            AdjustmentTarget::BasketTotal => Self {
                subtotal: next(self.subtotal),
                ..self
            },
            AdjustmentTarget::DeliveryFee => Self {
                delivery_fee: next(self.delivery_fee),
                ..self
            },
        }
    }
}

/// An adjustment a stage wants to make, before clamping.
#[derive(Debug, Clone, PartialEq)]
pub struct ProposedAdjustment {
    id: String,
    label: String,
    label_en: Option<String>,
    source: IncentiveSource,
    target: AdjustmentTarget,
    amount: MinorUnits,
    mode: AdjustmentMode,
    metadata: Map<String, Value>,
}

impl ProposedAdjustment {
    pub fn discount(
        id: impl Into<String>,
        label: impl Into<String>,
        source: IncentiveSource,
        target: AdjustmentTarget,
        amount: MinorUnits,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            label_en: None,
            source,
            target,
            amount,
            mode: AdjustmentMode::Discount,
            metadata: Map::new(),
        }
    }

    /// Guard rollbacks only; surcharges are never clamped.
    pub fn surcharge(
        id: impl Into<String>,
        label: impl Into<String>,
        target: AdjustmentTarget,
        amount: MinorUnits,
    ) -> Self {
        Self {
            mode: AdjustmentMode::Surcharge,
            ..Self::discount(id, label, IncentiveSource::Guard, target, amount)
        }
    }

    pub fn label_en(mut self, label_en: Option<String>) -> Self {
        self.label_en = label_en;
        self
    }

    pub fn meta(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// Attach a serializable config fragment (funding, ledger) when present.
    pub fn meta_opt<T: Serialize>(mut self, key: &str, value: Option<&T>) -> Self {
        if let Some(value) = value.and_then(|v| serde_json::to_value(v).ok()) {
            self.metadata.insert(key.to_string(), value);
        }
        self
    }
}

/// Accumulated state of one calculation.
#[derive(Debug, Clone, PartialEq)]
pub struct Pass {
    pub totals: RunningTotals,
    pub adjustments: Vec<IncentiveAdjustment>,
    pub violations: Vec<GuardrailViolation>,
    pub notices: Vec<IncentiveNotice>,
    pub applied_coupon_code: Option<String>,
    pub points_redeemed: i64,
    currency: String,
}

impl Pass {
    pub fn start(base: RunningTotals, currency: impl Into<String>) -> Self {
        Self {
            totals: base,
            adjustments: Vec::new(),
            violations: Vec::new(),
            notices: Vec::new(),
            applied_coupon_code: None,
            points_redeemed: 0,
            currency: currency.into(),
        }
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Apply an adjustment and return the amount actually applied.
    ///
    /// Discounts apply `min(amount, current value of target)`; surcharges
    /// apply the full amount up to the `MAX_AMOUNT` headroom. Nothing is
    /// recorded when the applied amount is not positive.
    pub fn apply(mut self, proposed: ProposedAdjustment) -> (Self, MinorUnits) {
        let current = self.totals.value_of(proposed.target);
        let applied = match proposed.mode {
            AdjustmentMode::Discount => proposed.amount.min(current),
            AdjustmentMode::Surcharge => proposed.amount.min(MAX_AMOUNT - current),
        };
        if applied <= 0 {
            return (self, 0);
        }

        let delta = match proposed.mode {
            AdjustmentMode::Discount => -applied,
            AdjustmentMode::Surcharge => applied,
        };
        self.totals = self.totals.shifted(proposed.target, delta);

        debug!(
            id = %proposed.id,
            source = proposed.source.as_str(),
            target = proposed.target.as_str(),
            requested = proposed.amount,
            applied = applied,
            subtotal = self.totals.subtotal,
            delivery_fee = self.totals.delivery_fee,
            "Incentive adjustment applied"
        );
        metrics::counter!("incentives.adjustments", "source" => proposed.source.as_str())
            .increment(1);

        self.adjustments.push(IncentiveAdjustment {
            id: proposed.id,
            label: proposed.label,
            label_en: proposed.label_en,
            source: proposed.source,
            target: proposed.target,
            amount: MoneyAmount::new(applied, self.currency.clone()),
            mode: proposed.mode,
            metadata: proposed.metadata,
        });
        (self, applied)
    }

    /// Record a skipped mechanism and log it.
    pub fn notice(mut self, notice: IncentiveNotice) -> Self {
        log_notice(&notice);
        metrics::counter!("incentives.notices", "kind" => notice.kind()).increment(1);
        self.notices.push(notice);
        self
    }

    pub fn violation(mut self, violation: GuardrailViolation) -> Self {
        warn!(code = violation.code(), "Guardrail violation corrected");
        metrics::counter!("incentives.guardrail_violations", "code" => violation.code())
            .increment(1);
        self.violations.push(violation);
        self
    }
}

fn log_notice(notice: &IncentiveNotice) {
    let message = notice.message();
    match notice {
        IncentiveNotice::SubscriptionPlanUnavailable {
            subscription_plan_id,
        } => warn!(subscription_plan_id = %subscription_plan_id, "{message}"),
        IncentiveNotice::RewardsDisabled { points_requested } => {
            warn!(points_requested = points_requested, "{message}")
        }
        IncentiveNotice::RewardsBelowMinimumBasket {
            min_basket_total,
            basket_total,
        } => warn!(
            min_basket_total = min_basket_total,
            basket_total = basket_total,
            "{message}"
        ),
        IncentiveNotice::RewardsInvalidConversion {
            points,
            currency_units,
        } => warn!(points = points, currency_units = currency_units, "{message}"),
        IncentiveNotice::CouponUnavailable { coupon_code } => {
            warn!(coupon_code = %coupon_code, "{message}")
        }
        IncentiveNotice::CouponIneligible {
            coupon_code,
            user_type,
        } => warn!(coupon_code = %coupon_code, user_type = ?user_type, "{message}"),
        IncentiveNotice::BaseAmountCapped {
            base_subtotal,
            base_delivery_fee,
            max_amount,
        } => warn!(
            base_subtotal = base_subtotal,
            base_delivery_fee = base_delivery_fee,
            max_amount = max_amount,
            "{message}"
        ),
    }
}
