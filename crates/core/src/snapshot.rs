//! Loading and validating incentives snapshots.
//!
//! Snapshots are read once through the `config` crate (TOML or JSON, by file
//! extension) and validated before an engine is built from them. A snapshot
//! that fails validation is never handed to the engine.

use crate::error::{IncentivesError, IncentivesResult};
use crate::incentives::{EffectKind, IncentivesSnapshot};
use crate::money::{MinorUnits, MAX_AMOUNT};
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

const MAX_UTC_OFFSET_MINUTES: i32 = 18 * 60;

impl IncentivesSnapshot {
    /// Load and validate a snapshot file.
    pub fn load(path: impl AsRef<Path>) -> IncentivesResult<Self> {
        let path = path.as_ref();
        let snapshot: IncentivesSnapshot = config::Config::builder()
            .add_source(config::File::from(path))
            .build()?
            .try_deserialize()?;
        snapshot.validate()?;

        info!(
            path = %path.display(),
            version = %snapshot.meta.version,
            plans = snapshot.subscription_plans.len(),
            rules = snapshot.discount_rules.len(),
            coupons = snapshot.coupons.len(),
            "Incentives snapshot loaded"
        );
        Ok(snapshot)
    }

    pub fn from_toml_str(raw: &str) -> IncentivesResult<Self> {
        let snapshot: IncentivesSnapshot = config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn from_json_str(raw: &str) -> IncentivesResult<Self> {
        let snapshot: IncentivesSnapshot = serde_json::from_str(raw)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Reject snapshots the engine could not apply deterministically.
    pub fn validate(&self) -> IncentivesResult<()> {
        if self.meta.service_code.trim().is_empty() {
            return Err(IncentivesError::invalid("meta.service_code must not be empty"));
        }
        if self.meta.currency.trim().is_empty() {
            return Err(IncentivesError::invalid("meta.currency must not be empty"));
        }
        if self.meta.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
            return Err(IncentivesError::invalid(format!(
                "meta.utc_offset_minutes {} is outside ±{MAX_UTC_OFFSET_MINUTES}",
                self.meta.utc_offset_minutes
            )));
        }

        let mut plan_ids = HashSet::new();
        for plan in &self.subscription_plans {
            let context = format!("subscription plan '{}'", plan.id);
            if !plan_ids.insert(plan.id.as_str()) {
                return Err(IncentivesError::invalid(format!("duplicate {context}")));
            }
            let features = &plan.features;
            if let Some(pct) = features.delivery_fee_pct_discount {
                check_pct(&context, "delivery_fee_pct_discount", pct)?;
            }
            check_money(
                &context,
                "min_delivery_fee_after_discount",
                features.min_delivery_fee_after_discount,
            )?;
            check_money(
                &context,
                "delivery_fee_flat_discount",
                features.delivery_fee_flat_discount,
            )?;
        }

        let mut rule_ids = HashSet::new();
        for rule in &self.discount_rules {
            let context = format!("discount rule '{}'", rule.id);
            if !rule_ids.insert(rule.id.as_str()) {
                return Err(IncentivesError::invalid(format!("duplicate {context}")));
            }
            check_effect(&context, &rule.effect.kind, rule.effect.max_discount)?;
            check_money(&context, "min_basket_total", rule.condition.min_basket_total)?;
            check_money(&context, "max_basket_total", rule.condition.max_basket_total)?;
            if let Some(range) = rule.scope.time_range {
                if range.from > range.to {
                    return Err(IncentivesError::invalid(format!(
                        "{context}: time_range.from {} is after time_range.to {}",
                        range.from, range.to
                    )));
                }
            }
        }

        let mut coupon_codes = HashSet::new();
        for coupon in &self.coupons {
            let context = format!("coupon '{}'", coupon.code);
            if coupon.code.trim().is_empty() {
                return Err(IncentivesError::invalid("coupon code must not be empty"));
            }
            if !coupon_codes.insert(coupon.code.trim().to_ascii_uppercase()) {
                return Err(IncentivesError::invalid(format!("duplicate {context}")));
            }
            check_effect(&context, &coupon.effect.kind, coupon.effect.max_discount)?;
            check_money(&context, "min_basket_total", coupon.limits.min_basket_total)?;
            if let Some(validity) = coupon.validity {
                if let (Some(starts_at), Some(ends_at)) = (validity.starts_at, validity.ends_at) {
                    if starts_at > ends_at {
                        return Err(IncentivesError::invalid(format!(
                            "{context}: validity starts after it ends"
                        )));
                    }
                }
            }
        }

        let limits = &self.rewards_program.redemption.limits;
        if let Some(pct) = limits.max_discount_pct_per_order {
            check_pct("rewards", "max_discount_pct_per_order", pct)?;
        }
        check_money("rewards", "min_basket_total_to_redeem", limits.min_basket_total_to_redeem)?;

        let guards = &self.stacking_policy.guards;
        if let Some(pct) = guards.max_total_discount_pct {
            check_pct("stacking policy", "max_total_discount_pct", pct)?;
        }
        check_money("stacking policy", "min_net_total", guards.min_net_total)?;

        Ok(())
    }
}

fn check_pct(context: &str, field: &str, pct: Decimal) -> IncentivesResult<()> {
    if pct < Decimal::ZERO || pct > Decimal::ONE_HUNDRED {
        return Err(IncentivesError::invalid(format!(
            "{context}: {field} {pct} must be within 0..=100"
        )));
    }
    Ok(())
}

fn check_money(context: &str, field: &str, amount: Option<MinorUnits>) -> IncentivesResult<()> {
    match amount {
        Some(value) if value < 0 => Err(IncentivesError::invalid(format!(
            "{context}: {field} {value} must not be negative"
        ))),
        Some(value) if value > MAX_AMOUNT => Err(IncentivesError::invalid(format!(
            "{context}: {field} {value} exceeds {MAX_AMOUNT}"
        ))),
        _ => Ok(()),
    }
}

fn check_effect(
    context: &str,
    kind: &EffectKind,
    max_discount: Option<MinorUnits>,
) -> IncentivesResult<()> {
    match kind {
        EffectKind::Percent { value_pct } => check_pct(context, "value_pct", *value_pct)?,
        EffectKind::Flat { value } => check_money(context, "value", Some(*value))?,
        EffectKind::Free => {}
    }
    check_money(context, "max_discount", max_discount)
}
