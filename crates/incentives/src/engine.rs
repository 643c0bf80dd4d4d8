//! Incentives engine: folds the promotional stages over the base totals,
//! enforces the stacking guards, and assembles the auditable result.

use crate::guardrails;
use crate::pass::{Pass, RunningTotals};
use crate::stages::{coupon, discount_rules, rewards, subscription, Stage, StageEnv};
use chrono::{DateTime, Utc};
use dsh_core::incentives::{
    IncentiveContext, IncentiveNotice, IncentivesCalculationResult, IncentivesSnapshot,
};
use dsh_core::money::{MoneyAmount, MAX_AMOUNT};
use dsh_core::IncentivesResult;
use std::sync::Arc;
use tracing::{debug, info};

/// Stage order is fixed; `order_of_application` in the snapshot is only
/// documentation.
const STAGES: [(&str, Stage); 4] = [
    ("subscription", subscription::apply),
    ("discount_rules", discount_rules::apply),
    ("rewards", rewards::apply),
    ("coupon", coupon::apply),
];

/// Pricing adjustment engine bound to one immutable snapshot.
///
/// Cheap to clone and safe to share across threads. Swapping configuration
/// means building a new engine with [`IncentivesEngine::with_snapshot`].
#[derive(Debug, Clone)]
pub struct IncentivesEngine {
    snapshot: Arc<IncentivesSnapshot>,
}

impl IncentivesEngine {
    pub fn new(snapshot: IncentivesSnapshot) -> Self {
        Self::from_shared(Arc::new(snapshot))
    }

    /// Validate the snapshot before binding it.
    pub fn try_new(snapshot: IncentivesSnapshot) -> IncentivesResult<Self> {
        snapshot.validate()?;
        Ok(Self::new(snapshot))
    }

    pub fn from_shared(snapshot: Arc<IncentivesSnapshot>) -> Self {
        info!(
            version = %snapshot.meta.version,
            service = %snapshot.meta.service_code,
            plans = snapshot.subscription_plans.len(),
            rules = snapshot.discount_rules.len(),
            coupons = snapshot.coupons.len(),
            rewards_enabled = snapshot.rewards_program.enabled,
            "Incentives engine initialized"
        );
        Self { snapshot }
    }

    pub fn snapshot(&self) -> &IncentivesSnapshot {
        &self.snapshot
    }

    /// A new engine for a newer snapshot. `self` keeps the old one.
    pub fn with_snapshot(&self, snapshot: IncentivesSnapshot) -> Self {
        Self::new(snapshot)
    }

    /// Apply every incentive to one order, using the current time when the
    /// context carries no timestamp.
    pub fn apply_incentives(&self, context: &IncentiveContext) -> IncentivesCalculationResult {
        self.apply_at(context, Utc::now())
    }

    /// Same as [`apply_incentives`](Self::apply_incentives) with an explicit
    /// fallback clock. Identical inputs always give identical results.
    pub fn apply_at(
        &self,
        context: &IncentiveContext,
        now: DateTime<Utc>,
    ) -> IncentivesCalculationResult {
        let snapshot = self.snapshot.as_ref();
        let env = StageEnv::new(snapshot, context, now);
        let base = RunningTotals::new(context.base_subtotal, context.base_delivery_fee);
        let mut start = Pass::start(base, context.currency.as_str());
        if context.base_subtotal > MAX_AMOUNT || context.base_delivery_fee > MAX_AMOUNT {
            start = start.notice(IncentiveNotice::BaseAmountCapped {
                base_subtotal: context.base_subtotal,
                base_delivery_fee: context.base_delivery_fee,
                max_amount: MAX_AMOUNT,
            });
        }

        let pass = STAGES
            .iter()
            .fold(start, |pass, (name, stage)| {
                let pass = stage(&env, pass);
                debug!(
                    stage = *name,
                    subtotal = pass.totals.subtotal,
                    delivery_fee = pass.totals.delivery_fee,
                    "Incentive stage complete"
                );
                pass
            });
        let pass = guardrails::enforce(&snapshot.stacking_policy.guards, context, pass);

        metrics::counter!("incentives.calculations").increment(1);
        assemble(pass, &snapshot.meta.version)
    }
}

fn assemble(pass: Pass, snapshot_version: &str) -> IncentivesCalculationResult {
    let currency = pass.currency().to_string();
    let totals = pass.totals;
    IncentivesCalculationResult {
        subtotal: MoneyAmount::new(totals.subtotal, currency.clone()),
        delivery_fee: MoneyAmount::new(totals.delivery_fee, currency.clone()),
        total: MoneyAmount::new(totals.total(), currency),
        adjustments: pass.adjustments,
        guardrail_violations: Some(pass.violations).filter(|v| !v.is_empty()),
        applied_coupon_code: pass.applied_coupon_code,
        points_redeemed: Some(pass.points_redeemed).filter(|points| *points > 0),
        notices: pass.notices,
        snapshot_version: snapshot_version.to_string(),
    }
}
