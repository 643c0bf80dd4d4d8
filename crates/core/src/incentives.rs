//! Incentive domain types: the configuration snapshot consumed by the
//! pricing engine, the per-order calculation context, and the auditable
//! calculation result.
//!
//! Effects are modeled as a tagged sum type (`percent` / `flat` / `free`) so
//! a percent effect without a percentage cannot be expressed.

use crate::money::{clamp_amount, default_currency, MinorUnits, MoneyAmount};
use chrono::{DateTime, FixedOffset, NaiveTime, Offset, Utc, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Sentinel that matches any city or category in a scope list.
pub const SCOPE_ALL: &str = "ALL";

// ─── Snapshot ───────────────────────────────────────────────────────────────

/// Immutable, versioned incentives configuration. The engine reads one
/// snapshot per calculation and never mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct IncentivesSnapshot {
    #[serde(default)]
    pub meta: SnapshotMeta,
    #[serde(default)]
    pub subscription_plans: Vec<SubscriptionPlan>,
    /// Evaluated in the order given here; never re-sorted.
    #[serde(default)]
    pub discount_rules: Vec<DiscountRule>,
    #[serde(default)]
    pub coupons: Vec<CouponDefinition>,
    #[serde(default)]
    pub rewards_program: RewardsProgram,
    #[serde(default)]
    pub stacking_policy: StackingPolicy,
}

impl IncentivesSnapshot {
    /// Active plan with the given id.
    pub fn active_plan(&self, plan_id: &str) -> Option<&SubscriptionPlan> {
        self.subscription_plans
            .iter()
            .find(|plan| plan.id == plan_id && plan.active)
    }

    /// Active coupon matching `code` after trimming, ignoring case.
    pub fn find_active_coupon(&self, code: &str) -> Option<&CouponDefinition> {
        let normalized = code.trim();
        self.coupons
            .iter()
            .find(|coupon| coupon.active && coupon.code.eq_ignore_ascii_case(normalized))
    }

    /// Local time zone used for day-of-week and time-of-day scopes.
    pub fn local_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.meta.utc_offset_minutes.saturating_mul(60))
            .unwrap_or_else(|| Utc.fix())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    #[serde(default = "default_service_code")]
    pub service_code: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Offset of the service's local time from UTC (Asia/Aden is +03:00).
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

fn default_service_code() -> String {
    "DSH".to_string()
}
fn default_version() -> String {
    "0".to_string()
}
fn default_utc_offset_minutes() -> i32 {
    180
}

impl Default for SnapshotMeta {
    fn default() -> Self {
        Self {
            service_code: default_service_code(),
            version: default_version(),
            currency: default_currency(),
            utc_offset_minutes: default_utc_offset_minutes(),
            note: None,
        }
    }
}

// ─── Subscription Plans ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionPlan {
    pub id: String,
    pub name_ar: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_en: Option<String>,
    pub active: bool,
    #[serde(default)]
    pub features: SubscriptionFeatures,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SubscriptionFeatures {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_fee_pct_discount: Option<Decimal>,
    /// Floor the percentage discount may not push the delivery fee below.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_delivery_fee_after_discount: Option<MinorUnits>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_fee_flat_discount: Option<MinorUnits>,
}

// ─── Effects ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EffectKind {
    Percent { value_pct: Decimal },
    Flat { value: MinorUnits },
    Free,
}

/// Common view over rule and coupon effects.
pub trait DiscountEffect {
    fn kind(&self) -> &EffectKind;
    fn max_discount(&self) -> Option<MinorUnits>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentTarget {
    BasketTotal,
    DeliveryFee,
}

impl AdjustmentTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentTarget::BasketTotal => "basket_total",
            AdjustmentTarget::DeliveryFee => "delivery_fee",
        }
    }
}

/// Target as written in a discount rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleTarget {
    BasketTotal,
    DeliveryFee,
    Both,
}

impl RuleTarget {
    /// `Both` resolves to the delivery fee only. Splitting across both totals
    /// is an open product question; the single-target behavior is kept.
    pub fn resolve(self) -> AdjustmentTarget {
        match self {
            RuleTarget::BasketTotal => AdjustmentTarget::BasketTotal,
            RuleTarget::DeliveryFee | RuleTarget::Both => AdjustmentTarget::DeliveryFee,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleEffect {
    pub target: RuleTarget,
    #[serde(flatten)]
    pub kind: EffectKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_discount: Option<MinorUnits>,
}

impl DiscountEffect for RuleEffect {
    fn kind(&self) -> &EffectKind {
        &self.kind
    }
    fn max_discount(&self) -> Option<MinorUnits> {
        self.max_discount
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouponEffect {
    pub target: AdjustmentTarget,
    #[serde(flatten)]
    pub kind: EffectKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_discount: Option<MinorUnits>,
}

impl DiscountEffect for CouponEffect {
    fn kind(&self) -> &EffectKind {
        &self.kind
    }
    fn max_discount(&self) -> Option<MinorUnits> {
        self.max_discount
    }
}

// ─── Funding & Ledger ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FundingMode {
    Platform,
    Partner,
    Hybrid,
}

/// Who pays for a discount. Passed through to adjustment metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Funding {
    pub mode: FundingMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_pct: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partner_pct: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerAccounts {
    pub discount_account_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_share_account_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partner_share_account_code: Option<String>,
}

// ─── Discount Rules ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountRule {
    pub id: String,
    pub name_ar: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_en: Option<String>,
    pub active: bool,
    #[serde(default)]
    pub scope: RuleScope,
    #[serde(default)]
    pub condition: RuleCondition,
    pub effect: RuleEffect,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub funding: Option<Funding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ledger: Option<LedgerAccounts>,
}

/// Contextual predicates gating a rule. Empty lists and absent fields are
/// unrestricted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RuleScope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default)]
    pub cities: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub days_of_week: Vec<Weekday>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_range: Option<TimeRange>,
}

/// Inclusive local-time window, written as `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    #[serde(with = "hhmm")]
    pub from: NaiveTime,
    #[serde(with = "hhmm")]
    pub to: NaiveTime,
}

impl TimeRange {
    pub fn contains(&self, time: NaiveTime) -> bool {
        time >= self.from && time <= self.to
    }
}

/// Inclusive bounds on the base basket subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RuleCondition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_basket_total: Option<MinorUnits>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_basket_total: Option<MinorUnits>,
}

// ─── Coupons ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouponDefinition {
    /// Canonical code; lookups ignore case.
    pub code: String,
    pub name_ar: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_en: Option<String>,
    pub active: bool,
    #[serde(default)]
    pub scope: CouponScope,
    pub effect: CouponEffect,
    #[serde(default)]
    pub limits: CouponLimits,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validity: Option<CouponValidity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub funding: Option<Funding>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EligibleUserType {
    All,
    NewUsersOnly,
    SubscribersOnly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouponScope {
    #[serde(default)]
    pub cities: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default = "default_eligible_user_types")]
    pub eligible_user_types: Vec<EligibleUserType>,
}

fn default_eligible_user_types() -> Vec<EligibleUserType> {
    vec![EligibleUserType::All]
}

impl Default for CouponScope {
    fn default() -> Self {
        Self {
            cities: Vec::new(),
            categories: Vec::new(),
            eligible_user_types: default_eligible_user_types(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CouponLimits {
    /// Compared against the base subtotal, not the discounted one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_basket_total: Option<MinorUnits>,
}

/// Inclusive validity window; an open side is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CouponValidity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ends_at: Option<DateTime<Utc>>,
}

impl CouponValidity {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.starts_at.map(|start| at >= start).unwrap_or(true)
            && self.ends_at.map(|end| at <= end).unwrap_or(true)
    }
}

// ─── Rewards ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RewardsProgram {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub redemption: RedemptionRules,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RedemptionRules {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub conversion: ConversionRatio,
    #[serde(default)]
    pub limits: RedemptionLimits,
}

/// `points` points are worth `currency_units` minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ConversionRatio {
    pub points: i64,
    pub currency_units: MinorUnits,
}

impl ConversionRatio {
    pub fn is_valid(&self) -> bool {
        self.points > 0 && self.currency_units > 0
    }

    /// Monetary value of `points`, floored.
    pub fn value_of(&self, points: i64) -> MinorUnits {
        if !self.is_valid() || points <= 0 {
            return 0;
        }
        let value = i128::from(points) * i128::from(self.currency_units) / i128::from(self.points);
        MinorUnits::try_from(value).unwrap_or(MinorUnits::MAX)
    }

    /// Points whose value fits in `amount`, floored.
    pub fn points_for(&self, amount: MinorUnits) -> i64 {
        if !self.is_valid() || amount <= 0 {
            return 0;
        }
        let points = i128::from(amount) * i128::from(self.points) / i128::from(self.currency_units);
        i64::try_from(points).unwrap_or(i64::MAX)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RedemptionTarget {
    DeliveryFeeFirstThenBasket,
    #[default]
    BasketOnly,
    DeliveryFeeOnly,
}

impl RedemptionTarget {
    pub fn delivery_fee_first(&self) -> bool {
        matches!(
            self,
            RedemptionTarget::DeliveryFeeFirstThenBasket | RedemptionTarget::DeliveryFeeOnly
        )
    }

    pub fn allows_basket(&self) -> bool {
        !matches!(self, RedemptionTarget::DeliveryFeeOnly)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RedemptionLimits {
    /// Cap as a share of the base gross total (subtotal + delivery fee).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_discount_pct_per_order: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_basket_total_to_redeem: Option<MinorUnits>,
    #[serde(default)]
    pub apply_to: RedemptionTarget,
}

// ─── Stacking Policy ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StackingPolicy {
    /// Informational only; the engine's stage order is fixed.
    #[serde(default)]
    pub order_of_application: Vec<String>,
    #[serde(default)]
    pub guards: Guardrails,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Guardrails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_net_total: Option<MinorUnits>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_total_discount_pct: Option<Decimal>,
    #[serde(default)]
    pub prevent_negative_or_zero_price: bool,
}

// ─── Calculation Context ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    New,
    #[default]
    Existing,
    Subscriber,
}

/// Per-order input to the engine. Amounts are base values from the pricing
/// component, in minor units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncentiveContext {
    pub base_subtotal: MinorUnits,
    pub base_delivery_fee: MinorUnits,
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Defaults to the snapshot's service code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_plan_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points_to_redeem: Option<i64>,
    #[serde(default)]
    pub user_type: UserType,
    /// Defaults to the time of the call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Default for IncentiveContext {
    fn default() -> Self {
        Self {
            base_subtotal: 0,
            base_delivery_fee: 0,
            currency: default_currency(),
            service: None,
            city: None,
            category: None,
            subscription_plan_id: None,
            coupon_code: None,
            points_to_redeem: None,
            user_type: UserType::default(),
            timestamp: None,
        }
    }
}

impl IncentiveContext {
    pub fn new(base_subtotal: MinorUnits, base_delivery_fee: MinorUnits) -> Self {
        Self {
            base_subtotal,
            base_delivery_fee,
            ..Default::default()
        }
    }

    /// Base subtotal plus base delivery fee, before any incentive. Each side
    /// is clamped to `[0, MAX_AMOUNT]` first, so the sum is exact.
    pub fn gross_total(&self) -> MinorUnits {
        clamp_amount(self.base_subtotal) + clamp_amount(self.base_delivery_fee)
    }

    /// Trimmed subscription plan id; blank ids count as absent.
    pub fn plan_id(&self) -> Option<&str> {
        self.subscription_plan_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    pub fn has_subscription(&self) -> bool {
        self.plan_id().is_some()
    }
}

// ─── Calculation Output ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncentiveSource {
    Subscription,
    DiscountRule,
    Rewards,
    Coupon,
    Guard,
}

impl IncentiveSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncentiveSource::Subscription => "subscription",
            IncentiveSource::DiscountRule => "discount_rule",
            IncentiveSource::Rewards => "rewards",
            IncentiveSource::Coupon => "coupon",
            IncentiveSource::Guard => "guard",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentMode {
    Discount,
    Surcharge,
}

/// One applied adjustment. `amount` is always what was actually applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncentiveAdjustment {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_en: Option<String>,
    pub source: IncentiveSource,
    pub target: AdjustmentTarget,
    pub amount: MoneyAmount,
    pub mode: AdjustmentMode,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl IncentiveAdjustment {
    /// Signed effect on its target: negative for discounts.
    pub fn signed_amount(&self) -> MinorUnits {
        match self.mode {
            AdjustmentMode::Discount => self.amount.amount.saturating_neg(),
            AdjustmentMode::Surcharge => self.amount.amount,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GuardrailViolation {
    #[serde(rename = "max_total_discount_pct")]
    MaxTotalDiscountPct,
    #[serde(rename = "min_net_total_yer")]
    MinNetTotal,
    #[serde(rename = "prevent_negative_or_zero_price")]
    PreventNegativeOrZeroPrice,
}

impl GuardrailViolation {
    pub fn code(&self) -> &'static str {
        match self {
            GuardrailViolation::MaxTotalDiscountPct => "max_total_discount_pct",
            GuardrailViolation::MinNetTotal => "min_net_total_yer",
            GuardrailViolation::PreventNegativeOrZeroPrice => "prevent_negative_or_zero_price",
        }
    }
}

/// Non-fatal reason a mechanism was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IncentiveNotice {
    SubscriptionPlanUnavailable {
        subscription_plan_id: String,
    },
    RewardsDisabled {
        points_requested: i64,
    },
    RewardsBelowMinimumBasket {
        min_basket_total: MinorUnits,
        basket_total: MinorUnits,
    },
    RewardsInvalidConversion {
        points: i64,
        currency_units: MinorUnits,
    },
    CouponUnavailable {
        coupon_code: String,
    },
    CouponIneligible {
        coupon_code: String,
        user_type: UserType,
    },
    BaseAmountCapped {
        base_subtotal: MinorUnits,
        base_delivery_fee: MinorUnits,
        max_amount: MinorUnits,
    },
}

impl IncentiveNotice {
    pub fn kind(&self) -> &'static str {
        match self {
            IncentiveNotice::SubscriptionPlanUnavailable { .. } => "subscription_plan_unavailable",
            IncentiveNotice::RewardsDisabled { .. } => "rewards_disabled",
            IncentiveNotice::RewardsBelowMinimumBasket { .. } => "rewards_below_minimum_basket",
            IncentiveNotice::RewardsInvalidConversion { .. } => "rewards_invalid_conversion",
            IncentiveNotice::CouponUnavailable { .. } => "coupon_unavailable",
            IncentiveNotice::CouponIneligible { .. } => "coupon_ineligible",
            IncentiveNotice::BaseAmountCapped { .. } => "base_amount_capped",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            IncentiveNotice::SubscriptionPlanUnavailable { .. } => {
                "Subscription plan not found or inactive"
            }
            IncentiveNotice::RewardsDisabled { .. } => "Rewards redemption disabled",
            IncentiveNotice::RewardsBelowMinimumBasket { .. } => {
                "Rewards redemption skipped due to min basket total"
            }
            IncentiveNotice::RewardsInvalidConversion { .. } => {
                "Rewards redemption skipped due to invalid conversion ratio"
            }
            IncentiveNotice::CouponUnavailable { .. } => "Coupon not found or inactive",
            IncentiveNotice::CouponIneligible { .. } => "Coupon not eligible for this context",
            IncentiveNotice::BaseAmountCapped { .. } => {
                "Base amounts exceed the supported maximum and were capped"
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncentivesCalculationResult {
    pub subtotal: MoneyAmount,
    pub delivery_fee: MoneyAmount,
    /// Always `subtotal + delivery_fee`.
    pub total: MoneyAmount,
    pub adjustments: Vec<IncentiveAdjustment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guardrail_violations: Option<Vec<GuardrailViolation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_coupon_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points_redeemed: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notices: Vec<IncentiveNotice>,
    pub snapshot_version: String,
}

impl IncentivesCalculationResult {
    pub fn has_source(&self, source: IncentiveSource) -> bool {
        self.adjustments.iter().any(|adj| adj.source == source)
    }

    pub fn has_violation(&self, violation: GuardrailViolation) -> bool {
        self.guardrail_violations
            .as_ref()
            .map(|violations| violations.contains(&violation))
            .unwrap_or(false)
    }

    pub fn adjustment(&self, id: &str) -> Option<&IncentiveAdjustment> {
        self.adjustments.iter().find(|adj| adj.id == id)
    }

    /// Sum of discount amounts minus guard surcharges.
    pub fn net_discount(&self) -> MinorUnits {
        self.adjustments
            .iter()
            .fold(0, |net: MinorUnits, adj| net.saturating_sub(adj.signed_amount()))
    }
}

// ─── Serde helpers ──────────────────────────────────────────────────────────

mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let trimmed = raw.trim();
        NaiveTime::parse_from_str(trimmed, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
            .map_err(|err| serde::de::Error::custom(format!("invalid time '{raw}': {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_rule_effect_deserializes_tagged_kind() {
        let effect: RuleEffect = serde_json::from_str(
            r#"{"target": "basket_total", "type": "percent", "value_pct": 5, "max_discount": 3000}"#,
        )
        .unwrap();
        assert_eq!(effect.target, RuleTarget::BasketTotal);
        assert_eq!(effect.kind, EffectKind::Percent { value_pct: dec!(5) });
        assert_eq!(effect.max_discount, Some(3000));

        let free: CouponEffect =
            serde_json::from_str(r#"{"target": "delivery_fee", "type": "free"}"#).unwrap();
        assert_eq!(free.kind, EffectKind::Free);
        assert_eq!(free.max_discount, None);
    }

    #[test]
    fn test_percent_effect_without_value_is_rejected() {
        let parsed: Result<RuleEffect, _> =
            serde_json::from_str(r#"{"target": "delivery_fee", "type": "percent"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_both_target_resolves_to_delivery_fee() {
        assert_eq!(RuleTarget::Both.resolve(), AdjustmentTarget::DeliveryFee);
        assert_eq!(RuleTarget::BasketTotal.resolve(), AdjustmentTarget::BasketTotal);
    }

    #[test]
    fn test_time_range_parses_hhmm_inclusive() {
        let range: TimeRange = serde_json::from_str(r#"{"from": "18:00", "to": "23:59"}"#).unwrap();
        assert!(range.contains(NaiveTime::from_hms_opt(18, 0, 0).unwrap()));
        assert!(range.contains(NaiveTime::from_hms_opt(23, 59, 0).unwrap()));
        assert!(!range.contains(NaiveTime::from_hms_opt(17, 59, 0).unwrap()));
        assert_eq!(
            serde_json::to_string(&range).unwrap(),
            r#"{"from":"18:00","to":"23:59"}"#
        );
    }

    #[test]
    fn test_days_of_week_accept_upper_case_codes() {
        let scope: RuleScope =
            serde_json::from_str(r#"{"days_of_week": ["FRI", "SAT"]}"#).unwrap();
        assert_eq!(scope.days_of_week, vec![Weekday::Fri, Weekday::Sat]);
    }

    #[test]
    fn test_find_active_coupon_ignores_case_and_inactive() {
        let mut snapshot = IncentivesSnapshot::default();
        let coupon = CouponDefinition {
            code: "WELCOME10".to_string(),
            name_ar: "خصم الترحيب".to_string(),
            name_en: None,
            active: true,
            scope: CouponScope::default(),
            effect: CouponEffect {
                target: AdjustmentTarget::BasketTotal,
                kind: EffectKind::Percent { value_pct: dec!(10) },
                max_discount: None,
            },
            limits: CouponLimits::default(),
            validity: None,
            funding: None,
        };
        snapshot.coupons.push(coupon.clone());
        snapshot.coupons.push(CouponDefinition {
            code: "OLD".to_string(),
            active: false,
            ..coupon
        });

        assert_eq!(
            snapshot.find_active_coupon("  welcome10 ").map(|c| c.code.as_str()),
            Some("WELCOME10")
        );
        assert!(snapshot.find_active_coupon("old").is_none());
    }

    #[test]
    fn test_conversion_ratio_uses_exact_integer_math() {
        let ratio = ConversionRatio {
            points: 3,
            currency_units: 1,
        };
        assert_eq!(ratio.value_of(3), 1);
        assert_eq!(ratio.value_of(2), 0);
        assert_eq!(ratio.points_for(1), 3);

        let ten_per_point = ConversionRatio {
            points: 1,
            currency_units: 10,
        };
        assert_eq!(ten_per_point.value_of(400), 4000);
        assert_eq!(ten_per_point.points_for(2505), 250);
        assert!(!ConversionRatio::default().is_valid());
    }

    #[test]
    fn test_context_defaults() {
        let context: IncentiveContext =
            serde_json::from_str(r#"{"base_subtotal": 100, "base_delivery_fee": 50}"#).unwrap();
        assert_eq!(context.currency, "YER");
        assert_eq!(context.user_type, UserType::Existing);
        assert_eq!(context.gross_total(), 150);
        assert!(!context.has_subscription());
    }

    #[test]
    fn test_blank_plan_id_is_not_a_subscription() {
        let mut context = IncentiveContext::new(100, 50);
        context.subscription_plan_id = Some("   ".to_string());
        assert_eq!(context.plan_id(), None);
        assert!(!context.has_subscription());

        context.subscription_plan_id = Some(" sub_user_pro_monthly ".to_string());
        assert_eq!(context.plan_id(), Some("sub_user_pro_monthly"));
        assert!(context.has_subscription());
    }

    #[test]
    fn test_gross_total_is_exact_for_huge_amounts() {
        let context = IncentiveContext::new(i64::MAX, 10);
        assert_eq!(context.gross_total(), crate::money::MAX_AMOUNT + 10);
    }

    #[test]
    fn test_guardrail_violation_codes_serialize() {
        let json = serde_json::to_string(&vec![
            GuardrailViolation::MaxTotalDiscountPct,
            GuardrailViolation::MinNetTotal,
        ])
        .unwrap();
        assert_eq!(json, r#"["max_total_discount_pct","min_net_total_yer"]"#);
    }

    #[test]
    fn test_default_offset_is_asia_aden() {
        let snapshot = IncentivesSnapshot::default();
        assert_eq!(snapshot.local_offset().local_minus_utc(), 3 * 3600);
    }
}
