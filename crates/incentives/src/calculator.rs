//! Monetary amount an effect removes from a target value.

use dsh_core::incentives::{DiscountEffect, EffectKind};
use dsh_core::money::{percent_of_floor, MinorUnits};

/// Amount `effect` removes from a target currently worth `current`.
///
/// Percent effects are floored, flat effects use the configured value, free
/// effects take everything. The result is capped by `max_discount` and then
/// clamped to `[0, current]`.
pub fn calculate_effect_amount<E: DiscountEffect + ?Sized>(
    effect: &E,
    current: MinorUnits,
) -> MinorUnits {
    effect_amount(effect.kind(), effect.max_discount(), current)
}

pub fn effect_amount(
    kind: &EffectKind,
    max_discount: Option<MinorUnits>,
    current: MinorUnits,
) -> MinorUnits {
    if current <= 0 {
        return 0;
    }

    let raw = match kind {
        EffectKind::Percent { value_pct } => percent_of_floor(current, *value_pct),
        EffectKind::Flat { value } => *value,
        EffectKind::Free => current,
    };
    let capped = match max_discount {
        Some(cap) => raw.min(cap),
        None => raw,
    };
    capped.clamp(0, current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsh_core::incentives::{AdjustmentTarget, CouponEffect};
    use rust_decimal_macros::dec;

    fn percent(value: rust_decimal::Decimal) -> EffectKind {
        EffectKind::Percent { value_pct: value }
    }

    #[test]
    fn test_non_positive_target_yields_zero() {
        assert_eq!(effect_amount(&EffectKind::Free, None, 0), 0);
        assert_eq!(effect_amount(&EffectKind::Flat { value: 500 }, None, -20), 0);
    }

    #[test]
    fn test_percent_is_floored() {
        assert_eq!(effect_amount(&percent(dec!(10)), None, 15000), 1500);
        assert_eq!(effect_amount(&percent(dec!(5)), None, 999), 49);
        assert_eq!(effect_amount(&percent(dec!(12.5)), None, 1001), 125);
    }

    #[test]
    fn test_flat_is_clamped_to_current_value() {
        assert_eq!(effect_amount(&EffectKind::Flat { value: 700 }, None, 2000), 700);
        assert_eq!(effect_amount(&EffectKind::Flat { value: 7000 }, None, 2000), 2000);
    }

    #[test]
    fn test_free_takes_whole_target() {
        assert_eq!(effect_amount(&EffectKind::Free, None, 3200), 3200);
    }

    #[test]
    fn test_max_discount_caps_amount() {
        assert_eq!(effect_amount(&percent(dec!(50)), Some(3000), 40000), 3000);
        assert_eq!(effect_amount(&EffectKind::Free, Some(1000), 3200), 1000);
        assert_eq!(effect_amount(&EffectKind::Free, Some(0), 3200), 0);
    }

    #[test]
    fn test_generic_entry_point_reads_effect() {
        let effect = CouponEffect {
            target: AdjustmentTarget::DeliveryFee,
            kind: EffectKind::Flat { value: 800 },
            max_discount: Some(600),
        };
        assert_eq!(calculate_effect_amount(&effect, 5000), 600);
    }
}
