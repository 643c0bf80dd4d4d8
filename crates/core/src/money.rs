//! Monetary values in minor currency units.
//!
//! All amounts are integers (fils for YER). Percentages are carried as
//! `Decimal` so that `floor`/`ceil` decisions are made on exact values.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Amount in the smallest denomination of a currency.
pub type MinorUnits = i64;

pub const DEFAULT_CURRENCY: &str = "YER";

/// Largest subtotal or delivery fee the engine works with. Twice this value
/// still fits in `MinorUnits`, so a total never overflows.
pub const MAX_AMOUNT: MinorUnits = 1_000_000_000_000_000;

/// Clamp an amount into `[0, MAX_AMOUNT]`.
pub fn clamp_amount(amount: MinorUnits) -> MinorUnits {
    amount.clamp(0, MAX_AMOUNT)
}

pub fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MoneyAmount {
    pub amount: MinorUnits,
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl MoneyAmount {
    pub fn new(amount: MinorUnits, currency: impl Into<String>) -> Self {
        Self {
            amount,
            currency: currency.into(),
        }
    }

    pub fn yer(amount: MinorUnits) -> Self {
        Self::new(amount, DEFAULT_CURRENCY)
    }
}

/// `floor(amount * pct / 100)`, zero for non-positive inputs. Saturates at
/// `MinorUnits::MAX` when the product does not fit.
pub fn percent_of_floor(amount: MinorUnits, pct: Decimal) -> MinorUnits {
    if amount <= 0 || pct <= Decimal::ZERO {
        return 0;
    }
    Decimal::from(amount)
        .checked_mul(pct)
        .and_then(|product| (product / Decimal::ONE_HUNDRED).floor().to_i64())
        .unwrap_or(MinorUnits::MAX)
}

/// `ceil(amount * (1 - pct / 100))`: the smallest total that keeps the
/// aggregate discount at or under `pct` percent. `pct` is read within
/// `[0, 100]`, so the result lies in `[0, amount]` for non-negative amounts.
pub fn remaining_after_percent_ceil(amount: MinorUnits, pct: Decimal) -> MinorUnits {
    let pct = pct.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED);
    let share = Decimal::ONE - pct / Decimal::ONE_HUNDRED;
    (Decimal::from(amount) * share)
        .ceil()
        .to_i64()
        .unwrap_or(MinorUnits::MAX)
}
