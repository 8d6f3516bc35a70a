//! # Cash Rounding
//!
//! Rounds amounts to the smallest cash unit a currency actually uses.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Denomination 0.05, amount 9.92                                         │
//! │                                                                         │
//! │    RoundMidpointUp    9.92 → 9.90     9.925 → 9.95 (tie goes up)        │
//! │    RoundMidpointDown  9.92 → 9.90     9.925 → 9.90 (tie goes down)      │
//! │    AlwaysRoundDown    9.94 → 9.90                                       │
//! │    AlwaysRoundUp      9.91 → 9.95                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::Currency;

/// How an amount between two cash units is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingRule {
    /// Nearest unit, ties away from the lower unit.
    #[default]
    RoundMidpointUp,
    /// Nearest unit, ties toward the lower unit.
    RoundMidpointDown,
    AlwaysRoundDown,
    AlwaysRoundUp,
}

impl RoundingRule {
    /// Rounds `cents` to a multiple of `unit` (which must be positive).
    ///
    /// "Down" means toward negative infinity.
    pub fn apply(&self, cents: i64, unit: i64) -> i64 {
        let remainder = cents.rem_euclid(unit);
        if remainder == 0 {
            return cents;
        }

        let lower = cents - remainder;
        let upper = lower + unit;

        match self {
            RoundingRule::AlwaysRoundDown => lower,
            RoundingRule::AlwaysRoundUp => upper,
            RoundingRule::RoundMidpointUp => {
                if remainder * 2 >= unit {
                    upper
                } else {
                    lower
                }
            }
            RoundingRule::RoundMidpointDown => {
                if remainder * 2 > unit {
                    upper
                } else {
                    lower
                }
            }
        }
    }
}

/// Cash rounding settings applied by the pricing pipeline.
///
/// The default performs no rounding at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashRoundingOptions {
    /// Round unit prices and line amounts to `decimals`.
    pub round_order_items: bool,

    /// Decimal digits kept when rounding items.
    pub decimals: u32,

    /// Round totals to `denomination_cents`.
    pub round_order_total: bool,

    /// Smallest cash unit in minor units.
    pub denomination_cents: i64,

    pub rule: RoundingRule,
}

impl Default for CashRoundingOptions {
    fn default() -> Self {
        CashRoundingOptions {
            round_order_items: false,
            decimals: 2,
            round_order_total: false,
            denomination_cents: 1,
            rule: RoundingRule::default(),
        }
    }
}

impl CashRoundingOptions {
    /// Takes the rounding settings of a currency.
    pub fn from_currency(currency: &Currency) -> Self {
        CashRoundingOptions {
            round_order_items: currency.round_order_items,
            decimals: currency.rounding_decimals,
            round_order_total: currency.round_order_total,
            denomination_cents: currency.round_total_denomination_cents,
            rule: currency.round_total_rule,
        }
    }

    /// Rounds an item amount to the configured number of decimals.
    ///
    /// Amounts are already held in hundredths, so only `decimals < 2`
    /// changes anything.
    pub fn round_item(&self, amount: Money) -> Money {
        if !self.round_order_items || self.decimals >= 2 {
            return amount;
        }

        let unit = 10_i64.pow(2 - self.decimals);
        Money::from_cents(RoundingRule::RoundMidpointUp.apply(amount.cents(), unit))
    }

    /// Rounds a total to the cash denomination using the configured rule.
    pub fn round_total(&self, amount: Money, currency_code: &str) -> CoreResult<Money> {
        if !self.round_order_total {
            return Ok(amount);
        }

        if self.denomination_cents <= 0 {
            return Err(CoreError::InvalidRounding {
                currency: currency_code.to_string(),
                reason: format!("denomination must be positive, got {}", self.denomination_cents),
            });
        }

        Ok(Money::from_cents(
            self.rule.apply(amount.cents(), self.denomination_cents),
        ))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rules_on_five_cent_denomination() {
        assert_eq!(RoundingRule::RoundMidpointUp.apply(992, 5), 990);
        assert_eq!(RoundingRule::RoundMidpointUp.apply(993, 5), 995);
        assert_eq!(RoundingRule::RoundMidpointDown.apply(993, 5), 995);
        assert_eq!(RoundingRule::AlwaysRoundDown.apply(994, 5), 990);
        assert_eq!(RoundingRule::AlwaysRoundUp.apply(991, 5), 995);
        assert_eq!(RoundingRule::AlwaysRoundUp.apply(995, 5), 995);
    }

    #[test]
    fn test_midpoint_ties() {
        // 0.50 is exactly between 0.00 and 1.00
        assert_eq!(RoundingRule::RoundMidpointUp.apply(50, 100), 100);
        assert_eq!(RoundingRule::RoundMidpointDown.apply(50, 100), 0);
    }

    #[test]
    fn test_negative_amounts_round_toward_lower_unit() {
        assert_eq!(RoundingRule::AlwaysRoundDown.apply(-992, 5), -995);
        assert_eq!(RoundingRule::AlwaysRoundUp.apply(-992, 5), -990);
    }

    #[test]
    fn test_default_options_do_nothing() {
        let options = CashRoundingOptions::default();
        let amount = Money::from_cents(993);
        assert_eq!(options.round_item(amount), amount);
        assert_eq!(options.round_total(amount, "EUR").unwrap(), amount);
    }

    #[test]
    fn test_round_item_to_whole_units() {
        let options = CashRoundingOptions {
            round_order_items: true,
            decimals: 0,
            ..CashRoundingOptions::default()
        };
        assert_eq!(options.round_item(Money::from_cents(1049)).cents(), 1000);
        assert_eq!(options.round_item(Money::from_cents(1050)).cents(), 1100);
    }

    #[test]
    fn test_round_total_rejects_zero_denomination() {
        let options = CashRoundingOptions {
            round_order_total: true,
            denomination_cents: 0,
            ..CashRoundingOptions::default()
        };
        let err = options.round_total(Money::from_cents(100), "CHF").unwrap_err();
        assert!(matches!(err, CoreError::InvalidRounding { .. }));
    }

    #[test]
    fn test_from_currency() {
        let mut chf = Currency::new(2, "CHF");
        chf.round_order_total = true;
        chf.round_total_denomination_cents = 5;
        chf.round_total_rule = RoundingRule::AlwaysRoundUp;

        let options = CashRoundingOptions::from_currency(&chf);
        assert_eq!(
            options.round_total(Money::from_cents(1001), &chf.code).unwrap().cents(),
            1005
        );
    }
}
