//! # Money Module
//!
//! Provides the `Money` type for monetary amounts in minor units.
//!
//! ## Gross vs. Net
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Catalog prices are stored either NET or GROSS (tax included).          │
//! │                                                                         │
//! │    net ──calculate_tax──► tax        net + tax = gross                  │
//! │    gross ──net_from_gross──► net     gross - net = tax                  │
//! │                                                                         │
//! │  All math is integer math on minor units (cents), rounding half up.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

use crate::types::TaxRate;

/// A monetary amount in the smallest currency unit.
///
/// Signed, so refunds and discount adjustments can be expressed directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    ///
    /// ```rust
    /// use storefront_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(1099).cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the amount in minor units.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion, truncated toward zero.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Tax owed on this (net) amount, rounded half up.
    ///
    /// ```rust
    /// use storefront_core::money::Money;
    /// use storefront_core::types::TaxRate;
    ///
    /// // 10.00 at 19% = 1.90
    /// let tax = Money::from_cents(1000).calculate_tax(TaxRate::from_bps(1900));
    /// assert_eq!(tax.cents(), 190);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        // i128 so large catalog prices cannot overflow during the multiply
        let tax = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money(tax as i64)
    }

    /// Strips the tax contained in this (gross) amount.
    ///
    /// ```rust
    /// use storefront_core::money::Money;
    /// use storefront_core::types::TaxRate;
    ///
    /// // 11.90 gross at 19% = 10.00 net
    /// let net = Money::from_cents(1190).net_from_gross(TaxRate::from_bps(1900));
    /// assert_eq!(net.cents(), 1000);
    /// ```
    pub fn net_from_gross(&self, rate: TaxRate) -> Money {
        let divisor = 10000 + rate.bps() as i128;
        let scaled = self.0 as i128 * 10000;
        // Round half away from zero
        let net = if scaled >= 0 {
            (scaled + divisor / 2) / divisor
        } else {
            (scaled - divisor / 2) / divisor
        };
        Money(net as i64)
    }

    /// Applies a percentage discount given in basis points (1000 = 10%).
    pub fn apply_percentage_discount(&self, discount_bps: u32) -> Money {
        let discount = (self.0 as i128 * discount_bps as i128 + 5000) / 10000;
        Money(self.0 - discount as i64)
    }
}

/// Plain decimal rendering ("10.99"). Currency symbols are a presentation
/// concern of the caller.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

/// Multiplication by a quantity.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
