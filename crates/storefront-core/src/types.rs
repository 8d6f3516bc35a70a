//! # Domain Types
//!
//! Core domain types used throughout the storefront.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │    Customer     │   │  CustomerRole   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  id / guid      │   │  id             │       │
//! │  │  sku            │   │  username/email │   │  system_name    │       │
//! │  │  price_cents    │   │  system account │   │  active         │       │
//! │  │  parent id      │   │  activity dates │   └─────────────────┘       │
//! │  └─────────────────┘   └─────────────────┘                              │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Store       │   │    Language     │   │    Currency     │       │
//! │  │  request scope  │   │  request scope  │   │  code, rounding │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::pricing::RoundingRule;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate in basis points: 1900 bps = 19%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaxRate(u32);

impl TaxRate {
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

// =============================================================================
// Product
// =============================================================================

/// A catalog product as stored in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: i64,

    /// Stock keeping unit.
    pub sku: String,

    pub name: String,

    pub short_description: Option<String>,

    /// Catalog price in minor units. Net or gross depending on the
    /// store's tax settings.
    pub price_cents: i64,

    /// Tax rate in basis points.
    pub tax_rate_bps: i64,

    /// Grouped product this product is an associated child of.
    pub parent_product_id: Option<i64>,

    pub published: bool,

    pub deleted: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Tax rate. Inserts reject values outside `u32`, so only rows written
    /// around the repository fall back to zero.
    pub fn tax_rate(&self) -> TaxRate {
        u32::try_from(self.tax_rate_bps)
            .map(TaxRate::from_bps)
            .unwrap_or_default()
    }

    /// Products that are published and not soft-deleted are exportable.
    pub fn is_exportable(&self) -> bool {
        self.published && !self.deleted
    }
}

/// Quantity-based price break for a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct TierPrice {
    pub id: i64,
    pub product_id: i64,
    /// Minimum quantity for this price to apply.
    pub quantity: i64,
    pub price_cents: i64,
}

impl TierPrice {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A customer account. Anonymous visitors get a guest account without
/// username or email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: i64,

    /// Stable public identifier (UUID v4 text).
    pub customer_guid: String,

    pub username: Option<String>,

    pub email: Option<String>,

    /// Set for built-in accounts such as the search engine or background
    /// task account.
    pub system_name: Option<String>,

    pub is_system_account: bool,

    pub active: bool,

    pub deleted: bool,

    pub created_at: DateTime<Utc>,

    pub last_activity_at: DateTime<Utc>,
}

impl Customer {
    /// A guest has neither a username nor an email and is not a system account.
    pub fn is_guest(&self) -> bool {
        self.username.is_none() && self.email.is_none() && !self.is_system_account
    }
}

/// A customer role such as "Guests" or "Administrators".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CustomerRole {
    pub id: i64,
    pub name: String,
    pub system_name: Option<String>,
    pub active: bool,
}

// =============================================================================
// Request Context Types
// =============================================================================

/// The store a request is served for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    pub id: i64,
    pub name: String,
    pub url: String,
}

/// The working language of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub id: i64,
    /// Culture code, e.g. "en-US".
    pub culture: String,
    pub name: String,
}

/// A currency with its cash rounding settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    pub id: i64,

    /// ISO 4217 code.
    pub code: String,

    /// Decimal digits used when rounding amounts.
    #[serde(default = "default_rounding_decimals")]
    pub rounding_decimals: u32,

    /// Round each line item amount.
    #[serde(default)]
    pub round_order_items: bool,

    /// Round the order total to `round_total_denomination_cents`.
    #[serde(default)]
    pub round_order_total: bool,

    /// Smallest cash unit for total rounding (e.g. 5 = 0.05).
    #[serde(default = "default_denomination")]
    pub round_total_denomination_cents: i64,

    #[serde(default)]
    pub round_total_rule: RoundingRule,
}

fn default_rounding_decimals() -> u32 {
    2
}

fn default_denomination() -> i64 {
    1
}

impl Currency {
    /// A currency without any cash rounding.
    pub fn new(id: i64, code: impl Into<String>) -> Self {
        Currency {
            id,
            code: code.into(),
            rounding_decimals: default_rounding_decimals(),
            round_order_items: false,
            round_order_total: false,
            round_total_denomination_cents: default_denomination(),
            round_total_rule: RoundingRule::default(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn customer(username: Option<&str>, email: Option<&str>, system: bool) -> Customer {
        Customer {
            id: 1,
            customer_guid: "00000000-0000-0000-0000-000000000001".to_string(),
            username: username.map(str::to_string),
            email: email.map(str::to_string),
            system_name: None,
            is_system_account: system,
            active: true,
            deleted: false,
            created_at: Utc::now(),
            last_activity_at: Utc::now(),
        }
    }

    #[test]
    fn test_guest_detection() {
        assert!(customer(None, None, false).is_guest());
        assert!(!customer(Some("jane"), None, false).is_guest());
        assert!(!customer(None, Some("jane@example.com"), false).is_guest());
        assert!(!customer(None, None, true).is_guest());
    }

    #[test]
    fn test_out_of_range_tax_rate_is_zero() {
        let now = Utc::now();
        let mut product = Product {
            id: 1,
            sku: "SKU-1".to_string(),
            name: "Widget".to_string(),
            short_description: None,
            price_cents: 999,
            tax_rate_bps: 1900,
            parent_product_id: None,
            published: true,
            deleted: false,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(product.tax_rate().bps(), 1900);

        product.tax_rate_bps = -5;
        assert!(product.tax_rate().is_zero());
    }

    #[test]
    fn test_currency_defaults_from_toml_like_json() {
        let currency: Currency = serde_json::from_str(r#"{"id":1,"code":"EUR"}"#).unwrap();
        assert_eq!(currency.rounding_decimals, 2);
        assert_eq!(currency.round_total_denomination_cents, 1);
        assert!(!currency.round_order_total);
    }
}
