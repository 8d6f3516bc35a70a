//! # Price Calculation
//!
//! A compact pricing pipeline driven by [`PriceCalculationOptions`].
//!
//! ```text
//! stored price ──► gross/net split ──► tax mode ──► cash rounding
//!                                          │
//!         tier prices, child products ─────┴──► lowest price (optional)
//! ```

use serde::Serialize;

use crate::money::Money;
use crate::pricing::options::PriceCalculationOptions;
use crate::types::{Product, TaxRate};

/// Result of running the pipeline for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalculatedPrice {
    /// Final unit price in the requested tax mode.
    pub final_price: Money,

    /// Tax contained in (or added to) the final price.
    pub tax: Money,

    /// Lowest possible price, when one was determined and is below
    /// `final_price`.
    pub lowest_price: Option<Money>,
}

impl CalculatedPrice {
    /// Listings show "from <lowest>" when a lower price exists.
    pub fn has_price_range(&self) -> bool {
        self.lowest_price.is_some()
    }
}

/// Calculates the unit price of a product.
pub fn calculate_price(product: &Product, options: &PriceCalculationOptions) -> CalculatedPrice {
    let (final_price, tax) = to_output(product.price(), product.tax_rate(), options);

    let mut lowest: Option<Money> = None;

    let wants_tier_minimum = options.determine_lowest_price || options.determine_min_tier_price;
    if wants_tier_minimum && !options.ignore_tier_prices {
        if let Some(tier) = options.batch_context().lowest_tier_price(product.id) {
            let (tier_final, _) = to_output(tier, product.tax_rate(), options);
            lowest = min_option(lowest, tier_final);
        }
    }

    if options.determine_lowest_price {
        let child_options = options.for_child_products();
        for child in options.batch_context().child_products(product.id) {
            let child_price = child_unit_price(child, &child_options);
            lowest = min_option(lowest, child_price);
        }
    }

    CalculatedPrice {
        final_price,
        tax,
        lowest_price: lowest.filter(|l| *l < final_price),
    }
}

/// Price of an associated child product: stored price, or its lowest tier
/// price when tier prices are considered.
fn child_unit_price(child: &Product, options: &PriceCalculationOptions) -> Money {
    let mut amount = child.price();
    if !options.ignore_tier_prices {
        if let Some(tier) = options.batch_context().lowest_tier_price(child.id) {
            amount = amount.min(tier);
        }
    }
    to_output(amount, child.tax_rate(), options).0
}

/// Converts a stored amount into the requested tax mode and applies item
/// rounding. Returns `(amount, tax)`.
fn to_output(stored: Money, rate: TaxRate, options: &PriceCalculationOptions) -> (Money, Money) {
    let (net, gross) = if options.is_gross_price {
        (stored.net_from_gross(rate), stored)
    } else {
        (stored, stored + stored.calculate_tax(rate))
    };

    let amount = if options.tax_inclusive { gross } else { net };
    (options.cash_rounding.round_item(amount), gross - net)
}

fn min_option(current: Option<Money>, candidate: Money) -> Option<Money> {
    Some(match current {
        Some(c) => c.min(candidate),
        None => candidate,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
