//! # Product Batch Context
//!
//! Pre-loaded related data for a batch of products, so pricing a listing
//! does not hit the database once per product.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  load page of products ──► ProductBatchContext::new(products)          │
//! │                                   │                                     │
//! │  repository (one query each) ─────┼──► add_tier_prices(...)            │
//! │                                   └──► add_child_products(...)         │
//! │                                                                         │
//! │  pricing reads tier_prices(id) / child_products(id) from memory        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use crate::money::Money;
use crate::types::{Product, TierPrice};

/// Cache of related product data for one batch.
#[derive(Debug, Clone, Default)]
pub struct ProductBatchContext {
    product_ids: Vec<i64>,
    tier_prices: HashMap<i64, Vec<TierPrice>>,
    child_products: HashMap<i64, Vec<Product>>,
}

impl ProductBatchContext {
    /// Creates a context for the given products with nothing pre-loaded yet.
    pub fn new<'a>(products: impl IntoIterator<Item = &'a Product>) -> Self {
        ProductBatchContext {
            product_ids: products.into_iter().map(|p| p.id).collect(),
            ..Default::default()
        }
    }

    /// Ids of the products this context was created for.
    pub fn product_ids(&self) -> &[i64] {
        &self.product_ids
    }

    pub fn contains(&self, product_id: i64) -> bool {
        self.product_ids.contains(&product_id)
    }

    /// Adds tier prices, grouped by product and ordered by quantity.
    pub fn add_tier_prices(&mut self, tier_prices: impl IntoIterator<Item = TierPrice>) {
        for tier_price in tier_prices {
            self.tier_prices
                .entry(tier_price.product_id)
                .or_default()
                .push(tier_price);
        }

        for prices in self.tier_prices.values_mut() {
            prices.sort_by_key(|t| t.quantity);
        }
    }

    /// Adds associated child products, grouped by their parent.
    pub fn add_child_products(&mut self, children: impl IntoIterator<Item = Product>) {
        for child in children {
            if let Some(parent_id) = child.parent_product_id {
                self.child_products.entry(parent_id).or_default().push(child);
            }
        }
    }

    pub fn tier_prices(&self, product_id: i64) -> &[TierPrice] {
        self.tier_prices
            .get(&product_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn child_products(&self, product_id: i64) -> &[Product] {
        self.child_products
            .get(&product_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All child products across every parent in this batch.
    pub fn all_child_products(&self) -> impl Iterator<Item = &Product> {
        self.child_products.values().flatten()
    }

    /// Lowest tier price of a product, if it has any.
    pub fn lowest_tier_price(&self, product_id: i64) -> Option<Money> {
        self.tier_prices(product_id).iter().map(TierPrice::price).min()
    }
}
