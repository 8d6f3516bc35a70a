//! # Price Calculation Options
//!
//! Options and settings that affect how the price calculation pipeline
//! operates.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  per pricing request                                                    │
//! │                                                                         │
//! │  PriceCalculationOptions::new(batch, customer, store, language, cur)   │
//! │       │                                                                 │
//! │       ├──► pipeline(product)                                           │
//! │       │                                                                 │
//! │       └──► for_child_products()  ← clone, swap batch context           │
//! │                 │                                                       │
//! │                 └──► pipeline(child product of a bundle/group)         │
//! │                                                                         │
//! │  Required references are Arc handles: they can be replaced but never   │
//! │  be absent, and a clone shares them instead of deep-copying.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use crate::pricing::batch::ProductBatchContext;
use crate::pricing::rounding::CashRoundingOptions;
use crate::types::{Currency, Customer, Language, Store};

/// Placeholder replaced by the formatted price in format strings.
const FORMAT_PLACEHOLDER: &str = "{0}";

/// Options threaded through the pricing pipeline.
///
/// `Clone` is shallow: shared references are reference counted, flags and
/// format strings are copied. Changing a clone never affects the original.
#[derive(Debug, Clone)]
pub struct PriceCalculationOptions {
    batch_context: Arc<ProductBatchContext>,
    customer: Arc<Customer>,
    store: Arc<Store>,
    language: Arc<Language>,
    target_currency: Arc<Currency>,

    /// Batch context for nested pipelines (grouped or bundled products).
    pub child_products_batch_context: Option<Arc<ProductBatchContext>>,

    /// Ignore product attributes during price calculation.
    pub ignore_attributes: bool,

    /// Ignore tier prices during price calculation.
    pub ignore_tier_prices: bool,

    /// Ignore discounts during price calculation.
    pub ignore_discounts: bool,

    /// The source price (as stored) already includes sales tax.
    pub is_gross_price: bool,

    /// Resulting amounts should include sales tax.
    pub tax_inclusive: bool,

    /// Cash rounding applied to resulting amounts.
    pub cash_rounding: CashRoundingOptions,

    /// Optional tax format, e.g. "{0} *" or "{0} incl. tax".
    pub tax_format: Option<String>,

    /// Optional price range format, e.g. "from {0}".
    pub price_range_format: Option<String>,

    /// Perform discount validity checks. Expensive in large listings.
    pub check_discount_validity: bool,

    /// Determine the lowest possible price (cheapest child product, cheapest
    /// attribute combination or lowest tier price). Needed for price ranges
    /// in listings.
    pub determine_lowest_price: bool,

    /// Determine the price of the preselected attribute combination.
    pub determine_preselected_price: bool,

    /// Determine the minimum tier price.
    pub determine_min_tier_price: bool,

    /// Determine the minimum attribute combination price.
    pub determine_min_attribute_combination_price: bool,
}

impl PriceCalculationOptions {
    /// Creates a new options instance. All five references are required.
    pub fn new(
        batch_context: Arc<ProductBatchContext>,
        customer: Arc<Customer>,
        store: Arc<Store>,
        language: Arc<Language>,
        target_currency: Arc<Currency>,
    ) -> Self {
        PriceCalculationOptions {
            batch_context,
            customer,
            store,
            language,
            target_currency,
            child_products_batch_context: None,
            ignore_attributes: false,
            ignore_tier_prices: false,
            ignore_discounts: false,
            is_gross_price: false,
            tax_inclusive: false,
            cash_rounding: CashRoundingOptions::default(),
            tax_format: None,
            price_range_format: None,
            check_discount_validity: true,
            determine_lowest_price: false,
            determine_preselected_price: false,
            determine_min_tier_price: false,
            determine_min_attribute_combination_price: false,
        }
    }

    // =========================================================================
    // Required references
    // =========================================================================

    pub fn batch_context(&self) -> &Arc<ProductBatchContext> {
        &self.batch_context
    }

    pub fn set_batch_context(&mut self, batch_context: Arc<ProductBatchContext>) {
        self.batch_context = batch_context;
    }

    pub fn customer(&self) -> &Arc<Customer> {
        &self.customer
    }

    pub fn set_customer(&mut self, customer: Arc<Customer>) {
        self.customer = customer;
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn set_store(&mut self, store: Arc<Store>) {
        self.store = store;
    }

    pub fn language(&self) -> &Arc<Language> {
        &self.language
    }

    pub fn set_language(&mut self, language: Arc<Language>) {
        self.language = language;
    }

    /// Target currency for money exchange after the pipeline ran.
    pub fn target_currency(&self) -> &Arc<Currency> {
        &self.target_currency
    }

    pub fn set_target_currency(&mut self, target_currency: Arc<Currency>) {
        self.target_currency = target_currency;
    }

    // =========================================================================
    // Variants
    // =========================================================================

    /// Options for pricing the children of a grouped or bundled product.
    ///
    /// The parent options are left untouched. Without a child-products batch
    /// context the clone keeps the parent's batch context.
    pub fn for_child_products(&self) -> PriceCalculationOptions {
        let mut child = self.clone();
        if let Some(ctx) = &self.child_products_batch_context {
            child.batch_context = Arc::clone(ctx);
        }
        child
    }

    // =========================================================================
    // Formatting
    // =========================================================================

    /// Applies the tax format to an already formatted price.
    pub fn apply_tax_format(&self, formatted_price: &str) -> String {
        apply_format(self.tax_format.as_deref(), formatted_price)
    }

    /// Applies the price range format to an already formatted price.
    pub fn apply_price_range_format(&self, formatted_price: &str) -> String {
        apply_format(self.price_range_format.as_deref(), formatted_price)
    }
}

fn apply_format(format: Option<&str>, value: &str) -> String {
    match format {
        Some(f) if f.contains(FORMAT_PLACEHOLDER) => f.replace(FORMAT_PLACEHOLDER, value),
        _ => value.to_string(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
