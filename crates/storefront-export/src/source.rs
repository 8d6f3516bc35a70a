//! # Product Export Source
//!
//! Feeds catalog products from the database into an
//! [`ExportDataSegmenter`](crate::segmenter::ExportDataSegmenter).
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ProductExportSource      list_page(offset, take), offset += take       │
//! │          │                                                              │
//! │          ▼                                                              │
//! │  ProductBatchLoader       tier prices + variants of everything buffered │
//! │          │  writes                                                      │
//! │          ▼                                                              │
//! │  SharedBatchState  ◄──── reads ────  ProductRecordConverter             │
//! │                                      calculate_price ─► ProductRecord   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{ExportError, ExportResult};
use crate::segmenter::{EntityLoader, LoadedCallback, RecordConverter};
use storefront_core::pricing::calculate_price;
use storefront_core::{PriceCalculationOptions, Product, ProductBatchContext};
use storefront_db::ProductRepository;

// =============================================================================
// Loader
// =============================================================================

/// Pages exportable products ordered by id.
pub struct ProductExportSource {
    products: ProductRepository,
    next_offset: usize,
    take: usize,
}

impl ProductExportSource {
    pub fn new(products: ProductRepository, offset: usize, take: usize) -> Self {
        ProductExportSource {
            products,
            next_offset: offset,
            take,
        }
    }
}

#[async_trait]
impl EntityLoader<Product> for ProductExportSource {
    async fn load(&mut self) -> ExportResult<Vec<Product>> {
        let page = self
            .products
            .list_page(self.next_offset, self.take)
            .await
            .map_err(|e| {
                ExportError::LoadFailed(format!(
                    "product page at offset {}: {}",
                    self.next_offset, e
                ))
            })?;

        self.next_offset += page.len();
        Ok(page)
    }
}

// =============================================================================
// Batch Context
// =============================================================================

/// Batch contexts of the products currently buffered by the segmenter.
#[derive(Debug, Default)]
pub struct BatchState {
    pub products: Arc<ProductBatchContext>,
    pub children: Option<Arc<ProductBatchContext>>,
}

pub type SharedBatchState = Arc<RwLock<BatchState>>;

/// Loaded callback that pre-loads tier prices and variants for all
/// buffered products, so pricing never queries per product.
pub struct ProductBatchLoader {
    products: ProductRepository,
    state: SharedBatchState,
}

impl ProductBatchLoader {
    pub fn new(products: ProductRepository, state: SharedBatchState) -> Self {
        ProductBatchLoader { products, state }
    }
}

#[async_trait]
impl LoadedCallback<Product> for ProductBatchLoader {
    async fn on_loaded(&mut self, buffered: &[Product]) -> ExportResult<()> {
        let ids: Vec<i64> = buffered.iter().map(|p| p.id).collect();

        let tier_prices = self.products.tier_prices_for(&ids).await?;
        let children = self.products.child_products_for(&ids).await?;

        let child_ids: Vec<i64> = children.iter().map(|c| c.id).collect();
        let child_tier_prices = self.products.tier_prices_for(&child_ids).await?;

        let mut child_context = ProductBatchContext::new(&children);
        child_context.add_tier_prices(child_tier_prices);

        let mut context = ProductBatchContext::new(buffered);
        context.add_tier_prices(tier_prices);
        context.add_child_products(children);

        debug!(
            products = ids.len(),
            children = child_ids.len(),
            "Pre-loaded product batch context"
        );

        let mut state = self.state.write().await;
        state.products = Arc::new(context);
        state.children = (!child_ids.is_empty()).then(|| Arc::new(child_context));

        Ok(())
    }
}

// =============================================================================
// Records
// =============================================================================

/// One line of the product feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductRecord {
    pub id: i64,
    pub sku: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_product_id: Option<i64>,
    pub currency: String,
    pub price: String,
    pub price_cents: i64,
    pub tax_cents: i64,
    /// Price with the configured tax format applied.
    pub price_display: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lowest_price: Option<String>,
    /// Lowest price with the configured price range format applied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lowest_price_display: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tier_prices: Vec<TierPriceRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierPriceRecord {
    pub quantity: i64,
    pub price: String,
}

/// Prices products with the export's [`PriceCalculationOptions`].
///
/// With `include_variants` every parent is followed by records for its
/// published variants, and variants are not exported on their own.
pub struct ProductRecordConverter {
    options: PriceCalculationOptions,
    state: SharedBatchState,
    include_variants: bool,
}

impl ProductRecordConverter {
    pub fn new(options: PriceCalculationOptions, state: SharedBatchState) -> Self {
        ProductRecordConverter {
            options,
            state,
            include_variants: false,
        }
    }

    pub fn include_variants(mut self, include: bool) -> Self {
        self.include_variants = include;
        self
    }

    fn to_record(product: &Product, options: &PriceCalculationOptions) -> ProductRecord {
        let calculated = calculate_price(product, options);
        let price = calculated.final_price.to_string();
        let lowest = calculated.lowest_price.map(|l| l.to_string());

        ProductRecord {
            id: product.id,
            sku: product.sku.clone(),
            name: product.name.clone(),
            short_description: product.short_description.clone(),
            parent_product_id: product.parent_product_id,
            currency: options.target_currency().code.clone(),
            price_display: options.apply_tax_format(&price),
            price,
            price_cents: calculated.final_price.cents(),
            tax_cents: calculated.tax.cents(),
            lowest_price_display: lowest.as_deref().map(|l| options.apply_price_range_format(l)),
            lowest_price: lowest,
            tier_prices: options
                .batch_context()
                .tier_prices(product.id)
                .iter()
                .map(|t| TierPriceRecord {
                    quantity: t.quantity,
                    price: t.price().to_string(),
                })
                .collect(),
        }
    }
}

#[async_trait]
impl RecordConverter<Product, ProductRecord> for ProductRecordConverter {
    async fn convert(&mut self, product: &Product) -> ExportResult<Vec<ProductRecord>> {
        if self.include_variants && product.parent_product_id.is_some() {
            return Ok(Vec::new());
        }

        let mut options = self.options.clone();
        {
            let state = self.state.read().await;
            options.set_batch_context(Arc::clone(&state.products));
            options.child_products_batch_context = state.children.clone();
        }

        let mut records = vec![Self::to_record(product, &options)];

        if self.include_variants {
            let child_options = options.for_child_products();
            records.extend(
                options
                    .batch_context()
                    .child_products(product.id)
                    .iter()
                    .map(|child| Self::to_record(child, &child_options)),
            );
        }

        Ok(records)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PricingSettings;
    use chrono::Utc;
    use storefront_core::Customer;
    use storefront_db::{Database, DbConfig};

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn insert(db: &Database, sku: &str, price_cents: i64, parent: Option<i64>) -> Product {
        let now = Utc::now();
        db.products()
            .insert(&Product {
                id: 0,
                sku: sku.to_string(),
                name: format!("Product {sku}"),
                short_description: None,
                price_cents,
                tax_rate_bps: 1900,
                parent_product_id: parent,
                published: true,
                deleted: false,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap()
    }

    fn options(pricing: &PricingSettings) -> PriceCalculationOptions {
        let now = Utc::now();
        pricing.price_options(Arc::new(Customer {
            id: 1,
            customer_guid: "guid".to_string(),
            username: None,
            email: None,
            system_name: Some("BackgroundTask".to_string()),
            is_system_account: true,
            active: true,
            deleted: false,
            created_at: now,
            last_activity_at: now,
        }))
    }

    #[tokio::test]
    async fn test_source_pages_from_offset() {
        let db = setup().await;
        for i in 0..7 {
            insert(&db, &format!("SKU-{i}"), 1000, None).await;
        }

        let mut source = ProductExportSource::new(db.products(), 2, 3);
        assert_eq!(source.load().await.unwrap().len(), 3);
        let second = source.load().await.unwrap();
        assert_eq!(second.len(), 2);
        assert_eq!(second[1].sku, "SKU-6");
        assert!(source.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_batch_loader_fills_state() {
        let db = setup().await;
        let parent = insert(&db, "PARENT", 2000, None).await;
        let child = insert(&db, "CHILD", 1500, Some(parent.id)).await;
        db.products().insert_tier_price(parent.id, 10, 1800).await.unwrap();
        db.products().insert_tier_price(child.id, 5, 1200).await.unwrap();

        let state = SharedBatchState::default();
        let mut loader = ProductBatchLoader::new(db.products(), Arc::clone(&state));
        loader.on_loaded(&[parent.clone()]).await.unwrap();

        let state = state.read().await;
        assert_eq!(state.products.product_ids(), &[parent.id]);
        assert_eq!(state.products.tier_prices(parent.id).len(), 1);
        assert_eq!(state.products.child_products(parent.id).len(), 1);

        let children = state.children.as_ref().unwrap();
        assert_eq!(children.tier_prices(child.id)[0].price_cents, 1200);
    }

    #[tokio::test]
    async fn test_batch_loader_without_children() {
        let db = setup().await;
        let product = insert(&db, "PLAIN", 1000, None).await;

        let state = SharedBatchState::default();
        let mut loader = ProductBatchLoader::new(db.products(), Arc::clone(&state));
        loader.on_loaded(&[product]).await.unwrap();

        assert!(state.read().await.children.is_none());
    }

    #[tokio::test]
    async fn test_converter_prices_with_batch_context() {
        let db = setup().await;
        let product = insert(&db, "TIERED", 1000, None).await;
        db.products().insert_tier_price(product.id, 10, 900).await.unwrap();

        let state = SharedBatchState::default();
        let mut loader = ProductBatchLoader::new(db.products(), Arc::clone(&state));
        loader.on_loaded(&[product.clone()]).await.unwrap();

        let mut pricing = PricingSettings::default();
        pricing.tax_format = Some("{0} incl. VAT".to_string());
        pricing.price_range_format = Some("from {0}".to_string());

        let mut converter = ProductRecordConverter::new(options(&pricing), state);
        let records = converter.convert(&product).await.unwrap();
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.price, "11.90");
        assert_eq!(record.price_cents, 1190);
        assert_eq!(record.tax_cents, 190);
        assert_eq!(record.currency, "EUR");
        assert_eq!(record.price_display, "11.90 incl. VAT");
        assert_eq!(record.lowest_price.as_deref(), Some("10.71"));
        assert_eq!(record.lowest_price_display.as_deref(), Some("from 10.71"));
        assert_eq!(record.tier_prices.len(), 1);
        assert_eq!(record.tier_prices[0].price, "9.00");
    }

    #[tokio::test]
    async fn test_converter_with_variants() {
        let db = setup().await;
        let parent = insert(&db, "SHIRT", 2000, None).await;
        let black = insert(&db, "SHIRT-BLACK", 1500, Some(parent.id)).await;

        let state = SharedBatchState::default();
        let mut loader = ProductBatchLoader::new(db.products(), Arc::clone(&state));
        loader
            .on_loaded(&[parent.clone(), black.clone()])
            .await
            .unwrap();

        let mut pricing = PricingSettings::default();
        pricing.tax_inclusive = false;

        let mut converter =
            ProductRecordConverter::new(options(&pricing), state).include_variants(true);

        let records = converter.convert(&parent).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].sku, "SHIRT");
        assert_eq!(records[0].lowest_price.as_deref(), Some("15.00"));
        assert_eq!(records[1].sku, "SHIRT-BLACK");
        assert_eq!(records[1].parent_product_id, Some(records[0].id));

        // Emitted with the parent already
        assert!(converter.convert(&black).await.unwrap().is_empty());
    }

    #[test]
    fn test_record_json_skips_empty_fields() {
        let record = ProductRecord {
            id: 1,
            sku: "SKU-1".to_string(),
            name: "Mug".to_string(),
            short_description: None,
            parent_product_id: None,
            currency: "EUR".to_string(),
            price: "9.99".to_string(),
            price_cents: 999,
            tax_cents: 0,
            price_display: "9.99".to_string(),
            lowest_price: None,
            lowest_price_display: None,
            tier_prices: Vec::new(),
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["sku"], "SKU-1");
        assert!(json.get("lowest_price").is_none());
        assert!(json.get("tier_prices").is_none());
        assert!(json.get("parent_product_id").is_none());
    }
}
