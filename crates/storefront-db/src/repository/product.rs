//! # Product Repository
//!
//! Database operations for catalog products and their tier prices.
//!
//! ## Export Paging
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Export loader asks for the next page                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  list_page(offset, take)     published = 1 AND deleted = 0, ORDER BY id │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  tier_prices_for(ids)        one IN (...) query per loaded page         │
//! │  child_products_for(ids)     variants of the loaded parents             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ProductBatchContext         no per-product queries while pricing       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use storefront_core::validation::{validate_sku, validate_tax_rate};
use storefront_core::{Product, TierPrice};

const PRODUCT_COLUMNS: &str = "id, sku, name, short_description, price_cents, tax_rate_bps, \
     parent_product_id, published, deleted, created_at, updated_at";

/// Repository for product database operations.
///
/// ```rust,ignore
/// let repo = db.products();
/// let total = repo.count_exportable().await?;
/// let page = repo.list_page(0, 500).await?;
/// let tiers = repo.tier_prices_for(&[1, 2, 3]).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Inserts a product and returns it with the generated id.
    ///
    /// The `id` of the argument is ignored.
    ///
    /// ## Returns
    /// * `Err(DbError::InvalidInput)` - SKU or tax rate fails validation
    /// * `Err(DbError::UniqueViolation)` - SKU already exists
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        validate_sku(&product.sku)?;
        validate_tax_rate(product.tax_rate_bps)?;

        debug!(sku = %product.sku, "Inserting product");

        let result = sqlx::query(
            r#"
            INSERT INTO products (
                sku, name, short_description, price_cents, tax_rate_bps,
                parent_product_id, published, deleted, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.short_description)
        .bind(product.price_cents)
        .bind(product.tax_rate_bps)
        .bind(product.parent_product_id)
        .bind(product.published)
        .bind(product.deleted)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
                field,
                value: product.sku.clone(),
            },
            other => other,
        })?;

        let mut inserted = product.clone();
        inserted.id = result.last_insert_rowid();
        Ok(inserted)
    }

    /// Adds a tier price for `product_id`.
    pub async fn insert_tier_price(
        &self,
        product_id: i64,
        quantity: i64,
        price_cents: i64,
    ) -> DbResult<TierPrice> {
        debug!(product_id, quantity, price_cents, "Inserting tier price");

        let result = sqlx::query(
            "INSERT INTO tier_prices (product_id, quantity, price_cents) VALUES (?1, ?2, ?3)",
        )
        .bind(product_id)
        .bind(quantity)
        .bind(price_cents)
        .execute(&self.pool)
        .await?;

        Ok(TierPrice {
            id: result.last_insert_rowid(),
            product_id,
            quantity,
            price_cents,
        })
    }

    /// Gets a product by its id.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");

        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Soft-deletes a product. Deleted products are skipped by the export.
    pub async fn soft_delete(&self, id: i64) -> DbResult<()> {
        debug!(id, "Soft-deleting product");

        let result = sqlx::query("UPDATE products SET deleted = 1, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts products the export will visit.
    pub async fn count_exportable(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE published = 1 AND deleted = 0")
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    /// Returns up to `take` exportable products after skipping `offset`,
    /// ordered by id so consecutive pages never overlap.
    pub async fn list_page(&self, offset: usize, take: usize) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE published = 1 AND deleted = 0 \
             ORDER BY id LIMIT ?1 OFFSET ?2"
        );

        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(to_i64(take))
            .bind(to_i64(offset))
            .fetch_all(&self.pool)
            .await?;

        debug!(offset, take, count = products.len(), "Loaded product page");
        Ok(products)
    }

    /// Loads the tier prices of all given products in one query.
    pub async fn tier_prices_for(&self, product_ids: &[i64]) -> DbResult<Vec<TierPrice>> {
        if product_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT id, product_id, quantity, price_cents FROM tier_prices WHERE product_id IN (",
        );
        let mut ids = builder.separated(", ");
        for id in product_ids {
            ids.push_bind(*id);
        }
        ids.push_unseparated(") ORDER BY product_id, quantity");

        let tier_prices = builder
            .build_query_as::<TierPrice>()
            .fetch_all(&self.pool)
            .await?;

        Ok(tier_prices)
    }

    /// Loads the published child products (variants) of the given parents.
    pub async fn child_products_for(&self, parent_ids: &[i64]) -> DbResult<Vec<Product>> {
        if parent_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE published = 1 AND deleted = 0 AND parent_product_id IN ("
        ));
        let mut ids = builder.separated(", ");
        for id in parent_ids {
            ids.push_bind(*id);
        }
        ids.push_unseparated(") ORDER BY id");

        let children = builder
            .build_query_as::<Product>()
            .fetch_all(&self.pool)
            .await?;

        Ok(children)
    }
}

fn to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

// =============================================================================
// Unit Tests
// =============================================================================
