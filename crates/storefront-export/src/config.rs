//! # Export Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Command line flags (highest priority, applied by the CLI)           │
//! │                                                                         │
//! │  2. Environment Variables                                               │
//! │     STOREFRONT_DB_PATH=/var/lib/storefront/store.db                     │
//! │     STOREFRONT_EXPORT_LIMIT=1000                                        │
//! │                                                                         │
//! │  3. TOML Config File                                                    │
//! │     ~/.config/storefront-export/export.toml (Linux)                     │
//! │                                                                         │
//! │  4. Default Values (lowest priority)                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "/var/lib/storefront/store.db"
//!
//! [export]
//! output_dir = "/srv/feeds"
//! file_prefix = "products"
//! offset = 0
//! take = 500
//! limit = 0                # 0 = everything
//! records_per_segment = 1000
//! include_variants = false
//!
//! [pricing]
//! currency = "EUR"
//! tax_inclusive = true
//! tax_format = "{0} incl. VAT"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{ExportError, ExportResult};
use crate::segmenter::SegmenterOptions;
use storefront_core::validation::validate_page_size;
use storefront_core::{
    CashRoundingOptions, Currency, Customer, Language, PriceCalculationOptions,
    ProductBatchContext, RoundingRule, Store,
};

// =============================================================================
// Database Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("storefront.db")
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
        }
    }
}

// =============================================================================
// Export Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSettings {
    /// Directory receiving the segment files.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Segment files are named `<prefix>-0001.jsonl`, `<prefix>-0002.jsonl`, ...
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,

    /// Products skipped at the start of the catalog.
    #[serde(default)]
    pub offset: usize,

    /// Products loaded per database query.
    #[serde(default = "default_take")]
    pub take: usize,

    /// Maximum number of products exported. 0 exports everything.
    #[serde(default)]
    pub limit: usize,

    /// Maximum number of products per segment file. 0 writes a single file.
    #[serde(default = "default_records_per_segment")]
    pub records_per_segment: usize,

    /// Emit a record for every published variant after its parent.
    #[serde(default)]
    pub include_variants: bool,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("export")
}

fn default_file_prefix() -> String {
    "products".to_string()
}

fn default_take() -> usize {
    500
}

fn default_records_per_segment() -> usize {
    1000
}

impl Default for ExportSettings {
    fn default() -> Self {
        ExportSettings {
            output_dir: default_output_dir(),
            file_prefix: default_file_prefix(),
            offset: 0,
            take: default_take(),
            limit: 0,
            records_per_segment: default_records_per_segment(),
            include_variants: false,
        }
    }
}

// =============================================================================
// Pricing Settings
// =============================================================================

/// Price calculation settings applied to every exported product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingSettings {
    /// ISO 4217 code of the feed currency.
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Stored prices include tax.
    #[serde(default)]
    pub is_gross_price: bool,

    /// Exported prices include tax.
    #[serde(default = "default_true")]
    pub tax_inclusive: bool,

    #[serde(default)]
    pub ignore_tier_prices: bool,

    /// Export a "from" price when tier prices or variants are cheaper.
    #[serde(default = "default_true")]
    pub determine_lowest_price: bool,

    /// Decimals prices are rounded to (0-2).
    #[serde(default = "default_rounding_decimals")]
    pub rounding_decimals: u32,

    #[serde(default)]
    pub round_order_items: bool,

    #[serde(default)]
    pub rounding_rule: RoundingRule,

    /// Wraps the formatted price, e.g. "{0} incl. VAT".
    #[serde(default)]
    pub tax_format: Option<String>,

    /// Wraps the formatted lowest price, e.g. "from {0}".
    #[serde(default)]
    pub price_range_format: Option<String>,

    #[serde(default = "default_store_name")]
    pub store_name: String,

    #[serde(default = "default_store_url")]
    pub store_url: String,

    #[serde(default = "default_culture")]
    pub language_culture: String,
}

fn default_true() -> bool {
    true
}

fn default_currency() -> String {
    "EUR".to_string()
}

fn default_rounding_decimals() -> u32 {
    2
}

fn default_store_name() -> String {
    "Storefront".to_string()
}

fn default_store_url() -> String {
    "http://localhost/".to_string()
}

fn default_culture() -> String {
    "en-US".to_string()
}

impl Default for PricingSettings {
    fn default() -> Self {
        PricingSettings {
            currency: default_currency(),
            is_gross_price: false,
            tax_inclusive: true,
            ignore_tier_prices: false,
            determine_lowest_price: true,
            rounding_decimals: default_rounding_decimals(),
            round_order_items: false,
            rounding_rule: RoundingRule::default(),
            tax_format: None,
            price_range_format: None,
            store_name: default_store_name(),
            store_url: default_store_url(),
            language_culture: default_culture(),
        }
    }
}

impl PricingSettings {
    pub fn target_currency(&self) -> Currency {
        let mut currency = Currency::new(1, self.currency.clone());
        currency.rounding_decimals = self.rounding_decimals;
        currency.round_order_items = self.round_order_items;
        currency.round_total_rule = self.rounding_rule;
        currency
    }

    pub fn store(&self) -> Store {
        Store {
            id: 1,
            name: self.store_name.clone(),
            url: self.store_url.clone(),
        }
    }

    pub fn language(&self) -> Language {
        Language {
            id: 1,
            culture: self.language_culture.clone(),
            name: self.language_culture.clone(),
        }
    }

    /// Base options for pricing exported products on behalf of `customer`.
    ///
    /// The batch context is empty; the export swaps in the context of each
    /// loaded batch.
    pub fn price_options(&self, customer: Arc<Customer>) -> PriceCalculationOptions {
        let currency = self.target_currency();
        let cash_rounding = CashRoundingOptions::from_currency(&currency);

        let mut options = PriceCalculationOptions::new(
            Arc::new(ProductBatchContext::default()),
            customer,
            Arc::new(self.store()),
            Arc::new(self.language()),
            Arc::new(currency),
        );
        options.is_gross_price = self.is_gross_price;
        options.tax_inclusive = self.tax_inclusive;
        options.ignore_tier_prices = self.ignore_tier_prices;
        options.determine_lowest_price = self.determine_lowest_price;
        options.cash_rounding = cash_rounding;
        options.tax_format = self.tax_format.clone();
        options.price_range_format = self.price_range_format.clone();
        options
    }
}

// =============================================================================
// Main Export Configuration
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub export: ExportSettings,

    #[serde(default)]
    pub pricing: PricingSettings,
}

impl ExportConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (export.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ExportResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading export config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ExportResult<()> {
        validate_page_size(self.export.take)?;

        let prefix = &self.export.file_prefix;
        if prefix.is_empty() || prefix.contains(['/', '\\']) {
            return Err(ExportError::InvalidConfig(format!(
                "file_prefix must be a plain file name, got: '{}'",
                prefix
            )));
        }

        let code = &self.pricing.currency;
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(ExportError::InvalidConfig(format!(
                "currency must be a 3-letter ISO code, got: '{}'",
                code
            )));
        }

        if self.pricing.rounding_decimals > 2 {
            return Err(ExportError::InvalidConfig(
                "rounding_decimals must be between 0 and 2".into(),
            ));
        }

        Ok(())
    }

    /// Segmenter options for a source holding `total_records` products.
    pub fn segmenter_options(&self, total_records: usize) -> SegmenterOptions {
        SegmenterOptions {
            offset: self.export.offset,
            take: self.export.take,
            limit: self.export.limit,
            records_per_segment: self.export.records_per_segment,
            total_records,
        }
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies `STOREFRONT_*` overrides read through `lookup`.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("STOREFRONT_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(dir) = lookup("STOREFRONT_EXPORT_DIR") {
            self.export.output_dir = PathBuf::from(dir);
        }

        if let Some(prefix) = lookup("STOREFRONT_EXPORT_PREFIX") {
            self.export.file_prefix = prefix;
        }

        let numeric = [
            ("STOREFRONT_EXPORT_OFFSET", &mut self.export.offset),
            ("STOREFRONT_EXPORT_TAKE", &mut self.export.take),
            ("STOREFRONT_EXPORT_LIMIT", &mut self.export.limit),
            ("STOREFRONT_EXPORT_PER_SEGMENT", &mut self.export.records_per_segment),
        ];
        for (key, target) in numeric {
            if let Some(raw) = lookup(key) {
                match raw.parse::<usize>() {
                    Ok(value) => *target = value,
                    Err(_) => warn!(key, value = %raw, "Ignoring non-numeric override"),
                }
            }
        }

        if let Some(currency) = lookup("STOREFRONT_CURRENCY") {
            debug!(currency = %currency, "Overriding currency from environment");
            self.pricing.currency = currency.to_uppercase();
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "storefront", "storefront-export")
            .map(|dirs| dirs.config_dir().join("export.toml"))
    }
}
