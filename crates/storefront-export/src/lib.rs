//! # storefront-export: Export Segmentation Engine
//!
//! Streams the product catalog into bounded JSON-lines segment files.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ExportConfig ──► export_products(db, config)                           │
//! │                        │                                                │
//! │                        ▼                                                │
//! │   ┌──────────────────────────────────────────────────────────────┐     │
//! │   │ ExportDataSegmenter<Product, ProductRecord>                   │     │
//! │   │   loader     ProductExportSource    (list_page)               │     │
//! │   │   callback   ProductBatchLoader     (tier prices, variants)   │     │
//! │   │   converter  ProductRecordConverter (calculate_price)         │     │
//! │   └───────────────────────────┬──────────────────────────────────┘     │
//! │                               │ SegmenterProvider                       │
//! │                               ▼                                         │
//! │   DataExporter ──► JsonLinesWriter ──► products-0001.jsonl, ...         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use storefront_export::{export_products, ExportConfig};
//!
//! let config = ExportConfig::load(None)?;
//! let db = Database::new(DbConfig::new(&config.database.path)).await?;
//! let summary = export_products(&db, &config).await?;
//! println!("{} records in {} segments", summary.records, summary.segments);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod exporter;
pub mod segmenter;
pub mod source;
pub mod writer;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{DatabaseSettings, ExportConfig, ExportSettings, PricingSettings};
pub use error::{ExportError, ExportResult};
pub use exporter::{export_products, DataExporter, ExportSummary};
pub use segmenter::{
    EntityLoader, ExportDataSegmenter, LoadedCallback, RecordConverter, SegmenterConsumer,
    SegmenterOptions, SegmenterProvider,
};
pub use source::{
    BatchState, ProductBatchLoader, ProductExportSource, ProductRecord, ProductRecordConverter,
    SharedBatchState, TierPriceRecord,
};
pub use writer::{ExportWriter, JsonLinesWriter, SegmentFile};
