//! # Data Exporter
//!
//! Drives a segmenter through an [`ExportWriter`], one file per segment.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  while provider.has_data()                                              │
//! │      set_record_per_segment_count(0)                                    │
//! │      writer.write_segment(n, provider)  ──►  products-000n.jsonl        │
//! │  provider.reset()                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::ExportConfig;
use crate::error::ExportResult;
use crate::segmenter::{ExportDataSegmenter, SegmenterProvider};
use crate::source::{
    ProductBatchLoader, ProductExportSource, ProductRecordConverter, SharedBatchState,
};
use crate::writer::{ExportWriter, JsonLinesWriter};
use storefront_core::{Customer, BACKGROUND_TASK_ACCOUNT};
use storefront_db::Database;

/// Outcome of one export run.
#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub run_id: Uuid,
    pub segments: usize,
    /// Output records written, variants included.
    pub records: usize,
    pub files: Vec<PathBuf>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

pub struct DataExporter<P, W> {
    provider: P,
    writer: W,
}

impl<P, W> DataExporter<P, W>
where
    P: SegmenterProvider + 'static,
    W: ExportWriter<P::Record>,
{
    pub fn new(provider: P, writer: W) -> Self {
        DataExporter { provider, writer }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Writes segments until the provider runs out of data, then resets it.
    pub async fn run(&mut self) -> ExportResult<ExportSummary> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let expected = self.provider.total_records();

        info!(%run_id, expected, "Starting export");

        let mut files = Vec::new();
        let mut records = 0;

        while self.provider.has_data() {
            self.provider.set_record_per_segment_count(0);

            let index = files.len() + 1;
            match self.writer.write_segment(index, &mut self.provider).await? {
                Some(segment) => {
                    info!(
                        %run_id,
                        segment = index,
                        records = segment.records,
                        path = %segment.path.display(),
                        "Wrote export segment"
                    );
                    records += segment.records;
                    files.push(segment.path);
                }
                None => {
                    if self.provider.has_data() {
                        warn!(%run_id, segment = index, "Segment produced no records");
                    }
                }
            }
        }

        self.provider.reset();

        let summary = ExportSummary {
            run_id,
            segments: files.len(),
            records,
            files,
            started_at,
            finished_at: Utc::now(),
        };

        info!(
            %run_id,
            segments = summary.segments,
            records = summary.records,
            "Export finished"
        );
        Ok(summary)
    }
}

/// Exports the product catalog as configured.
///
/// Prices are calculated for the background task account. A database
/// without that account prices for an anonymous system customer instead.
pub async fn export_products(db: &Database, config: &ExportConfig) -> ExportResult<ExportSummary> {
    config.validate()?;

    let products = db.products();
    let total = usize::try_from(products.count_exportable().await?).unwrap_or_default();

    let customer = match db
        .customers()
        .customer_by_system_name(BACKGROUND_TASK_ACCOUNT)
        .await?
    {
        Some(customer) => customer,
        None => {
            warn!("Background task account missing, pricing as anonymous system customer");
            anonymous_system_customer()
        }
    };

    let state = SharedBatchState::default();
    let converter = ProductRecordConverter::new(
        config.pricing.price_options(Arc::new(customer)),
        Arc::clone(&state),
    )
    .include_variants(config.export.include_variants);

    let segmenter = ExportDataSegmenter::new(
        ProductExportSource::new(products.clone(), config.export.offset, config.export.take),
        converter,
        config.segmenter_options(total),
    )
    .with_loaded_callback(ProductBatchLoader::new(products, state));

    let writer = JsonLinesWriter::new(&config.export.output_dir, config.export.file_prefix.clone());

    DataExporter::new(segmenter, writer).run().await
}

fn anonymous_system_customer() -> Customer {
    let now = Utc::now();
    Customer {
        id: 0,
        customer_guid: Uuid::new_v4().to_string(),
        username: None,
        email: None,
        system_name: Some(BACKGROUND_TASK_ACCOUNT.to_string()),
        is_system_account: true,
        active: true,
        deleted: false,
        created_at: now,
        last_activity_at: now,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmenter::{EntityLoader, RecordConverter, SegmenterOptions};
    use async_trait::async_trait;
    use storefront_core::Product;
    use storefront_db::DbConfig;

    struct Numbers {
        next: u32,
        end: u32,
        take: u32,
    }

    #[async_trait]
    impl EntityLoader<u32> for Numbers {
        async fn load(&mut self) -> ExportResult<Vec<u32>> {
            let batch: Vec<u32> = (self.next..self.end.min(self.next + self.take)).collect();
            self.next += batch.len() as u32;
            Ok(batch)
        }
    }

    struct Plain;

    #[async_trait]
    impl RecordConverter<u32, u32> for Plain {
        async fn convert(&mut self, n: &u32) -> ExportResult<Vec<u32>> {
            Ok(vec![*n])
        }
    }

    fn read_lines(path: &std::path::Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[tokio::test]
    async fn test_limit_splits_into_segments() {
        let dir = tempfile::tempdir().unwrap();
        let segmenter = ExportDataSegmenter::new(
            Numbers { next: 0, end: 50, take: 8 },
            Plain,
            SegmenterOptions {
                offset: 0,
                take: 8,
                limit: 20,
                records_per_segment: 5,
                total_records: 50,
            },
        );
        let mut exporter = DataExporter::new(segmenter, JsonLinesWriter::new(dir.path(), "n"));

        let summary = exporter.run().await.unwrap();
        assert_eq!(summary.segments, 4);
        assert_eq!(summary.records, 20);
        for (i, file) in summary.files.iter().enumerate() {
            assert_eq!(file, &dir.path().join(format!("n-{:04}.jsonl", i + 1)));
            assert_eq!(read_lines(file).len(), 5);
        }
        assert_eq!(read_lines(&summary.files[3]).last().unwrap(), "19");

        // Reset for the next run
        assert_eq!(exporter.provider().record_count(), 0);
        assert_eq!(exporter.provider().buffered(), 0);
    }

    #[tokio::test]
    async fn test_unbounded_segment_writes_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let segmenter = ExportDataSegmenter::new(
            Numbers { next: 0, end: 23, take: 10 },
            Plain,
            SegmenterOptions {
                take: 10,
                total_records: 23,
                ..Default::default()
            },
        );
        let mut exporter = DataExporter::new(segmenter, JsonLinesWriter::new(dir.path(), "all"));

        let summary = exporter.run().await.unwrap();
        assert_eq!(summary.segments, 1);
        assert_eq!(summary.records, 23);
    }

    #[tokio::test]
    async fn test_source_shorter_than_total() {
        let dir = tempfile::tempdir().unwrap();
        let segmenter = ExportDataSegmenter::new(
            Numbers { next: 0, end: 7, take: 4 },
            Plain,
            SegmenterOptions {
                take: 4,
                records_per_segment: 5,
                total_records: 100,
                ..Default::default()
            },
        );
        let mut exporter = DataExporter::new(segmenter, JsonLinesWriter::new(dir.path(), "short"));

        let summary = exporter.run().await.unwrap();
        assert_eq!(summary.segments, 2);
        assert_eq!(summary.records, 7);
    }

    async fn seed_catalog(db: &Database, count: i64) {
        let now = Utc::now();
        for i in 0..count {
            db.products()
                .insert(&Product {
                    id: 0,
                    sku: format!("SKU-{i:03}"),
                    name: format!("Product {i}"),
                    short_description: None,
                    price_cents: 1000 + i,
                    tax_rate_bps: 0,
                    parent_product_id: None,
                    published: true,
                    deleted: false,
                    created_at: now,
                    updated_at: now,
                })
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_export_products_end_to_end() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        seed_catalog(&db, 12).await;
        let dir = tempfile::tempdir().unwrap();

        let mut config = ExportConfig::default();
        config.export.output_dir = dir.path().join("feed");
        config.export.take = 4;
        config.export.records_per_segment = 5;

        let summary = export_products(&db, &config).await.unwrap();
        assert_eq!(summary.segments, 3);
        assert_eq!(summary.records, 12);

        let last = read_lines(&summary.files[2]);
        assert_eq!(last.len(), 2);
        let record: serde_json::Value = serde_json::from_str(&last[1]).unwrap();
        assert_eq!(record["sku"], "SKU-011");
        assert_eq!(record["price"], "10.11");
        assert_eq!(record["currency"], "EUR");
    }

    #[tokio::test]
    async fn test_export_products_offset_and_limit() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        seed_catalog(&db, 10).await;
        let dir = tempfile::tempdir().unwrap();

        let mut config = ExportConfig::default();
        config.export.output_dir = dir.path().to_path_buf();
        config.export.offset = 3;
        config.export.limit = 4;

        let summary = export_products(&db, &config).await.unwrap();
        assert_eq!(summary.segments, 1);
        assert_eq!(summary.records, 4);

        let lines = read_lines(&summary.files[0]);
        let first: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(first["sku"], "SKU-003");
    }

    #[tokio::test]
    async fn test_export_products_empty_catalog() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let dir = tempfile::tempdir().unwrap();

        let mut config = ExportConfig::default();
        config.export.output_dir = dir.path().to_path_buf();

        let summary = export_products(&db, &config).await.unwrap();
        assert_eq!(summary.segments, 0);
        assert!(summary.files.is_empty());
    }

    #[tokio::test]
    async fn test_export_products_rejects_invalid_config() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut config = ExportConfig::default();
        config.export.take = 0;

        let err = export_products(&db, &config).await.unwrap_err();
        assert!(err.is_config_error());
    }
}
