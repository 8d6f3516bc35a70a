//! # Export Data Segmenter
//!
//! Turns a lazily loaded entity stream into bounded segments of output
//! records.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  EntityLoader::load()  ──►  buffer (VecDeque<T>)  ──►  LoadedCallback   │
//! │   (page of `take`)              │                      (preload data)   │
//! │                                 ▼                                       │
//! │                      current_segment()                                  │
//! │                      dequeue ─► RecordConverter ─► Vec<R>               │
//! │                                 │                                       │
//! │            stop at `limit` (whole export) or                            │
//! │            `records_per_segment` (this segment)                         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Counters count source entities. A converter may emit several records for
//! one entity (a product and its variants), which still counts once against
//! `limit` and `records_per_segment`.
//!
//! ## Driving a segmenter
//! ```rust,ignore
//! while segmenter.has_data() {
//!     segmenter.set_record_per_segment_count(0);
//!     // open segment file
//!     while segmenter.read_next_segment().await? {
//!         for record in segmenter.current_segment().await? {
//!             // write record
//!         }
//!     }
//!     // close segment file
//! }
//! segmenter.reset();
//! ```

use std::collections::VecDeque;

use async_trait::async_trait;
use tracing::{debug, trace, warn};

use crate::error::ExportResult;

// =============================================================================
// Pipeline Seams
// =============================================================================

/// Produces the next batch of entities. An empty batch means the source is
/// exhausted.
#[async_trait]
pub trait EntityLoader<T>: Send {
    async fn load(&mut self) -> ExportResult<Vec<T>>;
}

/// Invoked after every load that left entities in the buffer, with all
/// buffered entities.
#[async_trait]
pub trait LoadedCallback<T>: Send {
    async fn on_loaded(&mut self, buffered: &[T]) -> ExportResult<()>;
}

/// Converts one entity into zero or more output records.
#[async_trait]
pub trait RecordConverter<T, R>: Send {
    async fn convert(&mut self, entity: &T) -> ExportResult<Vec<R>>;
}

// =============================================================================
// Segmenter Views
// =============================================================================

/// The view handed to export writers.
#[async_trait]
pub trait SegmenterConsumer: Send {
    type Record: Send;

    /// Number of entities the export is expected to visit.
    fn total_records(&self) -> usize;

    /// Converts buffered entities until the limit or the segment size is
    /// reached, or the buffer runs empty.
    ///
    /// A failed conversion leaves its entity buffered and uncounted. Records
    /// converted before it are returned; the error surfaces on the next call.
    async fn current_segment(&mut self) -> ExportResult<Vec<Self::Record>>;

    /// Makes sure data for the current segment is buffered.
    ///
    /// Returns `false` once the limit or the segment size is reached, or
    /// when no more data exists.
    async fn read_next_segment(&mut self) -> ExportResult<bool>;
}

/// The view used by the export driver.
pub trait SegmenterProvider: SegmenterConsumer {
    fn has_data(&self) -> bool;

    fn record_per_segment_count(&self) -> usize;

    fn set_record_per_segment_count(&mut self, count: usize);

    /// Zeroes the counters and drops buffered data so the segmenter can be
    /// run again.
    fn reset(&mut self);
}

// =============================================================================
// Options
// =============================================================================

/// Paging and bounding parameters of a segmenter.
///
/// `limit` and `records_per_segment` are disabled when 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SegmenterOptions {
    /// Entities skipped at the start of the source.
    pub offset: usize,
    /// Entities fetched per load.
    pub take: usize,
    /// Maximum number of entities exported overall.
    pub limit: usize,
    /// Maximum number of entities per segment.
    pub records_per_segment: usize,
    /// Number of entities in the source, before `offset`.
    pub total_records: usize,
}

// =============================================================================
// Segmenter
// =============================================================================

pub struct ExportDataSegmenter<T, R> {
    loader: Box<dyn EntityLoader<T>>,
    loaded_callback: Option<Box<dyn LoadedCallback<T>>>,
    converter: Box<dyn RecordConverter<T, R>>,
    options: SegmenterOptions,

    buffer: VecDeque<T>,
    end_of_data: bool,
    record_count: usize,
    record_per_segment_count: usize,
}

impl<T, R> ExportDataSegmenter<T, R>
where
    T: Send + Sync + 'static,
    R: Send + 'static,
{
    pub fn new(
        loader: impl EntityLoader<T> + 'static,
        converter: impl RecordConverter<T, R> + 'static,
        options: SegmenterOptions,
    ) -> Self {
        ExportDataSegmenter {
            loader: Box::new(loader),
            loaded_callback: None,
            converter: Box::new(converter),
            options,
            buffer: VecDeque::new(),
            end_of_data: false,
            record_count: 0,
            record_per_segment_count: 0,
        }
    }

    pub fn with_loaded_callback(mut self, callback: impl LoadedCallback<T> + 'static) -> Self {
        self.loaded_callback = Some(Box::new(callback));
        self
    }

    pub fn options(&self) -> &SegmenterOptions {
        &self.options
    }

    /// Entities processed since construction or the last reset.
    pub fn record_count(&self) -> usize {
        self.record_count
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    fn limit_reached(&self) -> bool {
        self.options.limit > 0 && self.record_count >= self.options.limit
    }

    fn segment_full(&self) -> bool {
        self.options.records_per_segment > 0
            && self.record_per_segment_count >= self.options.records_per_segment
    }
}

#[async_trait]
impl<T, R> SegmenterConsumer for ExportDataSegmenter<T, R>
where
    T: Send + Sync + 'static,
    R: Send + 'static,
{
    type Record = R;

    fn total_records(&self) -> usize {
        let total = self.options.total_records.saturating_sub(self.options.offset);

        if self.options.limit > 0 && self.options.limit < total {
            return self.options.limit;
        }

        total
    }

    async fn current_segment(&mut self) -> ExportResult<Vec<R>> {
        let mut records = Vec::new();

        while let Some(entity) = self.buffer.front() {
            let converted = match self.converter.convert(entity).await {
                Ok(converted) => converted,
                Err(err) if records.is_empty() => return Err(err),
                Err(err) => {
                    // The failing entity stays buffered and fails the next call
                    warn!(error = %err, records = records.len(), "Conversion failed mid-segment");
                    break;
                }
            };
            self.buffer.pop_front();
            records.extend(converted);

            self.record_count += 1;
            if self.limit_reached() {
                break;
            }

            self.record_per_segment_count += 1;
            if self.segment_full() {
                break;
            }
        }

        trace!(
            records = records.len(),
            record_count = self.record_count,
            "Converted segment data"
        );
        Ok(records)
    }

    async fn read_next_segment(&mut self) -> ExportResult<bool> {
        if self.limit_reached() || self.segment_full() {
            return Ok(false);
        }

        // Do not grow the buffer beyond one segment
        let per_segment = self.options.records_per_segment;
        if per_segment > 0 && self.buffer.len() >= per_segment {
            return Ok(true);
        }

        if self.end_of_data {
            return Ok(!self.buffer.is_empty());
        }

        let loaded = self.loader.load().await?;
        if loaded.is_empty() {
            debug!(record_count = self.record_count, "End of export data reached");
            self.end_of_data = true;

            if self.buffer.is_empty() {
                return Ok(false);
            }
        } else {
            debug!(loaded = loaded.len(), buffered = self.buffer.len(), "Loaded export data");
            self.buffer.extend(loaded);
        }

        if let Some(callback) = self.loaded_callback.as_mut() {
            callback.on_loaded(self.buffer.make_contiguous()).await?;
        }

        Ok(!self.buffer.is_empty())
    }
}

impl<T, R> SegmenterProvider for ExportDataSegmenter<T, R>
where
    T: Send + Sync + 'static,
    R: Send + 'static,
{
    fn has_data(&self) -> bool {
        if self.limit_reached() {
            return false;
        }

        if !self.buffer.is_empty() {
            return true;
        }

        if self.end_of_data {
            return false;
        }

        self.record_count < self.total_records()
    }

    fn record_per_segment_count(&self) -> usize {
        self.record_per_segment_count
    }

    fn set_record_per_segment_count(&mut self, count: usize) {
        self.record_per_segment_count = count;
    }

    fn reset(&mut self) {
        self.record_count = 0;
        self.record_per_segment_count = 0;
        self.end_of_data = false;
        self.buffer.clear();
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExportError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Serves `0..total` in pages of `take`, counting calls.
    struct RangeLoader {
        next: u32,
        total: u32,
        take: u32,
        calls: Arc<AtomicUsize>,
    }

    impl RangeLoader {
        fn new(total: u32, take: u32) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let loader = RangeLoader {
                next: 0,
                total,
                take,
                calls: Arc::clone(&calls),
            };
            (loader, calls)
        }
    }

    #[async_trait]
    impl EntityLoader<u32> for RangeLoader {
        async fn load(&mut self) -> ExportResult<Vec<u32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let end = (self.next + self.take).min(self.total);
            let page: Vec<u32> = (self.next..end).collect();
            self.next = end;
            Ok(page)
        }
    }

    struct FailingLoader;

    #[async_trait]
    impl EntityLoader<u32> for FailingLoader {
        async fn load(&mut self) -> ExportResult<Vec<u32>> {
            Err(ExportError::LoadFailed("connection reset".to_string()))
        }
    }

    struct Identity;

    #[async_trait]
    impl RecordConverter<u32, u32> for Identity {
        async fn convert(&mut self, entity: &u32) -> ExportResult<Vec<u32>> {
            Ok(vec![*entity])
        }
    }

    /// Emits the entity and a derived record, like a product and its variant.
    struct WithVariant;

    #[async_trait]
    impl RecordConverter<u32, u32> for WithVariant {
        async fn convert(&mut self, entity: &u32) -> ExportResult<Vec<u32>> {
            Ok(vec![*entity, *entity + 1000])
        }
    }

    struct RecordingCallback {
        seen: Arc<Mutex<Vec<Vec<u32>>>>,
    }

    #[async_trait]
    impl LoadedCallback<u32> for RecordingCallback {
        async fn on_loaded(&mut self, buffered: &[u32]) -> ExportResult<()> {
            self.seen.lock().unwrap().push(buffered.to_vec());
            Ok(())
        }
    }

    fn options(total: usize, take: usize, limit: usize, per_segment: usize) -> SegmenterOptions {
        SegmenterOptions {
            offset: 0,
            take,
            limit,
            records_per_segment: per_segment,
            total_records: total,
        }
    }

    fn segmenter(
        total: u32,
        take: u32,
        limit: usize,
        per_segment: usize,
    ) -> (ExportDataSegmenter<u32, u32>, Arc<AtomicUsize>) {
        let (loader, calls) = RangeLoader::new(total, take);
        let seg = ExportDataSegmenter::new(
            loader,
            Identity,
            options(total as usize, take as usize, limit, per_segment),
        );
        (seg, calls)
    }

    /// Drives the segmenter the way the export driver does.
    async fn drain<P: SegmenterProvider>(seg: &mut P) -> Vec<Vec<P::Record>> {
        let mut segments = Vec::new();
        let mut guard = 0;

        while seg.has_data() {
            guard += 1;
            assert!(guard < 1_000, "segmenter made no progress");

            seg.set_record_per_segment_count(0);
            let mut current = Vec::new();
            while seg.read_next_segment().await.unwrap() {
                current.extend(seg.current_segment().await.unwrap());
            }
            if !current.is_empty() {
                segments.push(current);
            }
        }

        segments
    }

    #[tokio::test]
    async fn test_limit_and_segment_size() {
        let (mut seg, _) = segmenter(50, 8, 20, 5);

        let segments = drain(&mut seg).await;

        assert_eq!(segments.len(), 4);
        assert!(segments.iter().all(|s| s.len() == 5));
        assert_eq!(segments.concat(), (0..20).collect::<Vec<_>>());
        assert!(!seg.has_data());
        assert_eq!(seg.record_count(), 20);
    }

    #[tokio::test]
    async fn test_bounds_hold_for_all_limits_and_segment_sizes() {
        for limit in 0..=12 {
            for per_segment in 0..=6 {
                let (mut seg, _) = segmenter(25, 4, limit, per_segment);
                let segments = drain(&mut seg).await;

                let delivered: usize = segments.iter().map(Vec::len).sum();
                let expected = if limit > 0 { limit.min(25) } else { 25 };
                assert_eq!(delivered, expected, "limit={limit} per_segment={per_segment}");

                if per_segment > 0 {
                    assert!(
                        segments.iter().all(|s| s.len() <= per_segment),
                        "limit={limit} per_segment={per_segment}"
                    );
                }

                // Nothing lost or duplicated
                let flat = segments.concat();
                assert_eq!(flat, (0..expected as u32).collect::<Vec<_>>());
            }
        }
    }

    #[tokio::test]
    async fn test_single_call_never_exceeds_segment_size() {
        let (mut seg, _) = segmenter(30, 30, 0, 4);

        assert!(seg.read_next_segment().await.unwrap());
        assert_eq!(seg.buffered(), 30);

        let first = seg.current_segment().await.unwrap();
        assert_eq!(first, vec![0, 1, 2, 3]);
        assert_eq!(seg.buffered(), 26);

        // Segment is full until the driver resets the counter
        assert!(!seg.read_next_segment().await.unwrap());
        seg.set_record_per_segment_count(0);
        assert!(seg.read_next_segment().await.unwrap());
        assert_eq!(seg.current_segment().await.unwrap(), vec![4, 5, 6, 7]);
    }

    #[tokio::test]
    async fn test_full_buffer_skips_loading() {
        let (mut seg, calls) = segmenter(30, 10, 0, 5);

        assert!(seg.read_next_segment().await.unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // 10 buffered >= 5 per segment
        assert!(seg.read_next_segment().await.unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_new_data_appended_after_buffered() {
        let (mut seg, _) = segmenter(12, 3, 0, 5);

        assert!(seg.read_next_segment().await.unwrap());
        assert!(seg.read_next_segment().await.unwrap());
        assert_eq!(seg.buffered(), 6);

        let records = seg.current_segment().await.unwrap();
        assert_eq!(records, vec![0, 1, 2, 3, 4]);
        assert_eq!(seg.buffered(), 1);
    }

    #[tokio::test]
    async fn test_exhaustion_ends_data_below_total() {
        // Source claims 100 entities but only has 7
        let (loader, calls) = RangeLoader::new(7, 5);
        let mut seg = ExportDataSegmenter::new(loader, Identity, options(100, 5, 0, 0));
        assert_eq!(seg.total_records(), 100);

        let segments = drain(&mut seg).await;
        assert_eq!(segments.concat().len(), 7);
        assert!(!seg.has_data());
        assert!(seg.record_count() < seg.total_records());

        // No loads after end of data
        let calls_at_end = calls.load(Ordering::SeqCst);
        assert!(!seg.read_next_segment().await.unwrap());
        assert!(!seg.read_next_segment().await.unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), calls_at_end);
    }

    #[tokio::test]
    async fn test_end_of_data_with_buffered_entities() {
        let (mut seg, calls) = segmenter(6, 6, 0, 4);

        assert!(seg.read_next_segment().await.unwrap());
        assert_eq!(seg.current_segment().await.unwrap().len(), 4);

        seg.set_record_per_segment_count(0);
        // 2 buffered < 4: loads, gets nothing, still has the 2
        assert!(seg.read_next_segment().await.unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(seg.has_data());
        assert_eq!(seg.current_segment().await.unwrap(), vec![4, 5]);

        assert!(!seg.read_next_segment().await.unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(!seg.has_data());
    }

    #[test]
    fn test_total_records() {
        let mut opts = options(1000, 100, 300, 0);
        opts.offset = 200;
        let (loader, _) = RangeLoader::new(0, 1);
        let seg = ExportDataSegmenter::new(loader, Identity, opts);
        assert_eq!(seg.total_records(), 300);

        opts.limit = 0;
        let (loader, _) = RangeLoader::new(0, 1);
        let seg = ExportDataSegmenter::new(loader, Identity, opts);
        assert_eq!(seg.total_records(), 800);

        opts.offset = 2000;
        let (loader, _) = RangeLoader::new(0, 1);
        let seg = ExportDataSegmenter::new(loader, Identity, opts);
        assert_eq!(seg.total_records(), 0);
    }

    #[tokio::test]
    async fn test_reset_clears_state() {
        let (mut seg, _) = segmenter(20, 10, 0, 3);

        assert!(seg.read_next_segment().await.unwrap());
        seg.current_segment().await.unwrap();
        assert!(seg.record_count() > 0);
        assert!(seg.record_per_segment_count() > 0);
        assert!(seg.buffered() > 0);

        seg.reset();

        assert_eq!(seg.record_count(), 0);
        assert_eq!(seg.record_per_segment_count(), 0);
        assert_eq!(seg.buffered(), 0);
    }

    #[tokio::test]
    async fn test_reset_after_end_of_data_allows_loading_again() {
        let (loader, calls) = RangeLoader::new(0, 5);
        let mut seg = ExportDataSegmenter::new(loader, Identity, options(0, 5, 0, 0));

        assert!(!seg.read_next_segment().await.unwrap());
        assert!(!seg.read_next_segment().await.unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        seg.reset();
        assert!(!seg.read_next_segment().await.unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_loaded_callback_sees_all_buffered() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (loader, _) = RangeLoader::new(6, 4);
        let mut seg = ExportDataSegmenter::new(loader, Identity, options(6, 4, 0, 3))
            .with_loaded_callback(RecordingCallback {
                seen: Arc::clone(&seen),
            });

        drain(&mut seg).await;

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0], vec![0, 1, 2, 3]);
        // One entity left over from the first load, then the next page
        assert_eq!(seen[1], vec![3, 4, 5]);
        assert!(seen.iter().all(|batch| !batch.is_empty()));
    }

    #[tokio::test]
    async fn test_multiple_records_per_entity_count_once() {
        let (loader, _) = RangeLoader::new(10, 10);
        let mut seg = ExportDataSegmenter::new(loader, WithVariant, options(10, 10, 4, 2));

        let segments = drain(&mut seg).await;

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0], vec![0, 1000, 1, 1001]);
        assert_eq!(seg.record_count(), 4);
    }

    #[tokio::test]
    async fn test_loader_error_propagates() {
        let mut seg = ExportDataSegmenter::new(FailingLoader, Identity, options(10, 5, 0, 0));

        let err = seg.read_next_segment().await.unwrap_err();
        assert!(matches!(err, ExportError::LoadFailed(_)));
        assert!(seg.has_data());
    }

    /// Fails on one entity, like a product whose price cannot be calculated.
    struct FailsOn(u32);

    #[async_trait]
    impl RecordConverter<u32, u32> for FailsOn {
        async fn convert(&mut self, entity: &u32) -> ExportResult<Vec<u32>> {
            if *entity == self.0 {
                return Err(ExportError::LoadFailed(format!("cannot convert {entity}")));
            }
            Ok(vec![*entity])
        }
    }

    #[tokio::test]
    async fn test_converter_error_keeps_counted_records() {
        let (loader, _) = RangeLoader::new(4, 4);
        let mut seg = ExportDataSegmenter::new(loader, FailsOn(2), options(4, 4, 0, 0));

        assert!(seg.read_next_segment().await.unwrap());

        // Records converted before the failure are delivered and counted
        let first = seg.current_segment().await.unwrap();
        assert_eq!(first, vec![0, 1]);
        assert_eq!(seg.record_count(), 2);
        assert_eq!(seg.record_per_segment_count(), 2);
        assert_eq!(seg.buffered(), 2);

        // The failing entity stays buffered and uncounted
        let err = seg.current_segment().await.unwrap_err();
        assert!(matches!(err, ExportError::LoadFailed(_)));
        assert_eq!(seg.record_count(), 2);
        assert_eq!(seg.buffered(), 2);
        assert!(seg.has_data());
    }
}
