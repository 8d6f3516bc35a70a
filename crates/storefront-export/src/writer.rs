//! # Segment Writers
//!
//! An [`ExportWriter`] drains one segment from the consumer view of a
//! segmenter into one output file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, trace, warn};

use crate::error::ExportResult;
use crate::segmenter::SegmenterConsumer;

/// A segment file that was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentFile {
    pub path: PathBuf,
    pub records: usize,
}

#[async_trait]
pub trait ExportWriter<R: Send>: Send {
    /// Writes the segment with the 1-based `index`.
    ///
    /// Returns `None` when the segment turned out empty. No file is left
    /// behind then, nor when writing fails.
    async fn write_segment(
        &mut self,
        index: usize,
        segmenter: &mut dyn SegmenterConsumer<Record = R>,
    ) -> ExportResult<Option<SegmentFile>>;
}

/// Writes each segment as a JSON-lines file `<prefix>-<index:04>.jsonl`.
#[derive(Debug, Clone)]
pub struct JsonLinesWriter {
    output_dir: PathBuf,
    file_prefix: String,
}

impl JsonLinesWriter {
    pub fn new(output_dir: impl Into<PathBuf>, file_prefix: impl Into<String>) -> Self {
        JsonLinesWriter {
            output_dir: output_dir.into(),
            file_prefix: file_prefix.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn segment_path(&self, index: usize) -> PathBuf {
        self.output_dir
            .join(format!("{}-{:04}.jsonl", self.file_prefix, index))
    }
}

#[async_trait]
impl<R> ExportWriter<R> for JsonLinesWriter
where
    R: Serialize + Send + 'static,
{
    async fn write_segment(
        &mut self,
        index: usize,
        segmenter: &mut dyn SegmenterConsumer<Record = R>,
    ) -> ExportResult<Option<SegmentFile>> {
        fs::create_dir_all(&self.output_dir).await?;

        let path = self.segment_path(index);
        let mut out = BufWriter::new(File::create(&path).await?);

        let written: ExportResult<usize> = async {
            let mut records = 0;
            while segmenter.read_next_segment().await? {
                for record in segmenter.current_segment().await? {
                    let mut line = serde_json::to_vec(&record)?;
                    line.push(b'\n');
                    out.write_all(&line).await?;
                    records += 1;
                }
                trace!(index, records, "Segment progress");
            }
            out.flush().await?;
            Ok(records)
        }
        .await;
        drop(out);

        let records = match written {
            Ok(records) => records,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Removing incomplete segment file");
                if let Err(remove_err) = fs::remove_file(&path).await {
                    warn!(path = %path.display(), error = %remove_err, "Failed to remove segment file");
                }
                return Err(err);
            }
        };

        if records == 0 {
            debug!(path = %path.display(), "Removing empty segment file");
            fs::remove_file(&path).await?;
            return Ok(None);
        }

        Ok(Some(SegmentFile { path, records }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExportError;
    use crate::segmenter::{
        EntityLoader, ExportDataSegmenter, RecordConverter, SegmenterOptions, SegmenterProvider,
    };

    struct Numbers {
        next: u32,
        end: u32,
    }

    #[async_trait]
    impl EntityLoader<u32> for Numbers {
        async fn load(&mut self) -> ExportResult<Vec<u32>> {
            let batch: Vec<u32> = (self.next..self.end.min(self.next + 4)).collect();
            self.next += batch.len() as u32;
            Ok(batch)
        }
    }

    struct ToJson;

    #[async_trait]
    impl RecordConverter<u32, serde_json::Value> for ToJson {
        async fn convert(&mut self, n: &u32) -> ExportResult<Vec<serde_json::Value>> {
            Ok(vec![serde_json::json!({ "n": n })])
        }
    }

    fn segmenter(end: u32, per_segment: usize) -> ExportDataSegmenter<u32, serde_json::Value> {
        ExportDataSegmenter::new(
            Numbers { next: 0, end },
            ToJson,
            SegmenterOptions {
                take: 4,
                records_per_segment: per_segment,
                total_records: end as usize,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_segment_path() {
        let writer = JsonLinesWriter::new("/tmp/feeds", "products");
        assert_eq!(
            writer.segment_path(3),
            PathBuf::from("/tmp/feeds/products-0003.jsonl")
        );
        assert_eq!(writer.output_dir(), Path::new("/tmp/feeds"));
    }

    #[tokio::test]
    async fn test_writes_one_segment() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = JsonLinesWriter::new(dir.path().join("out"), "numbers");
        let mut seg = segmenter(10, 6);

        let file = writer.write_segment(1, &mut seg).await.unwrap().unwrap();
        assert_eq!(file.records, 6);
        assert_eq!(file.path, dir.path().join("out/numbers-0001.jsonl"));

        let contents = std::fs::read_to_string(&file.path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], r#"{"n":0}"#);
        assert_eq!(lines[5], r#"{"n":5}"#);
        assert!(seg.has_data());
    }

    #[tokio::test]
    async fn test_empty_segment_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = JsonLinesWriter::new(dir.path(), "empty");
        let mut seg = segmenter(0, 5);

        assert!(writer.write_segment(1, &mut seg).await.unwrap().is_none());
        assert!(!writer.segment_path(1).exists());
    }

    /// Fails every load after the first batch.
    struct DropsConnection {
        loaded: bool,
    }

    #[async_trait]
    impl EntityLoader<u32> for DropsConnection {
        async fn load(&mut self) -> ExportResult<Vec<u32>> {
            if self.loaded {
                return Err(ExportError::LoadFailed("connection reset".to_string()));
            }
            self.loaded = true;
            Ok(vec![0, 1, 2, 3])
        }
    }

    #[tokio::test]
    async fn test_failed_segment_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = JsonLinesWriter::new(dir.path(), "partial");
        let mut seg = ExportDataSegmenter::new(
            DropsConnection { loaded: false },
            ToJson,
            SegmenterOptions {
                take: 4,
                total_records: 10,
                ..Default::default()
            },
        );

        let err = writer.write_segment(1, &mut seg).await.unwrap_err();
        assert!(matches!(err, ExportError::LoadFailed(_)));
        assert_eq!(seg.record_count(), 4);
        assert!(!writer.segment_path(1).exists());
    }
}
