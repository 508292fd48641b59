// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-document pipeline.
//
// Opens the document once, runs the image, table and text phases in parallel
// on the blocking pool, and turns every phase failure (error, panic or
// timeout) into an empty outcome for that phase alone. The handle is closed
// exactly once by a drop guard, whichever way the pipeline exits.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, instrument, warn};

use docsift_core::config::ExtractionConfig;
use docsift_core::error::{DocsiftError, Result};
use docsift_core::traits::{Collaborators, DocumentHandle};
use docsift_core::types::{DocumentJob, DocumentResult, ExtractionPhase, PhaseOutcome};
use docsift_document::integrity::hash_file;

use crate::phases;
use crate::report::write_report;

/// Closes the wrapped handle when dropped.
struct HandleGuard {
    handle: Arc<dyn DocumentHandle>,
}

impl HandleGuard {
    fn handle(&self) -> &Arc<dyn DocumentHandle> {
        &self.handle
    }
}

impl Drop for HandleGuard {
    fn drop(&mut self) {
        self.handle.close();
    }
}

/// Runs the three extraction phases for one document at a time.
#[derive(Clone)]
pub struct DocumentPipeline {
    collaborators: Collaborators,
    config: Arc<ExtractionConfig>,
}

impl DocumentPipeline {
    pub fn new(collaborators: Collaborators, config: Arc<ExtractionConfig>) -> Self {
        Self {
            collaborators,
            config,
        }
    }

    /// Extract everything from `job`'s document and write its report.
    ///
    /// Phase failures never surface here. `Err` means the document could not
    /// be opened or its report could not be written.
    #[instrument(skip_all, fields(document = %job.name))]
    pub async fn extract_all(&self, job: &DocumentJob) -> Result<DocumentResult> {
        info!(path = %job.source_path.display(), "Starting extraction");

        let document_hash = self.fingerprint(&job.source_path).await;

        let guard = HandleGuard {
            handle: self.open(&job.source_path).await?,
        };
        let page_count = guard.handle().page_count();
        debug!(pages = page_count, "Document opened");

        let (images, tables, text) = tokio::join!(
            self.run_phase(
                ExtractionPhase::Images,
                guard.handle(),
                &job.output_dir,
                phases::extract_images,
            ),
            self.run_phase(
                ExtractionPhase::Tables,
                guard.handle(),
                &job.output_dir,
                phases::extract_tables,
            ),
            self.run_phase(
                ExtractionPhase::Text,
                guard.handle(),
                &job.output_dir,
                phases::extract_text,
            ),
        );

        let result = DocumentResult {
            document_path: job.source_path.clone(),
            output_dir: job.output_dir.clone(),
            document_hash,
            page_count,
            images,
            tables,
            text,
        };

        let writer = Arc::clone(&self.collaborators.writer);
        let report_name = self.config.report_file_name.clone();
        let report_result = result.clone();
        tokio::task::spawn_blocking(move || {
            write_report(writer.as_ref(), &report_result, &report_name)
        })
        .await
        .map_err(|err| DocsiftError::Io(std::io::Error::other(err)))??;

        info!(
            outcome = "success",
            images = result.images.data.len(),
            tables = result.tables.data.tables.len(),
            chars = result.text.data.total_chars(),
            failed_phases = result.failures().len(),
            "Extraction completed"
        );
        Ok(result)
    }

    async fn fingerprint(&self, path: &Path) -> Option<String> {
        let path = path.to_path_buf();
        match tokio::task::spawn_blocking(move || hash_file(path)).await {
            Ok(Ok(hash)) => Some(hash),
            Ok(Err(err)) => {
                warn!(error = %err, "Cannot fingerprint document");
                None
            }
            Err(err) => {
                warn!(error = %err, "Fingerprint task failed");
                None
            }
        }
    }

    async fn open(&self, path: &Path) -> Result<Arc<dyn DocumentHandle>> {
        let source = Arc::clone(&self.collaborators.source);
        let owned = path.to_path_buf();
        tokio::task::spawn_blocking(move || source.open(&owned))
            .await
            .map_err(|err| DocsiftError::DocumentOpen {
                path: path.display().to_string(),
                reason: format!("open task failed: {}", err),
            })?
    }

    /// Run one phase on the blocking pool, bounded by the configured timeout.
    async fn run_phase<T, F>(
        &self,
        phase: ExtractionPhase,
        document: &Arc<dyn DocumentHandle>,
        output_dir: &Path,
        work: F,
    ) -> PhaseOutcome<T>
    where
        T: Default + Send + 'static,
        F: FnOnce(&dyn DocumentHandle, &Path, &Collaborators, &ExtractionConfig) -> Result<T>
            + Send
            + 'static,
    {
        let document = Arc::clone(document);
        let output_dir = output_dir.to_path_buf();
        let collaborators = self.collaborators.clone();
        let config = Arc::clone(&self.config);

        let started = Instant::now();
        let task = tokio::task::spawn_blocking(move || {
            work(document.as_ref(), &output_dir, &collaborators, &config)
        });

        let joined = match self.config.phase_timeout() {
            Some(limit) => match tokio::time::timeout(limit, task).await {
                Ok(joined) => joined,
                Err(_) => {
                    // The worker keeps running detached; whatever it produces is dropped.
                    let err = DocsiftError::PhaseTimeout {
                        phase,
                        seconds: limit.as_secs(),
                    };
                    error!(%phase, error = %err, "Phase abandoned");
                    return PhaseOutcome::failed(format!("timed out after {}s", limit.as_secs()));
                }
            },
            None => task.await,
        };

        match joined {
            Ok(Ok(data)) => {
                let elapsed = started.elapsed();
                info!(
                    %phase,
                    outcome = "success",
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Phase completed"
                );
                PhaseOutcome::completed(data, elapsed)
            }
            Ok(Err(err)) => {
                let reason = err.to_string();
                let failure = DocsiftError::PhaseFailed {
                    phase,
                    reason: reason.clone(),
                };
                error!(%phase, error = %failure, "Phase failed");
                PhaseOutcome::failed(reason)
            }
            Err(join_err) => {
                let reason = format!("worker panicked: {}", join_err);
                error!(%phase, error = %reason, "Phase failed");
                PhaseOutcome::failed(reason)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use docsift_core::traits::{ArtifactWriter, DocumentSource, ImageDecoder, TableDetector};
    use docsift_core::types::{
        DetectionParams, EncodedImage, ImageBox, PageGeometry, PageImage, RawImage, RawTable,
        TextBlock,
    };

    #[derive(Clone, Copy, PartialEq)]
    enum Fault {
        None,
        TextErrors,
        TablePanics,
        TableHangs,
    }

    struct Doc {
        fault: Fault,
        closes: Arc<AtomicUsize>,
    }

    impl DocumentHandle for Doc {
        fn page_count(&self) -> usize {
            1
        }
        fn page_geometry(&self, _page: u32) -> Result<PageGeometry> {
            Ok(PageGeometry::US_LETTER)
        }
        fn text_blocks(&self, _page: u32) -> Result<Vec<TextBlock>> {
            if self.fault == Fault::TextErrors {
                return Err(DocsiftError::Pdf("garbled content stream".into()));
            }
            Ok(vec![TextBlock::new(72.0, 72.0, "Hello").with_size(30.0, 12.0)])
        }
        fn page_images(&self, _page: u32) -> Result<Vec<PageImage>> {
            Ok(Vec::new())
        }
        fn image_boxes(&self, _page: u32) -> Result<Vec<ImageBox>> {
            Ok(Vec::new())
        }
        fn raw_image(&self, _image: &PageImage) -> Result<RawImage> {
            Err(DocsiftError::Image("none".into()))
        }
        fn close(&self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Source {
        fault: Fault,
        closes: Arc<AtomicUsize>,
        fail_open: bool,
    }

    impl DocumentSource for Source {
        fn open(&self, path: &Path) -> Result<Arc<dyn DocumentHandle>> {
            if self.fail_open {
                return Err(DocsiftError::DocumentOpen {
                    path: path.display().to_string(),
                    reason: "not a PDF".into(),
                });
            }
            Ok(Arc::new(Doc {
                fault: self.fault,
                closes: Arc::clone(&self.closes),
            }))
        }
    }

    struct Detector {
        fault: Fault,
    }

    impl TableDetector for Detector {
        fn detect(
            &self,
            _document: &dyn DocumentHandle,
            _params: &DetectionParams,
        ) -> Result<Vec<RawTable>> {
            match self.fault {
                Fault::TablePanics => panic!("detector bug"),
                Fault::TableHangs => {
                    std::thread::sleep(Duration::from_millis(3_000));
                    Ok(Vec::new())
                }
                _ => Ok(vec![RawTable::new(
                    Some(1),
                    vec![vec!["k".into(), "v".into()]; 2],
                )]),
            }
        }
    }

    struct NullEncoder;

    impl ImageDecoder for NullEncoder {
        fn encode(&self, _image: &RawImage) -> Result<EncodedImage> {
            Err(DocsiftError::Image("unused".into()))
        }
    }

    #[derive(Default)]
    struct CountingWriter {
        writes: AtomicUsize,
    }

    impl ArtifactWriter for CountingWriter {
        fn write_bytes(&self, _path: &Path, _bytes: &[u8]) -> Result<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn write_text(&self, _path: &Path, _text: &str) -> Result<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn write_table(&self, _path: &Path, _rows: &[Vec<String>]) -> Result<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn pipeline(
        fault: Fault,
        fail_open: bool,
        config: ExtractionConfig,
    ) -> (DocumentPipeline, Arc<AtomicUsize>) {
        let closes = Arc::new(AtomicUsize::new(0));
        let collaborators = Collaborators {
            source: Arc::new(Source {
                fault,
                closes: Arc::clone(&closes),
                fail_open,
            }),
            tables: Arc::new(Detector { fault }),
            images: Arc::new(NullEncoder),
            writer: Arc::new(CountingWriter::default()),
        };
        (DocumentPipeline::new(collaborators, Arc::new(config)), closes)
    }

    fn job() -> DocumentJob {
        DocumentJob::new(PathBuf::from("/in/sample.pdf"), Path::new("/out"))
    }

    #[tokio::test]
    async fn healthy_document_fills_all_three_slots() {
        let (pipeline, closes) = pipeline(Fault::None, false, ExtractionConfig::default());
        let result = pipeline.extract_all(&job()).await.expect("pipeline");

        assert!(result.failures().is_empty());
        assert_eq!(result.tables.data.tables.len(), 1);
        assert_eq!(result.text.data.total_pages, 1);
        // Missing source file: no fingerprint, but extraction still runs.
        assert_eq!(result.document_hash, None);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn a_failing_phase_leaves_siblings_intact() {
        let (pipeline, closes) = pipeline(Fault::TextErrors, false, ExtractionConfig::default());
        let result = pipeline.extract_all(&job()).await.expect("pipeline");

        assert!(result.text.is_failed());
        assert_eq!(result.text.data, Default::default());
        assert_eq!(result.text.elapsed, Duration::ZERO);
        assert!(!result.images.is_failed());
        assert!(!result.tables.is_failed());
        assert_eq!(result.failures()[0].0, ExtractionPhase::Text);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn a_panicking_phase_is_contained() {
        let (pipeline, _) = pipeline(Fault::TablePanics, false, ExtractionConfig::default());
        let result = pipeline.extract_all(&job()).await.expect("pipeline");

        let reason = result.tables.failure.as_deref().expect("table failure");
        assert!(reason.starts_with("worker panicked"));
        assert!(!result.text.is_failed());
    }

    #[tokio::test]
    async fn a_hung_phase_times_out() {
        let config = ExtractionConfig {
            phase_timeout_secs: Some(1),
            ..Default::default()
        };
        let (pipeline, closes) = pipeline(Fault::TableHangs, false, config);
        let result = pipeline.extract_all(&job()).await.expect("pipeline");

        assert_eq!(result.tables.failure.as_deref(), Some("timed out after 1s"));
        assert!(result.tables.data.tables.is_empty());
        assert!(!result.images.is_failed());
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn abandoned_phase_does_not_hold_up_shutdown() {
        let config = ExtractionConfig {
            phase_timeout_secs: Some(1),
            ..Default::default()
        };
        let (pipeline, _) = pipeline(Fault::TableHangs, false, config);

        let started = Instant::now();
        let result = crate::batch::block_on_batch(async { pipeline.extract_all(&job()).await })
            .expect("runtime")
            .expect("pipeline");
        let elapsed = started.elapsed();

        assert_eq!(result.tables.failure.as_deref(), Some("timed out after 1s"));
        // The hung detector sleeps 3s per pass; shutdown must not wait for it.
        assert!(elapsed < Duration::from_millis(2_500), "took {:?}", elapsed);
    }

    #[tokio::test]
    async fn open_failure_is_a_pipeline_error() {
        let (pipeline, closes) = pipeline(Fault::None, true, ExtractionConfig::default());
        let err = pipeline.extract_all(&job()).await.unwrap_err();

        assert!(matches!(err, DocsiftError::DocumentOpen { .. }));
        assert_eq!(closes.load(Ordering::SeqCst), 0);
    }
}
