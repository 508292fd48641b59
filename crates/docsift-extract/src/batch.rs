// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bounded-concurrency batch scheduler.
//
// One tokio task per discovered document, admitted through a shared
// semaphore. The permit is held for the whole pipeline and released on every
// exit path when the task's locals drop. Entries are collected in discovery
// order; completion order is visible only in the summary file.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::runtime::Builder;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

use docsift_core::config::ExtractionConfig;
use docsift_core::error::{DocsiftError, Result};
use docsift_core::traits::Collaborators;
use docsift_core::types::{BatchReport, DocumentJob, RunId, SummaryEntry};

use crate::pipeline::DocumentPipeline;
use crate::summary::SummaryLog;

/// Runs the document pipeline over every document in a directory.
pub struct BatchScheduler {
    pipeline: DocumentPipeline,
    config: Arc<ExtractionConfig>,
}

impl BatchScheduler {
    pub fn new(collaborators: Collaborators, config: ExtractionConfig) -> Self {
        let config = Arc::new(config);
        Self {
            pipeline: DocumentPipeline::new(collaborators, Arc::clone(&config)),
            config,
        }
    }

    /// Process every matching document in `input_dir`, writing artifacts
    /// under `output_dir`.
    ///
    /// Only a missing input directory or an unusable output root is an
    /// error. Documents that fail are logged, recorded in the summary and
    /// left out of `processed_count`.
    #[instrument(skip_all, fields(input = %input_dir.display(), output = %output_dir.display()))]
    pub async fn run(&self, input_dir: &Path, output_dir: &Path) -> Result<BatchReport> {
        let run_id = RunId::new();
        let started_at = Utc::now();

        let sources = discover_documents(input_dir, &self.config.document_extension)?;
        if sources.is_empty() {
            warn!(
                extension = %self.config.document_extension,
                "No documents found, nothing to do"
            );
            return Ok(BatchReport {
                run_id,
                started_at,
                total_documents: 0,
                processed_count: 0,
                entries: Vec::new(),
                elapsed: Default::default(),
                summary_path: None,
            });
        }

        tokio::fs::create_dir_all(output_dir).await?;
        let summary = Arc::new(SummaryLog::new(
            output_dir.join(&self.config.summary_file_name),
            run_id,
            started_at,
        ));

        let total_documents = sources.len();
        info!(
            %run_id,
            documents = total_documents,
            concurrency = self.config.concurrency_limit,
            "Batch started"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.concurrency_limit));
        let clock = Instant::now();

        let mut handles: Vec<(String, JoinHandle<SummaryEntry>)> =
            Vec::with_capacity(total_documents);
        for source in sources {
            let job = DocumentJob::new(source, output_dir);
            let name = job.name.clone();
            let pipeline = self.pipeline.clone();
            let summary = Arc::clone(&summary);
            let semaphore = Arc::clone(&semaphore);

            let handle = tokio::spawn(async move {
                let started = Instant::now();
                let entry = match semaphore.acquire_owned().await {
                    Ok(_permit) => process_document(&pipeline, &job).await,
                    Err(err) => {
                        error!(document = %job.name, error = %err, "Limiter closed");
                        SummaryEntry::failed(&job.name, started.elapsed(), err.to_string())
                    }
                };
                append_entry(&summary, &entry).await;
                entry
            });
            handles.push((name, handle));
        }

        let mut entries = Vec::with_capacity(total_documents);
        for (name, handle) in handles {
            let entry = match handle.await {
                Ok(entry) => entry,
                Err(err) => {
                    // The task died before recording anything.
                    error!(document = %name, error = %err, "Document task aborted");
                    let entry = SummaryEntry::failed(
                        &name,
                        Default::default(),
                        format!("document task aborted: {}", err),
                    );
                    append_entry(&summary, &entry).await;
                    entry
                }
            };
            entries.push(entry);
        }

        let elapsed = clock.elapsed();
        let processed_count = entries.iter().filter(|e| e.failure.is_none()).count();

        if let Err(err) = summary
            .finish(processed_count, total_documents, elapsed)
            .await
        {
            error!(error = %err, path = %summary.path().display(), "Cannot write summary footer");
        }

        info!(
            %run_id,
            outcome = "success",
            processed = processed_count,
            total = total_documents,
            elapsed_ms = elapsed.as_millis() as u64,
            "Batch completed"
        );

        Ok(BatchReport {
            run_id,
            started_at,
            total_documents,
            processed_count,
            entries,
            elapsed,
            summary_path: Some(summary.path().to_path_buf()),
        })
    }
}

/// Run one document through the pipeline, turning a pipeline-level failure
/// into a failed summary entry.
async fn process_document(pipeline: &DocumentPipeline, job: &DocumentJob) -> SummaryEntry {
    let started = Instant::now();

    let outcome = match tokio::fs::create_dir_all(&job.output_dir).await {
        Ok(()) => pipeline.extract_all(job).await,
        Err(err) => Err(DocsiftError::Io(err)),
    };

    match outcome {
        Ok(result) => SummaryEntry::from_result(&job.name, &result, started.elapsed()),
        Err(err) => {
            error!(document = %job.name, error = %err, "Document failed");
            SummaryEntry::failed(&job.name, started.elapsed(), err.to_string())
        }
    }
}

async fn append_entry(summary: &SummaryLog, entry: &SummaryEntry) {
    if let Err(err) = summary.append(entry).await {
        error!(document = %entry.name, error = %err, "Cannot append summary entry");
    }
}

/// Regular files directly inside `input_dir` whose extension matches
/// `extension` case-insensitively, sorted by path.
pub fn discover_documents(input_dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    if !input_dir.is_dir() {
        error!(path = %input_dir.display(), "Input directory not found");
        return Err(DocsiftError::InputDirectoryMissing(
            input_dir.display().to_string(),
        ));
    }

    let wanted = extension.trim_start_matches('.');
    let mut documents = Vec::new();
    for entry in std::fs::read_dir(input_dir)? {
        let path = entry?.path();
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(wanted));
        if matches && path.is_file() {
            documents.push(path);
        }
    }
    documents.sort();
    Ok(documents)
}

/// Process `input_dir` with the PDF collaborators and default settings,
/// admitting at most `concurrency_limit` documents at a time.
pub async fn run(
    input_dir: &Path,
    output_dir: &Path,
    concurrency_limit: usize,
) -> Result<BatchReport> {
    let config = ExtractionConfig {
        concurrency_limit,
        ..Default::default()
    };
    config.validate()?;
    BatchScheduler::new(docsift_document::pdf_collaborators(), config)
        .run(input_dir, output_dir)
        .await
}

/// How long runtime shutdown waits for phase workers left behind by a timeout.
pub const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

/// Drive `future` on a fresh multi-threaded runtime, then shut the runtime
/// down without waiting on abandoned phase workers.
///
/// A timed-out phase keeps its blocking thread until the collaborator
/// returns. Dropping the runtime normally would wait for it; here it is
/// given [`SHUTDOWN_GRACE`] and then left to die with the process.
pub fn block_on_batch<F: Future>(future: F) -> Result<F::Output> {
    let runtime = Builder::new_multi_thread().enable_all().build()?;
    let output = runtime.block_on(future);
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    Ok(output)
}
