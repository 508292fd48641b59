// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Append-only batch summary shared by all pipelines of a run.
//
// Every line group is rendered up front and written with a single
// `write_all` while holding the log's async mutex, so concurrent appends
// never interleave. The file is opened per append; a crash mid-batch leaves
// every completed group on disk.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use docsift_core::error::Result;
use docsift_core::types::{RunId, SummaryEntry};

const TITLE: &str = "PDF PROCESSING SUMMARY";
const RULE: &str = "==================================================";
const SEPARATOR: &str = "------------------------------";

/// The run-level summary artifact.
#[derive(Debug)]
pub struct SummaryLog {
    path: PathBuf,
    run_id: RunId,
    started_at: DateTime<Utc>,
    lock: Mutex<()>,
}

impl SummaryLog {
    pub fn new(path: impl Into<PathBuf>, run_id: RunId, started_at: DateTime<Utc>) -> Self {
        Self {
            path: path.into(),
            run_id,
            started_at,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one document's line group. The header is written first when
    /// the file does not exist yet.
    pub async fn append(&self, entry: &SummaryEntry) -> Result<()> {
        self.write_block(render_entry(entry)).await?;
        debug!(document = %entry.name, "Summary entry appended");
        Ok(())
    }

    /// Append the run footer.
    pub async fn finish(&self, processed: usize, total: usize, elapsed: Duration) -> Result<()> {
        self.write_block(render_footer(self.run_id, processed, total, elapsed))
            .await
    }

    async fn write_block(&self, block: String) -> Result<()> {
        let _guard = self.lock.lock().await;

        let exists = tokio::fs::try_exists(&self.path).await?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        let payload = if exists {
            block
        } else {
            render_header(self.run_id, self.started_at) + &block
        };
        file.write_all(payload.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

pub fn render_header(run_id: RunId, started_at: DateTime<Utc>) -> String {
    format!(
        "{TITLE}\n{RULE}\nRun: {run_id}\nStarted: {}\n{RULE}\n",
        started_at.to_rfc3339()
    )
}

/// One document's line group.
pub fn render_entry(entry: &SummaryEntry) -> String {
    let secs = entry.total.as_secs_f64();
    match &entry.failure {
        Some(reason) => format!(
            "{} - FAILED after {:.2} seconds\n  Error: {}\n{SEPARATOR}\n",
            entry.name, secs, reason
        ),
        None => format!(
            "{} - {} pages - {:.2} seconds\n\
             \x20 Image Extraction: {:.2}s\n\
             \x20 Table Extraction: {:.2}s\n\
             \x20 Text Extraction: {:.2}s\n\
             \x20 Images Found: {}\n\
             \x20 Tables Found: {}\n\
             {SEPARATOR}\n",
            entry.name,
            entry.pages,
            secs,
            entry.timings.images.as_secs_f64(),
            entry.timings.tables.as_secs_f64(),
            entry.timings.text.as_secs_f64(),
            entry.images,
            entry.tables,
        ),
    }
}

pub fn render_footer(run_id: RunId, processed: usize, total: usize, elapsed: Duration) -> String {
    format!(
        "Processed {processed} of {total} documents in {:.2} seconds (run {run_id})\n{RULE}\n",
        elapsed.as_secs_f64()
    )
}
