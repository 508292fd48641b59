// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Extraction configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DocsiftError, Result};
use crate::types::SCANNED_THRESHOLD;

/// Tunables for a batch run. Every field has a default so partial JSON files
/// are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Maximum number of documents in flight at once.
    pub concurrency_limit: usize,
    /// Extension (without dot) of documents picked up from the input directory.
    pub document_extension: String,
    /// Images narrower or shorter than this many pixels are discarded.
    pub min_image_size: u32,
    /// Smallest row count that still counts as a table.
    pub min_table_rows: usize,
    /// Smallest column count that still counts as a table.
    pub min_table_cols: usize,
    /// Scores strictly above this are classified as scanned.
    pub scanned_threshold: f64,
    /// How many leading pages the classifier inspects.
    pub pages_to_inspect: usize,
    /// Score reported when the classifier cannot inspect the document.
    pub classifier_fallback_confidence: f64,
    /// Column break tolerance as a fraction of page width.
    pub column_tolerance_ratio: f32,
    /// Also write the column-delimited layout text artifact.
    pub layout_text: bool,
    /// Upper bound for a single extraction phase; `None` waits forever.
    pub phase_timeout_secs: Option<u64>,
    /// Batch summary file at the output root.
    pub summary_file_name: String,
    /// Per-document report inside each document directory.
    pub report_file_name: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: 3,
            document_extension: "pdf".to_string(),
            min_image_size: 50,
            min_table_rows: 2,
            min_table_cols: 2,
            scanned_threshold: SCANNED_THRESHOLD,
            pages_to_inspect: 2,
            classifier_fallback_confidence: 0.9,
            column_tolerance_ratio: 0.05,
            layout_text: false,
            phase_timeout_secs: Some(300),
            summary_file_name: "processing_summary.txt".to_string(),
            report_file_name: "extraction_summary.txt".to_string(),
        }
    }
}

impl ExtractionConfig {
    /// Load a JSON config file. Missing keys take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|err| {
            DocsiftError::Config(format!("cannot read {}: {}", path.display(), err))
        })?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn phase_timeout(&self) -> Option<Duration> {
        self.phase_timeout_secs.map(Duration::from_secs)
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.concurrency_limit == 0 {
            return Err(DocsiftError::Config(
                "concurrency_limit must be at least 1".into(),
            ));
        }
        if self.document_extension.trim().is_empty() {
            return Err(DocsiftError::Config(
                "document_extension must not be empty".into(),
            ));
        }
        if !(self.column_tolerance_ratio > 0.0 && self.column_tolerance_ratio <= 1.0) {
            return Err(DocsiftError::Config(format!(
                "column_tolerance_ratio must be in (0, 1], got {}",
                self.column_tolerance_ratio
            )));
        }
        for (name, value) in [
            ("scanned_threshold", self.scanned_threshold),
            (
                "classifier_fallback_confidence",
                self.classifier_fallback_confidence,
            ),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(DocsiftError::Config(format!(
                    "{name} must be in [0, 1], got {value}"
                )));
            }
        }
        if self.pages_to_inspect == 0 {
            return Err(DocsiftError::Config(
                "pages_to_inspect must be at least 1".into(),
            ));
        }
        if self.phase_timeout_secs == Some(0) {
            return Err(DocsiftError::Config(
                "phase_timeout_secs must be positive (omit it to disable the bound)".into(),
            ));
        }
        Ok(())
    }
}
