// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for docsift.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Confidence above which a document is treated as scanned.
pub const SCANNED_THRESHOLD: f64 = 0.7;

/// Unique identifier for a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Jobs and phases
// ---------------------------------------------------------------------------

/// One discovered document and where its artifacts go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentJob {
    /// Path of the source document.
    pub source_path: PathBuf,
    /// File stem of the source, used for the output directory and logs.
    pub name: String,
    /// Per-document output directory (`<output_root>/<name>`).
    pub output_dir: PathBuf,
}

impl DocumentJob {
    pub fn new(source_path: impl Into<PathBuf>, output_root: &Path) -> Self {
        let source_path = source_path.into();
        let name = source_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .filter(|stem| !stem.is_empty())
            .unwrap_or_else(|| "document".to_string());
        let output_dir = output_root.join(&name);
        Self {
            source_path,
            name,
            output_dir,
        }
    }
}

/// The three independent extraction tasks run per document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionPhase {
    Images,
    Tables,
    Text,
}

impl ExtractionPhase {
    /// Heading used in reports and the batch summary.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Images => "Image Extraction",
            Self::Tables => "Table Extraction",
            Self::Text => "Text Extraction",
        }
    }
}

impl fmt::Display for ExtractionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Images => "image",
            Self::Tables => "table",
            Self::Text => "text",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Page content as reported by the document handle
// ---------------------------------------------------------------------------

/// Page size in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
}

impl PageGeometry {
    /// US Letter, used when a page declares no usable media box.
    pub const US_LETTER: PageGeometry = PageGeometry {
        width: 612.0,
        height: 792.0,
    };

    pub fn area(&self) -> f32 {
        self.width * self.height
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::US_LETTER
    }
}

/// A positioned text fragment in top-left page coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub left: f32,
    pub top: f32,
    /// Zero when the collaborator cannot measure the fragment.
    pub width: f32,
    pub height: f32,
    pub text: String,
}

impl TextBlock {
    pub fn new(left: f32, top: f32, text: impl Into<String>) -> Self {
        Self {
            left,
            top,
            width: 0.0,
            height: 0.0,
            text: text.into(),
        }
    }

    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.width = width.max(0.0);
        self.height = height.max(0.0);
        self
    }

    /// Bounding-box area in square points.
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    pub fn center(&self) -> (f32, f32) {
        (self.left + self.width / 2.0, self.top + self.height / 2.0)
    }
}

/// Where an image is drawn on a page, in top-left page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageBox {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl ImageBox {
    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineOrientation {
    Horizontal,
    Vertical,
}

/// A straight ruling line drawn on a page (table borders, separators).
///
/// `position` is the y coordinate of a horizontal line or the x coordinate of
/// a vertical one; `start..=end` is its extent along the other axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RulingLine {
    pub orientation: LineOrientation,
    pub position: f32,
    pub start: f32,
    pub end: f32,
}

impl RulingLine {
    pub fn horizontal(y: f32, x0: f32, x1: f32) -> Self {
        Self {
            orientation: LineOrientation::Horizontal,
            position: y,
            start: x0.min(x1),
            end: x0.max(x1),
        }
    }

    pub fn vertical(x: f32, y0: f32, y1: f32) -> Self {
        Self {
            orientation: LineOrientation::Vertical,
            position: x,
            start: y0.min(y1),
            end: y0.max(y1),
        }
    }

    pub fn length(&self) -> f32 {
        self.end - self.start
    }
}

/// Opaque reference to an embedded image, meaningful only to the handle that
/// produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageRef(pub u64);

/// An embedded raster image listed on a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageImage {
    /// 1-based page number.
    pub page: u32,
    /// 1-based position among the page's images.
    pub index: u32,
    /// Pixel width.
    pub width: u32,
    /// Pixel height.
    pub height: u32,
    pub reference: ImageRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelLayout {
    Gray,
    Rgb,
    Cmyk,
    Other(String),
}

/// How the bytes of a [`RawImage`] are encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageEncoding {
    /// A complete JPEG file.
    Jpeg,
    /// A complete JPEG 2000 codestream.
    Jpeg2000,
    /// Uncompressed samples, row-major, no padding.
    Raw {
        layout: PixelLayout,
        bits_per_component: u8,
    },
}

/// Image bytes as stored in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
    pub width: u32,
    pub height: u32,
    pub encoding: ImageEncoding,
    pub data: Vec<u8>,
}

/// Image bytes ready to be written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    /// File extension without the dot.
    pub extension: &'static str,
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

/// Which detection strategy produced a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableMethod {
    /// Ruled-line detection on vector content.
    Lattice,
    /// Whitespace/alignment detection on vector content.
    Stream,
    /// Alignment detection tuned for image-dominant pages.
    Scanned,
}

impl TableMethod {
    /// Short tag used in artifact names and reports.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Lattice => "lattice",
            Self::Stream => "stream",
            Self::Scanned => "scanned",
        }
    }
}

impl fmt::Display for TableMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Parameters handed to a table detector for one pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionParams {
    pub method: TableMethod,
    /// Max vertical distance (pt) between fragments sharing a row.
    pub row_tolerance: f32,
    /// Max horizontal distance (pt) between cell edges sharing a column.
    pub column_tolerance: f32,
    /// Max distance (pt) at which two ruling lines are considered to touch.
    pub line_tolerance: f32,
}

impl DetectionParams {
    pub fn for_method(method: TableMethod) -> Self {
        match method {
            TableMethod::Lattice => Self {
                method,
                row_tolerance: 3.0,
                column_tolerance: 5.0,
                line_tolerance: 2.0,
            },
            TableMethod::Stream => Self {
                method,
                row_tolerance: 3.0,
                column_tolerance: 10.0,
                line_tolerance: 2.0,
            },
            TableMethod::Scanned => Self {
                method,
                row_tolerance: 6.0,
                column_tolerance: 18.0,
                line_tolerance: 4.0,
            },
        }
    }
}

/// A table grid as returned by a detector, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTable {
    /// 1-based source page, when the detector knows it.
    pub page: Option<u32>,
    /// Row-major cell text. Rows may be ragged.
    pub cells: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(page: Option<u32>, cells: Vec<Vec<String>>) -> Self {
        Self { page, cells }
    }

    pub fn rows(&self) -> usize {
        self.cells.len()
    }

    /// Width of the widest row.
    pub fn columns(&self) -> usize {
        self.cells.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// True when every cell is empty or whitespace.
    pub fn is_blank(&self) -> bool {
        self.cells
            .iter()
            .flatten()
            .all(|cell| cell.trim().is_empty())
    }
}

// ---------------------------------------------------------------------------
// Extraction records
// ---------------------------------------------------------------------------

/// An image written to the document's `images/` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub page: u32,
    pub image_index: u32,
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// A table written to the document's `tables/` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRecord {
    /// 1-based, reset per document.
    pub table_index: u32,
    pub page: u32,
    pub path: PathBuf,
    pub rows: usize,
    pub columns: usize,
    pub method: TableMethod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageTextStats {
    pub page_number: u32,
    pub char_count: usize,
}

/// Output of the text phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextResult {
    pub pages: Vec<PageTextStats>,
    pub total_pages: usize,
    pub continuous_text_path: Option<PathBuf>,
    /// Present only in layout-aware mode.
    pub layout_text_path: Option<PathBuf>,
}

impl TextResult {
    pub fn total_chars(&self) -> usize {
        self.pages.iter().map(|page| page.char_count).sum()
    }
}

/// Probability that a document is scanned, with the decision at a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationScore {
    /// In `[0, 1]`.
    pub confidence: f64,
    pub is_scanned: bool,
    /// True when the score is the inspection-failure default.
    pub fallback: bool,
}

impl ClassificationScore {
    pub fn new(confidence: f64) -> Self {
        Self::with_threshold(confidence, SCANNED_THRESHOLD)
    }

    /// The decision is exclusive: a score equal to `threshold` is digital.
    pub fn with_threshold(confidence: f64, threshold: f64) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            confidence,
            is_scanned: confidence > threshold,
            fallback: false,
        }
    }

    pub fn fallback(confidence: f64, threshold: f64) -> Self {
        Self {
            fallback: true,
            ..Self::with_threshold(confidence, threshold)
        }
    }
}

/// Output of the table phase: the records plus the decision that chose the
/// strategy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableExtraction {
    pub classification: Option<ClassificationScore>,
    /// Strategy whose pass produced the records, if any did.
    pub method: Option<TableMethod>,
    pub tables: Vec<TableRecord>,
}

/// Result of one phase. A failed phase carries default data, zero elapsed time
/// and the failure reason.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseOutcome<T> {
    pub data: T,
    pub elapsed: Duration,
    pub failure: Option<String>,
}

impl<T: Default> PhaseOutcome<T> {
    pub fn completed(data: T, elapsed: Duration) -> Self {
        Self {
            data,
            elapsed,
            failure: None,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            data: T::default(),
            elapsed: Duration::ZERO,
            failure: Some(reason.into()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }
}

/// Per-phase wall-clock times.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTimings {
    pub images: Duration,
    pub tables: Duration,
    pub text: Duration,
}

impl PhaseTimings {
    pub fn get(&self, phase: ExtractionPhase) -> Duration {
        match phase {
            ExtractionPhase::Images => self.images,
            ExtractionPhase::Tables => self.tables,
            ExtractionPhase::Text => self.text,
        }
    }

    /// Sum of the three phases.
    pub fn total(&self) -> Duration {
        self.images + self.tables + self.text
    }
}

/// Everything extracted from one document. Written once to the per-document
/// report and folded into the batch summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentResult {
    pub document_path: PathBuf,
    pub output_dir: PathBuf,
    /// Hex SHA-256 of the source bytes, when it could be read.
    pub document_hash: Option<String>,
    pub page_count: usize,
    pub images: PhaseOutcome<Vec<ImageRecord>>,
    pub tables: PhaseOutcome<TableExtraction>,
    pub text: PhaseOutcome<TextResult>,
}

impl DocumentResult {
    pub fn timings(&self) -> PhaseTimings {
        PhaseTimings {
            images: self.images.elapsed,
            tables: self.tables.elapsed,
            text: self.text.elapsed,
        }
    }

    /// `(phase, reason)` for every phase that failed.
    pub fn failures(&self) -> Vec<(ExtractionPhase, &str)> {
        [
            (ExtractionPhase::Images, self.images.failure.as_deref()),
            (ExtractionPhase::Tables, self.tables.failure.as_deref()),
            (ExtractionPhase::Text, self.text.failure.as_deref()),
        ]
        .into_iter()
        .filter_map(|(phase, failure)| failure.map(|reason| (phase, reason)))
        .collect()
    }
}

// ---------------------------------------------------------------------------
// Batch summary
// ---------------------------------------------------------------------------

/// One line group of the batch summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryEntry {
    pub name: String,
    pub pages: usize,
    pub total: Duration,
    pub timings: PhaseTimings,
    pub images: usize,
    pub tables: usize,
    /// Set when the pipeline itself failed; the counters are then zero.
    pub failure: Option<String>,
}

impl SummaryEntry {
    pub fn from_result(name: &str, result: &DocumentResult, total: Duration) -> Self {
        Self {
            name: name.to_string(),
            pages: result.page_count,
            total,
            timings: result.timings(),
            images: result.images.data.len(),
            tables: result.tables.data.tables.len(),
            failure: None,
        }
    }

    pub fn failed(name: &str, total: Duration, reason: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            pages: 0,
            total,
            timings: PhaseTimings::default(),
            images: 0,
            tables: 0,
            failure: Some(reason.into()),
        }
    }
}

/// What a batch run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    pub total_documents: usize,
    /// Documents that completed without a pipeline-level failure.
    pub processed_count: usize,
    /// In discovery order.
    pub entries: Vec<SummaryEntry>,
    /// From first dispatch to last completion.
    pub elapsed: Duration,
    /// `None` when nothing was written (empty batch).
    pub summary_path: Option<PathBuf>,
}
