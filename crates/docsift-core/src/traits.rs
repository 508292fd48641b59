// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Collaborator contracts consumed by the extraction core.
//
// The core never decodes document bytes or touches the filesystem layout of
// artifacts directly. It talks to these traits; `docsift-document` provides
// the PDF-backed implementations and tests provide fakes.

use std::path::Path;
use std::sync::Arc;

use crate::error::Result;
use crate::types::{
    DetectionParams, EncodedImage, ImageBox, PageGeometry, PageImage, RawImage, RawTable,
    RulingLine, TextBlock,
};

/// Opens documents by path.
pub trait DocumentSource: Send + Sync {
    /// Open the document at `path`. The returned handle is shared by the
    /// extraction phases of one pipeline and closed by that pipeline.
    fn open(&self, path: &Path) -> Result<Arc<dyn DocumentHandle>>;
}

/// Read access to an opened document. Page numbers are 1-based.
pub trait DocumentHandle: Send + Sync {
    fn page_count(&self) -> usize;

    fn page_geometry(&self, page: u32) -> Result<PageGeometry>;

    /// Positioned text fragments in content order.
    fn text_blocks(&self, page: u32) -> Result<Vec<TextBlock>>;

    /// Embedded raster images with their pixel dimensions.
    fn page_images(&self, page: u32) -> Result<Vec<PageImage>>;

    /// Where images are drawn on the page.
    fn image_boxes(&self, page: u32) -> Result<Vec<ImageBox>>;

    /// Straight stroked or filled lines. Handles without vector content
    /// report none.
    fn ruling_lines(&self, _page: u32) -> Result<Vec<RulingLine>> {
        Ok(Vec::new())
    }

    /// The stored bytes of an image listed by [`DocumentHandle::page_images`].
    fn raw_image(&self, image: &PageImage) -> Result<RawImage>;

    /// Release the underlying resources. Called exactly once per open.
    fn close(&self) {}
}

/// Finds table grids for one detection strategy.
pub trait TableDetector: Send + Sync {
    /// May return no tables. Grids are returned unvalidated.
    fn detect(&self, document: &dyn DocumentHandle, params: &DetectionParams)
    -> Result<Vec<RawTable>>;
}

/// Turns stored image bytes into a file payload.
pub trait ImageDecoder: Send + Sync {
    fn encode(&self, image: &RawImage) -> Result<EncodedImage>;
}

/// Persists artifacts. Parent directories are created as needed.
pub trait ArtifactWriter: Send + Sync {
    fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<()>;

    fn write_text(&self, path: &Path, text: &str) -> Result<()>;

    /// Write a rectangular grid as CSV.
    fn write_table(&self, path: &Path, rows: &[Vec<String>]) -> Result<()>;
}

/// The full set of collaborators one pipeline needs.
#[derive(Clone)]
pub struct Collaborators {
    pub source: Arc<dyn DocumentSource>,
    pub tables: Arc<dyn TableDetector>,
    pub images: Arc<dyn ImageDecoder>,
    pub writer: Arc<dyn ArtifactWriter>,
}
