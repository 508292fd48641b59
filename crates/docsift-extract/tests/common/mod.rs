// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fake documents for the integration tests.
//
// Every input file is a one-line script naming the document kind. The fake
// source opens it into an in-memory handle, and a shared probe records how
// many handles are open at once.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use docsift_core::error::{DocsiftError, Result};
use docsift_core::traits::{Collaborators, DocumentHandle, DocumentSource};
use docsift_core::types::{
    ImageBox, ImageEncoding, ImageRef, PageGeometry, PageImage, PixelLayout, RawImage, RulingLine,
    TextBlock,
};
use docsift_document::{FsArtifactWriter, PdfTableDetector, PixelEncoder};

// -- Probe --------------------------------------------------------------------

/// Counts open handles and remembers the peak.
#[derive(Debug, Default)]
pub struct Probe {
    open: AtomicUsize,
    peak: AtomicUsize,
    opened: AtomicUsize,
    closed: AtomicUsize,
}

impl Probe {
    fn enter(&self) {
        let now = self.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.opened.fetch_add(1, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
        self.closed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

// -- Documents ----------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    None,
    Images,
    Tables,
    Text,
}

#[derive(Debug, Clone, Default)]
pub struct FakePage {
    pub blocks: Vec<TextBlock>,
    /// Pixel sizes of the embedded images, drawn at the same size in points.
    pub images: Vec<(u32, u32)>,
    pub lines: Vec<RulingLine>,
}

pub struct FakeDocument {
    pages: Vec<FakePage>,
    fault: Fault,
    delay: Duration,
    probe: Arc<Probe>,
}

impl FakeDocument {
    fn page(&self, page: u32) -> Result<&FakePage> {
        page.checked_sub(1)
            .and_then(|i| self.pages.get(i as usize))
            .ok_or_else(|| DocsiftError::Pdf(format!("page {} out of range", page)))
    }
}

impl DocumentHandle for FakeDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_geometry(&self, page: u32) -> Result<PageGeometry> {
        if self.fault == Fault::Text {
            return Err(DocsiftError::Pdf("broken media box".into()));
        }
        self.page(page).map(|_| PageGeometry::US_LETTER)
    }

    fn text_blocks(&self, page: u32) -> Result<Vec<TextBlock>> {
        std::thread::sleep(self.delay);
        Ok(self.page(page)?.blocks.clone())
    }

    fn page_images(&self, page: u32) -> Result<Vec<PageImage>> {
        if self.fault == Fault::Images {
            return Err(DocsiftError::Image("unreadable XObject".into()));
        }
        Ok(self
            .page(page)?
            .images
            .iter()
            .enumerate()
            .map(|(i, &(width, height))| PageImage {
                page,
                index: i as u32 + 1,
                width,
                height,
                reference: ImageRef((u64::from(page) << 8) | i as u64),
            })
            .collect())
    }

    fn image_boxes(&self, page: u32) -> Result<Vec<ImageBox>> {
        Ok(self
            .page(page)?
            .images
            .iter()
            .map(|&(width, height)| ImageBox {
                left: 300.0,
                top: 500.0,
                width: width as f32,
                height: height as f32,
            })
            .collect())
    }

    fn ruling_lines(&self, page: u32) -> Result<Vec<RulingLine>> {
        if self.fault == Fault::Tables {
            panic!("ruling line decoder bug");
        }
        Ok(self.page(page)?.lines.clone())
    }

    fn raw_image(&self, image: &PageImage) -> Result<RawImage> {
        Ok(RawImage {
            width: image.width,
            height: image.height,
            encoding: ImageEncoding::Raw {
                layout: PixelLayout::Gray,
                bits_per_component: 8,
            },
            data: vec![200; (image.width * image.height) as usize],
        })
    }

    fn close(&self) {
        self.probe.leave();
    }
}

/// A ruled grid with `rows` x `cols` cells of 100x20pt at (`left`, `top`).
pub fn ruled_grid(left: f32, top: f32, rows: usize, cols: usize) -> Vec<RulingLine> {
    let right = left + 100.0 * cols as f32;
    let bottom = top + 20.0 * rows as f32;
    let mut lines = Vec::new();
    for r in 0..=rows {
        lines.push(RulingLine::horizontal(top + 20.0 * r as f32, left, right));
    }
    for c in 0..=cols {
        lines.push(RulingLine::vertical(left + 100.0 * c as f32, top, bottom));
    }
    lines
}

fn block(left: f32, top: f32, text: &str) -> TextBlock {
    TextBlock::new(left, top, text).with_size(6.0 * text.len() as f32, 12.0)
}

/// Two pages. Page 1: three blocks in two columns and a 2x2 ruled table.
/// Page 2: a 1x1 ruled box and a 10px image.
pub fn scenario_pages() -> Vec<FakePage> {
    vec![
        FakePage {
            blocks: vec![
                block(72.0, 100.0, "Quarterly results"),
                block(72.0, 130.0, "Revenue grew."),
                block(400.0, 100.0, "Outlook"),
                block(80.0, 304.0, "Region"),
                block(180.0, 304.0, "Sales"),
                block(80.0, 324.0, "North"),
                block(180.0, 324.0, "1200"),
            ],
            images: Vec::new(),
            lines: ruled_grid(72.0, 300.0, 2, 2),
        },
        FakePage {
            blocks: vec![block(72.0, 100.0, "Appendix"), block(80.0, 304.0, "Note")],
            images: vec![(10, 10)],
            lines: ruled_grid(72.0, 300.0, 1, 1),
        },
    ]
}

fn plain_pages() -> Vec<FakePage> {
    vec![FakePage {
        blocks: vec![block(72.0, 100.0, "Plain text page")],
        images: vec![(80, 60)],
        lines: Vec::new(),
    }]
}

// -- Source -------------------------------------------------------------------

/// Opens script files: `scenario`, `unreadable`, `broken-images`,
/// `broken-tables`, `broken-text`, anything else is a plain one-pager.
pub struct FakeSource {
    pub probe: Arc<Probe>,
    pub delay: Duration,
}

impl DocumentSource for FakeSource {
    fn open(&self, path: &Path) -> Result<Arc<dyn DocumentHandle>> {
        let script = std::fs::read_to_string(path)?;
        let (pages, fault) = match script.trim() {
            "unreadable" => {
                return Err(DocsiftError::DocumentOpen {
                    path: path.display().to_string(),
                    reason: "not a PDF".into(),
                });
            }
            "scenario" => (scenario_pages(), Fault::None),
            "broken-images" => (plain_pages(), Fault::Images),
            "broken-tables" => (scenario_pages(), Fault::Tables),
            "broken-text" => (plain_pages(), Fault::Text),
            _ => (plain_pages(), Fault::None),
        };
        self.probe.enter();
        Ok(Arc::new(FakeDocument {
            pages,
            fault,
            delay: self.delay,
            probe: Arc::clone(&self.probe),
        }))
    }
}

/// Fake documents with the real detector, encoder and filesystem writer.
pub fn collaborators(probe: Arc<Probe>, delay: Duration) -> Collaborators {
    Collaborators {
        source: Arc::new(FakeSource { probe, delay }),
        tables: Arc::new(PdfTableDetector),
        images: Arc::new(PixelEncoder),
        writer: Arc::new(FsArtifactWriter),
    }
}

/// Write `files` as (name, script) pairs into `dir`.
pub fn seed(dir: &Path, files: &[(&str, &str)]) {
    for (name, script) in files {
        std::fs::write(dir.join(name), script).expect("seed document");
    }
}
