// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanned-versus-digital classification.
//
// Each inspected page gets a confidence that it is a scan, from how little of
// it is covered by text and how much by images. The document score is the
// mean over the first few pages. Any inspection failure yields the configured
// high-confidence fallback: scanned-path extraction degrades gracefully where
// text-path extraction on a garbled document silently finds nothing.

use tracing::{debug, warn};

use docsift_core::config::ExtractionConfig;
use docsift_core::error::{DocsiftError, Result};
use docsift_core::traits::DocumentHandle;
use docsift_core::types::{ClassificationScore, SCANNED_THRESHOLD};

/// Confidence for a page with no extractable text, whatever its images.
pub const TEXTLESS_PAGE_CONFIDENCE: f64 = 0.95;

/// Image-to-text ratio used when the text area is zero.
const RATIO_WITHOUT_TEXT: f64 = 10.0;

const TEXT_WEIGHT: f64 = 0.3;
const IMAGE_WEIGHT: f64 = 0.4;
const RATIO_WEIGHT: f64 = 0.3;

/// Areas measured on one page, in square points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageMeasurements {
    pub page_area: f64,
    pub text_area: f64,
    pub image_area: f64,
    pub has_text: bool,
}

/// Confidence in `[0, 1]` that a single page is scanned.
pub fn page_confidence(page: &PageMeasurements) -> f64 {
    if !page.has_text {
        return TEXTLESS_PAGE_CONFIDENCE;
    }

    let text_density = page.text_area / page.page_area;
    let image_coverage = page.image_area / page.page_area;
    let image_to_text = if page.text_area > 0.0 {
        page.image_area / page.text_area
    } else {
        RATIO_WITHOUT_TEXT
    };

    let text_confidence = (1.0 - text_density * 10.0).max(0.0);
    let image_confidence = (image_coverage * 2.0).min(1.0);
    let ratio_confidence = (image_to_text / 5.0).min(1.0);

    let confidence = TEXT_WEIGHT * text_confidence
        + IMAGE_WEIGHT * image_confidence
        + RATIO_WEIGHT * ratio_confidence;
    confidence.clamp(0.0, 1.0)
}

/// Scores documents by inspecting their leading pages.
#[derive(Debug, Clone, Copy)]
pub struct DocumentTypeClassifier {
    pages_to_inspect: usize,
    threshold: f64,
    fallback_confidence: f64,
}

impl Default for DocumentTypeClassifier {
    fn default() -> Self {
        Self {
            pages_to_inspect: 2,
            threshold: SCANNED_THRESHOLD,
            fallback_confidence: 0.9,
        }
    }
}

impl DocumentTypeClassifier {
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            pages_to_inspect: config.pages_to_inspect.max(1),
            threshold: config.scanned_threshold,
            fallback_confidence: config.classifier_fallback_confidence,
        }
    }

    /// Score `document`. Never fails: inspection errors produce the fallback.
    pub fn score(&self, document: &dyn DocumentHandle) -> ClassificationScore {
        match self.inspect(document) {
            Ok(confidence) => {
                let score = ClassificationScore::with_threshold(confidence, self.threshold);
                debug!(
                    confidence = score.confidence,
                    is_scanned = score.is_scanned,
                    "Document classified"
                );
                score
            }
            Err(err) => {
                warn!(
                    error = %err,
                    fallback = self.fallback_confidence,
                    "Classification failed, assuming scanned"
                );
                ClassificationScore::fallback(self.fallback_confidence, self.threshold)
            }
        }
    }

    fn inspect(&self, document: &dyn DocumentHandle) -> Result<f64> {
        let pages = document.page_count().min(self.pages_to_inspect);
        if pages == 0 {
            return Err(DocsiftError::Classification(
                "document has no pages".to_string(),
            ));
        }

        let mut total = 0.0;
        for page in 1..=pages as u32 {
            let measured = measure_page(document, page)?;
            let confidence = page_confidence(&measured);
            debug!(page, confidence, "Page inspected");
            total += confidence;
        }
        Ok(total / pages as f64)
    }
}

fn measure_page(document: &dyn DocumentHandle, page: u32) -> Result<PageMeasurements> {
    let geometry = document.page_geometry(page)?;
    let page_area = f64::from(geometry.area());
    if !(page_area.is_finite() && page_area > 0.0) {
        return Err(DocsiftError::Classification(format!(
            "page {} has no usable area",
            page
        )));
    }

    let blocks = document.text_blocks(page)?;
    let text: Vec<_> = blocks.iter().filter(|b| !b.is_blank()).collect();
    let text_area: f64 = text.iter().map(|b| f64::from(b.area())).sum();
    let image_area: f64 = document
        .image_boxes(page)?
        .iter()
        .map(|b| f64::from(b.area()))
        .sum();

    Ok(PageMeasurements {
        page_area,
        text_area,
        image_area,
        has_text: !text.is_empty(),
    })
}
