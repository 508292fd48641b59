// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Table detection over a document handle.
//
// Lattice detection builds grids from ruling lines; stream detection builds
// them from text alignment. The scanned profile is stream detection with the
// wider tolerances carried in its `DetectionParams`.

pub mod lattice;
pub mod stream;

use tracing::{debug, instrument};

use docsift_core::error::Result;
use docsift_core::traits::{DocumentHandle, TableDetector};
use docsift_core::types::{DetectionParams, RawTable, TableMethod};

/// Detector for PDF page content reported by a [`DocumentHandle`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTableDetector;

impl TableDetector for PdfTableDetector {
    #[instrument(skip_all, fields(method = %params.method))]
    fn detect(
        &self,
        document: &dyn DocumentHandle,
        params: &DetectionParams,
    ) -> Result<Vec<RawTable>> {
        let mut tables = Vec::new();
        for page in 1..=document.page_count() as u32 {
            let blocks = document.text_blocks(page)?;
            let found = match params.method {
                TableMethod::Lattice => {
                    let lines = document.ruling_lines(page)?;
                    lattice::detect_page(page, &lines, &blocks, params)
                }
                TableMethod::Stream | TableMethod::Scanned => {
                    stream::detect_page(page, &blocks, params)
                }
            };
            debug!(page, tables = found.len(), "Page scanned for tables");
            tables.extend(found);
        }
        Ok(tables)
    }
}

/// Collapse sorted-or-not positions into cluster means, merging values that
/// lie within `tolerance` of their predecessor. Output is ascending.
pub(crate) fn cluster_positions(mut values: Vec<f32>, tolerance: f32) -> Vec<f32> {
    values.retain(|v| v.is_finite());
    values.sort_by(f32::total_cmp);

    let mut clusters: Vec<(f32, usize)> = Vec::new();
    let mut previous: Option<f32> = None;
    for value in values {
        let joins = previous.is_some_and(|prev| value - prev <= tolerance);
        match clusters.last_mut() {
            Some((sum, count)) if joins => {
                *sum += value;
                *count += 1;
            }
            _ => clusters.push((value, 1)),
        }
        previous = Some(value);
    }

    clusters
        .into_iter()
        .map(|(sum, count)| sum / count as f32)
        .collect()
}

/// Index of the band `[edges[i], edges[i + 1])` containing `value`.
pub(crate) fn band_index(edges: &[f32], value: f32) -> Option<usize> {
    edges
        .windows(2)
        .position(|pair| value >= pair[0] && value < pair[1])
}

/// Append `text` to a cell, separating fragments with a space.
pub(crate) fn push_cell_text(cell: &mut String, text: &str) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    if !cell.is_empty() {
        cell.push(' ');
    }
    cell.push_str(text);
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsift_core::types::{
        ImageBox, PageGeometry, PageImage, RawImage, RulingLine, TextBlock,
    };

    #[test]
    fn positions_cluster_within_tolerance() {
        let clusters = cluster_positions(vec![100.0, 10.0, 11.0, 12.5, 99.0], 2.0);
        assert_eq!(clusters.len(), 2);
        assert!((clusters[0] - 11.166_667).abs() < 1e-3);
        assert!((clusters[1] - 99.5).abs() < 1e-3);
    }

    #[test]
    fn band_lookup_is_half_open() {
        let edges = [0.0, 10.0, 20.0];
        assert_eq!(band_index(&edges, 0.0), Some(0));
        assert_eq!(band_index(&edges, 10.0), Some(1));
        assert_eq!(band_index(&edges, 20.0), None);
    }

    struct GridPage;

    impl DocumentHandle for GridPage {
        fn page_count(&self) -> usize {
            1
        }
        fn page_geometry(&self, _page: u32) -> Result<PageGeometry> {
            Ok(PageGeometry::US_LETTER)
        }
        fn text_blocks(&self, _page: u32) -> Result<Vec<TextBlock>> {
            Ok(vec![
                TextBlock::new(110.0, 105.0, "a").with_size(10.0, 10.0),
                TextBlock::new(210.0, 105.0, "b").with_size(10.0, 10.0),
                TextBlock::new(110.0, 125.0, "c").with_size(10.0, 10.0),
                TextBlock::new(210.0, 125.0, "d").with_size(10.0, 10.0),
            ])
        }
        fn page_images(&self, _page: u32) -> Result<Vec<PageImage>> {
            Ok(Vec::new())
        }
        fn image_boxes(&self, _page: u32) -> Result<Vec<ImageBox>> {
            Ok(Vec::new())
        }
        fn ruling_lines(&self, _page: u32) -> Result<Vec<RulingLine>> {
            Ok(vec![
                RulingLine::horizontal(100.0, 100.0, 300.0),
                RulingLine::horizontal(120.0, 100.0, 300.0),
                RulingLine::horizontal(140.0, 100.0, 300.0),
                RulingLine::vertical(100.0, 100.0, 140.0),
                RulingLine::vertical(200.0, 100.0, 140.0),
                RulingLine::vertical(300.0, 100.0, 140.0),
            ])
        }
        fn raw_image(&self, _image: &PageImage) -> Result<RawImage> {
            unreachable!("no images on this page")
        }
    }

    #[test]
    fn detector_dispatches_on_method() {
        let lattice = PdfTableDetector
            .detect(&GridPage, &DetectionParams::for_method(TableMethod::Lattice))
            .expect("lattice");
        assert_eq!(lattice.len(), 1);
        assert_eq!(
            lattice[0].cells,
            vec![vec!["a".to_string(), "b".to_string()], vec!["c".to_string(), "d".to_string()]]
        );

        let stream = PdfTableDetector
            .detect(&GridPage, &DetectionParams::for_method(TableMethod::Stream))
            .expect("stream");
        assert_eq!(stream.len(), 1);
        assert_eq!(stream[0].page, Some(1));
    }
}
