// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The three extraction phases.
//
// Each phase is a plain function of (document, output directory,
// collaborators, config). They hold no state between calls and share nothing
// but the read-only document handle, so the pipeline can run them in parallel.

use std::path::Path;

use tracing::{debug, instrument, warn};

use docsift_core::config::ExtractionConfig;
use docsift_core::error::Result;
use docsift_core::traits::{Collaborators, DocumentHandle};
use docsift_core::types::{ImageRecord, PageTextStats, TableExtraction, TableRecord, TextResult};
use docsift_document::output::{continuous_text_path, image_path, layout_text_path, table_path};

use crate::classify::DocumentTypeClassifier;
use crate::reconstruct::reconstruct_page;
use crate::strategy::{TableLimits, plan_for, run_plan};

// -- Images -------------------------------------------------------------------

/// Write every embedded image at least `min_image_size` pixels in both
/// dimensions. An image that cannot be read or encoded is skipped with a
/// warning; write failures fail the phase.
#[instrument(skip_all, fields(output = %output_dir.display()))]
pub fn extract_images(
    document: &dyn DocumentHandle,
    output_dir: &Path,
    collaborators: &Collaborators,
    config: &ExtractionConfig,
) -> Result<Vec<ImageRecord>> {
    let mut records = Vec::new();

    for page in 1..=document.page_count() as u32 {
        for image in document.page_images(page)? {
            if image.width < config.min_image_size || image.height < config.min_image_size {
                debug!(
                    page,
                    index = image.index,
                    width = image.width,
                    height = image.height,
                    "Image below minimum size, skipped"
                );
                continue;
            }

            let encoded = match document
                .raw_image(&image)
                .and_then(|raw| collaborators.images.encode(&raw))
            {
                Ok(encoded) => encoded,
                Err(err) => {
                    warn!(page, index = image.index, error = %err, "Image skipped");
                    continue;
                }
            };

            let path = image_path(output_dir, page, image.index, encoded.extension);
            collaborators.writer.write_bytes(&path, &encoded.bytes)?;
            records.push(ImageRecord {
                page,
                image_index: image.index,
                path,
                width: image.width,
                height: image.height,
            });
        }
    }

    debug!(images = records.len(), "Image phase finished");
    Ok(records)
}

// -- Tables -------------------------------------------------------------------

/// Classify the document, run the selected detection plan and write each
/// qualifying table as CSV. Table indexes start at 1 per document.
#[instrument(skip_all, fields(output = %output_dir.display()))]
pub fn extract_tables(
    document: &dyn DocumentHandle,
    output_dir: &Path,
    collaborators: &Collaborators,
    config: &ExtractionConfig,
) -> Result<TableExtraction> {
    let classification = DocumentTypeClassifier::from_config(config).score(document);
    let plan = plan_for(classification.is_scanned, TableLimits::from_config(config));
    let outcome = run_plan(&plan, collaborators.tables.as_ref(), document)?;

    let mut tables = Vec::with_capacity(outcome.tables.len());
    if let Some(method) = outcome.method {
        for (i, table) in outcome.tables.into_iter().enumerate() {
            let table_index = i as u32 + 1;
            let path = table_path(output_dir, table_index, table.page, method);
            collaborators.writer.write_table(&path, &table.cells)?;
            tables.push(TableRecord {
                table_index,
                page: table.page,
                path,
                rows: table.rows,
                columns: table.columns,
                method,
            });
        }
    }

    debug!(tables = tables.len(), method = ?outcome.method, "Table phase finished");
    Ok(TableExtraction {
        classification: Some(classification),
        method: outcome.method,
        tables,
    })
}

// -- Text ---------------------------------------------------------------------

/// Reconstruct every page in reading order and write the continuous text
/// (pages joined by a space). In layout mode the column-delimited rendering
/// is written too, one `=== Page N ===` section per page.
#[instrument(skip_all, fields(output = %output_dir.display()))]
pub fn extract_text(
    document: &dyn DocumentHandle,
    output_dir: &Path,
    collaborators: &Collaborators,
    config: &ExtractionConfig,
) -> Result<TextResult> {
    let total_pages = document.page_count();
    let mut pages = Vec::with_capacity(total_pages);
    let mut continuous_parts = Vec::new();
    let mut layout_sections = Vec::new();

    for page in 1..=total_pages as u32 {
        let geometry = document.page_geometry(page)?;
        let blocks = document.text_blocks(page)?;
        let text = reconstruct_page(&blocks, geometry.width, config.column_tolerance_ratio);

        pages.push(PageTextStats {
            page_number: page,
            char_count: text.continuous.chars().count(),
        });
        if !text.continuous.is_empty() {
            continuous_parts.push(text.continuous);
        }
        if config.layout_text {
            layout_sections.push(format!("=== Page {} ===\n{}", page, text.layout));
        }
    }

    let continuous_path = continuous_text_path(output_dir);
    collaborators
        .writer
        .write_text(&continuous_path, &continuous_parts.join(" "))?;

    let layout_path = if config.layout_text {
        let path = layout_text_path(output_dir);
        collaborators
            .writer
            .write_text(&path, &layout_sections.join("\n\n"))?;
        Some(path)
    } else {
        None
    };

    Ok(TextResult {
        pages,
        total_pages,
        continuous_text_path: Some(continuous_path),
        layout_text_path: layout_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    use docsift_core::error::DocsiftError;
    use docsift_core::traits::{ArtifactWriter, DocumentSource, ImageDecoder, TableDetector};
    use docsift_core::types::{
        DetectionParams, EncodedImage, ImageBox, ImageEncoding, ImageRef, PageGeometry,
        PageImage, PixelLayout, RawImage, RawTable, TableMethod, TextBlock,
    };

    /// Two text pages; page 1 carries two images, one of them tiny.
    struct Brochure;

    impl DocumentHandle for Brochure {
        fn page_count(&self) -> usize {
            2
        }
        fn page_geometry(&self, _page: u32) -> Result<PageGeometry> {
            Ok(PageGeometry::US_LETTER)
        }
        fn text_blocks(&self, page: u32) -> Result<Vec<TextBlock>> {
            Ok(match page {
                1 => vec![
                    TextBlock::new(72.0, 100.0, "Intro").with_size(50.0, 12.0),
                    TextBlock::new(320.0, 100.0, "Sidebar").with_size(50.0, 12.0),
                ],
                _ => vec![TextBlock::new(72.0, 100.0, "Closing").with_size(50.0, 12.0)],
            })
        }
        fn page_images(&self, page: u32) -> Result<Vec<PageImage>> {
            if page != 1 {
                return Ok(Vec::new());
            }
            Ok(vec![
                PageImage {
                    page,
                    index: 1,
                    width: 10,
                    height: 10,
                    reference: ImageRef(1),
                },
                PageImage {
                    page,
                    index: 2,
                    width: 64,
                    height: 64,
                    reference: ImageRef(2),
                },
            ])
        }
        fn image_boxes(&self, _page: u32) -> Result<Vec<ImageBox>> {
            Ok(Vec::new())
        }
        fn raw_image(&self, image: &PageImage) -> Result<RawImage> {
            Ok(RawImage {
                width: image.width,
                height: image.height,
                encoding: ImageEncoding::Raw {
                    layout: PixelLayout::Gray,
                    bits_per_component: 8,
                },
                data: vec![0; (image.width * image.height) as usize],
            })
        }
    }

    #[derive(Default)]
    struct MemoryWriter {
        files: Mutex<HashMap<PathBuf, String>>,
    }

    impl ArtifactWriter for MemoryWriter {
        fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<()> {
            self.files
                .lock()
                .expect("files lock")
                .insert(path.to_path_buf(), format!("{} bytes", bytes.len()));
            Ok(())
        }
        fn write_text(&self, path: &Path, text: &str) -> Result<()> {
            self.files
                .lock()
                .expect("files lock")
                .insert(path.to_path_buf(), text.to_string());
            Ok(())
        }
        fn write_table(&self, path: &Path, rows: &[Vec<String>]) -> Result<()> {
            let body = rows.iter().map(|r| r.join(",")).collect::<Vec<_>>().join("\n");
            self.write_text(path, &body)
        }
    }

    struct StubEncoder;

    impl ImageDecoder for StubEncoder {
        fn encode(&self, _image: &RawImage) -> Result<EncodedImage> {
            Ok(EncodedImage {
                bytes: vec![0; 4],
                extension: "png",
            })
        }
    }

    struct OneTable;

    impl TableDetector for OneTable {
        fn detect(
            &self,
            _document: &dyn DocumentHandle,
            params: &DetectionParams,
        ) -> Result<Vec<RawTable>> {
            if params.method != TableMethod::Lattice {
                return Ok(Vec::new());
            }
            Ok(vec![
                RawTable::new(Some(2), vec![vec!["a".into(), "b".into()]; 2]),
                RawTable::new(Some(2), vec![vec!["lonely".into()]]),
            ])
        }
    }

    struct NeverOpened;

    impl DocumentSource for NeverOpened {
        fn open(&self, path: &Path) -> Result<Arc<dyn DocumentHandle>> {
            Err(DocsiftError::DocumentOpen {
                path: path.display().to_string(),
                reason: "not used".into(),
            })
        }
    }

    fn collaborators(writer: Arc<MemoryWriter>) -> Collaborators {
        Collaborators {
            source: Arc::new(NeverOpened),
            tables: Arc::new(OneTable),
            images: Arc::new(StubEncoder),
            writer,
        }
    }

    #[test]
    fn small_images_are_discarded() {
        let writer = Arc::new(MemoryWriter::default());
        let records = extract_images(
            &Brochure,
            Path::new("/out/doc"),
            &collaborators(writer.clone()),
            &ExtractionConfig::default(),
        )
        .expect("images");

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].image_index, 2);
        assert_eq!(records[0].path, PathBuf::from("/out/doc/images/page_1_img_2.png"));
        assert_eq!(writer.files.lock().expect("lock").len(), 1);
    }

    #[test]
    fn qualifying_tables_are_indexed_and_written() {
        let writer = Arc::new(MemoryWriter::default());
        let extraction = extract_tables(
            &Brochure,
            Path::new("/out/doc"),
            &collaborators(writer.clone()),
            &ExtractionConfig::default(),
        )
        .expect("tables");

        let classification = extraction.classification.expect("classified");
        assert!(!classification.is_scanned);
        assert_eq!(extraction.method, Some(TableMethod::Lattice));
        assert_eq!(extraction.tables.len(), 1);
        let record = &extraction.tables[0];
        assert_eq!((record.table_index, record.page), (1, 2));
        assert_eq!(
            record.path,
            PathBuf::from("/out/doc/tables/table_1_page_2_lattice.csv")
        );
        assert_eq!(
            writer.files.lock().expect("lock")[&record.path],
            "a,b\na,b"
        );
    }

    #[test]
    fn text_is_written_continuously_and_counted_per_page() {
        let writer = Arc::new(MemoryWriter::default());
        let config = ExtractionConfig {
            layout_text: true,
            ..Default::default()
        };
        let result = extract_text(
            &Brochure,
            Path::new("/out/doc"),
            &collaborators(writer.clone()),
            &config,
        )
        .expect("text");

        assert_eq!(result.total_pages, 2);
        assert_eq!(result.pages[0].char_count, "Intro Sidebar".len());
        assert_eq!(result.pages[1].char_count, "Closing".len());

        let files = writer.files.lock().expect("lock");
        let continuous = result.continuous_text_path.as_ref().expect("path");
        assert_eq!(files[continuous], "Intro Sidebar Closing");
        let layout = result.layout_text_path.as_ref().expect("layout path");
        assert!(files[layout].starts_with("=== Page 1 ===\n[Column 1]\nIntro"));
    }
}
