// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Artifact output: on-disk layout of a document's output directory and the
// filesystem writer that persists images, text and CSV tables into it.

use std::fs;
use std::path::{Path, PathBuf};

use csv::WriterBuilder;
use tracing::{debug, instrument};

use docsift_core::error::{DocsiftError, Result};
use docsift_core::traits::ArtifactWriter;
use docsift_core::types::TableMethod;

// -- Layout -------------------------------------------------------------------

pub const IMAGES_DIR: &str = "images";
pub const TABLES_DIR: &str = "tables";
pub const TEXT_DIR: &str = "text";
pub const CONTINUOUS_TEXT_FILE: &str = "continuous_text.txt";
pub const LAYOUT_TEXT_FILE: &str = "layout_text.txt";

/// `<output_dir>/images/page_{page}_img_{index}.{extension}`
pub fn image_path(output_dir: &Path, page: u32, index: u32, extension: &str) -> PathBuf {
    output_dir
        .join(IMAGES_DIR)
        .join(format!("page_{page}_img_{index}.{extension}"))
}

/// `<output_dir>/tables/table_{index}_page_{page}_{method}.csv`
pub fn table_path(output_dir: &Path, index: u32, page: u32, method: TableMethod) -> PathBuf {
    output_dir
        .join(TABLES_DIR)
        .join(format!("table_{index}_page_{page}_{}.csv", method.tag()))
}

pub fn continuous_text_path(output_dir: &Path) -> PathBuf {
    output_dir.join(TEXT_DIR).join(CONTINUOUS_TEXT_FILE)
}

pub fn layout_text_path(output_dir: &Path) -> PathBuf {
    output_dir.join(TEXT_DIR).join(LAYOUT_TEXT_FILE)
}

// -- Writer -------------------------------------------------------------------

/// Writes artifacts straight to the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsArtifactWriter;

impl FsArtifactWriter {
    fn ensure_parent(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl ArtifactWriter for FsArtifactWriter {
    #[instrument(skip_all, fields(path = %path.display(), bytes = bytes.len()))]
    fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        Self::ensure_parent(path)?;
        fs::write(path, bytes)?;
        debug!("Artifact written");
        Ok(())
    }

    #[instrument(skip_all, fields(path = %path.display(), chars = text.len()))]
    fn write_text(&self, path: &Path, text: &str) -> Result<()> {
        Self::ensure_parent(path)?;
        fs::write(path, text)?;
        debug!("Text artifact written");
        Ok(())
    }

    #[instrument(skip_all, fields(path = %path.display(), rows = rows.len()))]
    fn write_table(&self, path: &Path, rows: &[Vec<String>]) -> Result<()> {
        Self::ensure_parent(path)?;
        let mut writer = WriterBuilder::new()
            .flexible(false)
            .from_path(path)
            .map_err(|err| DocsiftError::Csv(format!("{}: {}", path.display(), err)))?;
        for row in rows {
            writer
                .write_record(row)
                .map_err(|err| DocsiftError::Csv(format!("{}: {}", path.display(), err)))?;
        }
        writer.flush()?;
        debug!("Table written");
        Ok(())
    }
}
