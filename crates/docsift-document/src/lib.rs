// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docsift-document: concrete collaborators behind the docsift core traits.
//
// Provides a `lopdf`-backed document handle (positioned text, embedded images,
// image placements, ruling lines), an image encoder, lattice and stream table
// detectors, a filesystem artifact writer, and source fingerprinting.

pub mod image;
pub mod integrity;
pub mod output;
pub mod pdf;
pub mod table;

use std::sync::Arc;

use docsift_core::traits::Collaborators;

pub use self::image::encoder::PixelEncoder;
pub use output::FsArtifactWriter;
pub use pdf::reader::{PdfDocument, PdfSource};
pub use table::PdfTableDetector;

/// The PDF-backed collaborator set used by the `docsift` binary.
pub fn pdf_collaborators() -> Collaborators {
    Collaborators {
        source: Arc::new(PdfSource),
        tables: Arc::new(PdfTableDetector),
        images: Arc::new(PixelEncoder),
        writer: Arc::new(FsArtifactWriter),
    }
}
