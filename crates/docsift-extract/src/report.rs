// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-document report written next to the document's artifacts.

use docsift_core::error::Result;
use docsift_core::traits::ArtifactWriter;
use docsift_core::types::{DocumentResult, ExtractionPhase};
use docsift_document::output::{
    CONTINUOUS_TEXT_FILE, IMAGES_DIR, LAYOUT_TEXT_FILE, TABLES_DIR, TEXT_DIR,
};

const RULE: &str = "==================================================";

/// Render the plain-text report for one document.
pub fn render_report(result: &DocumentResult, report_file_name: &str) -> String {
    let timings = result.timings();
    let tables = &result.tables.data;

    let mut text = format!("DOCUMENT EXTRACTION SUMMARY\n{RULE}\n\n");
    text.push_str(&format!("Document: {}\n", result.document_path.display()));
    text.push_str(&format!("Output Directory: {}\n", result.output_dir.display()));
    text.push_str(&format!(
        "SHA-256: {}\n",
        result.document_hash.as_deref().unwrap_or("unavailable")
    ));
    text.push_str(&format!("Pages: {}\n\n", result.page_count));

    match tables.classification {
        Some(score) => text.push_str(&format!(
            "Classification: {} (confidence {:.2}){}\n",
            if score.is_scanned { "scanned" } else { "digital" },
            score.confidence,
            if score.fallback { " [fallback]" } else { "" }
        )),
        None => text.push_str("Classification: unavailable\n"),
    }
    text.push_str(&format!(
        "Table Strategy: {}\n\n",
        tables.method.map(|m| m.tag()).unwrap_or("none")
    ));

    text.push_str(&format!("Images Extracted: {}\n", result.images.data.len()));
    text.push_str(&format!("Tables Extracted: {}\n\n", tables.tables.len()));

    text.push_str("EXECUTION TIMES:\n");
    for phase in [
        ExtractionPhase::Images,
        ExtractionPhase::Tables,
        ExtractionPhase::Text,
    ] {
        text.push_str(&format!(
            "- {}: {:.2} seconds\n",
            phase.label(),
            timings.get(phase).as_secs_f64()
        ));
    }
    text.push_str(&format!(
        "\nTotal Extraction Time: {:.2} seconds\n\n",
        timings.total().as_secs_f64()
    ));

    let failures = result.failures();
    if !failures.is_empty() {
        text.push_str("FAILURES:\n");
        for (phase, reason) in failures {
            text.push_str(&format!("- {}: {}\n", phase.label(), reason));
        }
        text.push('\n');
    }

    text.push_str("FILES CREATED:\n");
    text.push_str(&format!(
        "- {IMAGES_DIR}/ ({} files)\n",
        result.images.data.len()
    ));
    text.push_str(&format!(
        "- {TABLES_DIR}/ ({} CSV files)\n",
        tables.tables.len()
    ));
    if result.text.data.continuous_text_path.is_some() {
        text.push_str(&format!("- {TEXT_DIR}/{CONTINUOUS_TEXT_FILE}\n"));
    }
    if result.text.data.layout_text_path.is_some() {
        text.push_str(&format!("- {TEXT_DIR}/{LAYOUT_TEXT_FILE}\n"));
    }
    text.push_str(&format!("- {report_file_name} (this file)\n"));

    text
}

/// Write the report into the document's output directory.
pub fn write_report(
    writer: &dyn ArtifactWriter,
    result: &DocumentResult,
    report_file_name: &str,
) -> Result<()> {
    let path = result.output_dir.join(report_file_name);
    writer.write_text(&path, &render_report(result, report_file_name))
}
