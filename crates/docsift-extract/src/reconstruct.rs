// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page text reconstruction: regroups a page's positioned fragments into
// reading-order columns.
//
// Single pass, left to right. Blocks sorted by (left, top) join the current
// column while their left edge stays within the tolerance of the previous
// block in that column; otherwise they open a new column. Documents rarely
// exceed three visual columns, which is what this is tuned for.

use docsift_core::types::TextBlock;

/// Reconstructed text of one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageText {
    /// All columns in reading order, blocks joined by single spaces.
    pub continuous: String,
    /// The same text with a `[Column N]` header before each column.
    pub layout: String,
    pub columns: usize,
}

/// Group non-blank blocks into columns, left to right, each sorted top to
/// bottom.
pub fn group_columns(blocks: &[TextBlock], tolerance: f32) -> Vec<Vec<&TextBlock>> {
    let mut sorted: Vec<&TextBlock> = blocks.iter().filter(|b| !b.is_blank()).collect();
    sorted.sort_by(|a, b| a.left.total_cmp(&b.left).then(a.top.total_cmp(&b.top)));

    let mut columns: Vec<Vec<&TextBlock>> = Vec::new();
    for block in sorted {
        match columns.last_mut() {
            Some(column) if column.last().is_some_and(|prev| block.left - prev.left <= tolerance) => {
                column.push(block)
            }
            _ => columns.push(vec![block]),
        }
    }

    columns.sort_by(|a, b| min_left(a).total_cmp(&min_left(b)));
    for column in &mut columns {
        column.sort_by(|a, b| a.top.total_cmp(&b.top));
    }
    columns
}

/// Reconstruct a page. The column tolerance is `tolerance_ratio` of
/// `page_width`.
pub fn reconstruct_page(blocks: &[TextBlock], page_width: f32, tolerance_ratio: f32) -> PageText {
    let columns = group_columns(blocks, page_width * tolerance_ratio);
    if columns.is_empty() {
        return PageText::default();
    }

    let joined: Vec<String> = columns
        .iter()
        .map(|column| {
            column
                .iter()
                .map(|block| block.text.trim())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect();

    let layout = joined
        .iter()
        .enumerate()
        .map(|(i, text)| format!("[Column {}]\n{}", i + 1, text))
        .collect::<Vec<_>>()
        .join("\n\n");

    PageText {
        continuous: joined.join(" "),
        layout,
        columns: columns.len(),
    }
}

fn min_left(column: &[&TextBlock]) -> f32 {
    column
        .iter()
        .map(|block| block.left)
        .fold(f32::INFINITY, f32::min)
}
