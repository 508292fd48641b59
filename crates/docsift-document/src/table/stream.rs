// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stream detection: unruled tables found from text alignment alone.
//
// Fragments are grouped into rows by their top edge, adjacent fragments in a
// row are merged into cells, and runs of consecutive multi-cell rows become
// table candidates. Column anchors come from clustering the cells' left edges.

use docsift_core::types::{DetectionParams, RawTable, TextBlock};

use super::{cluster_positions, push_cell_text};

/// Row height assumed for fragments the handle could not measure.
const DEFAULT_ROW_HEIGHT: f32 = 12.0;

/// Rows further apart than this many row heights end a table.
const MAX_ROW_GAP: f32 = 2.5;

/// One row of merged cells, left to right.
#[derive(Debug)]
struct Row {
    top: f32,
    height: f32,
    cells: Vec<Cell>,
}

#[derive(Debug)]
struct Cell {
    left: f32,
    right: f32,
    text: String,
}

/// Detect alignment tables on one page.
pub fn detect_page(page: u32, blocks: &[TextBlock], params: &DetectionParams) -> Vec<RawTable> {
    let rows = group_rows(blocks, params);

    let mut tables = Vec::new();
    let mut run: Vec<&Row> = Vec::new();
    for row in &rows {
        let continues = run.last().is_some_and(|prev| {
            row.cells.len() >= 2 && row.top - prev.top <= prev.height.max(row.height) * MAX_ROW_GAP
        });
        if continues || (run.is_empty() && row.cells.len() >= 2) {
            run.push(row);
            continue;
        }
        tables.extend(build_table(page, &run, params));
        run.clear();
        if row.cells.len() >= 2 {
            run.push(row);
        }
    }
    tables.extend(build_table(page, &run, params));
    tables
}

/// Rows in top-to-bottom order with their fragments merged into cells.
fn group_rows(blocks: &[TextBlock], params: &DetectionParams) -> Vec<Row> {
    let mut sorted: Vec<&TextBlock> = blocks.iter().filter(|b| !b.is_blank()).collect();
    sorted.sort_by(|a, b| a.top.total_cmp(&b.top).then(a.left.total_cmp(&b.left)));

    let mut grouped: Vec<Vec<&TextBlock>> = Vec::new();
    for block in sorted {
        match grouped.last_mut() {
            Some(row) if block.top - row[0].top <= params.row_tolerance => row.push(block),
            _ => grouped.push(vec![block]),
        }
    }

    let merge_gap = params.column_tolerance / 2.0;
    grouped
        .into_iter()
        .map(|mut fragments| {
            fragments.sort_by(|a, b| a.left.total_cmp(&b.left));
            let top = fragments[0].top;
            let height = fragments
                .iter()
                .map(|f| f.height)
                .fold(0.0_f32, f32::max);
            let height = if height > 0.0 {
                height
            } else {
                DEFAULT_ROW_HEIGHT
            };

            let mut cells: Vec<Cell> = Vec::new();
            for fragment in fragments {
                match cells.last_mut() {
                    Some(cell) if fragment.left - cell.right <= merge_gap => {
                        push_cell_text(&mut cell.text, &fragment.text);
                        cell.right = cell.right.max(fragment.right());
                    }
                    _ => cells.push(Cell {
                        left: fragment.left,
                        right: fragment.right(),
                        text: fragment.text.trim().to_string(),
                    }),
                }
            }
            Row { top, height, cells }
        })
        .collect()
}

fn build_table(page: u32, run: &[&Row], params: &DetectionParams) -> Option<RawTable> {
    if run.len() < 2 {
        return None;
    }

    let lefts: Vec<f32> = run
        .iter()
        .flat_map(|row| row.cells.iter().map(|cell| cell.left))
        .collect();
    let anchors = cluster_positions(lefts, params.column_tolerance);
    if anchors.len() < 2 {
        return None;
    }

    let cells = run
        .iter()
        .map(|row| {
            let mut line = vec![String::new(); anchors.len()];
            for cell in &row.cells {
                let column = nearest(&anchors, cell.left);
                push_cell_text(&mut line[column], &cell.text);
            }
            line
        })
        .collect();

    Some(RawTable::new(Some(page), cells))
}

fn nearest(anchors: &[f32], value: f32) -> usize {
    anchors
        .iter()
        .enumerate()
        .min_by(|a, b| (a.1 - value).abs().total_cmp(&(b.1 - value).abs()))
        .map(|(index, _)| index)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsift_core::types::TableMethod;

    fn params() -> DetectionParams {
        DetectionParams::for_method(TableMethod::Stream)
    }

    fn word(left: f32, top: f32, text: &str) -> TextBlock {
        TextBlock::new(left, top, text).with_size(text.len() as f32 * 5.0, 10.0)
    }

    #[test]
    fn aligned_rows_form_a_table() {
        let blocks = vec![
            word(72.0, 100.0, "Region"),
            word(200.0, 100.0, "Sales"),
            word(300.0, 100.0, "Growth"),
            word(72.0, 115.0, "North"),
            word(202.0, 115.0, "1200"),
            word(301.0, 115.0, "4%"),
            word(72.0, 130.0, "South"),
            word(199.0, 130.0, "900"),
            word(300.0, 130.0, "-2%"),
        ];
        let tables = detect_page(3, &blocks, &params());

        assert_eq!(tables.len(), 1);
        let table = &tables[0];
        assert_eq!((table.rows(), table.columns()), (3, 3));
        assert_eq!(table.cells[2], vec!["South", "900", "-2%"]);
        assert_eq!(table.page, Some(3));
    }

    #[test]
    fn adjacent_words_merge_into_one_cell() {
        let blocks = vec![
            word(72.0, 100.0, "Unit"),
            word(94.0, 100.0, "price"),
            word(200.0, 100.0, "Total"),
            word(72.0, 115.0, "3.50"),
            word(200.0, 115.0, "7.00"),
        ];
        let tables = detect_page(1, &blocks, &params());
        assert_eq!(tables[0].cells[0], vec!["Unit price", "Total"]);
    }

    #[test]
    fn prose_and_distant_rows_do_not_form_tables() {
        let blocks = vec![
            word(72.0, 100.0, "A single line of body text"),
            word(72.0, 115.0, "followed by another line"),
            word(72.0, 300.0, "Left"),
            word(300.0, 300.0, "Right"),
            word(72.0, 500.0, "Far"),
            word(300.0, 500.0, "Away"),
        ];
        assert!(detect_page(1, &blocks, &params()).is_empty());
    }

    #[test]
    fn gap_row_splits_runs_into_separate_tables() {
        let mut blocks = Vec::new();
        for (i, top) in [100.0, 115.0, 400.0, 415.0].into_iter().enumerate() {
            blocks.push(word(72.0, top, &format!("k{i}")));
            blocks.push(word(250.0, top, &format!("v{i}")));
        }
        let tables = detect_page(1, &blocks, &params());
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[1].cells[0], vec!["k2", "v2"]);
    }
}
