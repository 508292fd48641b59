// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Lattice detection: ruled tables.
//
// Horizontal and vertical ruling lines that touch are joined into connected
// components. Each component with at least two lines in each direction is a
// grid whose distinct line positions are the row and column boundaries. Text
// fragments are placed in the cell that contains their centre point.

use docsift_core::types::{DetectionParams, LineOrientation, RawTable, RulingLine, TextBlock};

use super::{band_index, cluster_positions, push_cell_text};

/// Detect ruled tables on one page.
pub fn detect_page(
    page: u32,
    lines: &[RulingLine],
    blocks: &[TextBlock],
    params: &DetectionParams,
) -> Vec<RawTable> {
    let tolerance = params.line_tolerance;
    let (horizontal, vertical): (Vec<RulingLine>, Vec<RulingLine>) = lines
        .iter()
        .copied()
        .partition(|line| line.orientation == LineOrientation::Horizontal);
    if horizontal.len() < 2 || vertical.len() < 2 {
        return Vec::new();
    }

    // Indices 0..h are horizontal lines, h.. are vertical ones.
    let h = horizontal.len();
    let mut sets = DisjointSet::new(h + vertical.len());
    for (i, hl) in horizontal.iter().enumerate() {
        for (j, vl) in vertical.iter().enumerate() {
            if touches(hl, vl, tolerance) {
                sets.union(i, h + j);
            }
        }
    }

    let mut grids: Vec<(Vec<f32>, Vec<f32>)> = Vec::new();
    for root in sets.roots() {
        let ys: Vec<f32> = (0..h)
            .filter(|&i| sets.find(i) == root)
            .map(|i| horizontal[i].position)
            .collect();
        let xs: Vec<f32> = (0..vertical.len())
            .filter(|&j| sets.find(h + j) == root)
            .map(|j| vertical[j].position)
            .collect();

        let ys = cluster_positions(ys, tolerance);
        let xs = cluster_positions(xs, tolerance);
        if ys.len() >= 2 && xs.len() >= 2 {
            grids.push((ys, xs));
        }
    }

    // Reading order: top to bottom, then left to right.
    grids.sort_by(|a, b| a.0[0].total_cmp(&b.0[0]).then(a.1[0].total_cmp(&b.1[0])));

    grids
        .into_iter()
        .map(|(ys, xs)| fill_grid(page, &ys, &xs, blocks))
        .collect()
}

fn touches(horizontal: &RulingLine, vertical: &RulingLine, tolerance: f32) -> bool {
    vertical.position >= horizontal.start - tolerance
        && vertical.position <= horizontal.end + tolerance
        && horizontal.position >= vertical.start - tolerance
        && horizontal.position <= vertical.end + tolerance
}

fn fill_grid(page: u32, ys: &[f32], xs: &[f32], blocks: &[TextBlock]) -> RawTable {
    let mut cells = vec![vec![String::new(); xs.len() - 1]; ys.len() - 1];

    let mut placed: Vec<&TextBlock> = blocks.iter().filter(|b| !b.is_blank()).collect();
    placed.sort_by(|a, b| a.top.total_cmp(&b.top).then(a.left.total_cmp(&b.left)));

    for block in placed {
        let (cx, cy) = block.center();
        if let (Some(row), Some(col)) = (band_index(ys, cy), band_index(xs, cx)) {
            push_cell_text(&mut cells[row][col], &block.text);
        }
    }

    RawTable::new(Some(page), cells)
}

/// Union-find over line indices.
struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    fn find(&self, mut i: usize) -> usize {
        while self.parent[i] != i {
            i = self.parent[i];
        }
        i
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[rb] = ra;
        }
    }

    fn roots(&self) -> Vec<usize> {
        let mut roots: Vec<usize> = (0..self.parent.len()).map(|i| self.find(i)).collect();
        roots.sort_unstable();
        roots.dedup();
        roots
    }
}
