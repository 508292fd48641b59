// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Table strategy selection.
//
// The classification picks an ordered plan of detection passes. Passes run in
// order until one yields at least one table that satisfies the size and
// non-blank limits; later passes are then skipped.

use tracing::{debug, warn};

use docsift_core::config::ExtractionConfig;
use docsift_core::error::Result;
use docsift_core::traits::{DocumentHandle, TableDetector};
use docsift_core::types::{DetectionParams, RawTable, TableMethod};

/// Page attributed to tables the detector could not place.
const DEFAULT_PAGE: u32 = 1;

/// Minimum table shape. Anything smaller, or entirely blank, is not a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableLimits {
    pub min_rows: usize,
    pub min_cols: usize,
}

impl Default for TableLimits {
    fn default() -> Self {
        Self {
            min_rows: 2,
            min_cols: 2,
        }
    }
}

impl TableLimits {
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            min_rows: config.min_table_rows,
            min_cols: config.min_table_cols,
        }
    }

    pub fn admits(&self, table: &RawTable) -> bool {
        table.rows() >= self.min_rows && table.columns() >= self.min_cols && !table.is_blank()
    }
}

/// A table that passed the limits, with its page resolved and rows padded to
/// a rectangle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedTable {
    pub page: u32,
    pub cells: Vec<Vec<String>>,
    pub rows: usize,
    pub columns: usize,
}

impl QualifiedTable {
    fn from_raw(table: RawTable) -> Self {
        let columns = table.columns();
        let rows = table.rows();
        let cells = table
            .cells
            .into_iter()
            .map(|mut row| {
                row.resize(columns, String::new());
                row
            })
            .collect();
        Self {
            page: table.page.filter(|&p| p > 0).unwrap_or(DEFAULT_PAGE),
            cells,
            rows,
            columns,
        }
    }
}

/// One detection pass and the predicate its results must satisfy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrategyPass {
    pub params: DetectionParams,
    pub limits: TableLimits,
}

/// The methods to try for a document, in order.
pub fn select_table_strategy(is_scanned: bool) -> Vec<TableMethod> {
    if is_scanned {
        vec![TableMethod::Scanned]
    } else {
        vec![TableMethod::Lattice, TableMethod::Stream]
    }
}

/// Build the full plan for a classification decision.
pub fn plan_for(is_scanned: bool, limits: TableLimits) -> Vec<StrategyPass> {
    select_table_strategy(is_scanned)
        .into_iter()
        .map(|method| StrategyPass {
            params: DetectionParams::for_method(method),
            limits,
        })
        .collect()
}

/// Result of running a plan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanOutcome {
    /// The pass that produced `tables`; `None` when every pass came up empty.
    pub method: Option<TableMethod>,
    pub tables: Vec<QualifiedTable>,
}

/// Run `plan` against `document`, stopping at the first pass with qualifying
/// tables. A failing pass is logged and the next one tried; the error is
/// returned only when every pass failed.
pub fn run_plan(
    plan: &[StrategyPass],
    detector: &dyn TableDetector,
    document: &dyn DocumentHandle,
) -> Result<PlanOutcome> {
    let mut last_error = None;
    let mut any_succeeded = false;

    for pass in plan {
        let method = pass.params.method;
        match detector.detect(document, &pass.params) {
            Ok(raw) => {
                any_succeeded = true;
                let detected = raw.len();
                let tables: Vec<QualifiedTable> = raw
                    .into_iter()
                    .filter(|table| pass.limits.admits(table))
                    .map(QualifiedTable::from_raw)
                    .collect();
                debug!(%method, detected, qualifying = tables.len(), "Detection pass finished");
                if !tables.is_empty() {
                    return Ok(PlanOutcome {
                        method: Some(method),
                        tables,
                    });
                }
            }
            Err(err) => {
                warn!(%method, error = %err, "Detection pass failed, trying next");
                last_error = Some(err);
            }
        }
    }

    match last_error {
        Some(err) if !any_succeeded => Err(err),
        _ => Ok(PlanOutcome::default()),
    }
}
