// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docsift-extract: the extraction core. Bounded batch scheduling, the
// per-document pipeline with failure-isolated phases, scanned/digital
// classification, table strategy selection and reading-order text
// reconstruction.

pub mod batch;
pub mod classify;
pub mod phases;
pub mod pipeline;
pub mod reconstruct;
pub mod report;
pub mod strategy;
pub mod summary;

pub use batch::{BatchScheduler, block_on_batch, discover_documents, run};
pub use classify::DocumentTypeClassifier;
pub use pipeline::DocumentPipeline;
pub use reconstruct::{PageText, reconstruct_page};
pub use strategy::{TableLimits, select_table_strategy};
pub use summary::SummaryLog;
