// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for docsift.

use thiserror::Error;

use crate::types::ExtractionPhase;

/// Top-level error type for all docsift operations.
#[derive(Debug, Error)]
pub enum DocsiftError {
    // -- Batch errors --
    #[error("input directory not found: {0}")]
    InputDirectoryMissing(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    // -- Document errors --
    #[error("cannot open document {path}: {reason}")]
    DocumentOpen { path: String, reason: String },

    #[error("PDF operation failed: {0}")]
    Pdf(String),

    #[error("image processing failed: {0}")]
    Image(String),

    #[error("table detection failed: {0}")]
    Table(String),

    #[error("document classification failed: {0}")]
    Classification(String),

    // -- Phase errors --
    #[error("{phase} extraction failed: {reason}")]
    PhaseFailed {
        phase: ExtractionPhase,
        reason: String,
    },

    #[error("{phase} extraction timed out after {seconds}s")]
    PhaseTimeout { phase: ExtractionPhase, seconds: u64 },

    // -- Output / persistence --
    #[error("CSV write failed: {0}")]
    Csv(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DocsiftError>;
