// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docsift-core: core types, errors, configuration and the collaborator contracts
// shared across all crates.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::ExtractionConfig;
pub use error::DocsiftError;
pub use types::*;
