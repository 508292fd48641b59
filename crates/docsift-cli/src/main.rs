// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docsift: extract images, tables and reading-order text from every PDF in a
// directory.
//
// Entry point. Parses arguments, initialises logging, resolves the
// configuration and runs one batch.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use docsift_core::config::ExtractionConfig;
use docsift_core::error::Result;
use docsift_document::pdf_collaborators;
use docsift_extract::{BatchScheduler, block_on_batch};

#[derive(Debug, Parser)]
#[command(
    name = "docsift",
    version,
    about = "Concurrent batch extraction of images, tables and text from PDFs",
    after_help = "EXAMPLES:\n  \
                  docsift data/test_pdfs data/pdf_output\n  \
                  docsift scans/ out/ --concurrency 6 --layout\n  \
                  docsift in/ out/ --config docsift.json --verbose"
)]
struct Cli {
    /// Directory containing the documents to process (not searched recursively)
    #[arg(default_value = "data/test_pdfs")]
    input_dir: PathBuf,

    /// Root directory for per-document output and the batch summary
    #[arg(default_value = "data/pdf_output")]
    output_dir: PathBuf,

    /// Maximum number of documents processed at once
    #[arg(short, long)]
    concurrency: Option<usize>,

    /// JSON configuration file; flags given here override it
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Also write column-delimited layout text
    #[arg(long)]
    layout: bool,

    /// Per-phase timeout in seconds
    #[arg(long, value_name = "SECS")]
    phase_timeout: Option<u64>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Config file (or defaults) with command-line overrides applied.
    fn resolve_config(&self) -> Result<ExtractionConfig> {
        let mut config = match &self.config {
            Some(path) => ExtractionConfig::from_file(path)?,
            None => ExtractionConfig::default(),
        };
        if let Some(limit) = self.concurrency {
            config.concurrency_limit = limit;
        }
        if self.layout {
            config.layout_text = true;
        }
        if let Some(secs) = self.phase_timeout {
            config.phase_timeout_secs = Some(secs);
        }
        config.validate()?;
        Ok(config)
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match cli.resolve_config() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    info!(
        input = %cli.input_dir.display(),
        output = %cli.output_dir.display(),
        concurrency = config.concurrency_limit,
        "docsift starting"
    );

    let scheduler = BatchScheduler::new(pdf_collaborators(), config);
    let outcome = block_on_batch(scheduler.run(&cli.input_dir, &cli.output_dir))
        .and_then(|batch| batch);
    match outcome {
        Ok(report) => {
            info!(
                processed = report.processed_count,
                total = report.total_documents,
                elapsed_secs = report.elapsed.as_secs_f64(),
                "docsift finished"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "Batch aborted");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use docsift_core::error::DocsiftError;

    #[test]
    fn positional_defaults() {
        let cli = Cli::try_parse_from(["docsift"]).expect("parse");
        assert_eq!(cli.input_dir, PathBuf::from("data/test_pdfs"));
        assert_eq!(cli.output_dir, PathBuf::from("data/pdf_output"));

        let config = cli.resolve_config().expect("config");
        assert_eq!(config, ExtractionConfig::default());
    }

    #[test]
    fn flags_override_the_config_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{ "concurrency_limit": 8, "min_image_size": 120 }}"#).expect("write");
        let path = file.path().to_string_lossy().into_owned();

        let cli = Cli::try_parse_from([
            "docsift",
            "in",
            "out",
            "--config",
            path.as_str(),
            "--concurrency",
            "2",
            "--layout",
        ])
        .expect("parse");
        let config = cli.resolve_config().expect("config");

        assert_eq!(config.concurrency_limit, 2);
        assert_eq!(config.min_image_size, 120);
        assert!(config.layout_text);
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let cli = Cli::try_parse_from(["docsift", "--concurrency", "0"]).expect("parse");
        assert!(matches!(cli.resolve_config(), Err(DocsiftError::Config(_))));
    }
}
