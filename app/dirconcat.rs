//! Command-line interface for dirconcat.
//!
//! Runs one concatenation request over a directory, prints where the artifact
//! was written and then the statistics report.

use clap::{Parser, ValueEnum};
use dirconcat::{
    BinaryDetection, BinaryPolicy, CancellationToken, ConcatBuilder, ConcatOptions, DirconcatError,
    ReportFormat, concatenate_with_cancel, format_report,
};
use std::path::PathBuf;
use std::process::exit;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// dirconcat: concatenate a directory tree into one file, with statistics
#[derive(Parser)]
#[command(name = "dirconcat", version, about, long_about = None)]
struct Cli {
    /// Root directory (default current dir)
    #[arg(default_value = ".")]
    root: PathBuf,

    /// Extra ignore patterns in .gitignore syntax (can be repeated, later ones win)
    #[arg(short = 'I', long = "ignore")]
    ignore_patterns: Vec<String>,

    /// Directory the artifact is written to
    #[arg(short, long, default_value = "output")]
    output_dir: PathBuf,

    /// Report format
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Pretty JSON
    #[arg(short, long)]
    pretty: bool,

    /// Binary detection strategy
    #[arg(long, default_value = "accurate", value_parser = parse_binary_detection)]
    binary_detection: BinaryDetection,

    /// Leave binary files out instead of writing a placeholder
    #[arg(long)]
    skip_binary: bool,

    /// Max depth (unlimited if not set)
    #[arg(long)]
    max_depth: Option<usize>,

    /// Include hidden files
    #[arg(long)]
    hidden: bool,

    /// Disable .gitignore handling
    #[arg(long)]
    no_gitignore: bool,

    /// Only read the root .gitignore
    #[arg(long)]
    no_nested_gitignore: bool,

    /// Maximum number of concurrent file reads
    #[arg(short, long, default_value_t = 8)]
    jobs: usize,

    /// Per-file read timeout in milliseconds
    #[arg(long, default_value_t = 10_000)]
    timeout_ms: u64,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

/// Parse string into BinaryDetection enum.
fn parse_binary_detection(s: &str) -> Result<BinaryDetection, String> {
    match s {
        "simple" => Ok(BinaryDetection::Simple),
        "accurate" => Ok(BinaryDetection::Accurate),
        "none" => Ok(BinaryDetection::None),
        _ => Err(format!("invalid binary detection method: {}", s)),
    }
}

impl Cli {
    fn into_options(self) -> (ConcatOptions, ReportFormat, bool) {
        let policy = if self.skip_binary {
            BinaryPolicy::Skip
        } else {
            BinaryPolicy::Placeholder
        };
        let mut builder = ConcatBuilder::new(self.root)
            .output_dir(self.output_dir)
            .respect_gitignore(!self.no_gitignore)
            .nested_gitignore(!self.no_nested_gitignore)
            .include_hidden(self.hidden)
            .ignore_patterns(self.ignore_patterns)
            .binary_detection(self.binary_detection)
            .binary_policy(policy)
            .max_concurrency(self.jobs)
            .read_timeout(Duration::from_millis(self.timeout_ms));

        builder = if let Some(depth) = self.max_depth {
            builder.max_depth(depth)
        } else {
            builder.no_limit_depth()
        };

        let format = match self.format {
            Format::Text => ReportFormat::Text,
            Format::Json => ReportFormat::Json,
        };
        (builder.build(), format, self.pretty)
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let (options, format, pretty) = cli.into_options();

    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_token.cancel()) {
        tracing::warn!("Could not install Ctrl-C handler: {}", e);
    }

    match concatenate_with_cancel(options, &cancel) {
        Ok(result) => {
            println!("Artifact: {}", result.artifact.path.display());
            println!("{}", format_report(&result.report, format, pretty));
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            if let Some(report) = e.partial_report() {
                eprintln!("{}", format_report(report, format, pretty));
            }
            if matches!(e, DirconcatError::Cancelled) {
                exit(130);
            }
            exit(1);
        }
    }
}
