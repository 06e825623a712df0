//! # Dirconcat
//!
//! `dirconcat` walks a directory tree, filters entries with `.gitignore` rules and
//! caller-supplied glob patterns, concatenates the surviving files into one
//! timestamped artifact and reports aggregate statistics about the run: file,
//! line and comment counts, the type distribution, the shape of the directory
//! tree and how effective each pattern was.
//!
//! Every request is independent. [`concatenate`] builds its own pattern matcher,
//! walker, reader pool and accumulator from the [`ConcatOptions`] it receives, so
//! concurrent requests share no mutable state.
//!
//! # Guarantees
//!
//! - Traversal is depth-first with entries sorted by name, and the artifact and
//!   report follow that order even though reads run in parallel.
//! - A directory excluded by a pattern is never descended into.
//! - Per-entry failures (permissions, timeouts, undecodable text, symlink cycles)
//!   become excluded entries with reason `unreadable` and never abort the run.
//! - For every analyzed file, `total_lines == code_lines + comment_lines + blank_lines`.
//!
//! # Example
//!
//! ```no_run
//! use dirconcat::{ConcatBuilder, concatenate};
//!
//! let options = ConcatBuilder::new(".")
//!     .ignore_patterns(vec!["*.log".into(), "!keep.log".into()])
//!     .output_dir("output")
//!     .max_concurrency(4)
//!     .build();
//!
//! let result = concatenate(options).expect("Failed to concatenate directory");
//!
//! println!("Artifact: {}", result.artifact.path.display());
//! println!("Processed {} files", result.report.files.processed_files);
//! for hit in result.report.filters.most_effective(5) {
//!     println!("{} matched {} entries", hit.pattern, hit.hits);
//! }
//! ```

mod analyzer;
mod cancel;
mod engine;
mod error;
mod options;
pub mod output;
mod pattern;
mod stats;
mod tree;
mod types;
mod walker;

pub use analyzer::{
    Analysis, BINARY_PLACEHOLDER, CommentSyntax, Content, FileType, LineCounts, SAMPLE_SIZE, analyze,
    classify, count_lines, is_binary_sample,
};
pub use cancel::CancellationToken;
pub use engine::{concatenate, concatenate_with_cancel};
pub use error::{DirconcatError, ReadError};
pub use options::{BinaryDetection, BinaryPolicy, ConcatBuilder, ConcatOptions};
pub use output::{Artifact, ConcatWriter, ReportFormat, format_report};
pub use pattern::{Matcher, Pattern, PatternId, PatternOrigin, PatternWarning, Verdict, load_gitignore};
pub use stats::{
    DirectoryCount, DirectoryStats, FileStats, FilterStats, LargestFile, PatternHit, SkipCounts,
    StatsAccumulator, StatsReport, TypeStats,
};
pub use types::{
    ConcatResult, DirectoryNode, Entry, EntryKind, EntryStatus, ExclusionReason, FileRecord, display_path,
};
pub use walker::{TreeWalker, WalkEvent};
