//! Per-request configuration.
//!
//! A [`ConcatOptions`] value is the only input of a run; nothing is read from
//! process-wide state.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
/// How the first [`SAMPLE_SIZE`](crate::SAMPLE_SIZE) bytes of a file decide whether it is binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryDetection {
    /// Any null byte.
    Simple,
    /// content_inspector plus UTF-8 validity of the sample.
    Accurate,
    /// Never binary; invalid UTF-8 is replaced on decode.
    None,
}
/// What happens to a file once it is found to be binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryPolicy {
    /// Keep it, writing a placeholder instead of its content.
    Placeholder,
    /// Exclude it with reason `binary`.
    Skip,
}
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcatOptions {
    /// Directory to walk. An empty path means the working directory.
    pub root: PathBuf,
    /// Where the artifact is written. Skipped if it lies inside `root`.
    pub output_dir: PathBuf,
    /// Read `<root>/.gitignore`.
    pub respect_gitignore: bool,
    /// Also read `.gitignore` files of visited subdirectories. Needs `respect_gitignore`.
    pub nested_gitignore: bool,
    pub max_depth: Option<usize>,
    /// Visit dot-entries. Off by default, and skipped dot-entries are not counted.
    pub include_hidden: bool,
    /// Caller patterns in gitignore syntax, evaluated after all gitignore patterns.
    pub ignore_patterns: Vec<String>,
    pub binary_detection: BinaryDetection,
    pub binary_policy: BinaryPolicy,
    /// Upper bound on file reads in flight.
    pub max_concurrency: usize,
    /// Deadline for one file read, counted from when it is dispatched.
    pub read_timeout: Duration,
}
impl Default for ConcatOptions {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            output_dir: PathBuf::from("output"),
            respect_gitignore: true,
            nested_gitignore: true,
            max_depth: None,
            include_hidden: false,
            ignore_patterns: Vec::new(),
            binary_detection: BinaryDetection::Accurate,
            binary_policy: BinaryPolicy::Placeholder,
            max_concurrency: 8,
            read_timeout: Duration::from_secs(10),
        }
    }
}
/// Fluent construction of [`ConcatOptions`].
#[derive(Debug, Default)]
pub struct ConcatBuilder {
    options: ConcatOptions,
}
impl ConcatBuilder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            options: ConcatOptions {
                root: root.into(),
                ..Default::default()
            },
        }
    }
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.options.output_dir = dir.into();
        self
    }
    pub fn respect_gitignore(mut self, yes: bool) -> Self {
        self.options.respect_gitignore = yes;
        self
    }
    pub fn nested_gitignore(mut self, yes: bool) -> Self {
        self.options.nested_gitignore = yes;
        self
    }
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.options.max_depth = Some(depth);
        self
    }
    pub fn no_limit_depth(mut self) -> Self {
        self.options.max_depth = None;
        self
    }
    pub fn include_hidden(mut self, yes: bool) -> Self {
        self.options.include_hidden = yes;
        self
    }
    pub fn ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.options.ignore_patterns = patterns;
        self
    }
    pub fn binary_detection(mut self, method: BinaryDetection) -> Self {
        self.options.binary_detection = method;
        self
    }
    pub fn binary_policy(mut self, policy: BinaryPolicy) -> Self {
        self.options.binary_policy = policy;
        self
    }
    /// Clamped to at least 1.
    pub fn max_concurrency(mut self, limit: usize) -> Self {
        self.options.max_concurrency = limit.max(1);
        self
    }
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.options.read_timeout = timeout;
        self
    }
    pub fn build(self) -> ConcatOptions {
        self.options
    }
}
