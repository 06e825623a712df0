use crate::stats::StatsReport;
use std::path::PathBuf;
use thiserror::Error;
/// Fatal errors of a single concatenation request.
///
/// Per-entry failures never show up here: they are recorded as excluded
/// [`Entry`](crate::Entry) values with reason `unreadable`.
#[derive(Debug, Error)]
pub enum DirconcatError {
    #[error("invalid root {path}: {reason}")]
    InvalidRoot { path: PathBuf, reason: String },
    #[error("failed to write artifact {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
        /// Statistics for everything observed before the failure.
        partial: Option<Box<StatsReport>>,
    },
    #[error("request cancelled")]
    Cancelled,
    #[error("failed to start reader pool: {0}")]
    Pool(String),
}
impl DirconcatError {
    pub(crate) fn invalid_root(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        DirconcatError::InvalidRoot {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DirconcatError::Write {
            path: path.into(),
            source,
            partial: None,
        }
    }
    /// The statistics accumulated up to a write failure, if any.
    pub fn partial_report(&self) -> Option<&StatsReport> {
        match self {
            DirconcatError::Write { partial, .. } => partial.as_deref(),
            _ => None,
        }
    }
}
/// Failure to turn one file into a [`FileRecord`](crate::FileRecord).
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{path} is not valid UTF-8 text")]
    Decode { path: PathBuf },
}
impl ReadError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ReadError::Io {
            path: path.into(),
            source,
        }
    }
}
