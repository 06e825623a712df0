use crate::analyzer::FileType;
use crate::output::Artifact;
use crate::pattern::PatternId;
use crate::stats::StatsReport;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What kind of filesystem node an [`Entry`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
}

/// Why an entry was left out of the artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExclusionReason {
    Gitignore,
    Custom,
    Binary,
    Unreadable,
}

/// Outcome of classifying one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum EntryStatus {
    Included,
    Excluded {
        reason: ExclusionReason,
        /// Human-readable cause, set for `unreadable` entries.
        #[serde(skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
}

/// One filesystem node observed during traversal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    /// Path relative to the traversal root.
    pub path: PathBuf,
    /// Path used to open the node.
    #[serde(skip)]
    pub absolute: PathBuf,
    pub kind: EntryKind,
    /// True for directories and for symlinks resolving to one.
    pub is_dir: bool,
    /// Size in bytes. For symlinks, the size of the resolved target.
    pub size: u64,
    pub status: EntryStatus,
    /// The pattern that decided this entry, whether it excluded or re-included it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<PatternId>,
    /// Every exclusion pattern that matches an excluded entry on its own; each one
    /// is credited with a hit.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matched_patterns: Vec<PatternId>,
}
impl Entry {
    pub(crate) fn included(
        path: PathBuf,
        absolute: PathBuf,
        kind: EntryKind,
        size: u64,
        pattern: Option<PatternId>,
    ) -> Self {
        Self {
            path,
            absolute,
            kind,
            is_dir: kind == EntryKind::Dir,
            size,
            status: EntryStatus::Included,
            pattern,
            matched_patterns: Vec::new(),
        }
    }
    pub(crate) fn excluded(
        path: PathBuf,
        absolute: PathBuf,
        kind: EntryKind,
        size: u64,
        reason: ExclusionReason,
        pattern: Option<PatternId>,
    ) -> Self {
        Self {
            path,
            absolute,
            kind,
            is_dir: kind == EntryKind::Dir,
            size,
            status: EntryStatus::Excluded {
                reason,
                detail: None,
            },
            pattern,
            matched_patterns: Vec::new(),
        }
    }
    pub(crate) fn unreadable(
        path: PathBuf,
        absolute: PathBuf,
        kind: EntryKind,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            path,
            absolute,
            kind,
            is_dir: kind == EntryKind::Dir,
            size: 0,
            status: EntryStatus::Excluded {
                reason: ExclusionReason::Unreadable,
                detail: Some(detail.into()),
            },
            pattern: None,
            matched_patterns: Vec::new(),
        }
    }
    pub(crate) fn matching(mut self, patterns: Vec<PatternId>) -> Self {
        self.matched_patterns = patterns;
        self
    }
    pub(crate) fn resolving_to_dir(mut self) -> Self {
        self.is_dir = true;
        self
    }
    /// Reclassifies an entry after its content has been inspected.
    pub(crate) fn into_excluded(self, reason: ExclusionReason, detail: Option<String>) -> Self {
        Self {
            status: EntryStatus::Excluded { reason, detail },
            ..self
        }
    }
    pub fn is_included(&self) -> bool {
        matches!(self.status, EntryStatus::Included)
    }
    pub fn exclusion_reason(&self) -> Option<ExclusionReason> {
        match self.status {
            EntryStatus::Included => None,
            EntryStatus::Excluded { reason, .. } => Some(reason),
        }
    }
    /// Files and symlinks to files.
    pub fn is_file_like(&self) -> bool {
        !self.is_dir
    }
}

/// Computed statistics for one included file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: PathBuf,
    pub file_type: FileType,
    pub is_binary: bool,
    pub total_lines: u64,
    pub code_lines: u64,
    pub comment_lines: u64,
    pub blank_lines: u64,
    pub size: u64,
}

/// Shape of one visited directory, as reported after the walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryNode {
    /// Relative path; empty for the root.
    pub path: PathBuf,
    pub depth: usize,
    /// Included files directly inside this directory.
    pub file_count: u64,
    /// Included files anywhere below this directory.
    pub total_file_count: u64,
    pub is_empty: bool,
}

/// The complete result of one concatenation request.
#[derive(Debug, Serialize)]
pub struct ConcatResult {
    pub artifact: Artifact,
    pub report: StatsReport,
    /// Every entry observed, in traversal order.
    pub entries: Vec<Entry>,
}

/// Renders a relative path with `/` separators, `.` for the root.
pub fn display_path(path: &Path) -> String {
    if path.as_os_str().is_empty() {
        return ".".to_string();
    }
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
