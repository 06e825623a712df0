//! Aggregate statistics for one traversal.
//!
//! [`StatsAccumulator`] is fed in traversal order and consumed by
//! [`StatsAccumulator::finalize`], which yields the immutable [`StatsReport`].

use crate::analyzer::FileType;
use crate::pattern::{Pattern, PatternId, PatternOrigin, PatternWarning};
use crate::tree::render_tree;
use crate::types::{DirectoryNode, Entry, ExclusionReason, FileRecord, display_path};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsReport {
    pub files: FileStats,
    pub directories: DirectoryStats,
    pub filters: FilterStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileStats {
    /// Files and file symlinks seen, included or not.
    pub total_files: u64,
    pub processed_files: u64,
    /// Excluded entries of any kind, pruned directories included.
    pub skipped_files: u64,
    pub skipped_by_reason: SkipCounts,
    /// Included files whose content was replaced by a placeholder.
    pub binary_files: u64,
    pub total_bytes: u64,
    pub largest_file: Option<LargestFile>,
    pub total_lines: u64,
    pub code_lines: u64,
    pub comment_lines: u64,
    pub blank_lines: u64,
    pub avg_lines_per_file: f64,
    /// `None` when no comment lines were seen.
    pub code_to_comment_ratio: Option<f64>,
    pub by_type: BTreeMap<FileType, TypeStats>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipCounts {
    pub gitignore: u64,
    pub custom: u64,
    pub binary: u64,
    pub unreadable: u64,
}
impl SkipCounts {
    pub fn get(&self, reason: ExclusionReason) -> u64 {
        match reason {
            ExclusionReason::Gitignore => self.gitignore,
            ExclusionReason::Custom => self.custom,
            ExclusionReason::Binary => self.binary,
            ExclusionReason::Unreadable => self.unreadable,
        }
    }
    fn add(&mut self, reason: ExclusionReason) {
        match reason {
            ExclusionReason::Gitignore => self.gitignore += 1,
            ExclusionReason::Custom => self.custom += 1,
            ExclusionReason::Binary => self.binary += 1,
            ExclusionReason::Unreadable => self.unreadable += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeStats {
    pub files: u64,
    pub lines: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LargestFile {
    pub path: String,
    pub size: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectoryStats {
    /// Visited directories, the root included.
    pub total_dirs: u64,
    pub max_depth: usize,
    /// Directories with no included file anywhere below them.
    pub empty_dirs: u64,
    /// Directory with the most direct included files; ties go to the smallest path.
    pub busiest_dir: Option<DirectoryCount>,
    pub nodes: Vec<DirectoryNode>,
    pub tree: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryCount {
    pub path: String,
    pub files: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterStats {
    pub gitignore_filtered: u64,
    pub custom_filtered: u64,
    /// Every compiled pattern, most hits first, then declaration order.
    pub pattern_hits: Vec<PatternHit>,
    pub warnings: Vec<PatternWarning>,
}
impl FilterStats {
    /// The `n` highest-ranked patterns that matched at least once.
    pub fn most_effective(&self, n: usize) -> Vec<&PatternHit> {
        self.pattern_hits.iter().filter(|h| h.hits > 0).take(n).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternHit {
    pub id: PatternId,
    pub pattern: String,
    pub origin: PatternOrigin,
    /// Directory the pattern applies to; `.` for the root.
    pub scope: String,
    /// Excluded entries this pattern matched. Re-include patterns stay at 0.
    pub hits: u64,
}

#[derive(Debug, Default)]
pub struct StatsAccumulator {
    files: FileStats,
    gitignore_filtered: u64,
    custom_filtered: u64,
    hits: HashMap<PatternId, u64>,
    directories: Vec<(PathBuf, usize)>,
    included: Vec<PathBuf>,
}
impl StatsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe_directory(&mut self, path: &Path, depth: usize) {
        self.directories.push((path.to_path_buf(), depth));
    }

    pub fn observe_entry(&mut self, entry: &Entry) {
        if entry.is_file_like() {
            self.files.total_files += 1;
        }
        for id in &entry.matched_patterns {
            *self.hits.entry(*id).or_default() += 1;
        }
        let Some(reason) = entry.exclusion_reason() else {
            return;
        };
        self.files.skipped_files += 1;
        self.files.skipped_by_reason.add(reason);
        match reason {
            ExclusionReason::Gitignore => self.gitignore_filtered += 1,
            ExclusionReason::Custom => self.custom_filtered += 1,
            ExclusionReason::Binary | ExclusionReason::Unreadable => {}
        }
    }

    pub fn observe_file(&mut self, record: &FileRecord) {
        let files = &mut self.files;
        files.processed_files += 1;
        if record.is_binary {
            files.binary_files += 1;
        }
        files.total_bytes += record.size;
        if files.largest_file.as_ref().is_none_or(|l| record.size > l.size) {
            files.largest_file = Some(LargestFile {
                path: display_path(&record.path),
                size: record.size,
            });
        }
        files.total_lines += record.total_lines;
        files.code_lines += record.code_lines;
        files.comment_lines += record.comment_lines;
        files.blank_lines += record.blank_lines;
        let by_type = files.by_type.entry(record.file_type).or_default();
        by_type.files += 1;
        by_type.lines += record.total_lines;
        self.included.push(record.path.clone());
    }

    pub fn finalize(self, patterns: &[Pattern], warnings: &[PatternWarning]) -> StatsReport {
        let mut files = self.files;
        if files.processed_files > 0 {
            files.avg_lines_per_file = round2(files.total_lines as f64 / files.processed_files as f64);
        }
        if files.comment_lines > 0 {
            files.code_to_comment_ratio = Some(round2(files.code_lines as f64 / files.comment_lines as f64));
        }

        let nodes = directory_nodes(&self.directories, &self.included);
        let busiest_dir = nodes
            .iter()
            .filter(|n| n.file_count > 0)
            .map(|n| (n.file_count, display_path(&n.path)))
            .min_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)))
            .map(|(files, path)| DirectoryCount { path, files });
        let directories = DirectoryStats {
            total_dirs: nodes.len() as u64,
            max_depth: nodes.iter().map(|n| n.depth).max().unwrap_or(0),
            empty_dirs: nodes.iter().filter(|n| n.is_empty).count() as u64,
            busiest_dir,
            tree: render_tree(&nodes, &self.included),
            nodes,
        };

        let mut pattern_hits: Vec<PatternHit> = patterns
            .iter()
            .map(|p| PatternHit {
                id: p.id,
                pattern: p.text.clone(),
                origin: p.origin,
                scope: display_path(&p.scope),
                hits: self.hits.get(&p.id).copied().unwrap_or(0),
            })
            .collect();
        pattern_hits.sort_by(|a, b| b.hits.cmp(&a.hits).then(a.id.cmp(&b.id)));

        StatsReport {
            files,
            directories,
            filters: FilterStats {
                gitignore_filtered: self.gitignore_filtered,
                custom_filtered: self.custom_filtered,
                pattern_hits,
                warnings: warnings.to_vec(),
            },
        }
    }
}

fn directory_nodes(directories: &[(PathBuf, usize)], included: &[PathBuf]) -> Vec<DirectoryNode> {
    let mut direct: HashMap<&Path, u64> = HashMap::new();
    let mut below: HashMap<&Path, u64> = HashMap::new();
    for file in included {
        let mut ancestors = file.ancestors().skip(1);
        if let Some(parent) = ancestors.next() {
            *direct.entry(parent).or_default() += 1;
            *below.entry(parent).or_default() += 1;
        }
        for ancestor in ancestors {
            *below.entry(ancestor).or_default() += 1;
        }
    }
    directories
        .iter()
        .map(|(path, depth)| {
            let total = below.get(path.as_path()).copied().unwrap_or(0);
            DirectoryNode {
                path: path.clone(),
                depth: *depth,
                file_count: direct.get(path.as_path()).copied().unwrap_or(0),
                total_file_count: total,
                is_empty: total == 0,
            }
        })
        .collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
