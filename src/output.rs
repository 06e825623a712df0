//! Artifact writing and report rendering.
//!
//! The artifact is streamed file by file through [`ConcatWriter`] into a
//! temporary file inside the output directory, and only takes its
//! timestamped name once the request completes.

use crate::StatsReport;
use crate::types::{FileRecord, display_path};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Width of the rule line framing each file header.
pub const RULE_WIDTH: usize = 80;

/// Appends file blocks to any writer, in call order.
pub struct ConcatWriter<W: Write> {
    out: W,
    files_written: usize,
    bytes_written: u64,
}
impl<W: Write> ConcatWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            files_written: 0,
            bytes_written: 0,
        }
    }

    /// Writes one block: rule, `File: <path>`, rule, blank line, content, newline.
    pub fn append(&mut self, record: &FileRecord, content: &str) -> io::Result<()> {
        let rule = "=".repeat(RULE_WIDTH);
        let header = format!("\n{rule}\nFile: {}\n{rule}\n\n", display_path(&record.path));
        self.out.write_all(header.as_bytes())?;
        self.out.write_all(content.as_bytes())?;
        self.out.write_all(b"\n")?;
        self.files_written += 1;
        self.bytes_written += (header.len() + content.len() + 1) as u64;
        Ok(())
    }

    pub fn files_written(&self) -> usize {
        self.files_written
    }
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Flushes and hands back the underlying writer.
    pub fn finish(mut self) -> io::Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

/// A persisted artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub path: PathBuf,
    pub file_name: String,
    pub files_written: usize,
    pub bytes_written: u64,
}

/// The artifact while it is still being written.
///
/// Dropping it without calling [`persist`](Self::persist) deletes the temporary file.
pub struct ArtifactFile {
    dir: PathBuf,
    writer: ConcatWriter<BufWriter<NamedTempFile>>,
}
impl ArtifactFile {
    pub fn create(dir: &Path) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let temp = tempfile::Builder::new()
            .prefix(".output_")
            .suffix(".part")
            .tempfile_in(dir)?;
        tracing::debug!("Writing artifact to {}", temp.path().display());
        Ok(Self {
            dir: dir.to_path_buf(),
            writer: ConcatWriter::new(BufWriter::new(temp)),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn append(&mut self, record: &FileRecord, content: &str) -> io::Result<()> {
        self.writer.append(record, content)
    }

    /// Moves the finished file to `output_<timestamp>.txt`, adding `_<n>` on collision.
    pub fn persist(self) -> io::Result<Artifact> {
        let files_written = self.writer.files_written();
        let bytes_written = self.writer.bytes_written();
        let mut temp = self
            .writer
            .finish()?
            .into_inner()
            .map_err(|e| e.into_error())?;
        let stem = format!("output_{}", chrono::Local::now().format("%Y%m%d_%H%M%S"));
        let mut attempt = 0usize;
        loop {
            let file_name = if attempt == 0 {
                format!("{stem}.txt")
            } else {
                format!("{stem}_{attempt}.txt")
            };
            let path = self.dir.join(&file_name);
            match temp.persist_noclobber(&path) {
                Ok(_) => {
                    return Ok(Artifact {
                        path,
                        file_name,
                        files_written,
                        bytes_written,
                    });
                }
                Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                    temp = e.file;
                    attempt += 1;
                }
                Err(e) => return Err(e.error),
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}

/// Formats a report for display.
pub fn format_report(report: &StatsReport, format: ReportFormat, pretty: bool) -> String {
    match format {
        ReportFormat::Text => format_text(report),
        ReportFormat::Json => format_json(report, pretty),
    }
}

// ----------------------- Internal formatting -----------------------

fn format_text(report: &StatsReport) -> String {
    let files = &report.files;
    let dirs = &report.directories;
    let filters = &report.filters;
    let mut out = String::with_capacity(1024);

    let _ = writeln!(out, "Files:");
    let _ = writeln!(out, "  processed: {} of {}", files.processed_files, files.total_files);
    let _ = writeln!(
        out,
        "  skipped: {} (gitignore {}, custom {}, binary {}, unreadable {})",
        files.skipped_files,
        files.skipped_by_reason.gitignore,
        files.skipped_by_reason.custom,
        files.skipped_by_reason.binary,
        files.skipped_by_reason.unreadable
    );
    let _ = writeln!(out, "  binary placeholders: {}", files.binary_files);
    let _ = writeln!(out, "  total size: {} bytes", files.total_bytes);
    if let Some(largest) = &files.largest_file {
        let _ = writeln!(out, "  largest: {} ({} bytes)", largest.path, largest.size);
    }
    let _ = writeln!(
        out,
        "  lines: {} (code {}, comment {}, blank {})",
        files.total_lines, files.code_lines, files.comment_lines, files.blank_lines
    );
    let _ = writeln!(out, "  average lines per file: {:.2}", files.avg_lines_per_file);
    match files.code_to_comment_ratio {
        Some(ratio) => {
            let _ = writeln!(out, "  code/comment ratio: {:.2}", ratio);
        }
        None => {
            let _ = writeln!(out, "  code/comment ratio: n/a");
        }
    }
    for (file_type, stats) in &files.by_type {
        let _ = writeln!(out, "  {:<12} {:>6} files {:>8} lines", file_type, stats.files, stats.lines);
    }

    let _ = writeln!(out, "\nDirectories:");
    let _ = writeln!(out, "  total: {}", dirs.total_dirs);
    let _ = writeln!(out, "  max depth: {}", dirs.max_depth);
    let _ = writeln!(out, "  empty: {}", dirs.empty_dirs);
    if let Some(busiest) = &dirs.busiest_dir {
        let _ = writeln!(out, "  most files: {} ({})", busiest.path, busiest.files);
    }

    let _ = writeln!(out, "\nFilters:");
    let _ = writeln!(out, "  gitignore: {}", filters.gitignore_filtered);
    let _ = writeln!(out, "  custom: {}", filters.custom_filtered);
    for hit in filters.most_effective(5) {
        let _ = writeln!(out, "  {:>6}  {} ({:?}, {})", hit.hits, hit.pattern, hit.origin, hit.scope);
    }
    for warning in &filters.warnings {
        let _ = writeln!(out, "  warning: skipped pattern '{}': {}", warning.pattern, warning.message);
    }

    let _ = writeln!(out, "\nTree:\n{}", dirs.tree);
    out
}

fn format_json(report: &StatsReport, pretty: bool) -> String {
    let result = if pretty {
        serde_json::to_string_pretty(report)
    } else {
        serde_json::to_string(report)
    };
    result.unwrap_or_else(|e| format!("{{\"error\":\"report serialization failed: {e}\"}}"))
}
