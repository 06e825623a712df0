//! Per-file analysis: type classification, binary detection and line counts.
//!
//! Comment detection is a line-oriented heuristic. A non-blank line counts as a
//! comment when, after trimming, it starts with one of the type's line markers,
//! opens one of its block comments, or sits inside an open block comment.
//! Types without a marker table never report comments.
//!
//! | Type(s)                                                           | Line markers | Blocks               |
//! |-------------------------------------------------------------------|--------------|----------------------|
//! | Rust, JavaScript, TypeScript, Java, C, C++, C#, Go, Swift, Kotlin | `//`         | `/* */`              |
//! | PHP                                                               | `//`, `#`    | `/* */`              |
//! | Python                                                            | `#`          | `""" """`, `''' '''` |
//! | Ruby                                                              | `#`          | `=begin =end`        |
//! | Shell, YAML, TOML, Makefile, Dockerfile                           | `#`          |                      |
//! | SQL                                                               | `--`         | `/* */`              |
//! | CSS                                                               |              | `/* */`              |
//! | HTML, XML, Markdown                                               |              | `<!-- -->`           |
//! | JSON, Text, Other                                                 |              |                      |

use crate::error::ReadError;
use crate::options::BinaryDetection;
use crate::types::FileRecord;
use content_inspector::ContentType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

/// Bytes sampled from the head of a file for binary detection and sniffing.
pub const SAMPLE_SIZE: usize = 8 * 1024;

/// Placeholder written to the artifact in place of binary content.
pub const BINARY_PLACEHOLDER: &str = "[Binary file, content omitted]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Python,
    Rust,
    JavaScript,
    TypeScript,
    Java,
    C,
    Cpp,
    CSharp,
    Go,
    Ruby,
    Php,
    Swift,
    Kotlin,
    Shell,
    Html,
    Css,
    Sql,
    Markdown,
    Json,
    Yaml,
    Toml,
    Xml,
    Makefile,
    Dockerfile,
    Text,
    Other,
}
impl FileType {
    pub fn as_str(self) -> &'static str {
        match self {
            FileType::Python => "python",
            FileType::Rust => "rust",
            FileType::JavaScript => "javascript",
            FileType::TypeScript => "typescript",
            FileType::Java => "java",
            FileType::C => "c",
            FileType::Cpp => "cpp",
            FileType::CSharp => "csharp",
            FileType::Go => "go",
            FileType::Ruby => "ruby",
            FileType::Php => "php",
            FileType::Swift => "swift",
            FileType::Kotlin => "kotlin",
            FileType::Shell => "shell",
            FileType::Html => "html",
            FileType::Css => "css",
            FileType::Sql => "sql",
            FileType::Markdown => "markdown",
            FileType::Json => "json",
            FileType::Yaml => "yaml",
            FileType::Toml => "toml",
            FileType::Xml => "xml",
            FileType::Makefile => "makefile",
            FileType::Dockerfile => "dockerfile",
            FileType::Text => "text",
            FileType::Other => "other",
        }
    }

    pub fn comment_syntax(self) -> CommentSyntax {
        const C_BLOCK: &[(&str, &str)] = &[("/*", "*/")];
        const MARKUP_BLOCK: &[(&str, &str)] = &[("<!--", "-->")];
        match self {
            FileType::Rust
            | FileType::JavaScript
            | FileType::TypeScript
            | FileType::Java
            | FileType::C
            | FileType::Cpp
            | FileType::CSharp
            | FileType::Go
            | FileType::Swift
            | FileType::Kotlin => CommentSyntax::new(&["//"], C_BLOCK),
            FileType::Php => CommentSyntax::new(&["//", "#"], C_BLOCK),
            FileType::Python => CommentSyntax::new(&["#"], &[("\"\"\"", "\"\"\""), ("'''", "'''")]),
            FileType::Ruby => CommentSyntax::new(&["#"], &[("=begin", "=end")]),
            FileType::Shell
            | FileType::Yaml
            | FileType::Toml
            | FileType::Makefile
            | FileType::Dockerfile => CommentSyntax::new(&["#"], &[]),
            FileType::Sql => CommentSyntax::new(&["--"], C_BLOCK),
            FileType::Css => CommentSyntax::new(&[], C_BLOCK),
            FileType::Html | FileType::Xml | FileType::Markdown => CommentSyntax::new(&[], MARKUP_BLOCK),
            FileType::Json | FileType::Text | FileType::Other => CommentSyntax::new(&[], &[]),
        }
    }
}
impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CommentSyntax {
    pub line: &'static [&'static str],
    pub block: &'static [(&'static str, &'static str)],
}
impl CommentSyntax {
    const fn new(line: &'static [&'static str], block: &'static [(&'static str, &'static str)]) -> Self {
        Self { line, block }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineCounts {
    pub total: u64,
    pub code: u64,
    pub comment: u64,
    pub blank: u64,
}

/// Counts lines by category. `total == code + comment + blank` always holds.
pub fn count_lines(content: &str, syntax: CommentSyntax) -> LineCounts {
    let mut counts = LineCounts::default();
    let mut open_block: Option<&str> = None;
    for line in content.lines() {
        counts.total += 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            counts.blank += 1;
            continue;
        }
        if let Some(close) = open_block {
            counts.comment += 1;
            if trimmed.contains(close) {
                open_block = None;
            }
            continue;
        }
        if syntax.line.iter().any(|marker| trimmed.starts_with(marker)) {
            counts.comment += 1;
            continue;
        }
        if let Some((open, close)) = syntax.block.iter().find(|(open, _)| trimmed.starts_with(open)) {
            counts.comment += 1;
            if !trimmed[open.len()..].contains(close) {
                open_block = Some(*close);
            }
            continue;
        }
        counts.code += 1;
    }
    counts
}

/// Classifies by extension, then well-known file name, then shebang.
pub fn classify(path: &Path, sample: &[u8]) -> FileType {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    if let Some(ext) = extension.as_deref() {
        if ext == "h" {
            return sniff_header(sample);
        }
        if let Some(file_type) = type_from_extension(ext) {
            return file_type;
        }
    }
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    if let Some(file_type) = type_from_name(name) {
        return file_type;
    }
    type_from_shebang(sample).unwrap_or(FileType::Other)
}

fn type_from_extension(ext: &str) -> Option<FileType> {
    let file_type = match ext {
        "py" | "pyw" | "pyi" => FileType::Python,
        "rs" => FileType::Rust,
        "js" | "mjs" | "cjs" | "jsx" => FileType::JavaScript,
        "ts" | "tsx" | "mts" | "cts" => FileType::TypeScript,
        "java" => FileType::Java,
        "c" => FileType::C,
        "cpp" | "cc" | "cxx" | "hpp" | "hh" | "hxx" => FileType::Cpp,
        "cs" => FileType::CSharp,
        "go" => FileType::Go,
        "rb" => FileType::Ruby,
        "php" => FileType::Php,
        "swift" => FileType::Swift,
        "kt" | "kts" => FileType::Kotlin,
        "sh" | "bash" | "zsh" => FileType::Shell,
        "html" | "htm" => FileType::Html,
        "css" => FileType::Css,
        "sql" => FileType::Sql,
        "md" | "markdown" => FileType::Markdown,
        "json" => FileType::Json,
        "yml" | "yaml" => FileType::Yaml,
        "toml" => FileType::Toml,
        "xml" | "svg" => FileType::Xml,
        "mk" => FileType::Makefile,
        "txt" | "text" => FileType::Text,
        _ => return None,
    };
    Some(file_type)
}

fn type_from_name(name: &str) -> Option<FileType> {
    match name {
        "Makefile" | "makefile" | "GNUmakefile" => Some(FileType::Makefile),
        "Dockerfile" | "Containerfile" => Some(FileType::Dockerfile),
        "Rakefile" | "Gemfile" => Some(FileType::Ruby),
        "README" | "LICENSE" | "CHANGELOG" => Some(FileType::Text),
        _ => None,
    }
}

fn type_from_shebang(sample: &[u8]) -> Option<FileType> {
    let first_line = sample.split(|b| *b == b'\n').next()?;
    let line = std::str::from_utf8(first_line).ok()?.trim();
    let interpreter = line.strip_prefix("#!")?;
    let program = interpreter
        .split_whitespace()
        .find(|word| !word.ends_with("/env") && !word.starts_with('-'))?;
    let program = program.rsplit('/').next().unwrap_or(program);
    match program.trim_end_matches(|c: char| c.is_ascii_digit() || c == '.') {
        "python" => Some(FileType::Python),
        "sh" | "bash" | "zsh" | "dash" | "ksh" => Some(FileType::Shell),
        "node" | "deno" => Some(FileType::JavaScript),
        "ruby" => Some(FileType::Ruby),
        "php" => Some(FileType::Php),
        _ => None,
    }
}

/// `.h` is shared by C and C++.
fn sniff_header(sample: &[u8]) -> FileType {
    let text = String::from_utf8_lossy(sample);
    let cpp_markers = ["namespace ", "template<", "template <", "class ", "#include <iostream>"];
    if cpp_markers.iter().any(|marker| text.contains(marker)) {
        FileType::Cpp
    } else {
        FileType::C
    }
}

/// Whether a head sample looks binary under the given strategy.
pub fn is_binary_sample(sample: &[u8], detection: BinaryDetection) -> bool {
    match detection {
        BinaryDetection::Simple => sample.contains(&0),
        BinaryDetection::Accurate => match content_inspector::inspect(sample) {
            ContentType::UTF_8 | ContentType::UTF_8_BOM => !is_utf8_prefix(sample),
            _ => true,
        },
        BinaryDetection::None => false,
    }
}

/// UTF-8 check that tolerates a multi-byte character cut off by the sample boundary.
fn is_utf8_prefix(sample: &[u8]) -> bool {
    match std::str::from_utf8(sample) {
        Ok(_) => true,
        Err(e) => e.error_len().is_none(),
    }
}

/// What the artifact receives for an analyzed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Text(String),
    Binary,
}
impl Content {
    pub fn as_str(&self) -> &str {
        match self {
            Content::Text(text) => text,
            Content::Binary => BINARY_PLACEHOLDER,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Analysis {
    pub record: FileRecord,
    pub content: Content,
}

/// Reads and analyzes one file.
///
/// Binary files yield a record with zero line counts. Text that fails strict
/// UTF-8 decoding past the sample yields [`ReadError::Decode`], except under
/// [`BinaryDetection::None`] where it is decoded lossily.
pub fn analyze(
    absolute: &Path,
    relative: &Path,
    detection: BinaryDetection,
) -> Result<Analysis, ReadError> {
    let file = File::open(absolute).map_err(|e| ReadError::io(absolute, e))?;
    let size = file
        .metadata()
        .map_err(|e| ReadError::io(absolute, e))?
        .len();
    let mut reader = BufReader::new(file);
    let mut bytes = Vec::with_capacity(SAMPLE_SIZE);
    reader
        .by_ref()
        .take(SAMPLE_SIZE as u64)
        .read_to_end(&mut bytes)
        .map_err(|e| ReadError::io(absolute, e))?;
    let file_type = classify(relative, &bytes);
    if is_binary_sample(&bytes, detection) {
        tracing::debug!("Binary file detected: {}", relative.display());
        return Ok(Analysis {
            record: FileRecord {
                path: relative.to_path_buf(),
                file_type,
                is_binary: true,
                total_lines: 0,
                code_lines: 0,
                comment_lines: 0,
                blank_lines: 0,
                size,
            },
            content: Content::Binary,
        });
    }
    reader
        .read_to_end(&mut bytes)
        .map_err(|e| ReadError::io(absolute, e))?;
    let text = match detection {
        BinaryDetection::None => String::from_utf8_lossy(&bytes).into_owned(),
        _ => String::from_utf8(bytes).map_err(|_| ReadError::Decode {
            path: PathBuf::from(absolute),
        })?,
    };
    let body = text.strip_prefix('\u{feff}').unwrap_or(&text);
    let counts = count_lines(body, file_type.comment_syntax());
    Ok(Analysis {
        record: FileRecord {
            path: relative.to_path_buf(),
            file_type,
            is_binary: false,
            total_lines: counts.total,
            code_lines: counts.code,
            comment_lines: counts.comment,
            blank_lines: counts.blank,
            size,
        },
        content: Content::Text(text),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn python_counts_add_up() {
        let source = "# header\nimport os\n\nx = 1\nprint(x)\n";
        let counts = count_lines(source, FileType::Python.comment_syntax());
        assert_eq!(counts, LineCounts { total: 5, code: 3, comment: 1, blank: 1 });
    }

    #[test]
    fn block_comments_span_lines() {
        let source = "/*\n * doc\n\n */\nint x;\n/* one line */\n";
        let counts = count_lines(source, FileType::C.comment_syntax());
        assert_eq!(counts.comment, 4);
        assert_eq!(counts.blank, 1);
        assert_eq!(counts.code, 1);
        assert_eq!(counts.total, counts.code + counts.comment + counts.blank);
    }

    #[test]
    fn unknown_types_have_no_comments() {
        let counts = count_lines("# not a comment\n// nor this\n", FileType::Other.comment_syntax());
        assert_eq!(counts.comment, 0);
        assert_eq!(counts.code, 2);
    }

    #[test]
    fn markdown_headings_are_code() {
        let counts = count_lines("# Title\n<!-- note -->\ntext\n", FileType::Markdown.comment_syntax());
        assert_eq!(counts.comment, 1);
        assert_eq!(counts.code, 2);
    }

    #[test]
    fn classify_by_extension_name_and_shebang() {
        assert_eq!(classify(Path::new("a.PY"), b""), FileType::Python);
        assert_eq!(classify(Path::new("sub/Makefile"), b""), FileType::Makefile);
        assert_eq!(classify(Path::new("run"), b"#!/usr/bin/env python3\n"), FileType::Python);
        assert_eq!(classify(Path::new("deploy"), b"#!/bin/bash -e\n"), FileType::Shell);
        assert_eq!(classify(Path::new("blob"), b"\x7fELF"), FileType::Other);
        assert_eq!(classify(Path::new("x.h"), b"namespace foo {}"), FileType::Cpp);
        assert_eq!(classify(Path::new("x.h"), b"int f(void);"), FileType::C);
    }

    #[test]
    fn binary_sample_detection() {
        assert!(is_binary_sample(b"abc\0def", BinaryDetection::Simple));
        assert!(!is_binary_sample(b"abc\0def", BinaryDetection::None));
        assert!(is_binary_sample(b"abc\0def", BinaryDetection::Accurate));
        assert!(!is_binary_sample("héllo".as_bytes(), BinaryDetection::Accurate));
        // A two-byte character cut in half at the end of the sample.
        assert!(!is_binary_sample(&"héllo".as_bytes()[..2], BinaryDetection::Accurate));
    }
}
