//! Internal module for rendering the visited directory tree as text.

use crate::types::DirectoryNode;
use std::path::{Path, PathBuf};

/// Builds a visual tree string from visited directories and included files.
///
/// Paths are relative to the root, which is printed as `.`. Directories carry a
/// trailing `/`; empty directories are kept so the tree mirrors the
/// directory statistics.
pub(crate) fn render_tree(directories: &[DirectoryNode], files: &[PathBuf]) -> String {
    let mut sorted: Vec<(&Path, bool)> = directories
        .iter()
        .filter(|d| !d.path.as_os_str().is_empty())
        .map(|d| (d.path.as_path(), true))
        .chain(files.iter().map(|f| (f.as_path(), false)))
        .collect();
    sorted.sort_by(|a, b| a.0.components().cmp(b.0.components()));

    let mut lines = Vec::with_capacity(sorted.len() + 1);
    lines.push(".".to_string());

    for (entry, is_dir) in sorted {
        let depth = entry.components().count();
        let prefix = "│   ".repeat(depth.saturating_sub(1)) + "├── ";
        let name = entry
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        let suffix = if is_dir { "/" } else { "" };
        lines.push(format!("{}{}{}", prefix, name, suffix));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dir(path: &str, depth: usize) -> DirectoryNode {
        DirectoryNode {
            path: PathBuf::from(path),
            depth,
            file_count: 0,
            total_file_count: 0,
            is_empty: true,
        }
    }

    #[test]
    fn nests_files_under_their_directories() {
        let dirs = vec![dir("", 0), dir("src", 1), dir("src/util", 2)];
        let files = vec![
            PathBuf::from("src/util/io.rs"),
            PathBuf::from("README.md"),
            PathBuf::from("src/lib.rs"),
        ];
        let tree = render_tree(&dirs, &files);
        assert_eq!(
            tree,
            ".\n├── README.md\n├── src/\n│   ├── lib.rs\n│   ├── util/\n│   │   ├── io.rs"
        );
    }
}
