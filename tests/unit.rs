use dirconcat::{
    BinaryDetection, ConcatWriter, Content, FileRecord, FileType, Matcher, PatternId, PatternOrigin,
    ReadError, ReportFormat, StatsAccumulator, analyze, format_report,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;
fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
fn record(path: &str, code: u64, comment: u64, blank: u64) -> FileRecord {
    FileRecord {
        path: PathBuf::from(path),
        file_type: FileType::Python,
        is_binary: false,
        total_lines: code + comment + blank,
        code_lines: code,
        comment_lines: comment,
        blank_lines: blank,
        size: 10,
    }
}
#[test]
fn test_negation_reincludes() {
    let matcher = Matcher::compile("/project", &[], &strings(&["*.log", "!keep.log"]));
    let keep = matcher.is_excluded(Path::new("keep.log"), false);
    assert!(!keep.excluded);
    assert_eq!(keep.pattern, Some(PatternId(1)));
    let debug = matcher.is_excluded(Path::new("debug.log"), false);
    assert!(debug.excluded);
    assert_eq!(debug.pattern, Some(PatternId(0)));
    assert_eq!(debug.origin, Some(PatternOrigin::Custom));
}
#[test]
fn test_custom_patterns_override_gitignore() {
    let matcher = Matcher::compile(
        "/project",
        &strings(&["*.txt"]),
        &strings(&["!notes.txt"]),
    );
    assert!(matcher.is_excluded(Path::new("other.txt"), false).excluded);
    let notes = matcher.is_excluded(Path::new("notes.txt"), false);
    assert!(!notes.excluded);
    assert_eq!(notes.origin, Some(PatternOrigin::Custom));
}
#[test]
fn test_directory_only_patterns() {
    let matcher = Matcher::compile("/project", &strings(&["build/"]), &[]);
    assert!(matcher.is_excluded(Path::new("build"), true).excluded);
    assert!(!matcher.is_excluded(Path::new("build"), false).excluded);
}
#[test]
fn test_star_and_double_star() {
    let matcher = Matcher::compile("/project", &[], &strings(&["src/*.rs", "docs/**/*.tmp"]));
    assert!(matcher.is_excluded(Path::new("src/a.rs"), false).excluded);
    assert!(!matcher.is_excluded(Path::new("src/x/a.rs"), false).excluded);
    assert!(matcher.is_excluded(Path::new("docs/z.tmp"), false).excluded);
    assert!(matcher.is_excluded(Path::new("docs/x/y/z.tmp"), false).excluded);
    assert!(!matcher.is_excluded(Path::new("z.tmp"), false).excluded);
}
#[test]
fn test_malformed_pattern_is_skipped() {
    let matcher = Matcher::compile("/project", &[], &strings(&["{a,b", "*.bak"]));
    assert_eq!(matcher.warnings().len(), 1);
    assert_eq!(matcher.warnings()[0].pattern, "{a,b");
    assert_eq!(matcher.patterns().len(), 1);
    assert!(matcher.is_excluded(Path::new("x.bak"), false).excluded);
}
#[test]
fn test_comments_and_blanks_are_not_patterns() {
    let matcher = Matcher::compile("/project", &strings(&["# build output", "", "   ", "target/"]), &[]);
    assert_eq!(matcher.patterns().len(), 1);
    assert_eq!(matcher.patterns()[0].text, "target/");
    assert!(matcher.warnings().is_empty());
}
#[test]
fn test_nested_gitignore_stays_in_scope() {
    let mut matcher = Matcher::compile("/project", &[], &[]);
    matcher.add_gitignore(Path::new("sub"), &strings(&["*.md"]));
    assert!(matcher.is_excluded(Path::new("sub/a.md"), false).excluded);
    assert!(matcher.is_excluded(Path::new("sub/deep/a.md"), false).excluded);
    assert!(!matcher.is_excluded(Path::new("a.md"), false).excluded);
    assert!(!matcher.is_excluded(Path::new("subway/a.md"), false).excluded);
}
#[test]
fn test_analyze_counts_python() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("a.py");
    fs::write(&path, "# comment\nimport os\n\nx = 1\nprint(x)\n").unwrap();
    let analysis = analyze(&path, Path::new("a.py"), BinaryDetection::Accurate).unwrap();
    let rec = analysis.record;
    assert_eq!(rec.file_type, FileType::Python);
    assert_eq!(
        (rec.total_lines, rec.code_lines, rec.comment_lines, rec.blank_lines),
        (5, 3, 1, 1)
    );
    assert_eq!(rec.size, 36);
}
#[test]
fn test_analyze_ignores_byte_order_mark() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bom.py");
    fs::write(&path, "\u{feff}# header\nx = 1\n").unwrap();
    let rec = analyze(&path, Path::new("bom.py"), BinaryDetection::Accurate)
        .unwrap()
        .record;
    assert_eq!((rec.comment_lines, rec.code_lines), (1, 1));
}
#[test]
fn test_exclusions_matching_lists_every_match() {
    let matcher = Matcher::compile(
        "/project",
        &strings(&["*.log"]),
        &strings(&["*.log", "debug.*", "!debug.log"]),
    );
    let custom = matcher.exclusions_matching(Path::new("debug.log"), false, PatternOrigin::Custom);
    assert_eq!(custom, vec![PatternId(1), PatternId(2)]);
    let gitignore = matcher.exclusions_matching(Path::new("debug.log"), false, PatternOrigin::Gitignore);
    assert_eq!(gitignore, vec![PatternId(0)]);
    assert!(
        matcher
            .exclusions_matching(Path::new("main.rs"), false, PatternOrigin::Custom)
            .is_empty()
    );
}
#[test]
fn test_analyze_binary_has_no_lines() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bin.dat");
    fs::write(&path, vec![0, 1, 2, 3, b'\n', b'\n']).unwrap();
    let analysis = analyze(&path, Path::new("bin.dat"), BinaryDetection::Simple).unwrap();
    assert!(analysis.record.is_binary);
    assert_eq!(analysis.record.total_lines, 0);
    assert_eq!(analysis.record.size, 6);
    assert_eq!(analysis.content, Content::Binary);
}
#[test]
fn test_analyze_rejects_invalid_utf8_after_sample() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("late.txt");
    let mut bytes = vec![b'a'; 9000];
    bytes.extend_from_slice(&[0xff, 0xfe, 0xfd]);
    fs::write(&path, bytes).unwrap();
    let err = analyze(&path, Path::new("late.txt"), BinaryDetection::Accurate).unwrap_err();
    assert!(matches!(err, ReadError::Decode { .. }));
    let lossy = analyze(&path, Path::new("late.txt"), BinaryDetection::None).unwrap();
    assert_eq!(lossy.record.total_lines, 1);
}
#[test]
fn test_concat_writer_blocks() {
    let mut writer = ConcatWriter::new(Vec::new());
    writer.append(&record("a.py", 1, 0, 0), "x = 1").unwrap();
    writer.append(&record("sub/b.py", 1, 0, 0), "y = 2\n").unwrap();
    assert_eq!(writer.files_written(), 2);
    let bytes = writer.finish().unwrap();
    let text = String::from_utf8(bytes).unwrap();
    let rule = "=".repeat(80);
    let expected = format!(
        "\n{rule}\nFile: a.py\n{rule}\n\nx = 1\n\n{rule}\nFile: sub/b.py\n{rule}\n\ny = 2\n\n"
    );
    assert_eq!(text, expected);
}
#[test]
fn test_accumulator_directory_shape() {
    let mut stats = StatsAccumulator::new();
    stats.observe_directory(Path::new(""), 0);
    stats.observe_directory(Path::new("a"), 1);
    stats.observe_directory(Path::new("b"), 1);
    stats.observe_directory(Path::new("b/c"), 2);
    stats.observe_directory(Path::new("d"), 1);
    stats.observe_file(&record("a/x.py", 2, 1, 0));
    stats.observe_file(&record("b/c/y.py", 4, 0, 1));
    stats.observe_file(&record("b/z.py", 3, 1, 0));
    let report = stats.finalize(&[], &[]);
    let dirs = &report.directories;
    assert_eq!(dirs.total_dirs, 5);
    assert_eq!(dirs.max_depth, 2);
    assert_eq!(dirs.empty_dirs, 1);
    let busiest = dirs.busiest_dir.as_ref().unwrap();
    assert_eq!((busiest.path.as_str(), busiest.files), ("a", 1));
    let b = dirs.nodes.iter().find(|n| n.path == Path::new("b")).unwrap();
    assert_eq!((b.file_count, b.total_file_count, b.is_empty), (1, 2, false));
    let root = &dirs.nodes[0];
    assert_eq!(root.total_file_count, 3);
    assert!(!root.is_empty);
    let d = dirs.nodes.iter().find(|n| n.path == Path::new("d")).unwrap();
    assert!(d.is_empty);
    assert_eq!(report.files.code_to_comment_ratio, Some(4.5));
    assert_eq!(report.files.total_lines, 12);
    assert_eq!(report.files.by_type[&FileType::Python].files, 3);
}
#[test]
fn test_ratio_is_undefined_without_comments() {
    let mut stats = StatsAccumulator::new();
    stats.observe_file(&record("a.py", 3, 0, 0));
    let report = stats.finalize(&[], &[]);
    assert_eq!(report.files.code_to_comment_ratio, None);
    let json = format_report(&report, ReportFormat::Json, false);
    assert!(json.contains("\"code_to_comment_ratio\":null"));
    let text = format_report(&report, ReportFormat::Text, false);
    assert!(text.contains("code/comment ratio: n/a"));
}
