//! Gitignore-style pattern matching with per-pattern attribution.
//!
//! All patterns, whether read from `.gitignore` files or supplied by the caller,
//! share gitignore semantics: `*` stays within a path segment, `**` crosses
//! segments, a trailing `/` restricts a pattern to directories and a leading `!`
//! re-includes. The last matching pattern decides. Caller patterns are evaluated
//! after every gitignore pattern, and a nested `.gitignore` outranks the ones
//! above it but only applies inside its own directory.

use crate::types::ExclusionReason;
use ignore::Match;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Index of a pattern in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PatternId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternOrigin {
    Gitignore,
    Custom,
}
impl PatternOrigin {
    pub fn exclusion_reason(self) -> ExclusionReason {
        match self {
            PatternOrigin::Gitignore => ExclusionReason::Gitignore,
            PatternOrigin::Custom => ExclusionReason::Custom,
        }
    }
}

/// One successfully compiled pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    pub id: PatternId,
    pub text: String,
    pub origin: PatternOrigin,
    /// Directory (relative to the root) the pattern is scoped to.
    pub scope: PathBuf,
}

/// A pattern line that could not be compiled and was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternWarning {
    pub pattern: String,
    pub origin: PatternOrigin,
    pub message: String,
}

/// Result of [`Matcher::is_excluded`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub excluded: bool,
    /// The deciding pattern, `None` when nothing matched.
    pub pattern: Option<PatternId>,
    pub origin: Option<PatternOrigin>,
}
impl Verdict {
    /// Exclusion reason for an excluded verdict.
    pub fn reason(&self) -> Option<ExclusionReason> {
        if self.excluded {
            self.origin.map(PatternOrigin::exclusion_reason)
        } else {
            None
        }
    }
}

struct Scope {
    dir: PathBuf,
    origin: PatternOrigin,
    gitignore: Gitignore,
    ids: Vec<(String, PatternId)>,
    /// Each non-negated pattern compiled on its own, for hit attribution.
    singles: Vec<(PatternId, Gitignore)>,
}
impl Scope {
    fn lookup(&self, original: &str) -> Option<PatternId> {
        self.ids
            .iter()
            .rev()
            .find(|(text, _)| text == original)
            .map(|(_, id)| *id)
    }
}

pub struct Matcher {
    root: PathBuf,
    patterns: Vec<Pattern>,
    gitignore: Vec<Scope>,
    custom: Option<Scope>,
    warnings: Vec<PatternWarning>,
}
impl Matcher {
    /// Compiles root-level gitignore lines followed by custom patterns.
    ///
    /// Comment and blank lines are dropped; malformed lines become warnings.
    pub fn compile(root: impl Into<PathBuf>, gitignore: &[String], custom: &[String]) -> Self {
        let mut matcher = Self {
            root: root.into(),
            patterns: Vec::new(),
            gitignore: Vec::new(),
            custom: None,
            warnings: Vec::new(),
        };
        if let Some(scope) = matcher.build_scope(Path::new(""), gitignore, PatternOrigin::Gitignore) {
            matcher.gitignore.push(scope);
        }
        matcher.custom = matcher.build_scope(Path::new(""), custom, PatternOrigin::Custom);
        tracing::debug!(
            "Compiled {} patterns ({} warnings)",
            matcher.patterns.len(),
            matcher.warnings.len()
        );
        matcher
    }

    /// Adds the patterns of a nested `.gitignore` found in `dir` (relative to the root).
    pub fn add_gitignore(&mut self, dir: &Path, lines: &[String]) {
        if let Some(scope) = self.build_scope(dir, lines, PatternOrigin::Gitignore) {
            self.gitignore.push(scope);
        }
    }

    pub fn is_excluded(&self, relative: &Path, is_dir: bool) -> Verdict {
        let absolute = self.root.join(relative);
        let scopes = self
            .custom
            .iter()
            .chain(self.gitignore.iter().rev().filter(|s| relative.starts_with(&s.dir)));
        for scope in scopes {
            let (excluded, glob) = match scope.gitignore.matched(&absolute, is_dir) {
                Match::None => continue,
                Match::Ignore(glob) => (true, glob),
                Match::Whitelist(glob) => (false, glob),
            };
            return Verdict {
                excluded,
                pattern: scope.lookup(glob.original()),
                origin: Some(scope.origin),
            };
        }
        Verdict {
            excluded: false,
            pattern: None,
            origin: None,
        }
    }

    /// Exclusion patterns of `origin` that match `relative` each on their own,
    /// in declaration order. Re-include (`!`) patterns are never listed.
    pub fn exclusions_matching(&self, relative: &Path, is_dir: bool, origin: PatternOrigin) -> Vec<PatternId> {
        let absolute = self.root.join(relative);
        let mut ids: Vec<PatternId> = self
            .custom
            .iter()
            .chain(self.gitignore.iter())
            .filter(|s| s.origin == origin && relative.starts_with(&s.dir))
            .flat_map(|s| s.singles.iter())
            .filter(|(_, single)| single.matched(&absolute, is_dir).is_ignore())
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        ids
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }
    pub fn pattern(&self, id: PatternId) -> Option<&Pattern> {
        self.patterns.get(id.0)
    }
    pub fn warnings(&self) -> &[PatternWarning] {
        &self.warnings
    }

    fn build_scope(&mut self, dir: &Path, lines: &[String], origin: PatternOrigin) -> Option<Scope> {
        let scope_root = self.root.join(dir);
        let mut builder = GitignoreBuilder::new(&scope_root);
        let mut ids = Vec::new();
        let mut singles = Vec::new();
        for line in lines {
            let Some(text) = pattern_text(line) else {
                continue;
            };
            if let Err(e) = builder.add_line(None, text) {
                tracing::warn!("Skipping malformed pattern '{}': {}", text, e);
                self.warnings.push(PatternWarning {
                    pattern: text.to_string(),
                    origin,
                    message: e.to_string(),
                });
                continue;
            }
            let id = PatternId(self.patterns.len());
            self.patterns.push(Pattern {
                id,
                text: text.to_string(),
                origin,
                scope: dir.to_path_buf(),
            });
            ids.push((text.to_string(), id));
            if !text.starts_with('!') {
                let mut single = GitignoreBuilder::new(&scope_root);
                if single.add_line(None, text).is_ok() {
                    if let Ok(single) = single.build() {
                        singles.push((id, single));
                    }
                }
            }
        }
        if ids.is_empty() {
            return None;
        }
        match builder.build() {
            Ok(gitignore) => Some(Scope {
                dir: dir.to_path_buf(),
                origin,
                gitignore,
                ids,
                singles,
            }),
            Err(e) => {
                tracing::warn!("Dropping patterns of {}: {}", self.root.join(dir).display(), e);
                self.warnings.push(PatternWarning {
                    pattern: ids
                        .iter()
                        .map(|(text, _)| text.as_str())
                        .collect::<Vec<_>>()
                        .join(", "),
                    origin,
                    message: e.to_string(),
                });
                None
            }
        }
    }
}

/// Normalizes a raw line the way gitignore reads it; `None` for blanks and comments.
fn pattern_text(line: &str) -> Option<&str> {
    let text = if line.ends_with("\\ ") {
        line
    } else {
        line.trim_end()
    };
    if text.is_empty() || text.starts_with('#') {
        None
    } else {
        Some(text)
    }
}

/// Reads the `.gitignore` in `dir`, if there is one.
pub fn load_gitignore(dir: &Path) -> io::Result<Option<Vec<String>>> {
    let path = dir.join(".gitignore");
    match fs::read_to_string(&path) {
        Ok(content) => Ok(Some(content.lines().map(str::to_string).collect())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}
