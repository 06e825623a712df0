//! Depth-first, name-sorted traversal that consults a [`Matcher`] at every node.
//!
//! The walk itself is an [`ignore::Walk`] with its own ignore-file handling
//! switched off; pattern decisions come from the request's [`Matcher`] through
//! the walk's entry filter, so excluded directories are never descended into.

use crate::options::ConcatOptions;
use crate::pattern::{Matcher, PatternId, load_gitignore};
use crate::types::{Entry, EntryKind};
use ignore::{DirEntry, Walk, WalkBuilder};
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// One step of a traversal.
#[derive(Debug, Clone)]
pub enum WalkEvent {
    /// A directory whose children are about to be walked. Emitted for the root too.
    Directory { path: PathBuf, depth: usize },
    Entry(Entry),
}

/// State shared with the walk's entry filter.
struct Filter {
    root: PathBuf,
    matcher: Matcher,
    skip: Option<PathBuf>,
    /// Entries the filter turned away, in traversal order, not yet emitted.
    rejected: VecDeque<Entry>,
    /// Deciding pattern of the last entry the filter let through.
    admitted: Option<PatternId>,
}
impl Filter {
    fn relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.root).unwrap_or(path).to_path_buf()
    }

    /// Returns whether the walk may yield (and descend into) `dirent`.
    fn admit(&mut self, dirent: &DirEntry) -> bool {
        let absolute = dirent.path().to_path_buf();
        let path = self.relative(&absolute);
        let is_symlink = dirent.path_is_symlink();
        let Some(file_type) = dirent.file_type() else {
            return self.reject(Entry::unreadable(path, absolute, EntryKind::File, "unknown file type"));
        };
        let kind = if is_symlink {
            EntryKind::Symlink
        } else if file_type.is_dir() {
            EntryKind::Dir
        } else {
            EntryKind::File
        };
        if is_symlink {
            match fs::canonicalize(&absolute) {
                Ok(target) if target.starts_with(&self.root) => {}
                Ok(target) => {
                    let detail = format!("symlink points outside the root: {}", target.display());
                    return self.reject(Entry::unreadable(path, absolute, kind, detail));
                }
                Err(e) => {
                    let detail = format!("broken symlink: {e}");
                    return self.reject(Entry::unreadable(path, absolute, kind, detail));
                }
            }
        }

        if file_type.is_dir() {
            if let Some(skip) = &self.skip {
                if fs::canonicalize(&absolute).is_ok_and(|real| &real == skip) {
                    return false;
                }
            }
            let verdict = self.matcher.is_excluded(&path, true);
            if let (Some(reason), Some(origin)) = (verdict.reason(), verdict.origin) {
                tracing::debug!("Pruning directory {} ({:?})", path.display(), reason);
                let matched = self.matcher.exclusions_matching(&path, true, origin);
                let entry = Entry::excluded(path, absolute, kind, 0, reason, verdict.pattern);
                return self.reject(entry.resolving_to_dir().matching(matched));
            }
            if let Err(e) = fs::read_dir(&absolute) {
                tracing::warn!("Cannot read directory {}: {}", absolute.display(), e);
                let entry = Entry::unreadable(path, absolute, kind, e.to_string());
                return self.reject(entry.resolving_to_dir());
            }
            self.admitted = verdict.pattern;
            return true;
        }
        if !file_type.is_file() {
            return self.reject(Entry::unreadable(path, absolute, kind, "not a regular file"));
        }
        let verdict = self.matcher.is_excluded(&path, false);
        if let (Some(reason), Some(origin)) = (verdict.reason(), verdict.origin) {
            let size = dirent.metadata().map(|m| m.len()).unwrap_or(0);
            let matched = self.matcher.exclusions_matching(&path, false, origin);
            let entry = Entry::excluded(path, absolute, kind, size, reason, verdict.pattern);
            return self.reject(entry.matching(matched));
        }
        self.admitted = verdict.pattern;
        true
    }

    fn reject(&mut self, entry: Entry) -> bool {
        self.rejected.push_back(entry);
        false
    }
}

fn lock(filter: &Mutex<Filter>) -> MutexGuard<'_, Filter> {
    filter.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Lazy traversal of one root. Not restartable: build a new walker per request.
///
/// Excluded directories are reported once and never descended into. Symlinks are
/// followed; those that escape the root, are broken, or lead back to any
/// directory already on the current path are reported as `unreadable`. Hidden
/// entries are skipped silently unless enabled.
pub struct TreeWalker {
    walk: Walk,
    filter: Arc<Mutex<Filter>>,
    nested_gitignore: bool,
    queued: VecDeque<WalkEvent>,
    done: bool,
}
impl TreeWalker {
    /// `root` should be canonical so that symlink targets can be compared to it.
    pub fn new(root: impl Into<PathBuf>, matcher: Matcher, options: &ConcatOptions) -> Self {
        let root = root.into();
        let filter = Arc::new(Mutex::new(Filter {
            root: root.clone(),
            matcher,
            skip: None,
            rejected: VecDeque::new(),
            admitted: None,
        }));
        let mut builder = WalkBuilder::new(&root);
        builder
            .standard_filters(false)
            .hidden(!options.include_hidden)
            .max_depth(options.max_depth)
            .follow_links(true)
            .sort_by_file_name(|a, b| a.cmp(b));
        let shared = Arc::clone(&filter);
        builder.filter_entry(move |dirent| lock(&shared).admit(dirent));
        Self {
            walk: builder.build(),
            filter,
            nested_gitignore: options.respect_gitignore && options.nested_gitignore,
            queued: VecDeque::new(),
            done: false,
        }
    }

    /// Silently leaves out the directory whose canonical path is `real`.
    pub fn skip_dir(self, real: PathBuf) -> Self {
        lock(&self.filter).skip = Some(real);
        self
    }

    /// Runs `f` against the matcher, including any nested `.gitignore` loaded so far.
    pub fn with_matcher<R>(&self, f: impl FnOnce(&Matcher) -> R) -> R {
        f(&lock(&self.filter).matcher)
    }

    fn accept(&mut self, dirent: DirEntry, pattern: Option<PatternId>) {
        let depth = dirent.depth();
        let absolute = dirent.path().to_path_buf();
        if depth == 0 {
            self.queued.push_back(WalkEvent::Directory {
                path: PathBuf::new(),
                depth,
            });
            return;
        }
        let mut filter = lock(&self.filter);
        let path = filter.relative(&absolute);
        let kind = if dirent.path_is_symlink() {
            EntryKind::Symlink
        } else if dirent.file_type().is_some_and(|t| t.is_dir()) {
            EntryKind::Dir
        } else {
            EntryKind::File
        };
        if dirent.file_type().is_some_and(|t| t.is_dir()) {
            if self.nested_gitignore {
                match load_gitignore(&absolute) {
                    Ok(Some(lines)) => {
                        tracing::debug!("Loading nested .gitignore in {}", absolute.display());
                        filter.matcher.add_gitignore(&path, &lines);
                    }
                    Ok(None) => {}
                    Err(e) => tracing::warn!("Failed to read .gitignore in {}: {}", absolute.display(), e),
                }
            }
            drop(filter);
            let entry = Entry::included(path.clone(), absolute, kind, 0, pattern);
            self.queued.push_back(WalkEvent::Entry(entry.resolving_to_dir()));
            self.queued.push_back(WalkEvent::Directory { path, depth });
            return;
        }
        drop(filter);
        let entry = match dirent.metadata() {
            Ok(metadata) => Entry::included(path, absolute, kind, metadata.len(), pattern),
            Err(e) => Entry::unreadable(path, absolute, kind, e.to_string()),
        };
        self.queued.push_back(WalkEvent::Entry(entry));
    }

    fn fail(&mut self, err: ignore::Error) {
        let mut cause = &err;
        let mut at: Option<&Path> = None;
        loop {
            match cause {
                ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
                    cause = &**err;
                }
                ignore::Error::WithPath { path, err } => {
                    at.get_or_insert(path.as_path());
                    cause = &**err;
                }
                ignore::Error::Loop { ancestor, child } => {
                    tracing::debug!("Symlink cycle at {}", child.display());
                    let path = lock(&self.filter).relative(child);
                    let detail = format!("symlink cycle back to {}", ancestor.display());
                    let entry = Entry::unreadable(path, child.clone(), EntryKind::Symlink, detail);
                    self.queued.push_back(WalkEvent::Entry(entry.resolving_to_dir()));
                    return;
                }
                _ => break,
            }
        }
        let Some(absolute) = at else {
            tracing::warn!("Walk error: {}", err);
            return;
        };
        let kind = match fs::symlink_metadata(absolute) {
            Ok(m) if m.file_type().is_symlink() => EntryKind::Symlink,
            Ok(m) if m.is_dir() => EntryKind::Dir,
            _ => EntryKind::File,
        };
        let detail = match kind {
            EntryKind::Symlink => format!("broken symlink: {cause}"),
            _ => cause.to_string(),
        };
        tracing::warn!("Skipping unreadable entry {}: {}", absolute.display(), detail);
        let path = lock(&self.filter).relative(absolute);
        let entry = Entry::unreadable(path, absolute.to_path_buf(), kind, detail);
        self.queued.push_back(WalkEvent::Entry(entry));
    }
}
impl Iterator for TreeWalker {
    type Item = WalkEvent;
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(event) = self.queued.pop_front() {
                return Some(event);
            }
            if self.done {
                return None;
            }
            let item = self.walk.next();
            let admitted = {
                let mut filter = lock(&self.filter);
                let rejected: Vec<Entry> = filter.rejected.drain(..).collect();
                self.queued.extend(rejected.into_iter().map(WalkEvent::Entry));
                filter.admitted.take()
            };
            match item {
                Some(Ok(dirent)) => self.accept(dirent, admitted),
                Some(Err(err)) => self.fail(err),
                None => self.done = true,
            }
        }
    }
}
