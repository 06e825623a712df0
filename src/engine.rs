use crate::analyzer::{Analysis, analyze};
use crate::cancel::CancellationToken;
use crate::error::{DirconcatError, ReadError};
use crate::options::{BinaryDetection, BinaryPolicy, ConcatOptions};
use crate::output::ArtifactFile;
use crate::pattern::{Matcher, load_gitignore};
use crate::stats::{StatsAccumulator, StatsReport};
use crate::types::{ConcatResult, Entry, ExclusionReason};
use crate::walker::{TreeWalker, WalkEvent};
use crossbeam_channel::{Receiver, RecvTimeoutError, bounded};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::{Duration, Instant};
const POLL_INTERVAL: Duration = Duration::from_millis(25);
/// Reads and analyzes one file on a pool worker.
type Reader = fn(&Path, &Path, BinaryDetection) -> Result<Analysis, ReadError>;
/// Runs one request to completion.
pub fn concatenate(options: ConcatOptions) -> Result<ConcatResult, DirconcatError> {
    concatenate_with_cancel(options, &CancellationToken::new())
}
/// Runs one request, abandoning it as soon as `cancel` fires.
pub fn concatenate_with_cancel(
    options: ConcatOptions,
    cancel: &CancellationToken,
) -> Result<ConcatResult, DirconcatError> {
    run_request(options, cancel, analyze)
}
fn run_request(
    options: ConcatOptions,
    cancel: &CancellationToken,
    reader: Reader,
) -> Result<ConcatResult, DirconcatError> {
    tracing::info!("Starting concatenation of {}", options.root.display());
    let root = resolve_root(&options.root)?;
    let matcher = build_matcher(&root, &options);
    let pool = ThreadPoolBuilder::new()
        .num_threads(options.max_concurrency.max(1))
        .thread_name(|i| format!("dirconcat-read-{i}"))
        .build()
        .map_err(|e| DirconcatError::Pool(e.to_string()))?;
    let artifact = ArtifactFile::create(&options.output_dir)
        .map_err(|e| DirconcatError::write(&options.output_dir, e))?;
    let mut walker = TreeWalker::new(root, matcher, &options);
    if let Ok(output_dir) = fs::canonicalize(artifact.dir()) {
        walker = walker.skip_dir(output_dir);
    }
    let mut run = Run {
        options: &options,
        cancel,
        reader,
        pool,
        walker,
        stats: StatsAccumulator::new(),
        artifact,
        entries: Vec::new(),
        pending: VecDeque::new(),
        workers: Vec::new(),
        walk_done: false,
    };
    match run.drive() {
        Ok(()) => {}
        Err(Halt::Cancelled) => {
            tracing::info!("Concatenation of {} cancelled", options.root.display());
            return Err(DirconcatError::Cancelled);
        }
        Err(Halt::Write(source)) => {
            tracing::error!("Failed to write artifact: {}", source);
            let path = options.output_dir.clone();
            let (report, _, _) = run.finish();
            return Err(DirconcatError::Write {
                path,
                source,
                partial: Some(Box::new(report)),
            });
        }
    }
    let (report, artifact, entries) = run.finish();
    let artifact = artifact.persist().map_err(|source| DirconcatError::Write {
        path: options.output_dir.clone(),
        source,
        partial: Some(Box::new(report.clone())),
    })?;
    tracing::info!(
        "Concatenation complete: {} files written to {}",
        artifact.files_written,
        artifact.path.display()
    );
    Ok(ConcatResult {
        artifact,
        report,
        entries,
    })
}
fn resolve_root(root: &Path) -> Result<PathBuf, DirconcatError> {
    let root = if root.as_os_str().is_empty() {
        Path::new(".")
    } else {
        root
    };
    let canonical = fs::canonicalize(root).map_err(|e| DirconcatError::invalid_root(root, e))?;
    if !canonical.is_dir() {
        return Err(DirconcatError::invalid_root(root, "not a directory"));
    }
    fs::read_dir(&canonical).map_err(|e| DirconcatError::invalid_root(root, e))?;
    Ok(canonical)
}
fn build_matcher(root: &Path, options: &ConcatOptions) -> Matcher {
    let gitignore = if options.respect_gitignore {
        match load_gitignore(root) {
            Ok(Some(lines)) => {
                tracing::info!("Loaded {} lines from {}/.gitignore", lines.len(), root.display());
                lines
            }
            Ok(None) => {
                tracing::debug!("No .gitignore in {}", root.display());
                Vec::new()
            }
            Err(e) => {
                tracing::warn!("Failed to read .gitignore, proceeding without it: {}", e);
                Vec::new()
            }
        }
    } else {
        Vec::new()
    };
    Matcher::compile(root, &gitignore, &options.ignore_patterns)
}
enum Halt {
    Cancelled,
    Write(io::Error),
}
/// Progress of one read, shared with the worker that runs it.
#[derive(Default)]
struct Job {
    started: OnceLock<Instant>,
    finished: AtomicBool,
}
impl Job {
    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }
}
struct Reading {
    job: Arc<Job>,
    result: Receiver<Result<Analysis, ReadError>>,
}
enum Pending {
    Directory {
        path: PathBuf,
        depth: usize,
    },
    Settled(Entry),
    /// A file to read; `reading` is set once it has been handed to a worker.
    Read {
        entry: Entry,
        reading: Option<Reading>,
    },
}
enum Waited {
    Done(Result<Analysis, ReadError>),
    TimedOut,
    Abandoned,
    Cancelled,
}
/// State of one request. Reads run on the pool; results are consumed strictly
/// in traversal order. A worker stays counted as busy until its read returns,
/// even after the engine has given up on it, so at most `max_concurrency` reads
/// ever occupy the pool.
struct Run<'a> {
    options: &'a ConcatOptions,
    cancel: &'a CancellationToken,
    reader: Reader,
    pool: ThreadPool,
    walker: TreeWalker,
    stats: StatsAccumulator,
    artifact: ArtifactFile,
    entries: Vec<Entry>,
    pending: VecDeque<Pending>,
    workers: Vec<Arc<Job>>,
    walk_done: bool,
}
impl Run<'_> {
    fn window(&self) -> usize {
        self.options.max_concurrency.max(1)
    }
    fn busy(&mut self) -> usize {
        self.workers.retain(|job| !job.is_finished());
        self.workers.len()
    }
    fn drive(&mut self) -> Result<(), Halt> {
        let window = self.window();
        loop {
            if self.cancel.is_cancelled() {
                return Err(Halt::Cancelled);
            }
            while !self.walk_done && self.pending.len() < window * 4 {
                match self.walker.next() {
                    Some(event) => self.schedule(event),
                    None => self.walk_done = true,
                }
            }
            self.dispatch_queued();
            let Some(next) = self.pending.pop_front() else {
                return Ok(());
            };
            self.settle(next)?;
        }
    }
    fn schedule(&mut self, event: WalkEvent) {
        let pending = match event {
            WalkEvent::Directory { path, depth } => Pending::Directory { path, depth },
            WalkEvent::Entry(entry) if entry.is_included() && entry.is_file_like() => Pending::Read {
                entry,
                reading: None,
            },
            WalkEvent::Entry(entry) => Pending::Settled(entry),
        };
        self.pending.push_back(pending);
    }
    /// Hands queued reads to free workers, in traversal order.
    fn dispatch_queued(&mut self) {
        let mut free = self.window().saturating_sub(self.busy());
        for pending in self.pending.iter_mut() {
            if free == 0 {
                break;
            }
            if let Pending::Read {
                entry,
                reading: reading @ None,
            } = pending
            {
                let started = dispatch(&self.pool, self.reader, entry, self.options, self.cancel);
                self.workers.push(Arc::clone(&started.job));
                *reading = Some(started);
                free -= 1;
            }
        }
    }
    /// Waits for a worker to come free. Gives up after `read_timeout` when every
    /// worker is still held by a read that already timed out.
    fn dispatch_when_free(&mut self, entry: &Entry) -> Result<Option<Reading>, Halt> {
        let give_up = Instant::now() + self.options.read_timeout;
        loop {
            if self.cancel.is_cancelled() {
                return Err(Halt::Cancelled);
            }
            if self.busy() < self.window() {
                let reading = dispatch(&self.pool, self.reader, entry, self.options, self.cancel);
                self.workers.push(Arc::clone(&reading.job));
                return Ok(Some(reading));
            }
            let now = Instant::now();
            if now >= give_up {
                return Ok(None);
            }
            thread::sleep((give_up - now).min(POLL_INTERVAL));
        }
    }
    fn settle(&mut self, pending: Pending) -> Result<(), Halt> {
        let (entry, reading) = match pending {
            Pending::Directory { path, depth } => {
                self.stats.observe_directory(&path, depth);
                return Ok(());
            }
            Pending::Settled(entry) => {
                self.record(entry);
                return Ok(());
            }
            Pending::Read { entry, reading } => (entry, reading),
        };
        let reading = match reading {
            Some(reading) => reading,
            None => match self.dispatch_when_free(&entry)? {
                Some(reading) => reading,
                None => {
                    let detail = format!("no reader came free within {:?}", self.options.read_timeout);
                    tracing::warn!("Skipping {}: {}", entry.path.display(), detail);
                    self.record(entry.into_excluded(ExclusionReason::Unreadable, Some(detail)));
                    return Ok(());
                }
            },
        };
        match wait(&reading, self.options.read_timeout, self.cancel) {
            Waited::Done(Ok(analysis)) => self.include(entry, analysis)?,
            Waited::Done(Err(e)) => {
                tracing::warn!("Skipping unreadable file {}: {}", entry.path.display(), e);
                self.record(entry.into_excluded(ExclusionReason::Unreadable, Some(e.to_string())));
            }
            Waited::TimedOut | Waited::Abandoned => {
                let detail = format!("read timed out after {:?}", self.options.read_timeout);
                tracing::warn!("Skipping {}: {}", entry.path.display(), detail);
                self.record(entry.into_excluded(ExclusionReason::Unreadable, Some(detail)));
            }
            Waited::Cancelled => return Err(Halt::Cancelled),
        }
        Ok(())
    }
    fn include(&mut self, entry: Entry, analysis: Analysis) -> Result<(), Halt> {
        if analysis.record.is_binary && self.options.binary_policy == BinaryPolicy::Skip {
            tracing::debug!("Skipping binary file {}", entry.path.display());
            self.record(entry.into_excluded(ExclusionReason::Binary, None));
            return Ok(());
        }
        tracing::debug!("Processing file: {}", entry.path.display());
        self.artifact
            .append(&analysis.record, analysis.content.as_str())
            .map_err(Halt::Write)?;
        self.stats.observe_file(&analysis.record);
        self.record(entry);
        Ok(())
    }
    fn record(&mut self, entry: Entry) {
        self.stats.observe_entry(&entry);
        self.entries.push(entry);
    }
    fn finish(self) -> (StatsReport, ArtifactFile, Vec<Entry>) {
        let stats = self.stats;
        let report = self
            .walker
            .with_matcher(|matcher| stats.finalize(matcher.patterns(), matcher.warnings()));
        (report, self.artifact, self.entries)
    }
}
/// Spawns the read of `entry` on the pool. Its deadline starts when a worker picks it up.
fn dispatch(
    pool: &ThreadPool,
    reader: Reader,
    entry: &Entry,
    options: &ConcatOptions,
    cancel: &CancellationToken,
) -> Reading {
    let job = Arc::new(Job::default());
    let (tx, rx) = bounded(1);
    let worker_job = Arc::clone(&job);
    let absolute = entry.absolute.clone();
    let relative = entry.path.clone();
    let detection = options.binary_detection;
    let timeout = options.read_timeout;
    let cancel = cancel.clone();
    pool.spawn(move || {
        let started = *worker_job.started.get_or_init(Instant::now);
        if !cancel.is_cancelled() && Instant::now() < started + timeout {
            let _ = tx.send(reader(&absolute, &relative, detection));
        }
        worker_job.finished.store(true, Ordering::Release);
    });
    Reading { job, result: rx }
}
fn wait(reading: &Reading, timeout: Duration, cancel: &CancellationToken) -> Waited {
    loop {
        if cancel.is_cancelled() {
            return Waited::Cancelled;
        }
        let Some(&started) = reading.job.started.get() else {
            match reading.result.recv_timeout(POLL_INTERVAL) {
                Ok(done) => return Waited::Done(done),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return Waited::Abandoned,
            }
        };
        let deadline = started + timeout;
        let now = Instant::now();
        if now >= deadline {
            return match reading.result.try_recv() {
                Ok(done) => Waited::Done(done),
                Err(_) => Waited::TimedOut,
            };
        }
        match reading.result.recv_timeout((deadline - now).min(POLL_INTERVAL)) {
            Ok(done) => return Waited::Done(done),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => return Waited::Abandoned,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ConcatBuilder;

    fn slow_first(absolute: &Path, relative: &Path, detection: BinaryDetection) -> Result<Analysis, ReadError> {
        if relative == Path::new("a_slow.rs") {
            thread::sleep(Duration::from_millis(600));
        }
        analyze(absolute, relative, detection)
    }

    #[test]
    fn slow_read_does_not_starve_later_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        for name in ["a_slow.rs", "b.rs", "c.rs"] {
            fs::write(dir.path().join(name), "fn f() {}\n").unwrap();
        }
        let options = ConcatBuilder::new(dir.path())
            .output_dir(out.path())
            .max_concurrency(1)
            .read_timeout(Duration::from_millis(400))
            .build();
        let result = run_request(options, &CancellationToken::new(), slow_first).unwrap();
        let reason = |name: &str| {
            result
                .entries
                .iter()
                .find(|e| e.path == Path::new(name))
                .and_then(Entry::exclusion_reason)
        };
        assert_eq!(reason("a_slow.rs"), Some(ExclusionReason::Unreadable));
        assert_eq!(reason("b.rs"), None);
        assert_eq!(reason("c.rs"), None);
        assert_eq!(result.report.files.processed_files, 2);
        assert_eq!(result.artifact.files_written, 2);
    }
}
