//! Bounded recursive file search.
//!
//! The search walks a folder tree through a [`FilesManager`] and yields one
//! [`SearchHit`] per file, lazily: nothing is listed until the consumer asks
//! for the next item, so a slow consumer throttles the I/O.
//!
//! Work is kept in a FIFO queue seeded with the root at depth 0, which makes
//! the walk breadth-first: every folder at one depth is visited before any
//! folder one level deeper. Within a folder, siblings keep the order the
//! backend lists them in. Backends with unordered listings give no ordering
//! guarantee beyond that.

mod guard;
mod stream;

use std::collections::VecDeque;

use tracing::debug;

use crate::error::{Error, Result};
use crate::storage::{FilesManager, FolderHandle};
use crate::types::SearchOptions;

pub use guard::LimitGuard;
pub use stream::spawn_search;

/// Safety bound on pending queue entries.
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 1_000_000;

/// One file found by a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    /// Depth of the containing folder; the root is depth 0.
    pub depth: usize,
    /// Path of the containing folder.
    pub path: String,
    pub filename: String,
}

impl From<SearchHit> for (usize, String, String) {
    fn from(hit: SearchHit) -> Self {
        (hit.depth, hit.path, hit.filename)
    }
}

/// A configured search. Every call to [`FileSearch::iter`] starts a fresh
/// traversal with a fresh deadline.
#[derive(Clone)]
pub struct FileSearch<'a> {
    manager: &'a dyn FilesManager,
    root: String,
    skip_empty: bool,
    max_queue_size: usize,
    limits: Option<SearchOptions>,
}

impl<'a> FileSearch<'a> {
    pub fn new(manager: &'a dyn FilesManager, root: impl Into<String>) -> Self {
        Self {
            manager,
            root: root.into(),
            skip_empty: false,
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
            limits: None,
        }
    }

    /// Skip folders of total size zero without listing them, and skip
    /// zero-byte files.
    pub fn skip_empty(mut self, skip_empty: bool) -> Self {
        self.skip_empty = skip_empty;
        self
    }

    pub fn max_queue_size(mut self, max_queue_size: usize) -> Self {
        self.max_queue_size = max_queue_size;
        self
    }

    /// Enforce the depth, item and duration limits of `options` and take
    /// over its skip-empty switch.
    pub fn options(mut self, options: &SearchOptions) -> Self {
        self.skip_empty = options.skip_empty;
        self.limits = Some(options.clone());
        self
    }

    pub fn iter(&self) -> SearchIter<'a> {
        let mut queue = VecDeque::new();
        queue.push_back(Task { depth: 0, target: Target::Folder(self.root.clone()) });
        SearchIter {
            manager: self.manager,
            queue,
            current: None,
            skip_empty: self.skip_empty,
            max_queue_size: self.max_queue_size,
            guard: self.limits.as_ref().map(LimitGuard::new),
            emitted: 0,
            done: false,
        }
    }
}

impl<'a> IntoIterator for FileSearch<'a> {
    type Item = Result<SearchHit>;
    type IntoIter = SearchIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Searches `root` under the limits of `options`.
pub fn search_files<'a>(manager: &'a dyn FilesManager, root: &str, options: &SearchOptions) -> SearchIter<'a> {
    FileSearch::new(manager, root).options(options).iter()
}

enum Target {
    Folder(String),
    /// Sibling folders found in one listing, fanned out when dequeued.
    Siblings(Vec<String>),
}

struct Task {
    depth: usize,
    target: Target,
}

struct OpenFolder {
    depth: usize,
    path: String,
    folder: Box<dyn FolderHandle>,
    filenames: std::vec::IntoIter<String>,
}

/// The lazy traversal. Yields at most one error, after which it is exhausted.
pub struct SearchIter<'a> {
    manager: &'a dyn FilesManager,
    queue: VecDeque<Task>,
    current: Option<OpenFolder>,
    skip_empty: bool,
    max_queue_size: usize,
    guard: Option<LimitGuard>,
    emitted: usize,
    done: bool,
}

impl SearchIter<'_> {
    /// Number of hits yielded so far.
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    fn advance(&mut self) -> Result<Option<SearchHit>> {
        loop {
            if let Some(guard) = &self.guard {
                guard.check_deadline()?;
            }

            if let Some(open) = &mut self.current {
                match open.filenames.next() {
                    Some(filename) => {
                        if self.skip_empty && open.folder.get_file(&filename).size()? == 0 {
                            continue;
                        }
                        let hit = SearchHit { depth: open.depth, path: open.path.clone(), filename };
                        self.emitted += 1;
                        if let Some(guard) = &self.guard {
                            guard.check(hit.depth, self.emitted)?;
                        }
                        return Ok(Some(hit));
                    }
                    None => {
                        let depth = open.depth;
                        let subfolders = open.folder.subfolder_paths()?;
                        self.current = None;
                        if !subfolders.is_empty() {
                            self.queue.push_back(Task { depth: depth + 1, target: Target::Siblings(subfolders) });
                        }
                        continue;
                    }
                }
            }

            let pending = self.queue.len();
            if pending > self.max_queue_size {
                return Err(Error::QueueOverflow { size: pending, max: self.max_queue_size });
            }

            let Some(task) = self.queue.pop_front() else {
                return Ok(None);
            };

            match task.target {
                Target::Siblings(paths) => {
                    for path in paths {
                        self.queue.push_back(Task { depth: task.depth, target: Target::Folder(path) });
                    }
                }
                Target::Folder(path) => {
                    let folder = self.manager.get_folder(&path);
                    if self.skip_empty && folder.size()? == 0 {
                        debug!("Skipping empty folder {}", path);
                        continue;
                    }
                    let filenames = folder.filenames()?;
                    debug!("Visiting {} at depth {} ({} files)", path, task.depth, filenames.len());
                    self.current = Some(OpenFolder {
                        depth: task.depth,
                        path,
                        folder,
                        filenames: filenames.into_iter(),
                    });
                }
            }
        }
    }
}

impl Iterator for SearchIter<'_> {
    type Item = Result<SearchHit>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.advance() {
            Ok(Some(hit)) => Some(Ok(hit)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl std::iter::FusedIterator for SearchIter<'_> {}
