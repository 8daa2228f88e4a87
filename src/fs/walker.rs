//! Source tree walker
//!
//! Feeds one [`TransferJob`] per regular file into a bounded queue.
//! Dropping the sender when the walk ends is what tells the workers
//! there is nothing left.

use crate::network::to_wire_path;
use crate::sync::Checkpoint;
use crossbeam::channel::Sender;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One file to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferJob {
    /// Absolute (or root-joined) source path
    pub source: PathBuf,
    /// Wire form of the path relative to the root
    pub relative: String,
    /// Size at enumeration time
    pub size: u64,
}

/// Outcome of a walk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    /// Jobs handed to the queue
    pub queued: u64,
    /// Bytes in queued jobs
    pub queued_bytes: u64,
    /// Files skipped because they were checkpointed
    pub skipped: u64,
    /// Entries that could not be read or represented
    pub errors: u64,
}

/// Recursive enumerator of a source root
pub struct DirectoryWalker {
    root: PathBuf,
    checkpoint: Checkpoint,
}

impl DirectoryWalker {
    /// Walk `root` without skipping anything
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            checkpoint: Checkpoint::empty(),
        }
    }

    /// Skip files present in `checkpoint`
    pub fn with_checkpoint(mut self, checkpoint: Checkpoint) -> Self {
        self.checkpoint = checkpoint;
        self
    }

    /// Root being walked
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Enumerate the tree into `jobs`, blocking while the queue is full.
    ///
    /// The sender is dropped on return, closing the queue exactly once.
    pub fn feed(&self, jobs: Sender<TransferJob>) -> WalkStats {
        let mut stats = WalkStats::default();

        for entry in WalkDir::new(&self.root).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let at = err
                        .path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| self.root.display().to_string());
                    tracing::error!("Error walking {}: {}", at, err);
                    stats.errors += 1;
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let relative = match entry
                .path()
                .strip_prefix(&self.root)
                .map_err(|e| e.to_string())
                .and_then(|rel| to_wire_path(rel).map_err(|e| e.to_string()))
            {
                Ok(relative) => relative,
                Err(reason) => {
                    tracing::warn!("Skipping {}: {}", entry.path().display(), reason);
                    stats.errors += 1;
                    continue;
                }
            };

            if self.checkpoint.contains(&relative) {
                tracing::trace!("Already transferred: {}", relative);
                stats.skipped += 1;
                continue;
            }

            let size = match entry.metadata() {
                Ok(metadata) => metadata.len(),
                Err(err) => {
                    tracing::error!("Error reading metadata of {}: {}", entry.path().display(), err);
                    stats.errors += 1;
                    continue;
                }
            };

            let job = TransferJob {
                source: entry.path().to_path_buf(),
                relative,
                size,
            };
            if jobs.send(job).is_err() {
                tracing::warn!("Job queue closed early; stopping walk of {}", self.root.display());
                break;
            }
            stats.queued += 1;
            stats.queued_bytes += size;
        }

        tracing::debug!(
            "Walk of {} done: {} queued, {} skipped, {} errors",
            self.root.display(),
            stats.queued,
            stats.skipped,
            stats.errors
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam::channel::{bounded, unbounded};
    use std::fs::File;
    use std::io::Write;
    use std::thread;
    use tempfile::TempDir;

    fn create_test_tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        File::create(dir.path().join("a.txt")).unwrap().write_all(b"hello").unwrap();
        std::fs::create_dir_all(dir.path().join("b")).unwrap();
        File::create(dir.path().join("b/c.txt"))
            .unwrap()
            .write_all(b"0123456789")
            .unwrap();
        std::fs::create_dir_all(dir.path().join("empty/nested")).unwrap();
        dir
    }

    fn collect(walker: &DirectoryWalker) -> (Vec<TransferJob>, WalkStats) {
        let (tx, rx) = unbounded();
        let stats = walker.feed(tx);
        let mut jobs: Vec<_> = rx.iter().collect();
        jobs.sort_by(|a, b| a.relative.cmp(&b.relative));
        (jobs, stats)
    }

    #[test]
    fn test_walk_emits_regular_files_only() {
        let dir = create_test_tree();
        let (jobs, stats) = collect(&DirectoryWalker::new(dir.path()));

        let relatives: Vec<_> = jobs.iter().map(|j| j.relative.as_str()).collect();
        assert_eq!(relatives, vec!["a.txt", "b/c.txt"]);
        assert_eq!(jobs[0].size, 5);
        assert_eq!(jobs[1].size, 10);
        assert_eq!(jobs[1].source, dir.path().join("b").join("c.txt"));
        assert_eq!(stats.queued, 2);
        assert_eq!(stats.queued_bytes, 15);
        assert_eq!(stats.errors, 0);
    }

    #[test]
    fn test_walk_skips_checkpointed() {
        let dir = create_test_tree();
        let log = TempDir::new().unwrap();
        let log_path = log.path().join("checkpoint.log");
        std::fs::write(&log_path, "b/c.txt\n").unwrap();

        let walker =
            DirectoryWalker::new(dir.path()).with_checkpoint(Checkpoint::load(&log_path).unwrap());
        let (jobs, stats) = collect(&walker);

        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].relative, "a.txt");
        assert_eq!(stats.skipped, 1);
    }

    #[test]
    fn test_missing_root_closes_queue() {
        let dir = TempDir::new().unwrap();
        let (jobs, stats) = collect(&DirectoryWalker::new(dir.path().join("nope")));
        assert!(jobs.is_empty());
        assert_eq!(stats.errors, 1);
    }

    #[test]
    fn test_bounded_queue_applies_backpressure() {
        let dir = TempDir::new().unwrap();
        for i in 0..20 {
            std::fs::write(dir.path().join(format!("f{:02}", i)), b"x").unwrap();
        }

        let (tx, rx) = bounded(2);
        let root = dir.path().to_path_buf();
        let walker = thread::spawn(move || DirectoryWalker::new(root).feed(tx));

        let received: Vec<_> = rx.iter().collect();
        let stats = walker.join().unwrap();
        assert_eq!(received.len(), 20);
        assert_eq!(stats.queued, 20);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_are_not_followed() {
        let dir = create_test_tree();
        std::os::unix::fs::symlink(dir.path().join("a.txt"), dir.path().join("link.txt")).unwrap();

        let (jobs, _) = collect(&DirectoryWalker::new(dir.path()));
        assert!(jobs.iter().all(|j| j.relative != "link.txt"));
    }
}
