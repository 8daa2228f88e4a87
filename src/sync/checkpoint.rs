//! Checkpoint log for resumable runs
//!
//! The log is a plain text file with one relative path per line, only
//! ever appended to. [`Checkpoint`] is the in-memory set loaded at
//! startup; [`CompletionLedger`] owns the append handle together with the
//! run's progress counters, behind a single lock.

use crate::error::{IoResultExt, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Relative paths already transferred by an earlier run
#[derive(Debug, Clone, Default)]
pub struct Checkpoint {
    completed: HashSet<String>,
}

impl Checkpoint {
    /// Empty checkpoint (resume disabled or first run)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load a checkpoint log. A missing file is an empty checkpoint.
    pub fn load(path: &Path) -> Result<Self> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("No checkpoint at {}, starting fresh", path.display());
                return Ok(Self::empty());
            }
            Err(e) => return Err(e).with_path(path),
        };

        let mut completed = HashSet::new();
        for line in BufReader::new(file).lines() {
            let line = line.with_path(path)?;
            let entry = line.trim_end_matches('\r');
            if !entry.is_empty() {
                completed.insert(entry.to_string());
            }
        }

        tracing::info!(
            "Loaded {} checkpointed paths from {}",
            completed.len(),
            path.display()
        );
        Ok(Self { completed })
    }

    /// Whether a relative path is already done
    pub fn contains(&self, relative: &str) -> bool {
        self.completed.contains(relative)
    }

    /// Number of checkpointed paths
    pub fn len(&self) -> usize {
        self.completed.len()
    }

    /// Whether the checkpoint is empty
    pub fn is_empty(&self) -> bool {
        self.completed.is_empty()
    }
}

/// Point-in-time copy of the run counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LedgerSnapshot {
    /// Files fully sent
    pub files_completed: u64,
    /// Bytes in fully sent files
    pub bytes_completed: u64,
    /// Files that failed
    pub files_failed: u64,
}

struct LedgerState {
    log: File,
    counters: LedgerSnapshot,
}

/// Append-only checkpoint writer plus progress counters
pub struct CompletionLedger {
    path: PathBuf,
    state: Mutex<LedgerState>,
}

impl CompletionLedger {
    /// Open (or create) the checkpoint log for appending
    pub fn open(path: &Path) -> Result<Self> {
        let log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_path(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            state: Mutex::new(LedgerState {
                log,
                counters: LedgerSnapshot::default(),
            }),
        })
    }

    /// Checkpoint log location
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Record a fully sent file: count it and append its path.
    ///
    /// Counters are updated even if the append fails; the returned
    /// snapshot reflects them.
    pub fn record_success(&self, relative: &str, bytes: u64) -> (LedgerSnapshot, Result<()>) {
        let mut state = self.lock();
        state.counters.files_completed += 1;
        state.counters.bytes_completed += bytes;
        let snapshot = state.counters;

        let line = format!("{}\n", relative);
        let appended = state
            .log
            .write_all(line.as_bytes())
            .and_then(|_| state.log.flush())
            .with_path(&self.path);

        (snapshot, appended)
    }

    /// Record a file that could not be sent
    pub fn record_failure(&self) -> LedgerSnapshot {
        let mut state = self.lock();
        state.counters.files_failed += 1;
        state.counters
    }

    /// Current counters
    pub fn snapshot(&self) -> LedgerSnapshot {
        self.lock().counters
    }
}
