//! Read-only directory listing (`--mode dir`)

use crate::progress::{truncate_path, ProgressReporter};
use std::path::Path;
use walkdir::WalkDir;

/// Totals of a listing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListSummary {
    /// Non-directory entries
    pub files: u64,
    /// Directories, root included
    pub dirs: u64,
    /// Entries that could not be read
    pub errors: u64,
}

/// Walk `root`, showing each entry on the status line
pub fn list_tree(root: &Path, progress: &ProgressReporter) -> ListSummary {
    let mut summary = ListSummary::default();

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::error!("Error walking files: {}", err);
                summary.errors += 1;
                continue;
            }
        };

        if entry.file_type().is_dir() {
            summary.dirs += 1;
            continue;
        }

        summary.files += 1;
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        progress.set_status(format!(
            "{:08} - {:08} - {}",
            summary.files,
            summary.dirs,
            truncate_path(&relative.to_string_lossy(), 60)
        ));
    }

    progress.finish();
    summary
}
