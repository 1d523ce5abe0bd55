//! Site directory analysis for cost estimation.

use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// Totals for a site directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteStats {
    pub total_bytes: u64,
    pub file_count: u64,
    /// Entries that could not be read; they are left out of the totals.
    pub warnings: Vec<String>,
}

/// Sum regular-file sizes under `root` without following symlinks.
///
/// Unreadable entries become warnings; the walk never aborts on them,
/// so a best-effort estimate is always available.
pub fn walk_site_dir(root: &Path) -> SiteStats {
    let mut stats = SiteStats::default();

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                let at = e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from(root));
                let msg = format!("skipping {}: {}", at.display(), e);
                warn!("{}", msg);
                stats.warnings.push(msg);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        match entry.metadata() {
            Ok(meta) => {
                stats.total_bytes += meta.len();
                stats.file_count += 1;
            }
            Err(e) => {
                let msg = format!("skipping {}: {}", entry.path().display(), e);
                warn!("{}", msg);
                stats.warnings.push(msg);
            }
        }
    }

    stats
}
