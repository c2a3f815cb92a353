//! Filtered, traversal-safe extraction of source archives

use crate::error::Result;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info, warn};

/// What one extraction pass did
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOutcome {
    /// Entries written under the destination directory
    pub extracted: usize,
    /// Entries rejected for containing a parent-directory traversal
    /// segment. Reported for diagnostics, never silently dropped.
    pub skipped_unsafe: usize,
}

/// Extracts only filtered, traversal-safe entries from a zip-compatible
/// archive into a destination directory.
pub struct SafeZipExtractor;

impl SafeZipExtractor {
    /// Extract entries whose name ends with `suffix` (case-insensitive)
    /// under `dest_dir`, preserving their relative paths.
    ///
    /// An entry whose name contains a `..` segment is never extracted and
    /// is counted in [`ExtractOutcome::skipped_unsafe`]. Entries not
    /// matching the suffix are skipped without counting; they are merely
    /// uninteresting.
    pub fn extract(archive_bytes: &[u8], suffix: &str, dest_dir: &Path) -> Result<ExtractOutcome> {
        let mut archive = zip::ZipArchive::new(Cursor::new(archive_bytes))?;
        let suffix_lower = suffix.to_lowercase();
        let mut outcome = ExtractOutcome::default();

        for index in 0..archive.len() {
            let mut entry = archive.by_index(index)?;
            let name = entry.name().to_string();

            if has_parent_segment(&name) {
                warn!(entry = %name, "rejecting traversal-unsafe archive entry");
                outcome.skipped_unsafe += 1;
                continue;
            }
            if !name.to_lowercase().ends_with(&suffix_lower) {
                debug!(entry = %name, "skipping non-source entry");
                continue;
            }

            // enclosed_name is a second guard against absolute paths and
            // platform-specific separators the segment check misses
            let relative = match entry.enclosed_name() {
                Some(path) => path.to_path_buf(),
                None => {
                    warn!(entry = %name, "rejecting archive entry with unsafe path");
                    outcome.skipped_unsafe += 1;
                    continue;
                }
            };

            let out_path = dest_dir.join(relative);
            if let Some(parent) = out_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut out_file = std::fs::File::create(&out_path)?;
            std::io::copy(&mut entry, &mut out_file)?;
            outcome.extracted += 1;
        }

        if outcome.skipped_unsafe > 0 {
            info!(count = outcome.skipped_unsafe, "skipped unsafe zipped names");
        }
        Ok(outcome)
    }
}

fn has_parent_segment(name: &str) -> bool {
    name.split(['/', '\\']).any(|segment| segment == "..")
}
