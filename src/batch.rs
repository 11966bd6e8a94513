//! Directory scanning and batch tallies.

use std::fs::{self, ReadDir};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::image_file::has_supported_extension;

/// Aggregate outcome of one batch run.
///
/// `total_considered == succeeded + failed` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total_considered: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchSummary {
    /// Tally one item.
    pub fn record(&mut self, success: bool) {
        self.total_considered += 1;
        if success {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }

    /// Fold another partial summary into this one.
    pub fn merge(&mut self, other: BatchSummary) {
        self.total_considered += other.total_considered;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
    }

    /// A batch succeeds when nothing failed, including when nothing was found.
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

impl Extend<bool> for BatchSummary {
    fn extend<I: IntoIterator<Item = bool>>(&mut self, iter: I) {
        for success in iter {
            self.record(success);
        }
    }
}

impl FromIterator<bool> for BatchSummary {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        let mut summary = BatchSummary::default();
        summary.extend(iter);
        summary
    }
}

/// Lazy, non-recursive scan of a directory for supported image files.
///
/// Re-running [`scan_images`] restarts the scan. Entries that can't be inspected are logged and
/// skipped.
pub struct ImageScan {
    entries: ReadDir,
}

/// Start scanning `dir` for supported images.
pub fn scan_images(dir: &Path) -> Result<ImageScan> {
    if !dir.is_dir() {
        return Err(Error::msg(format!(
            "'{}' is not a directory",
            dir.display()
        )));
    }

    let entries = fs::read_dir(dir)?;
    Ok(ImageScan { entries })
}

impl Iterator for ImageScan {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        for entry in self.entries.by_ref() {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(err) => {
                    warn!(error = %err, "failed to read directory entry; skipping");
                    continue;
                }
            };

            if !path.is_file() {
                continue;
            }

            if has_supported_extension(&path) {
                debug!(path = %path.display(), "found supported image");
                return Some(path);
            }

            debug!(path = %path.display(), "skipping unsupported file");
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_tallies_successes_and_failures() {
        let summary: BatchSummary = [true, false, true].into_iter().collect();
        assert_eq!(
            summary,
            BatchSummary {
                total_considered: 3,
                succeeded: 2,
                failed: 1,
            }
        );
        assert!(!summary.is_success());
    }

    #[test]
    fn empty_summary_is_a_success() {
        let summary: BatchSummary = std::iter::empty().collect();
        assert_eq!(summary.total_considered, 0);
        assert!(summary.is_success());
    }

    #[test]
    fn merge_adds_partial_summaries() {
        let mut left: BatchSummary = [true, true].into_iter().collect();
        let right: BatchSummary = [false].into_iter().collect();
        left.merge(right);
        assert_eq!(left.total_considered, 3);
        assert_eq!(left.succeeded, 2);
        assert_eq!(left.failed, 1);
    }

    #[test]
    fn scan_only_yields_supported_regular_files() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        for name in ["a.jpg", "b.JPEG", "c.png", "notes.txt"] {
            fs::write(dir.path().join(name), b"")?;
        }
        fs::create_dir(dir.path().join("nested.jpg"))?;
        fs::write(dir.path().join("nested.jpg").join("inner.jpg"), b"")?;

        let mut found: Vec<_> = scan_images(dir.path())?
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        found.sort();

        assert_eq!(found, vec!["a.jpg".to_string(), "b.JPEG".to_string()]);
        Ok(())
    }

    #[test]
    fn scan_rejects_non_directories() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let file = dir.path().join("a.jpg");
        fs::write(&file, b"")?;

        assert!(scan_images(&file).is_err());
        assert!(scan_images(&dir.path().join("missing")).is_err());
        Ok(())
    }
}
