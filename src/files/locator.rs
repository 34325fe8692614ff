//! File resolution by name or recency rank within a search root

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use walkdir::WalkDir;

use crate::{Error, Result};

/// A file resolved within the search root
#[derive(Debug, Clone)]
pub struct ResolvedFile {
    pub file_name: String,
    pub full_path: PathBuf,
    pub modified_time: DateTime<Utc>,
}

/// Resolves files under a search root, read-only
#[derive(Debug, Clone)]
pub struct FileLocator {
    search_root: PathBuf,
}

impl FileLocator {
    /// Create a locator rooted at `search_root`
    #[must_use]
    pub fn new(search_root: impl Into<PathBuf>) -> Self {
        Self {
            search_root: search_root.into(),
        }
    }

    /// The root this locator searches under
    #[must_use]
    pub fn search_root(&self) -> &Path {
        &self.search_root
    }

    /// Find a file by name, case-insensitive, recursive
    ///
    /// Returns the first match in directory-walk order; which match wins
    /// when duplicates exist is undefined across platforms.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no file matches
    pub fn find_by_name(&self, name: &str) -> Result<ResolvedFile> {
        for entry in WalkDir::new(&self.search_root)
            .into_iter()
            .filter_map(std::result::Result::ok)
        {
            if !entry.file_type().is_file() {
                continue;
            }
            if entry.file_name().to_string_lossy().eq_ignore_ascii_case(name) {
                let modified_time = modified_time(entry.path()).unwrap_or_else(Utc::now);
                tracing::debug!(path = %entry.path().display(), "file resolved by name");
                return Ok(ResolvedFile {
                    file_name: entry.file_name().to_string_lossy().into_owned(),
                    full_path: entry.path().to_path_buf(),
                    modified_time,
                });
            }
        }

        Err(Error::NotFound(format!(
            "file '{name}' not found under {}",
            self.search_root.display()
        )))
    }

    /// All files matching `extension` modified within `within_days`,
    /// sorted by modification time descending (most recent first)
    ///
    /// This is the full-list form of recency lookup; [`Self::nth_recent`]
    /// selects a single rank from it. Files whose metadata cannot be read
    /// are skipped.
    #[must_use]
    pub fn list_recent(&self, within_days: i64, extension: &str) -> Vec<ResolvedFile> {
        let cutoff = Utc::now() - Duration::days(within_days);
        let suffix = extension.to_ascii_lowercase();

        let mut files: Vec<ResolvedFile> = WalkDir::new(&self.search_root)
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| {
                entry
                    .file_name()
                    .to_string_lossy()
                    .to_ascii_lowercase()
                    .ends_with(&suffix)
            })
            .filter_map(|entry| {
                let modified_time = modified_time(entry.path())?;
                (modified_time >= cutoff).then(|| ResolvedFile {
                    file_name: entry.file_name().to_string_lossy().into_owned(),
                    full_path: entry.path().to_path_buf(),
                    modified_time,
                })
            })
            .collect();

        files.sort_by(|a, b| b.modified_time.cmp(&a.modified_time));
        files
    }

    /// The `rank`-th most recent matching file, 1-based
    ///
    /// `rank = 1` is the most recent. A rank beyond the list length clamps
    /// to the oldest available file rather than failing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no file matches at all
    pub fn nth_recent(
        &self,
        rank: usize,
        within_days: i64,
        extension: &str,
    ) -> Result<ResolvedFile> {
        let mut files = self.list_recent(within_days, extension);
        if files.is_empty() {
            return Err(Error::NotFound(format!(
                "no '{extension}' files modified in the last {within_days} days under {}",
                self.search_root.display()
            )));
        }

        let idx = rank.max(1).min(files.len()) - 1;
        Ok(files.swap_remove(idx))
    }
}

fn modified_time(path: &Path) -> Option<DateTime<Utc>> {
    let modified = path.metadata().ok()?.modified().ok()?;
    Some(DateTime::<Utc>::from(modified))
}
