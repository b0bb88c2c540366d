//! In-progress download filtering
//!
//! Browsers write to a temporary name (`.crdownload`, `.part`, ...) and
//! rename on completion. Those temporary files are never candidates.

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::path::Path;

/// Matches file names carrying an in-progress download suffix
pub struct InProgressFilter {
    matcher: Gitignore,
}

impl InProgressFilter {
    /// Build a filter from suffixes such as `.crdownload`
    pub fn new<S: AsRef<str>>(suffixes: &[S]) -> Result<Self, ignore::Error> {
        let mut builder = GitignoreBuilder::new("");
        builder.case_insensitive(true)?;

        for suffix in suffixes {
            builder.add_line(None, &format!("*{}", suffix.as_ref()))?;
        }

        Ok(Self {
            matcher: builder.build()?,
        })
    }

    /// Check whether `path` names a download that is still being written
    pub fn is_in_progress(&self, path: &Path) -> bool {
        match path.file_name() {
            Some(name) => self.matcher.matched(Path::new(name), false).is_ignore(),
            None => false,
        }
    }
}
