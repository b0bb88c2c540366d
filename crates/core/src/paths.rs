//! Destination path resolution

use std::path::{PathBuf, MAIN_SEPARATOR};
use thiserror::Error;

/// Literal token replaced with the current user's home directory
pub const HOME_PLACEHOLDER: &str = "%USER%";

/// Name of the download directory under home
const DOWNLOADS_DIR: &str = "Downloads";

#[derive(Debug, Error)]
pub enum PathError {
    #[error("could not determine the home directory of the current user")]
    HomeUnavailable,
}

/// Resolves raw destination paths against one home directory
#[derive(Debug, Clone)]
pub struct PathResolver {
    home: PathBuf,
}

impl PathResolver {
    /// Resolver for the current OS user
    pub fn from_env() -> Result<Self, PathError> {
        let home = dirs::home_dir().ok_or(PathError::HomeUnavailable)?;
        Ok(Self::with_home(home))
    }

    /// Resolver for an explicit home directory
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    /// The watched download directory, always `<home>/Downloads`
    pub fn downloads_dir(&self) -> PathBuf {
        self.home.join(DOWNLOADS_DIR)
    }

    /// Resolve a raw destination path
    ///
    /// Surrounding whitespace is dropped, every `%USER%` is replaced with the
    /// home directory, then a leading `~` is expanded.
    pub fn resolve(&self, raw: &str) -> PathBuf {
        let raw = raw.trim();
        let home = self.home.to_string_lossy();
        let substituted = raw.replace(HOME_PLACEHOLDER, &home);
        self.expand_tilde(&substituted)
    }

    /// Rewrite a path under home into its `%USER%` form
    ///
    /// Paths outside home are returned resolved but otherwise unchanged.
    pub fn portable(&self, raw: &str) -> String {
        let resolved = self.resolve(raw);

        match resolved.strip_prefix(&self.home) {
            Ok(rest) if rest.as_os_str().is_empty() => HOME_PLACEHOLDER.to_string(),
            Ok(rest) => format!("{}{}{}", HOME_PLACEHOLDER, MAIN_SEPARATOR, rest.display()),
            Err(_) => resolved.display().to_string(),
        }
    }

    fn expand_tilde(&self, path: &str) -> PathBuf {
        if path == "~" {
            return self.home.clone();
        }

        let rest = path
            .strip_prefix("~/")
            .or_else(|| if cfg!(windows) { path.strip_prefix("~\\") } else { None });

        match rest {
            Some(rest) => self.home.join(rest),
            None => PathBuf::from(path),
        }
    }
}
