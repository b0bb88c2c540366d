//! Placement codes
//!
//! A code is a clipboard-portable string of the form `<url>|<destination>`.
//! The destination may embed the `%USER%` placeholder, which is resolved
//! against the home directory of whoever places the file.

use thiserror::Error;

/// Separator between the URL and the destination path
pub const DELIMITER: char = '|';

/// Errors produced while parsing or generating a code
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodeError {
    #[error("invalid code format, expected URL|destination path")]
    Malformed,

    #[error("a download URL is required")]
    MissingUrl,

    #[error("a destination path is required")]
    MissingPath,

    #[error("URL must not contain '{}'", DELIMITER)]
    DelimiterInUrl,
}

/// A parsed placement code
///
/// Both halves are kept exactly as written; the destination is resolved
/// later by [`crate::PathResolver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementRequest {
    source_url: String,
    destination_path: String,
}

impl PlacementRequest {
    /// Parse a pasted code, splitting on the first delimiter only
    pub fn parse(code: &str) -> Result<Self, CodeError> {
        let (url, path) = code.split_once(DELIMITER).ok_or(CodeError::Malformed)?;

        Ok(Self {
            source_url: url.to_string(),
            destination_path: path.to_string(),
        })
    }

    /// URL that triggers the download
    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    /// Destination path before placeholder resolution
    pub fn destination_path(&self) -> &str {
        &self.destination_path
    }
}

/// Build a code from a URL and a destination path
///
/// Surrounding whitespace is trimmed from both inputs.
pub fn generate_code(url: &str, path: &str) -> Result<String, CodeError> {
    let url = url.trim();
    let path = path.trim();

    if url.is_empty() {
        return Err(CodeError::MissingUrl);
    }
    if path.is_empty() {
        return Err(CodeError::MissingPath);
    }
    // The parser splits on the first delimiter, so it can only live in the path
    if url.contains(DELIMITER) {
        return Err(CodeError::DelimiterInUrl);
    }

    Ok(format!("{}{}{}", url, DELIMITER, path))
}
