//! Desktop integration: file manager and clipboard

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("could not open folder {}: {source}", path.display())]
pub struct FolderOpenError {
    pub path: PathBuf,
    #[source]
    source: io::Error,
}

/// Show a folder in the OS file manager
pub fn open_folder(path: &Path) -> Result<(), FolderOpenError> {
    open::that(path).map_err(|source| FolderOpenError {
        path: path.to_path_buf(),
        source,
    })
}

pub fn copy_to_clipboard(text: &str) -> Result<(), arboard::Error> {
    let mut clipboard = arboard::Clipboard::new()?;
    clipboard.set_text(text.to_owned())
}

pub fn read_clipboard() -> Result<String, arboard::Error> {
    arboard::Clipboard::new()?.get_text()
}
