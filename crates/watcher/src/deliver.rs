//! Copying a finished download into place

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("failed to create destination directory {}: {source}", path.display())]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to copy {} to {}: {source}", from.display(), to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} has no file name", .0.display())]
    NoFileName(PathBuf),
}

/// Copy `source` into `destination_dir` under its own file name
///
/// The directory is created if missing. An existing file of the same name
/// is overwritten. Returns the placed path and the number of bytes copied.
pub fn deliver(source: &Path, destination_dir: &Path) -> Result<(PathBuf, u64), DeliveryError> {
    let name = source
        .file_name()
        .ok_or_else(|| DeliveryError::NoFileName(source.to_path_buf()))?;

    fs::create_dir_all(destination_dir).map_err(|e| DeliveryError::DirectoryCreation {
        path: destination_dir.to_path_buf(),
        source: e,
    })?;

    let target = destination_dir.join(name);
    let copy_err = |e: io::Error| DeliveryError::Copy {
        from: source.to_path_buf(),
        to: target.clone(),
        source: e,
    };

    // Copying a file onto itself would truncate it
    if same_file(source, &target) {
        let bytes = fs::metadata(source).map_err(copy_err)?.len();
        tracing::info!("{} is already in place", target.display());
        return Ok((target, bytes));
    }

    let bytes = fs::copy(source, &target).map_err(copy_err)?;
    Ok((target, bytes))
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
