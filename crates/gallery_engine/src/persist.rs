use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory {path:?} missing or not writable: {reason}")]
    OutputDir { path: PathBuf, reason: String },
    #[error("cannot write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Ensure the output directory exists, creating it and its parents if needed.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    let output_dir = |reason: String| PersistError::OutputDir {
        path: dir.to_path_buf(),
        reason,
    };
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| output_dir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(output_dir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| output_dir(e.to_string()))?;
    }
    // writability probe
    NamedTempFile::new_in(dir).map_err(|e| output_dir(e.to_string()))?;
    Ok(())
}

/// Atomically write `content` to `{dir}/{filename}`, replacing any existing file.
pub fn save_document(dir: &Path, filename: &str, content: &[u8]) -> Result<PathBuf, PersistError> {
    ensure_output_dir(dir)?;

    let target = dir.join(filename);
    let write_error = |source: io::Error| PersistError::Write {
        path: target.clone(),
        source,
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(write_error)?;
    tmp.write_all(content).map_err(write_error)?;
    tmp.flush().map_err(write_error)?;
    tmp.as_file_mut().sync_all().map_err(write_error)?;

    if target.exists() {
        fs::remove_file(&target).map_err(write_error)?;
    }
    tmp.persist(&target).map_err(|e| write_error(e.error))?;
    Ok(target)
}
