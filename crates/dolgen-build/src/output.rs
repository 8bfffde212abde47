//! Atomic output writing
//!
//! Every file the generator produces is written to a temporary file in the
//! destination directory and then renamed over the target, so an interrupted
//! run never leaves a truncated `build.ninja` behind.

use crate::error::{BuildError, BuildResult};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Replace `path` with `contents`
pub fn write_atomic(path: &Path, contents: &str) -> BuildResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| BuildError::io(dir, e))?;

    let mut file = NamedTempFile::new_in(dir).map_err(|e| BuildError::io(dir, e))?;
    file.write_all(contents.as_bytes())
        .map_err(|e| BuildError::io(file.path(), e))?;
    file.persist(path).map_err(|e| BuildError::io(path, e.error))?;

    debug!(path = %path.display(), bytes = contents.len(), "wrote output");
    Ok(())
}
