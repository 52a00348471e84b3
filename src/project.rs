//! Project root discovery and target resolution.

use crate::error::FatalError;
use std::path::{Path, PathBuf};

/// Walk upward from `start` to the first directory containing `marker`.
pub fn find_project_root(start: &Path, marker: &str) -> Result<PathBuf, FatalError> {
    let start = if start.is_file() {
        start.parent().unwrap_or(start)
    } else {
        start
    };
    start
        .ancestors()
        .find(|dir| dir.join(marker).exists())
        .map(Path::to_path_buf)
        .ok_or_else(|| FatalError::ProjectRootNotFound {
            start: start.to_path_buf(),
            marker: marker.to_string(),
        })
}

/// Resolved file to validate and the project root it belongs to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target {
    pub root: PathBuf,
    pub file: PathBuf,
}

/// Resolve the CLI argument.
///
/// With no argument the root is discovered upward from `cwd`. A directory
/// argument names the root itself. A file argument is validated as given and
/// its parent directory is the root.
pub fn resolve_target(arg: Option<&Path>, cwd: &Path, file_name: &str) -> Result<Target, FatalError> {
    let Some(arg) = arg else {
        let root = find_project_root(cwd, file_name)?;
        let file = root.join(file_name);
        return Ok(Target { root, file });
    };

    let arg = if arg.is_absolute() {
        arg.to_path_buf()
    } else {
        cwd.join(arg)
    };
    if arg.is_dir() {
        let file = arg.join(file_name);
        if !file.is_file() {
            return Err(FatalError::NotFound(file));
        }
        return Ok(Target { root: arg, file });
    }
    if !arg.exists() {
        return Err(FatalError::NotFound(arg));
    }
    let root = arg.parent().map(Path::to_path_buf).unwrap_or_else(|| cwd.to_path_buf());
    Ok(Target { root, file: arg })
}
