//! Workspace root detection and path resolution for command arguments.

use crate::config::WORKSPACE_CONFIG_DIR;
use std::path::{Path, PathBuf};

/// Nearest ancestor of `start` (inclusive) holding `.git` or `.margin`, else
/// `start` itself. The result is canonical when the path exists.
pub fn detect_workspace_root(start: &Path) -> PathBuf {
    let start = dunce::canonicalize(start).unwrap_or_else(|_| start.to_path_buf());
    start
        .ancestors()
        .find(|dir| dir.join(".git").exists() || dir.join(WORKSPACE_CONFIG_DIR).is_dir())
        .map(Path::to_path_buf)
        .unwrap_or(start)
}

/// Absolute form of a user-supplied file path, resolved against `cwd`.
pub fn resolve_input_path(cwd: &Path, path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    };
    dunce::canonicalize(&absolute).unwrap_or(absolute)
}
