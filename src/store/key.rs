//! Store key normalization
//!
//! Every read and write goes through [`store_key`], so the same file always
//! maps to the same entry no matter how its path was spelled.

use std::path::{Component, Path, PathBuf};

/// Workspace root used to relativize store keys.
#[derive(Debug, Clone)]
pub struct KeyRoot {
    root: PathBuf,
    canonical: Option<PathBuf>,
}

impl KeyRoot {
    pub fn new(root: &Path) -> Self {
        Self {
            root: lexical_normalize(root),
            canonical: dunce::canonicalize(root).ok(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    fn relativize(&self, path: &Path) -> Option<PathBuf> {
        let lexical = lexical_normalize(path);
        if let Ok(rel) = lexical.strip_prefix(&self.root) {
            return Some(rel.to_path_buf());
        }
        let canonical_root = self.canonical.as_ref()?;
        if let Ok(rel) = lexical.strip_prefix(canonical_root) {
            return Some(rel.to_path_buf());
        }
        let canonical_path = dunce::canonicalize(path).ok()?;
        canonical_path
            .strip_prefix(canonical_root)
            .ok()
            .map(Path::to_path_buf)
    }
}

/// Compute the store key for `path`.
///
/// Absolute paths under `root` become root-relative; anything else is kept as
/// given. Relative input is taken to be root-relative already. Separators are
/// always `/`.
pub fn store_key(root: Option<&KeyRoot>, path: &Path) -> String {
    let key_path = if path.is_absolute() {
        root.and_then(|r| r.relativize(path))
            .filter(|rel| !rel.as_os_str().is_empty())
            .unwrap_or_else(|| lexical_normalize(path))
    } else {
        lexical_normalize(path)
    };
    path_to_key(&key_path)
}

/// Resolve a store key back to a filesystem path.
pub fn key_to_path(root: Option<&KeyRoot>, key: &str) -> PathBuf {
    let path = PathBuf::from(key);
    match root {
        Some(r) if path.is_relative() => r.path().join(path),
        _ => path,
    }
}

fn path_to_key(path: &Path) -> String {
    let s = path.to_string_lossy().replace('\\', "/");
    let mut s = s.as_str();
    while let Some(rest) = s.strip_prefix("./") {
        s = rest;
    }
    if s.len() > 1 {
        s = s.trim_end_matches('/');
    }
    s.to_string()
}

/// Remove `.` components and resolve `..` against preceding normal components
/// without touching the filesystem.
fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
