//! Comment Store
//!
//! Durable cache mapping (file, abstraction level) to previously generated
//! commentary, invalidated by content fingerprint. Backed by a single JSON
//! document that is rewritten in full after every mutation.
//!
//! The store is advisory: nothing here returns an error to the caller. Read
//! failures fall back to an empty document and write failures are logged while
//! the in-memory document stays authoritative.

pub mod document;
pub mod key;
pub mod persistence;

pub use document::{StoreDocument, StoreMetadata, StoredEntry, CURRENT_FORMAT_VERSION};
pub use key::{store_key, KeyRoot};

use crate::fingerprint;
use crate::level::AbstractionLevel;
use chrono::{DateTime, Utc};
use persistence::Loaded;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File name of the cache document under the workspace root.
pub const DEFAULT_STORE_FILE_NAME: &str = ".margin-comments.json";

/// Read-only snapshot of store counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreStats {
    pub total_files: usize,
    pub total_comments: usize,
    pub storage_bytes: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub format_version: String,
}

/// One row of [`CommentStore::list_stored_files`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredFileSummary {
    pub path: String,
    pub levels: Vec<AbstractionLevel>,
    pub last_updated: DateTime<Utc>,
    pub total_comments: usize,
}

pub struct CommentStore {
    path: PathBuf,
    root: Option<KeyRoot>,
    document: StoreDocument,
    // Backing file holds something other than `document` until the next write.
    disk_unusable: bool,
}

impl CommentStore {
    /// Open the store for a workspace root using the default file name.
    pub fn open(root: &Path) -> Self {
        Self::open_with_file_name(root, DEFAULT_STORE_FILE_NAME)
    }

    pub fn open_with_file_name(root: &Path, file_name: &str) -> Self {
        Self::open_at(root.join(file_name), Some(root))
    }

    /// Open the store at an explicit file path.
    ///
    /// Keys are relativized against `root` when one is given. A missing file
    /// is created immediately; an unreadable or malformed one is replaced by an
    /// empty document on the next write.
    pub fn open_at(path: PathBuf, root: Option<&Path>) -> Self {
        let now = Utc::now();
        let mut store = Self {
            root: root.map(KeyRoot::new),
            document: StoreDocument::empty(now),
            disk_unusable: false,
            path,
        };

        match persistence::load_document(&store.path, now) {
            Ok(Loaded::Document { document, migrated }) => {
                store.document = document;
                if migrated {
                    info!(path = %store.path.display(), "Upgraded comment store format");
                    store.persist();
                }
            }
            Ok(Loaded::Missing) => {
                debug!(path = %store.path.display(), "Creating comment store");
                store.persist();
            }
            Ok(Loaded::Unusable) => {
                warn!(path = %store.path.display(), "Discarding unusable comment store");
                store.disk_unusable = true;
            }
            Err(e) => {
                warn!(
                    path = %store.path.display(),
                    error = %e,
                    "Failed to read comment store, continuing with an empty cache"
                );
            }
        }

        store
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn document(&self) -> &StoreDocument {
        &self.document
    }

    /// Normalized key for `path`.
    pub fn key_for(&self, path: &Path) -> String {
        store_key(self.root.as_ref(), path)
    }

    /// True iff an entry exists for (path, level) and it was generated from
    /// exactly `current_content`.
    pub fn has_valid_entry(&self, path: &Path, level: AbstractionLevel, current_content: &str) -> bool {
        self.entry(path, level)
            .map(|entry| fingerprint::matches(&entry.fingerprint, current_content))
            .unwrap_or(false)
    }

    /// Stored comments for (path, level), fresh or not.
    pub fn get_entry(&self, path: &Path, level: AbstractionLevel) -> Option<&[String]> {
        self.entry(path, level).map(|entry| entry.comments.as_slice())
    }

    /// Full stored record for (path, level).
    pub fn entry(&self, path: &Path, level: AbstractionLevel) -> Option<&StoredEntry> {
        self.document
            .entries
            .get(&self.key_for(path))
            .and_then(|levels| levels.get(&level))
    }

    /// Insert or overwrite the entry for (path, level) and persist.
    pub fn put_entry(
        &mut self,
        path: &Path,
        level: AbstractionLevel,
        comments: Vec<String>,
        current_content: &str,
        model: &str,
        language: &str,
    ) {
        let now = Utc::now();
        let key = self.key_for(path);
        let entry = StoredEntry {
            comments,
            fingerprint: fingerprint::digest(current_content),
            generated_at: now,
            model: model.to_string(),
            language: language.to_string(),
            abstraction_level: level,
        };
        debug!(file = %key, level = %level, comments = entry.comments.len(), "Storing commentary");
        self.document.entries.entry(key).or_default().insert(level, entry);
        self.document.touch(now);
        self.persist();
    }

    /// Delete one (path, level) entry; the file disappears with its last level.
    pub fn remove_entry(&mut self, path: &Path, level: AbstractionLevel) {
        let key = self.key_for(path);
        let Some(levels) = self.document.entries.get_mut(&key) else {
            return;
        };
        if levels.remove(&level).is_none() {
            return;
        }
        if levels.is_empty() {
            self.document.entries.remove(&key);
        }
        self.document.touch(Utc::now());
        self.persist();
    }

    /// Delete every level stored for `path`.
    pub fn remove_file(&mut self, path: &Path) {
        let key = self.key_for(path);
        if self.document.entries.remove(&key).is_none() {
            return;
        }
        self.document.touch(Utc::now());
        self.persist();
    }

    /// Remove all entries.
    pub fn clear(&mut self) {
        self.document.entries.clear();
        self.document.touch(Utc::now());
        self.persist();
    }

    /// Drop entries whose file no longer exists. Returns how many files were removed.
    pub fn prune_missing_files(&mut self) -> usize {
        let root = self.root.clone();
        let before = self.document.entries.len();
        self.document
            .entries
            .retain(|file_key, _| key::key_to_path(root.as_ref(), file_key).exists());
        let removed = before - self.document.entries.len();
        if removed > 0 {
            info!(removed, "Pruned commentary for deleted files");
            self.document.touch(Utc::now());
            self.persist();
        }
        removed
    }

    /// Counters for the in-memory document. `storage_bytes` is the size of the
    /// backing file, or 0 while that file is unusable and not yet replaced.
    pub fn stats(&self) -> StoreStats {
        let metadata = &self.document.metadata;
        let storage_bytes = if self.disk_unusable {
            0
        } else {
            persistence::file_size(&self.path)
        };
        StoreStats {
            total_files: metadata.total_files,
            total_comments: metadata.total_comments,
            storage_bytes,
            created_at: metadata.created_at,
            updated_at: metadata.last_updated,
            format_version: self.document.format_version.clone(),
        }
    }

    /// One row per stored file, most recently updated first.
    pub fn list_stored_files(&self) -> Vec<StoredFileSummary> {
        let mut rows: Vec<StoredFileSummary> = self
            .document
            .entries
            .iter()
            .filter_map(|(path, levels)| {
                let last_updated = levels.values().map(|e| e.generated_at).max()?;
                Some(StoredFileSummary {
                    path: path.clone(),
                    levels: levels.keys().copied().collect(),
                    last_updated,
                    total_comments: levels.values().map(|e| e.comments.len()).sum(),
                })
            })
            .collect();
        rows.sort_by(|a, b| {
            b.last_updated
                .cmp(&a.last_updated)
                .then_with(|| a.path.cmp(&b.path))
        });
        rows
    }

    fn persist(&mut self) {
        match persistence::save_document(&self.path, &self.document) {
            Ok(()) => self.disk_unusable = false,
            Err(e) => warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to persist comment store; keeping in-memory copy"
            ),
        }
    }
}
