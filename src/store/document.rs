//! Persisted store document and its migration.

use crate::level::AbstractionLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

pub const CURRENT_FORMAT_VERSION: &str = "2.0";

/// Commentary generated for one (file, level) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredEntry {
    pub comments: Vec<String>,
    pub fingerprint: String,
    pub generated_at: DateTime<Utc>,
    pub model: String,
    pub language: String,
    pub abstraction_level: AbstractionLevel,
}

/// Aggregate counters, always derived from `entries`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreMetadata {
    pub total_files: usize,
    pub total_comments: usize,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl StoreMetadata {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            total_files: 0,
            total_comments: 0,
            created_at: now,
            last_updated: now,
        }
    }
}

pub type LevelEntries = BTreeMap<AbstractionLevel, StoredEntry>;

/// Root of the JSON cache file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreDocument {
    pub format_version: String,
    pub metadata: StoreMetadata,
    pub entries: BTreeMap<String, LevelEntries>,
}

impl Default for StoreDocument {
    fn default() -> Self {
        Self::empty(Utc::now())
    }
}

impl StoreDocument {
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            format_version: CURRENT_FORMAT_VERSION.to_string(),
            metadata: StoreMetadata::new(now),
            entries: BTreeMap::new(),
        }
    }

    /// Recompute the derived counters from `entries`.
    pub fn recompute_metadata(&mut self) {
        self.metadata.total_files = self.entries.len();
        self.metadata.total_comments = self
            .entries
            .values()
            .flat_map(|levels| levels.values())
            .map(|entry| entry.comments.len())
            .sum();
    }

    /// Recompute counters and stamp `last_updated`.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.recompute_metadata();
        self.metadata.last_updated = now;
    }

    /// Build a document from arbitrary JSON, keeping whatever parses.
    ///
    /// Returns the document and whether it was changed on the way in
    /// (version bump, synthesized sections, dropped entries). Returns `None`
    /// when the value is not a JSON object at all.
    pub fn from_value(value: Value, now: DateTime<Utc>) -> Option<(Self, bool)> {
        let Value::Object(mut root) = value else {
            return None;
        };
        let mut changed = false;

        let format_version = match root.remove("formatVersion") {
            Some(Value::String(v)) => Some(v),
            _ => None,
        };

        let entries = match root.remove("entries") {
            Some(Value::Object(files)) => {
                let (entries, entries_changed) = parse_entries(files);
                changed |= entries_changed;
                entries
            }
            Some(Value::Null) | None => {
                changed = true;
                BTreeMap::new()
            }
            Some(_) => return None,
        };

        let metadata = match root
            .remove("metadata")
            .map(serde_json::from_value::<StoreMetadata>)
        {
            Some(Ok(metadata)) => metadata,
            _ => {
                changed = true;
                synthesize_metadata(&entries, now)
            }
        };

        let mut document = StoreDocument {
            format_version: format_version.clone().unwrap_or_default(),
            metadata,
            entries,
        };

        let before = (document.metadata.total_files, document.metadata.total_comments);
        document.recompute_metadata();
        if before != (document.metadata.total_files, document.metadata.total_comments) {
            changed = true;
        }

        if format_version.as_deref() != Some(CURRENT_FORMAT_VERSION) {
            document.format_version = CURRENT_FORMAT_VERSION.to_string();
            changed = true;
        }

        Some((document, changed))
    }
}

/// Rebuild an entry from an older or partial record, filling what is missing.
///
/// Returns the entry and whether anything had to be filled in. `None` only
/// when `comments` is not a list of strings.
fn parse_entry(value: Value, level: AbstractionLevel) -> Option<(StoredEntry, bool)> {
    let Value::Object(mut fields) = value else {
        return None;
    };
    let comments: Vec<String> = serde_json::from_value(fields.remove("comments")?).ok()?;

    let mut filled = false;
    let fingerprint = match fields.remove("fingerprint") {
        Some(Value::String(fingerprint)) => fingerprint,
        _ => {
            filled = true;
            String::new()
        }
    };
    let stamp = fields.remove("generatedAt");
    let generated_at = match stamp.as_ref().and_then(parse_timestamp) {
        Some(at) => {
            filled |= !matches!(stamp, Some(Value::String(_)));
            at
        }
        None => {
            filled = true;
            DateTime::<Utc>::UNIX_EPOCH
        }
    };
    let mut text = |name: &str| match fields.remove(name) {
        Some(Value::String(v)) => v,
        _ => {
            filled = true;
            "unknown".to_string()
        }
    };
    let model = text("model");
    let language = text("language");

    Some((
        StoredEntry {
            comments,
            fingerprint,
            generated_at,
            model,
            language,
            abstraction_level: level,
        },
        filled,
    ))
}

/// RFC 3339 string or epoch milliseconds.
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(stamp) => DateTime::parse_from_rfc3339(stamp)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        Value::Number(millis) => millis.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis),
        _ => None,
    }
}

fn parse_entries(files: serde_json::Map<String, Value>) -> (BTreeMap<String, LevelEntries>, bool) {
    let mut entries = BTreeMap::new();
    let mut changed = false;

    for (file_key, levels_value) in files {
        let Value::Object(levels) = levels_value else {
            warn!(file = %file_key, "Dropping malformed cache entry: levels are not an object");
            changed = true;
            continue;
        };

        let mut file_entries = LevelEntries::new();
        for (level_key, entry_value) in levels {
            let level = match level_key
                .parse::<u8>()
                .ok()
                .and_then(|n| AbstractionLevel::try_from(n).ok())
            {
                Some(level) => level,
                None => {
                    warn!(file = %file_key, level = %level_key, "Dropping cache entry with invalid level");
                    changed = true;
                    continue;
                }
            };

            match parse_entry(entry_value, level) {
                Some((entry, filled)) => {
                    changed |= filled;
                    file_entries.insert(level, entry);
                }
                None => {
                    warn!(file = %file_key, level = %level_key, "Dropping cache entry without a comment list");
                    changed = true;
                }
            }
        }

        if file_entries.is_empty() {
            changed = true;
        } else {
            entries.insert(file_key, file_entries);
        }
    }

    (entries, changed)
}

fn synthesize_metadata(entries: &BTreeMap<String, LevelEntries>, now: DateTime<Utc>) -> StoreMetadata {
    let stamps = entries
        .values()
        .flat_map(|levels| levels.values())
        .map(|entry| entry.generated_at);
    let created_at = stamps.clone().min().unwrap_or(now);
    let last_updated = stamps.max().unwrap_or(now);
    StoreMetadata {
        total_files: 0,
        total_comments: 0,
        created_at,
        last_updated,
    }
}
