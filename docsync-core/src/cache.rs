//! Classification cache: persisted publish/sync-back verdicts keyed by public path.
//!
//! The cache is loaded once per run, mutated in memory, and written back in
//! full at the end. Entries never expire. A path with no entry is treated
//! as eligible for both publication and sync-back.
//!
//! Concurrent runs sharing one cache file are not supported: the last
//! writer wins.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{Result, SyncError};
use crate::mapping::MappingTable;

/// Publish/sync-back eligibility of one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationVerdict {
    pub publish: bool,
    pub sync_back: bool,
    #[serde(default)]
    pub reason: String,
    pub classified_at: DateTime<Utc>,
}

impl ClassificationVerdict {
    pub fn new(publish: bool, sync_back: bool, reason: impl Into<String>) -> Self {
        Self {
            publish,
            sync_back,
            reason: reason.into(),
            classified_at: Utc::now(),
        }
    }
}

/// On-disk and in-memory cache document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationCache {
    #[serde(default)]
    pub entries: BTreeMap<String, ClassificationVerdict>,
}

impl ClassificationCache {
    /// Load the cache file; a missing file yields an empty cache.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No classification cache yet, starting empty");
                return Ok(Self::default());
            }
            Err(e) => return Err(SyncError::io(path, e)),
        };
        let cache: Self = serde_json::from_str(&text)?;
        info!(path = %path.display(), entries = cache.entries.len(), "Loaded classification cache");
        Ok(cache)
    }

    pub fn lookup(&self, path: &str) -> Option<&ClassificationVerdict> {
        self.entries.get(path)
    }

    /// Record (or overwrite) the verdict for `path`.
    pub fn record(&mut self, path: impl Into<String>, verdict: ClassificationVerdict) {
        let path = path.into();
        debug!(path = %path, publish = verdict.publish, sync_back = verdict.sync_back, "Recording classification");
        self.entries.insert(path, verdict);
    }

    /// Overwrite the cache file with pretty-printed JSON and a trailing newline.
    pub fn persist(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| SyncError::io(parent, e))?;
        }
        let mut text = serde_json::to_string_pretty(self)?;
        text.push('\n');
        std::fs::write(path, text).map_err(|e| SyncError::io(path, e))?;
        info!(path = %path.display(), entries = self.entries.len(), "Persisted classification cache");
        Ok(())
    }

    /// The cached verdict that keeps `public_path` from being published.
    ///
    /// `None` when the path may be published, including when it was never
    /// classified.
    pub fn publish_blocker(&self, public_path: &str) -> Option<&ClassificationVerdict> {
        self.lookup(public_path).filter(|verdict| !verdict.publish)
    }

    /// The cached verdict that keeps edits to `docs_path` from flowing back
    /// to a private repo.
    ///
    /// The docs path is first translated to its public-namespace key with the
    /// inverse mapping rules. No translation or no entry means eligible.
    pub fn sync_back_blocker(&self, docs_path: &str, table: &MappingTable) -> Option<&ClassificationVerdict> {
        let Some(mapping) = table.resolve_inverse(docs_path) else {
            debug!(docs_path, "No public counterpart for cache lookup, treating as eligible");
            return None;
        };
        self.lookup(&mapping.target_path).filter(|verdict| !verdict.sync_back)
    }
}
