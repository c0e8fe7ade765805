//! Persistence of the compiled artifact and its timestamp.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::Result;
use crate::rule::CompiledRule;

/// File name of the persisted record inside the cache directory.
pub const CACHE_FILE: &str = "cache.json";

/// Persisted compiled rules, stylesheet and the time they were saved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    #[serde(default)]
    pub rules: Vec<CompiledRule>,
    #[serde(rename = "hideCSS", default)]
    pub hide_css: String,
    /// Epoch milliseconds of the last successful save
    #[serde(rename = "lastUpdated", default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<u64>,
}

#[derive(Serialize)]
struct CacheRecordRef<'a> {
    rules: &'a [CompiledRule],
    #[serde(rename = "hideCSS")]
    hide_css: &'a str,
    #[serde(rename = "lastUpdated")]
    last_updated: u64,
}

/// Storage for the compiled artifact.
///
/// Both operations are synchronous so a refresh can persist its result as a
/// single non-suspending step.
pub trait CacheStore: Send + Sync {
    /// Load the persisted record, or an empty one if nothing was saved yet.
    fn load(&self) -> Result<CacheRecord>;

    /// Replace the persisted record, stamping it with the current time.
    ///
    /// Returns the timestamp that was written.
    fn save(&self, rules: &[CompiledRule], hide_css: &str) -> Result<u64>;
}

/// Current time in epoch milliseconds.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Check whether a cache saved at `last_updated` needs refreshing.
///
/// Returns `true` if:
/// - No timestamp is recorded
/// - More than `interval` has elapsed since the timestamp
pub fn is_stale(last_updated: Option<u64>, interval: Duration) -> bool {
    is_stale_at(last_updated, interval, now_millis())
}

/// [`is_stale`] against an explicit clock reading.
pub fn is_stale_at(last_updated: Option<u64>, interval: Duration, now_ms: u64) -> bool {
    match last_updated {
        None => true,
        Some(last) => now_ms.saturating_sub(last) > interval.as_millis() as u64,
    }
}

/// Cache store backed by a JSON file, replaced atomically on save.
#[derive(Debug, Clone)]
pub struct FileCacheStore {
    dir: PathBuf,
}

impl FileCacheStore {
    /// Create a store rooted at `dir`. The directory is created on first save.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Path of the persisted record.
    pub fn path(&self) -> PathBuf {
        self.dir.join(CACHE_FILE)
    }
}

impl CacheStore for FileCacheStore {
    fn load(&self) -> Result<CacheRecord> {
        let path = self.path();
        if !path.exists() {
            return Ok(CacheRecord::default());
        }
        let content = fs::read_to_string(&path)?;
        let record = serde_json::from_str(&content)?;
        Ok(record)
    }

    fn save(&self, rules: &[CompiledRule], hide_css: &str) -> Result<u64> {
        fs::create_dir_all(&self.dir)?;

        let last_updated = now_millis();
        let record = CacheRecordRef {
            rules,
            hide_css,
            last_updated,
        };

        // Write to temp file, then rename over the old record
        let mut temp_file = tempfile::NamedTempFile::new_in(&self.dir)?;
        serde_json::to_writer(&mut temp_file, &record)?;
        temp_file.flush()?;
        temp_file.as_file().sync_all()?;
        temp_file.persist(self.path()).map_err(|e| e.error)?;

        log::info!(
            "Saved {} rules + {} chars of element-hide CSS to {:?}",
            rules.len(),
            hide_css.len(),
            self.path()
        );
        Ok(last_updated)
    }
}

/// In-process cache store.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    record: Mutex<CacheRecord>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `record`.
    pub fn with_record(record: CacheRecord) -> Self {
        Self {
            record: Mutex::new(record),
        }
    }

    /// Copy of the current record.
    pub fn snapshot(&self) -> CacheRecord {
        self.record.lock().clone()
    }
}

impl CacheStore for MemoryCacheStore {
    fn load(&self) -> Result<CacheRecord> {
        Ok(self.snapshot())
    }

    fn save(&self, rules: &[CompiledRule], hide_css: &str) -> Result<u64> {
        let last_updated = now_millis();
        *self.record.lock() = CacheRecord {
            rules: rules.to_vec(),
            hide_css: hide_css.to_string(),
            last_updated: Some(last_updated),
        };
        Ok(last_updated)
    }
}
