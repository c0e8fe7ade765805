//! Source list and capacity configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Default ceiling on compiled network rules.
pub const DEFAULT_MAX_RULES: usize = 30_000;

/// Default ceiling on pattern-class rules within one compilation.
pub const DEFAULT_MAX_PATTERN_RULES: usize = 15_000;

/// Default ceiling on generic element-hiding selectors.
pub const DEFAULT_MAX_HIDE_SELECTORS: usize = 5_000;

/// Default refresh interval (24 hours).
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 24 * 60 * 60 * 1000;

/// Default per-fetch timeout.
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 60_000;

/// One upstream filter list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceList {
    /// Stable identifier, used in logs
    pub id: String,
    /// Human readable name
    #[serde(alias = "name")]
    pub display_name: String,
    /// Download URL
    pub url: String,
}

impl SourceList {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            url: url.into(),
        }
    }
}

/// Capacity constants applied by the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum number of rules handed to the matching engine
    pub max_rules: usize,
    /// Maximum number of pattern-class rules kept before path rules fill the rest
    pub max_pattern_rules: usize,
    /// Maximum number of generic hide selectors
    pub max_hide_selectors: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_rules: DEFAULT_MAX_RULES,
            max_pattern_rules: DEFAULT_MAX_PATTERN_RULES,
            max_hide_selectors: DEFAULT_MAX_HIDE_SELECTORS,
        }
    }
}

/// Startup configuration for the blocklist manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlocklistConfig {
    #[serde(default = "default_lists")]
    pub lists: Vec<SourceList>,

    #[serde(default = "default_max_rules")]
    pub max_rules: usize,

    #[serde(default = "default_max_pattern_rules")]
    pub max_pattern_rules: usize,

    #[serde(default = "default_max_hide_selectors")]
    pub max_hide_selectors: usize,

    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,

    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
}

fn default_lists() -> Vec<SourceList> {
    vec![
        SourceList::new(
            "easylist",
            "EasyList (Ads)",
            "https://easylist.to/easylist/easylist.txt",
        ),
        SourceList::new(
            "easyprivacy",
            "EasyPrivacy (Trackers)",
            "https://easylist.to/easylist/easyprivacy.txt",
        ),
    ]
}

fn default_max_rules() -> usize {
    DEFAULT_MAX_RULES
}

fn default_max_pattern_rules() -> usize {
    DEFAULT_MAX_PATTERN_RULES
}

fn default_max_hide_selectors() -> usize {
    DEFAULT_MAX_HIDE_SELECTORS
}

fn default_refresh_interval_ms() -> u64 {
    DEFAULT_REFRESH_INTERVAL_MS
}

fn default_fetch_timeout_ms() -> u64 {
    DEFAULT_FETCH_TIMEOUT_MS
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".dnrc-cache")
}

impl Default for BlocklistConfig {
    fn default() -> Self {
        Self {
            lists: default_lists(),
            max_rules: default_max_rules(),
            max_pattern_rules: default_max_pattern_rules(),
            max_hide_selectors: default_max_hide_selectors(),
            refresh_interval_ms: default_refresh_interval_ms(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            cache_dir: default_cache_dir(),
        }
    }
}

impl BlocklistConfig {
    /// Parse a configuration from YAML text.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Reject configurations the compiler cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.max_rules == 0 {
            return Err(Error::Config("max_rules must be positive".to_string()));
        }
        if self.refresh_interval_ms == 0 {
            return Err(Error::Config(
                "refresh_interval_ms must be positive".to_string(),
            ));
        }
        let mut seen = ahash::AHashSet::new();
        for list in &self.lists {
            if list.url.trim().is_empty() {
                return Err(Error::Config(format!("list '{}' has no url", list.id)));
            }
            if !seen.insert(list.id.as_str()) {
                return Err(Error::Config(format!("duplicate list id '{}'", list.id)));
            }
        }
        Ok(())
    }

    /// Capacity constants for the compiler.
    pub fn limits(&self) -> Limits {
        Limits {
            max_rules: self.max_rules,
            max_pattern_rules: self.max_pattern_rules,
            max_hide_selectors: self.max_hide_selectors,
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}
