//! Interface to the rule matching engine.
//!
//! The engine is external; this module specifies the update call it accepts
//! and provides two implementations: an in-memory engine for embedding and
//! tests, and a JSON ruleset file for browser extension builds.
//!
//! Every update is all-or-nothing: the resulting rule set is validated as a
//! whole before anything is replaced.

use ahash::AHashSet;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::InstallError;
use crate::rule::CompiledRule;

/// One update call to the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleUpdate {
    pub remove_rule_ids: Vec<u32>,
    pub add_rules: Vec<CompiledRule>,
}

impl RuleUpdate {
    /// Replace everything in `installed` with `rules`.
    pub fn replace_all(installed: Vec<u32>, rules: Vec<CompiledRule>) -> Self {
        Self {
            remove_rule_ids: installed,
            add_rules: rules,
        }
    }
}

/// The matching engine's dynamic rule API.
#[async_trait]
pub trait RuleInstaller: Send + Sync {
    /// Ids of the rules currently installed.
    async fn installed_rule_ids(&self) -> Result<Vec<u32>, InstallError>;

    /// Remove and add rules in one step.
    async fn update_rules(&self, update: RuleUpdate) -> Result<(), InstallError>;
}

/// Compute the rule set that results from applying `update` to `current`.
///
/// Fails without side effects if any added rule is malformed or ids collide.
pub fn apply_update(
    current: &[CompiledRule],
    update: &RuleUpdate,
) -> Result<Vec<CompiledRule>, InstallError> {
    let removed: AHashSet<u32> = update.remove_rule_ids.iter().copied().collect();

    let mut next: Vec<CompiledRule> = current
        .iter()
        .filter(|rule| !removed.contains(&rule.id))
        .cloned()
        .collect();
    let mut ids: AHashSet<u32> = next.iter().map(|rule| rule.id).collect();

    for rule in &update.add_rules {
        if rule.id == 0 {
            return Err(InstallError::ZeroId);
        }
        if rule.condition.url_filter.is_empty() {
            return Err(InstallError::EmptyUrlFilter(rule.id));
        }
        if rule.condition.resource_types.is_empty() {
            return Err(InstallError::EmptyResourceTypes(rule.id));
        }
        if !ids.insert(rule.id) {
            return Err(InstallError::DuplicateId(rule.id));
        }
        next.push(rule.clone());
    }

    Ok(next)
}

/// In-memory rule engine.
#[derive(Debug, Default)]
pub struct MemoryInstaller {
    rules: RwLock<Vec<CompiledRule>>,
}

impl MemoryInstaller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the installed rules.
    pub fn rules(&self) -> Vec<CompiledRule> {
        self.rules.read().clone()
    }

    pub fn rule_count(&self) -> usize {
        self.rules.read().len()
    }
}

#[async_trait]
impl RuleInstaller for MemoryInstaller {
    async fn installed_rule_ids(&self) -> Result<Vec<u32>, InstallError> {
        Ok(self.rules.read().iter().map(|rule| rule.id).collect())
    }

    async fn update_rules(&self, update: RuleUpdate) -> Result<(), InstallError> {
        let mut rules = self.rules.write();
        let next = apply_update(&rules, &update)?;
        *rules = next;
        Ok(())
    }
}

/// Rule engine backed by a JSON ruleset file.
///
/// The file holds the installed rules as a JSON array and is replaced
/// atomically on every update.
#[derive(Debug, Clone)]
pub struct JsonFileInstaller {
    path: PathBuf,
}

impl JsonFileInstaller {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the installed rules; a missing file means none.
    pub fn read_rules(&self) -> Result<Vec<CompiledRule>, InstallError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content =
            fs::read_to_string(&self.path).map_err(|e| InstallError::Backend(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| InstallError::Backend(e.to_string()))
    }

    fn write_rules(&self, rules: &[CompiledRule]) -> std::io::Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut temp_file = tempfile::NamedTempFile::new_in(&dir)?;
        serde_json::to_writer_pretty(&mut temp_file, rules)?;
        temp_file.flush()?;
        temp_file.as_file().sync_all()?;
        temp_file.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

#[async_trait]
impl RuleInstaller for JsonFileInstaller {
    async fn installed_rule_ids(&self) -> Result<Vec<u32>, InstallError> {
        Ok(self.read_rules()?.iter().map(|rule| rule.id).collect())
    }

    async fn update_rules(&self, update: RuleUpdate) -> Result<(), InstallError> {
        let current = self.read_rules()?;
        let next = apply_update(&current, &update)?;
        self.write_rules(&next)
            .map_err(|e| InstallError::Backend(e.to_string()))?;
        log::debug!("Wrote {} installed rules to {:?}", next.len(), self.path);
        Ok(())
    }
}
