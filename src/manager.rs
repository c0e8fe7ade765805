//! Blocklist refresh lifecycle.
//!
//! This module provides `BlocklistManager` which handles:
//! - Restoring cached rules at startup, before any network round-trip
//! - Staleness checks against the configured refresh interval
//! - Fetch → parse → merge → install → persist refresh cycles
//! - Single-flight refreshes (concurrent triggers share one outcome)
//! - A periodic refresh timer
//!
//! A refresh that yields zero rules, or whose rules the engine rejects,
//! leaves the previously installed and cached rules untouched.

use arc_swap::ArcSwap;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::cache::{is_stale, now_millis, CacheRecord, CacheStore, FileCacheStore};
use crate::compiler::{compile_parsed, merge, CompiledList};
use crate::config::BlocklistConfig;
use crate::converter::parse_list;
use crate::error::{InstallError, RefreshError};
use crate::fetch::{fetch_all, Fetcher, HttpFetcher};
use crate::install::{JsonFileInstaller, RuleInstaller, RuleUpdate};
use crate::rule::CompiledRule;
use crate::Result;

/// File name of the installed ruleset written by [`BlocklistManager::from_config`].
pub const INSTALLED_RULES_FILE: &str = "installed_rules.json";

/// Number of rules logged when the engine rejects an update.
const REJECTED_SAMPLE: usize = 3;

/// Snapshot of the blocklist state exposed to callers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    /// Rules are installed
    pub ready: bool,
    /// Number of installed rules
    pub rule_count: usize,
    /// Epoch milliseconds of the artifact the installed rules came from
    pub last_updated: Option<u64>,
}

impl Status {
    /// Status of rules restored from a persisted record.
    pub fn from_record(record: &CacheRecord) -> Self {
        Self {
            ready: !record.rules.is_empty(),
            rule_count: record.rules.len(),
            last_updated: record.last_updated,
        }
    }
}

/// Summary of a successful refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshReport {
    pub rule_count: usize,
    pub hide_css_len: usize,
    pub sources_ok: usize,
    pub sources_failed: usize,
    pub last_updated: u64,
}

/// Outcome of a refresh cycle.
pub type RefreshResult = std::result::Result<RefreshReport, RefreshError>;

/// What [`BlocklistManager::init`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitOutcome {
    /// Number of cached rules re-installed before refreshing
    pub restored: usize,
    /// Result of the refresh, if the cache was stale
    pub refresh: Option<RefreshResult>,
}

type PendingRefresh = Shared<BoxFuture<'static, RefreshResult>>;

struct Inner {
    config: BlocklistConfig,
    fetcher: Arc<dyn Fetcher>,
    installer: Arc<dyn RuleInstaller>,
    store: Arc<dyn CacheStore>,
    status: ArcSwap<Status>,
    hide_css: ArcSwap<String>,
    in_flight: Mutex<Option<PendingRefresh>>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

/// Owns the compiled blocklist and its refresh lifecycle.
///
/// Cloning is cheap; clones share state.
///
/// # Example
///
/// ```ignore
/// use dnrc::{BlocklistConfig, BlocklistManager};
///
/// let manager = BlocklistManager::from_config(BlocklistConfig::default())?;
///
/// // Re-install cached rules, refresh if the cache is stale
/// manager.init().await;
/// manager.schedule_periodic_refresh();
///
/// // On-demand refresh
/// match manager.refresh().await {
///     Ok(report) => println!("{} rules active", report.rule_count),
///     Err(e) => eprintln!("refresh failed: {}", e),
/// }
/// ```
#[derive(Clone)]
pub struct BlocklistManager {
    inner: Arc<Inner>,
}

impl BlocklistManager {
    /// Create a manager from its collaborators.
    pub fn new(
        config: BlocklistConfig,
        fetcher: Arc<dyn Fetcher>,
        installer: Arc<dyn RuleInstaller>,
        store: Arc<dyn CacheStore>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                fetcher,
                installer,
                store,
                status: ArcSwap::from_pointee(Status::default()),
                hide_css: ArcSwap::from_pointee(String::new()),
                in_flight: Mutex::new(None),
                timer: Mutex::new(None),
            }),
        }
    }

    /// Create a manager that downloads over HTTP, caches in `cache_dir` and
    /// installs into `cache_dir/installed_rules.json`.
    pub fn from_config(config: BlocklistConfig) -> Result<Self> {
        config.validate()?;
        let fetcher = HttpFetcher::new(config.fetch_timeout())?;
        let store = FileCacheStore::new(&config.cache_dir);
        let installer = JsonFileInstaller::new(config.cache_dir.join(INSTALLED_RULES_FILE));
        Ok(Self::new(
            config,
            Arc::new(fetcher),
            Arc::new(installer),
            Arc::new(store),
        ))
    }

    pub fn config(&self) -> &BlocklistConfig {
        &self.inner.config
    }

    /// Current status snapshot.
    pub fn status(&self) -> Status {
        **self.inner.status.load()
    }

    /// Element-hiding stylesheet matching the installed rules.
    pub fn hide_css(&self) -> Arc<String> {
        self.inner.hide_css.load_full()
    }

    /// Restore cached rules, then refresh if the cache is stale.
    pub async fn init(&self) -> InitOutcome {
        log::info!("Initializing blocklist...");

        let record = match self.inner.store.load() {
            Ok(record) => record,
            Err(e) => {
                log::warn!("Failed to load cached rules, will refresh: {}", e);
                CacheRecord::default()
            }
        };

        let mut restored = 0;
        if !record.rules.is_empty() {
            match self.inner.install(&record.rules).await {
                Ok(()) => {
                    restored = record.rules.len();
                    self.inner
                        .publish(Status::from_record(&record), record.hide_css.clone());
                    log::info!("Re-registered {} cached rules", restored);
                }
                Err(e) => log::warn!("Failed to re-register cached rules: {}", e),
            }
        }

        if is_stale(record.last_updated, self.inner.config.refresh_interval()) {
            log::info!("Cache stale, fetching fresh lists...");
            let refresh = self.refresh().await;
            return InitOutcome {
                restored,
                refresh: Some(refresh),
            };
        }

        if let Some(last) = record.last_updated {
            let age_minutes = now_millis().saturating_sub(last) / 60_000;
            log::info!("Cache is fresh ({}m old)", age_minutes);
        }
        InitOutcome {
            restored,
            refresh: None,
        }
    }

    /// Fetch, compile and install all configured lists.
    ///
    /// The cycle runs on its own task, so it completes even if every caller
    /// stops waiting. If a refresh is already running, waits for it and
    /// returns its outcome instead of starting another. Must be called within
    /// a tokio runtime.
    pub async fn refresh(&self) -> RefreshResult {
        let pending = {
            let mut slot = self.inner.in_flight.lock();
            match slot.as_ref() {
                Some(pending) => {
                    log::debug!("Refresh already in flight, joining it");
                    pending.clone()
                }
                None => {
                    let inner = Arc::clone(&self.inner);
                    // The slot is locked until the handle is stored, so the
                    // task cannot clear it first.
                    let handle = tokio::spawn(async move {
                        let clear = ClearInFlight(Arc::clone(&inner));
                        let result = inner.run_refresh().await;
                        drop(clear);
                        result
                    });
                    let pending = handle
                        .map(|joined| {
                            joined.unwrap_or_else(|e| Err(RefreshError::Aborted(e.to_string())))
                        })
                        .boxed()
                        .shared();
                    *slot = Some(pending.clone());
                    pending
                }
            }
        };

        pending.await
    }

    /// Whether a refresh is currently running.
    pub fn is_refreshing(&self) -> bool {
        self.inner.in_flight.lock().is_some()
    }

    /// Start the periodic refresh timer.
    ///
    /// The first refresh fires one interval from now. Returns `false` if a
    /// timer is already running. Must be called within a tokio runtime.
    pub fn schedule_periodic_refresh(&self) -> bool {
        let mut timer = self.inner.timer.lock();
        if timer.as_ref().map_or(false, |handle| !handle.is_finished()) {
            return false;
        }

        let period = self.inner.config.refresh_interval();
        let weak = Arc::downgrade(&self.inner);
        *timer = Some(tokio::spawn(periodic_refresh(weak, period)));
        log::info!("Scheduled blocklist refresh every {:?}", period);
        true
    }

    /// Stop the periodic refresh timer, if any.
    pub fn stop_periodic_refresh(&self) {
        if let Some(handle) = self.inner.timer.lock().take() {
            handle.abort();
        }
    }
}

/// Empties the in-flight slot when a refresh task ends, even by panic.
struct ClearInFlight(Arc<Inner>);

impl Drop for ClearInFlight {
    fn drop(&mut self) {
        self.0.in_flight.lock().take();
    }
}

async fn periodic_refresh(inner: Weak<Inner>, period: Duration) {
    let start = tokio::time::Instant::now() + period;
    let mut ticker = tokio::time::interval_at(start, period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let manager = match inner.upgrade() {
            Some(inner) => BlocklistManager { inner },
            None => break,
        };
        log::info!("Periodic timer fired, refreshing blocklists");
        if let Err(e) = manager.refresh().await {
            log::warn!("Periodic refresh failed: {}", e);
        }
    }
}

impl Inner {
    async fn run_refresh(&self) -> RefreshResult {
        let limits = self.config.limits();
        let sources = &self.config.lists;
        let outcomes = fetch_all(self.fetcher.as_ref(), sources, self.config.fetch_timeout()).await;

        let mut lists = Vec::with_capacity(outcomes.len());
        let mut sources_failed = 0;
        for outcome in outcomes {
            match outcome.result {
                Ok(text) => {
                    let parsed = parse_list(&text, limits.max_hide_selectors);
                    log::info!(
                        "{}: {} candidate rules, {} element-hide selectors",
                        outcome.source.display_name,
                        parsed.rule_count(),
                        parsed.hide_selectors.len()
                    );
                    lists.push(compile_parsed(parsed, &limits));
                }
                Err(_) => {
                    sources_failed += 1;
                    lists.push(CompiledList::empty());
                }
            }
        }

        let artifact = merge(lists, &limits);
        if artifact.is_empty() {
            log::warn!("Fetch returned 0 rules, keeping existing rules");
            return Err(RefreshError::EmptyResult {
                sources: sources.len(),
            });
        }

        self.install(&artifact.rules).await?;

        let rule_count = artifact.rule_count();
        let last_updated = match self.store.save(&artifact.rules, &artifact.hide_css) {
            Ok(stamp) => stamp,
            Err(e) => {
                log::error!("Rules installed but cache write failed: {}", e);
                let current = self.status.load();
                self.publish(
                    Status {
                        ready: true,
                        rule_count,
                        last_updated: current.last_updated,
                    },
                    artifact.hide_css,
                );
                return Err(RefreshError::Cache(e.to_string()));
            }
        };

        let report = RefreshReport {
            rule_count,
            hide_css_len: artifact.hide_css.len(),
            sources_ok: sources.len() - sources_failed,
            sources_failed,
            last_updated,
        };
        self.publish(
            Status {
                ready: true,
                rule_count,
                last_updated: Some(last_updated),
            },
            artifact.hide_css,
        );

        log::info!("Refresh complete, {} rules active", rule_count);
        Ok(report)
    }

    /// Replace every installed rule with `rules` in one engine call.
    async fn install(&self, rules: &[CompiledRule]) -> std::result::Result<(), InstallError> {
        let installed = self.installer.installed_rule_ids().await?;
        log::info!(
            "Removing {} existing rules, adding {} new rules",
            installed.len(),
            rules.len()
        );

        match self
            .installer
            .update_rules(RuleUpdate::replace_all(installed, rules.to_vec()))
            .await
        {
            Ok(()) => {
                log::info!("Successfully registered {} blocking rules", rules.len());
                Ok(())
            }
            Err(e) => {
                log::error!("Rule engine rejected update: {}", e);
                log::error!(
                    "Rejected rules sample: {:?}",
                    &rules[..rules.len().min(REJECTED_SAMPLE)]
                );
                Err(e)
            }
        }
    }

    fn publish(&self, status: Status, hide_css: String) {
        self.hide_css.store(Arc::new(hide_css));
        self.status.store(Arc::new(status));
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(handle) = self.timer.get_mut().take() {
            handle.abort();
        }
    }
}
