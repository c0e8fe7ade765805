//! dnrc - EasyList filter list compiler for declarative network rule engines.
//!
//! This crate turns community-maintained block lists (EasyList, EasyPrivacy
//! and other lists in the same dialect) into:
//!
//! - a capped, priority-ordered set of declarative block rules
//!   (url filter, third-party only, resource types)
//! - one generic element-hiding stylesheet
//!
//! and keeps them fresh: cached artifacts are re-installed at startup, stale
//! caches trigger a refresh, and a periodic timer re-fetches the lists.
//!
//! # Quick Start
//!
//! ```
//! use dnrc::{compile_list, Limits};
//!
//! let artifact = compile_list("||doubleclick.net^\n##.ad-banner\n", &Limits::default());
//!
//! assert_eq!(artifact.rules.len(), 1);
//! assert_eq!(artifact.rules[0].condition.url_filter, "||doubleclick.net");
//! assert_eq!(artifact.hide_css, ".ad-banner { display: none !important; }");
//! ```
//!
//! # Refresh Lifecycle
//!
//! Applications that keep rules installed in a matching engine use
//! [`BlocklistManager`]:
//!
//! ```ignore
//! use dnrc::{BlocklistConfig, BlocklistManager};
//!
//! let manager = BlocklistManager::from_config(BlocklistConfig::load("dnrc.yaml")?)?;
//!
//! // Re-install cached rules, refresh if stale
//! manager.init().await;
//!
//! // Refresh every 24h
//! manager.schedule_periodic_refresh();
//!
//! println!("{:?}", manager.status());
//! ```
//!
//! # Rule Classes
//!
//! - **Domain**: `||example.com^` → priority 1, always kept
//! - **Pattern**: heuristic ad/tracker patterns → priority 2, best scored first
//! - **Path**: `||example.com/path`, `|http://...` → priority 1, fills the rest
//!
//! Exception rules (`@@`), domain-scoped rules (`$domain=`, `example.com##`)
//! and procedural cosmetics are skipped.

mod error;
mod resource_type;

pub mod cache;
pub mod compiler;
pub mod config;
pub mod converter;
pub mod fetch;
pub mod heuristic;
pub mod install;
pub mod manager;
pub mod rule;

// Re-export core types
pub use error::{Error, FetchError, InstallError, RefreshError, Result};
pub use resource_type::ResourceType;
pub use rule::{CandidateRule, CompiledRule, DomainType, RuleAction, RuleClass, RuleCondition};

// Re-export compiler entry points
pub use compiler::{compile_list, compile_lists, merge, CompiledArtifact, CompiledList};
pub use config::{BlocklistConfig, Limits, SourceList};

// Re-export lifecycle types
pub use cache::{is_stale, CacheRecord, CacheStore, FileCacheStore, MemoryCacheStore};
pub use fetch::{Fetcher, HttpFetcher};
pub use install::{JsonFileInstaller, MemoryInstaller, RuleInstaller, RuleUpdate};
pub use manager::{BlocklistManager, InitOutcome, RefreshReport, RefreshResult, Status};
