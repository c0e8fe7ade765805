//! Compiled rule types, in the shape the matching engine consumes.

use serde::{Deserialize, Serialize};

use crate::ResourceType;

/// Action taken when a rule matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RuleAction {
    /// Block the request
    #[default]
    Block,
    /// Let the request through
    Allow,
}

/// Which party's traffic a rule applies to.
///
/// First-party traffic is never blocked by compiled rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DomainType {
    #[default]
    #[serde(rename = "thirdParty")]
    ThirdParty,
}

/// Match condition of a compiled rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleCondition {
    pub url_filter: String,
    pub domain_type: DomainType,
    pub resource_types: Vec<ResourceType>,
}

/// One declarative blocking rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledRule {
    pub id: u32,
    pub priority: u32,
    pub action: RuleAction,
    pub condition: RuleCondition,
}

impl CompiledRule {
    /// The rule's url filter.
    pub fn url_filter(&self) -> &str {
        &self.condition.url_filter
    }
}

/// Specificity class of a parsed network rule.
///
/// Classes are allocated in declaration order when the rule budget is
/// applied: domain anchors first, then scored patterns, then path anchors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuleClass {
    /// `||host^`
    Domain,
    /// Loose substring/wildcard match picked up by the ad heuristics
    Pattern,
    /// `||host/path` or `|http://...`
    Path,
}

impl RuleClass {
    /// Engine priority for rules of this class.
    pub fn priority(&self) -> u32 {
        match self {
            RuleClass::Domain | RuleClass::Path => 1,
            RuleClass::Pattern => 2,
        }
    }
}

/// A parsed network rule that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRule {
    pub class: RuleClass,
    pub url_filter: String,
    pub resource_types: Vec<ResourceType>,
    /// Ad-likelihood score; only meaningful for [`RuleClass::Pattern`].
    pub score: u32,
}

impl CandidateRule {
    /// Convert into a block rule with the given id.
    pub fn into_compiled(self, id: u32) -> CompiledRule {
        CompiledRule {
            id,
            priority: self.class.priority(),
            action: RuleAction::Block,
            condition: RuleCondition {
                url_filter: self.url_filter,
                domain_type: DomainType::ThirdParty,
                resource_types: self.resource_types,
            },
        }
    }
}
