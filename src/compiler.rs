//! Rule budget allocation and cross-list merging.
//!
//! The matching engine accepts a bounded number of rules, so compilation is
//! an allocation problem. Candidates are admitted class by class:
//!
//! 1. every domain anchor
//! 2. pattern rules, best ad score first, up to `max_pattern_rules`
//! 3. path anchors, filling whatever budget remains
//!
//! and the result is truncated to `max_rules` with ids renumbered `1..=N`.
//! Merging several lists deduplicates by url filter (first occurrence wins),
//! groups the survivors by class and truncates the whole set to `max_rules`.

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use crate::config::Limits;
use crate::converter::{parse_list, HideSelectorSet, ParsedList};
use crate::rule::{CandidateRule, CompiledRule, RuleClass};

/// Budgeted output of one list, before ids are assigned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledList {
    pub rules: Vec<CandidateRule>,
    pub hide_selectors: Vec<String>,
}

impl CompiledList {
    /// Result contributed by a source that could not be fetched.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Final rule set and stylesheet handed to the cache and the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledArtifact {
    pub rules: Vec<CompiledRule>,
    #[serde(rename = "hideCSS")]
    pub hide_css: String,
}

impl CompiledArtifact {
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Class-ordered, budgeted selection of candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Allocation {
    pub domain: usize,
    pub pattern: usize,
    pub pattern_candidates: usize,
    pub path: usize,
    pub path_candidates: usize,
}

impl Allocation {
    pub fn total(&self) -> usize {
        self.domain + self.pattern + self.path
    }
}

/// Apply the rule budget to three class buckets.
///
/// Pattern rules are ordered by descending score; the sort is stable so equal
/// scores keep their encounter order.
pub fn allocate(
    domain_rules: Vec<CandidateRule>,
    mut pattern_rules: Vec<CandidateRule>,
    path_rules: Vec<CandidateRule>,
    limits: &Limits,
) -> (Vec<CandidateRule>, Allocation) {
    let pattern_candidates = pattern_rules.len();
    let path_candidates = path_rules.len();

    pattern_rules.sort_by(|a, b| b.score.cmp(&a.score));
    pattern_rules.truncate(limits.max_pattern_rules);

    let path_budget = limits
        .max_rules
        .saturating_sub(domain_rules.len() + pattern_rules.len());

    let mut rules = domain_rules;
    rules.extend(pattern_rules);
    rules.extend(path_rules.into_iter().take(path_budget));
    rules.truncate(limits.max_rules);

    let mut allocation = Allocation {
        pattern_candidates,
        path_candidates,
        ..Allocation::default()
    };
    for rule in &rules {
        match rule.class {
            RuleClass::Domain => allocation.domain += 1,
            RuleClass::Pattern => allocation.pattern += 1,
            RuleClass::Path => allocation.path += 1,
        }
    }

    (rules, allocation)
}

/// Number candidates densely from 1 in their current order.
pub fn assign_ids(rules: Vec<CandidateRule>) -> Vec<CompiledRule> {
    rules
        .into_iter()
        .enumerate()
        .map(|(index, rule)| rule.into_compiled(index as u32 + 1))
        .collect()
}

/// Budget one parsed list.
pub fn compile_parsed(parsed: ParsedList, limits: &Limits) -> CompiledList {
    let (rules, allocation) = allocate(
        parsed.domain_rules,
        parsed.pattern_rules,
        parsed.path_rules,
        limits,
    );

    log::info!(
        "Rule breakdown: {} domain, {} pattern (from {}), {} path (from {}), kept {} total",
        allocation.domain,
        allocation.pattern,
        allocation.pattern_candidates,
        allocation.path,
        allocation.path_candidates,
        allocation.total()
    );

    CompiledList {
        rules,
        hide_selectors: parsed.hide_selectors,
    }
}

/// Merge per-list results into the final artifact.
///
/// Lists are taken in order; a url filter seen in an earlier list wins over
/// any later duplicate. The survivors are stably grouped by class (domain,
/// pattern, path), truncated to `max_rules` and renumbered. Per-list caps are
/// not applied again. Hide selectors are unioned in encounter order.
pub fn merge(lists: Vec<CompiledList>, limits: &Limits) -> CompiledArtifact {
    let mut seen = AHashSet::new();
    let mut rules = Vec::new();
    let mut selectors = HideSelectorSet::new(limits.max_hide_selectors);
    let mut duplicates = 0usize;

    for list in lists {
        for rule in list.rules {
            if !seen.insert(rule.url_filter.clone()) {
                duplicates += 1;
                continue;
            }
            rules.push(rule);
        }
        for selector in &list.hide_selectors {
            selectors.insert(selector);
        }
    }

    let unique = rules.len();
    rules.sort_by_key(|rule| rule.class);
    rules.truncate(limits.max_rules);
    let rules = assign_ids(rules);

    log::info!(
        "Merged total: {} rules from {} unique ({} duplicates dropped), {} element-hide selectors",
        rules.len(),
        unique,
        duplicates,
        selectors.len()
    );

    CompiledArtifact {
        rules,
        hide_css: selectors.render_css(),
    }
}

/// Compile a single list's text into an artifact.
pub fn compile_list(text: &str, limits: &Limits) -> CompiledArtifact {
    compile_lists(&[text], limits)
}

/// Compile several lists' texts into one artifact.
pub fn compile_lists<S: AsRef<str>>(texts: &[S], limits: &Limits) -> CompiledArtifact {
    let lists = texts
        .iter()
        .map(|text| compile_parsed(parse_list(text.as_ref(), limits.max_hide_selectors), limits))
        .collect();
    merge(lists, limits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ResourceType;

    fn limits(max_rules: usize, max_pattern_rules: usize) -> Limits {
        Limits {
            max_rules,
            max_pattern_rules,
            max_hide_selectors: 100,
        }
    }

    fn candidate(class: RuleClass, url_filter: &str, score: u32) -> CandidateRule {
        CandidateRule {
            class,
            url_filter: url_filter.to_string(),
            resource_types: ResourceType::all(),
            score,
        }
    }

    fn filters(rules: &[CompiledRule]) -> Vec<&str> {
        rules.iter().map(|r| r.url_filter()).collect()
    }

    #[test]
    fn test_allocate_orders_classes_and_scores() {
        let (rules, allocation) = allocate(
            vec![candidate(RuleClass::Domain, "||a.com", 0)],
            vec![
                candidate(RuleClass::Pattern, "low", 1),
                candidate(RuleClass::Pattern, "high", 20),
                candidate(RuleClass::Pattern, "tie-first", 5),
                candidate(RuleClass::Pattern, "tie-second", 5),
            ],
            vec![candidate(RuleClass::Path, "||b.com/x", 0)],
            &limits(100, 100),
        );
        let order: Vec<&str> = rules.iter().map(|r| r.url_filter.as_str()).collect();
        assert_eq!(
            order,
            vec!["||a.com", "high", "tie-first", "tie-second", "low", "||b.com/x"]
        );
        assert_eq!(allocation.total(), 6);
    }

    #[test]
    fn test_pattern_sub_cap_leaves_room_for_paths() {
        let patterns = (0..10)
            .map(|i| candidate(RuleClass::Pattern, &format!("p{}", i), i))
            .collect();
        let paths = (0..10)
            .map(|i| candidate(RuleClass::Path, &format!("||h{}.com/x", i), 0))
            .collect();
        let (rules, allocation) = allocate(Vec::new(), patterns, paths, &limits(8, 3));

        assert_eq!(rules.len(), 8);
        assert_eq!(allocation.pattern, 3);
        assert_eq!(allocation.path, 5);
        assert_eq!(rules[0].url_filter, "p9");
    }

    #[test]
    fn test_domain_rules_never_displaced() {
        let domains = (0..5)
            .map(|i| candidate(RuleClass::Domain, &format!("||d{}.com", i), 0))
            .collect();
        let patterns = vec![candidate(RuleClass::Pattern, "/ads/", 10)];
        let (rules, allocation) = allocate(domains, patterns, Vec::new(), &limits(4, 10));

        assert_eq!(rules.len(), 4);
        assert_eq!(allocation.domain, 4);
        assert_eq!(allocation.pattern, 0);
    }

    #[test]
    fn test_cap_invariant_and_dense_ids() {
        let mut text = String::new();
        for i in 0..50 {
            text.push_str(&format!("||d{}.example.com^\n", i));
            text.push_str(&format!("/ads/{}.gif\n", i));
            text.push_str(&format!("||h{}.example.com/collect\n", i));
        }
        let artifact = compile_list(&text, &limits(120, 40));

        assert_eq!(artifact.rule_count(), 120);
        let ids: Vec<u32> = artifact.rules.iter().map(|r| r.id).collect();
        assert_eq!(ids, (1..=120).collect::<Vec<u32>>());
    }

    #[test]
    fn test_under_cap_keeps_everything() {
        let artifact = compile_list("||a.com^\n/ads/x.gif\n||b.com/y\n", &limits(100, 100));
        assert_eq!(artifact.rule_count(), 3);
        assert_eq!(artifact.rules[0].priority, 1);
        assert_eq!(artifact.rules[1].priority, 2);
        assert_eq!(artifact.rules[2].priority, 1);
    }

    #[test]
    fn test_merge_dedups_by_url_filter() {
        let artifact = compile_lists(
            &["||example.com^\n/ads/a.gif\n", "||example.com^\n||other.com^\n"],
            &limits(100, 100),
        );
        let all = filters(&artifact.rules);
        assert_eq!(all.iter().filter(|f| **f == "||example.com").count(), 1);
        assert_eq!(all, vec!["||example.com", "||other.com", "/ads/a.gif"]);
    }

    #[test]
    fn test_merge_keeps_domains_ahead_of_patterns() {
        let artifact = compile_lists(
            &["/ads/a.gif\n/banner/*\n", "||late-domain.com^\n"],
            &limits(100, 100),
        );
        assert_eq!(artifact.rules[0].url_filter(), "||late-domain.com");
        assert_eq!(artifact.rules[0].id, 1);
    }

    #[test]
    fn test_merge_keeps_all_candidates_under_ceiling() {
        let a = "/ads/a1.gif\n/ads/a2.gif\n/ads/a3.gif\n";
        let b = "/ads/b1.gif\n/ads/b2.gif\n/ads/b3.gif\n";
        let artifact = compile_lists(&[a, b], &limits(10, 3));

        assert_eq!(artifact.rule_count(), 6);
        let ids: Vec<u32> = artifact.rules.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_merge_cap_invariant_across_lists() {
        let lists: Vec<String> = (0..3)
            .map(|list| {
                (0..20)
                    .map(|i| format!("||l{}-d{}.example.com^\n/ads/l{}-{}.gif\n", list, i, list, i))
                    .collect()
            })
            .collect();
        let artifact = compile_lists(lists.as_slice(), &limits(100, 20));

        // 120 unique candidates, ceiling 100
        assert_eq!(artifact.rule_count(), 100);
        let ids: Vec<u32> = artifact.rules.iter().map(|r| r.id).collect();
        assert_eq!(ids, (1..=100).collect::<Vec<u32>>());
        assert!(artifact.rules[..60].iter().all(|r| r.priority == 1));
        assert!(artifact.rules[60..].iter().all(|r| r.priority == 2));
    }

    #[test]
    fn test_merge_class_order_is_stable() {
        let artifact = compile_lists(
            &["/ads/first.gif\n||b.com/x\n", "||a.com^\n/banner/*\n||c.com/y\n"],
            &limits(100, 100),
        );
        assert_eq!(
            filters(&artifact.rules),
            vec!["||a.com", "/ads/first.gif", "/banner/*", "||b.com/x", "||c.com/y"]
        );
    }

    #[test]
    fn test_merge_unions_selectors() {
        let artifact = compile_lists(
            &["##.a\n##.b\n", "##.b\n##.c\n"],
            &limits(100, 100),
        );
        assert_eq!(
            artifact.hide_css,
            ".a,\n.b,\n.c { display: none !important; }"
        );
        assert!(artifact.is_empty());
    }

    #[test]
    fn test_merge_empty_inputs() {
        let artifact = merge(vec![CompiledList::empty(), CompiledList::empty()], &limits(10, 10));
        assert!(artifact.is_empty());
        assert_eq!(artifact.hide_css, "");
    }

    #[test]
    fn test_compile_is_idempotent() {
        let text = "||a.com^\n/ads/x.png\n/banner/*\n||b.com/path\n##.x\n##.y\n";
        let first = compile_list(text, &Limits::default());
        let second = compile_list(text, &Limits::default());
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}
