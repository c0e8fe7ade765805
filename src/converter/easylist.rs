//! EasyList filter list parser.
//!
//! Every line is classified into exactly one [`LineKind`]. The checks run in
//! a fixed order and the first one that applies decides:
//!
//! 1. empty, `!` comment or `[Adblock]` header → ignored
//! 2. `##` / `#@#` cosmetic rule → generic hide selector, or ignored
//! 3. `@@` exception → ignored (only block rules are emitted)
//! 4. `#?#` / `#$#` procedural cosmetic → ignored
//! 5. network rule, after stripping `$options`:
//!    domain anchor → heuristic pattern → host+path anchor → full-URL anchor
//!
//! Lines that fit none of these are dropped without error.

use once_cell::sync::Lazy;
use regex::Regex;

use super::cosmetic::{parse_hide_selector, HideSelectorSet};
use crate::heuristic::{ad_score, is_speculative_pattern};
use crate::rule::{CandidateRule, RuleClass};
use crate::ResourceType;

/// `||example.com^` with a plain hostname.
static DOMAIN_ANCHOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\|\|([a-zA-Z0-9.-]+\.[a-zA-Z]{2,})\^?$").unwrap());

/// `||host` followed by anything, host without separators or wildcards.
static HOST_PATH_ANCHOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\|\|([^/^$|*]+)(.*)$").unwrap());

/// Why a line produced neither a rule nor a selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// Blank line, `!` comment or `[...]` header
    Comment,
    /// Domain-scoped hide rule or `#@#` hide exception
    Cosmetic,
    /// Generic hide rule with a scriptlet or procedural selector
    UnsupportedSelector,
    /// `@@` allow-list exception
    Exception,
    /// `#?#` / `#$#` procedural or CSS-injection syntax
    Procedural,
    /// `$domain=` / `$sitekey=` targeting
    DomainScoped,
    /// No supported network rule shape
    Unsupported,
}

/// Classification of a single filter list line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    Ignored(SkipReason),
    Network(CandidateRule),
    Hide(String),
}

/// Classify one line of a filter list.
pub fn classify_line(line: &str) -> LineKind {
    let line = line.trim();

    if line.is_empty() || line.starts_with('!') || line.starts_with('[') {
        return LineKind::Ignored(SkipReason::Comment);
    }

    if line.contains("##") || line.contains("#@#") {
        return match parse_hide_selector(line) {
            Ok(selector) => LineKind::Hide(selector.to_string()),
            Err(reason) => LineKind::Ignored(reason),
        };
    }

    if line.starts_with("@@") {
        return LineKind::Ignored(SkipReason::Exception);
    }

    if line.contains("#?#") || line.contains("#$#") {
        return LineKind::Ignored(SkipReason::Procedural);
    }

    match parse_network_rule(line) {
        Ok(rule) => LineKind::Network(rule),
        Err(reason) => LineKind::Ignored(reason),
    }
}

/// Parse a line already known not to be a comment, cosmetic or exception rule.
fn parse_network_rule(line: &str) -> Result<CandidateRule, SkipReason> {
    let (body, options) = split_rule_options(line);

    let resource_types = match options {
        Some(options) => parse_options(options)?,
        None => ResourceType::all(),
    };

    let (class, url_filter) = match_shape(body).ok_or(SkipReason::Unsupported)?;
    let score = match class {
        RuleClass::Pattern => ad_score(&url_filter),
        _ => 0,
    };

    Ok(CandidateRule {
        class,
        url_filter,
        resource_types,
        score,
    })
}

fn split_rule_options(line: &str) -> (&str, Option<&str>) {
    match line.split_once('$') {
        Some((body, options)) => (body, Some(options)),
        None => (line, None),
    }
}

/// Resolve the resource types named by an options string.
///
/// Domain-scoped options reject the whole rule.
fn parse_options(options: &str) -> Result<Vec<ResourceType>, SkipReason> {
    let lower = options.to_ascii_lowercase();
    if lower.contains("domain=") || lower.contains("sitekey=") {
        return Err(SkipReason::DomainScoped);
    }

    let named: Vec<ResourceType> = lower
        .split(',')
        .filter_map(|token| ResourceType::parse(token.trim()))
        .collect();
    let narrowed = ResourceType::NARROWABLE
        .into_iter()
        .find(|ty| named.contains(ty));

    Ok(match narrowed {
        Some(ty) => vec![ty],
        None => ResourceType::all(),
    })
}

/// Try the four supported rule shapes in order.
fn match_shape(body: &str) -> Option<(RuleClass, String)> {
    if let Some(caps) = DOMAIN_ANCHOR.captures(body) {
        let domain = caps[1].to_lowercase();
        return Some((RuleClass::Domain, format!("||{}", domain)));
    }

    if is_speculative_pattern(body) {
        let pattern = strip_separators(body);
        let pattern = pattern.trim_start_matches('|');
        if !pattern.is_empty() {
            return Some((RuleClass::Pattern, pattern.to_string()));
        }
    }

    if body.starts_with("||") {
        if let Some(caps) = HOST_PATH_ANCHOR.captures(body) {
            let host = caps[1].to_lowercase();
            let rest = strip_separators(&caps[2]);
            return Some((RuleClass::Path, format!("||{}{}", host, rest)));
        }
    }

    if body.starts_with("|http") {
        let url = strip_separators(&body[1..]);
        return Some((RuleClass::Path, format!("|{}", url)));
    }

    None
}

/// Remove `^` separators and stray `$` markers.
fn strip_separators(s: &str) -> String {
    s.chars().filter(|c| *c != '^' && *c != '$').collect()
}

/// Per-reason line counters for one parsed list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    pub lines: usize,
    pub comments: usize,
    pub cosmetic: usize,
    pub unsupported_selectors: usize,
    pub exceptions: usize,
    pub procedural: usize,
    pub domain_scoped: usize,
    pub unsupported: usize,
    /// Generic selectors dropped as duplicates or past the ceiling
    pub selectors_dropped: usize,
}

impl ParseStats {
    fn record_skip(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::Comment => self.comments += 1,
            SkipReason::Cosmetic => self.cosmetic += 1,
            SkipReason::UnsupportedSelector => self.unsupported_selectors += 1,
            SkipReason::Exception => self.exceptions += 1,
            SkipReason::Procedural => self.procedural += 1,
            SkipReason::DomainScoped => self.domain_scoped += 1,
            SkipReason::Unsupported => self.unsupported += 1,
        }
    }
}

/// Candidate rules and hide selectors parsed from one list, in encounter order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedList {
    pub domain_rules: Vec<CandidateRule>,
    pub pattern_rules: Vec<CandidateRule>,
    pub path_rules: Vec<CandidateRule>,
    pub hide_selectors: Vec<String>,
    pub stats: ParseStats,
}

impl ParsedList {
    /// Total number of candidate network rules.
    pub fn rule_count(&self) -> usize {
        self.domain_rules.len() + self.pattern_rules.len() + self.path_rules.len()
    }

    fn push(&mut self, rule: CandidateRule) {
        match rule.class {
            RuleClass::Domain => self.domain_rules.push(rule),
            RuleClass::Pattern => self.pattern_rules.push(rule),
            RuleClass::Path => self.path_rules.push(rule),
        }
    }
}

/// Parse the full text of a filter list.
///
/// Generic hide selectors are deduplicated and admitted until
/// `max_hide_selectors` is reached.
pub fn parse_list(text: &str, max_hide_selectors: usize) -> ParsedList {
    let mut parsed = ParsedList::default();
    let mut selectors = HideSelectorSet::new(max_hide_selectors);

    for line in text.lines() {
        parsed.stats.lines += 1;
        match classify_line(line) {
            LineKind::Network(rule) => parsed.push(rule),
            LineKind::Hide(selector) => {
                if !selectors.insert(&selector) {
                    parsed.stats.selectors_dropped += 1;
                }
            }
            LineKind::Ignored(reason) => parsed.stats.record_skip(reason),
        }
    }

    parsed.hide_selectors = selectors.into_vec();
    log::debug!(
        "Parsed {} lines: {} domain, {} pattern, {} path rules, {} hide selectors",
        parsed.stats.lines,
        parsed.domain_rules.len(),
        parsed.pattern_rules.len(),
        parsed.path_rules.len(),
        parsed.hide_selectors.len()
    );
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network(line: &str) -> CandidateRule {
        match classify_line(line) {
            LineKind::Network(rule) => rule,
            other => panic!("expected network rule for {:?}, got {:?}", line, other),
        }
    }

    fn skipped(line: &str) -> SkipReason {
        match classify_line(line) {
            LineKind::Ignored(reason) => reason,
            other => panic!("expected {:?} to be ignored, got {:?}", line, other),
        }
    }

    #[test]
    fn test_domain_anchor() {
        let rule = network("||doubleclick.net^");
        assert_eq!(rule.class, RuleClass::Domain);
        assert_eq!(rule.class.priority(), 1);
        assert_eq!(rule.url_filter, "||doubleclick.net");
        assert_eq!(rule.resource_types, ResourceType::all());
    }

    #[test]
    fn test_domain_anchor_lowercased_without_caret() {
        let rule = network("||Ads.Example.COM");
        assert_eq!(rule.class, RuleClass::Domain);
        assert_eq!(rule.url_filter, "||ads.example.com");
    }

    #[test]
    fn test_image_pattern_with_option() {
        let rule = network("/ads/banner.gif$image");
        assert_eq!(rule.class, RuleClass::Pattern);
        assert_eq!(rule.class.priority(), 2);
        assert_eq!(rule.url_filter, "/ads/banner.gif");
        assert_eq!(rule.resource_types, vec![ResourceType::Image]);
        assert!(rule.score >= 18);
    }

    #[test]
    fn test_pattern_strips_anchors_and_separators() {
        let rule = network("|https://cdn.example.com/ads/*^");
        assert_eq!(rule.class, RuleClass::Pattern);
        assert_eq!(rule.url_filter, "https://cdn.example.com/ads/*");
    }

    #[test]
    fn test_host_anchor_with_ad_path_becomes_pattern() {
        let rule = network("||example.com/banner/*");
        assert_eq!(rule.class, RuleClass::Pattern);
        assert_eq!(rule.url_filter, "example.com/banner/*");
    }

    #[test]
    fn test_host_path_anchor() {
        let rule = network("||tracker.example.com/collect^");
        assert_eq!(rule.class, RuleClass::Path);
        assert_eq!(rule.class.priority(), 1);
        assert_eq!(rule.url_filter, "||tracker.example.com/collect");
    }

    #[test]
    fn test_host_anchor_with_unusual_host_is_path() {
        // underscores fail the strict hostname grammar
        let rule = network("||cdn_1.Example.com^");
        assert_eq!(rule.class, RuleClass::Path);
        assert_eq!(rule.url_filter, "||cdn_1.example.com");
    }

    #[test]
    fn test_full_url_anchor() {
        let rule = network("|http://example.org/collect?id=^");
        assert_eq!(rule.class, RuleClass::Path);
        assert_eq!(rule.url_filter, "|http://example.org/collect?id=");
    }

    #[test]
    fn test_unsupported_shapes() {
        assert_eq!(skipped("example.com"), SkipReason::Unsupported);
        assert_eq!(skipped("*foo"), SkipReason::Unsupported);
        assert_eq!(skipped("$image"), SkipReason::Unsupported);
        assert_eq!(skipped("/^https?:\\/\\/[a-z]+\\.net\\//"), SkipReason::Unsupported);
    }

    #[test]
    fn test_comments_and_headers() {
        assert_eq!(skipped(""), SkipReason::Comment);
        assert_eq!(skipped("   "), SkipReason::Comment);
        assert_eq!(skipped("! Title: EasyList"), SkipReason::Comment);
        assert_eq!(skipped("[Adblock Plus 2.0]"), SkipReason::Comment);
    }

    #[test]
    fn test_exception_never_emitted() {
        assert_eq!(skipped("@@||good.com^"), SkipReason::Exception);
        assert_eq!(skipped("@@/ads/allowed.gif$image"), SkipReason::Exception);
    }

    #[test]
    fn test_procedural_cosmetics() {
        assert_eq!(
            skipped("example.com#?#div:has(> .ad)"),
            SkipReason::Procedural
        );
        assert_eq!(
            skipped("example.com#$#body { overflow: auto; }"),
            SkipReason::Procedural
        );
    }

    #[test]
    fn test_hide_rules() {
        assert_eq!(
            classify_line("##.ad-banner"),
            LineKind::Hide(".ad-banner".to_string())
        );
        assert_eq!(
            skipped("example.com##.sponsored-block"),
            SkipReason::Cosmetic
        );
        assert_eq!(skipped("example.com#@#.ad"), SkipReason::Cosmetic);
    }

    #[test]
    fn test_domain_scoped_options() {
        assert_eq!(
            skipped("||ads.example.com^$domain=example.org"),
            SkipReason::DomainScoped
        );
        assert_eq!(
            skipped("/banner/*$script,sitekey=abc"),
            SkipReason::DomainScoped
        );
        assert_eq!(
            skipped("/banner/*$script,Domain=a.com"),
            SkipReason::DomainScoped
        );
    }

    #[test]
    fn test_option_narrowing_precedence() {
        let rule = network("||ads.example.com^$script,image");
        assert_eq!(rule.resource_types, vec![ResourceType::Image]);

        let rule = network("||ads.example.com^$xmlhttprequest,third-party");
        assert_eq!(rule.resource_types, vec![ResourceType::XmlHttpRequest]);

        let rule = network("/banner/*$xhr");
        assert_eq!(rule.resource_types, vec![ResourceType::XmlHttpRequest]);

        let rule = network("||ads.example.com^$css,third-party");
        assert_eq!(rule.resource_types, vec![ResourceType::Stylesheet]);

        // document is a known type but never narrows
        let rule = network("||ads.example.com^$document");
        assert_eq!(rule.resource_types, ResourceType::all());

        // negated and unknown types keep the default set
        let rule = network("||ads.example.com^$~image,third-party");
        assert_eq!(rule.resource_types, ResourceType::all());
    }

    #[test]
    fn test_parse_list_buckets_and_stats() {
        let text = "\
[Adblock Plus 2.0]
! comment
||doubleclick.net^
/ads/banner.gif$image
||tracker.example.com/collect^
@@||good.com^
example.com##.sponsored-block
##.ad-banner
##.ad-banner
||ads.example.com^$domain=example.org
plainword
";
        let parsed = parse_list(text, 100);
        assert_eq!(parsed.domain_rules.len(), 1);
        assert_eq!(parsed.pattern_rules.len(), 1);
        assert_eq!(parsed.path_rules.len(), 1);
        assert_eq!(parsed.rule_count(), 3);
        assert_eq!(parsed.hide_selectors, vec![".ad-banner".to_string()]);

        assert_eq!(parsed.stats.lines, 11);
        assert_eq!(parsed.stats.comments, 2);
        assert_eq!(parsed.stats.exceptions, 1);
        assert_eq!(parsed.stats.cosmetic, 1);
        assert_eq!(parsed.stats.domain_scoped, 1);
        assert_eq!(parsed.stats.unsupported, 1);
        assert_eq!(parsed.stats.selectors_dropped, 1);
    }

    #[test]
    fn test_parse_list_selector_ceiling() {
        let text = "##.a\n##.b\n##.c\n";
        let parsed = parse_list(text, 2);
        assert_eq!(parsed.hide_selectors, vec![".a".to_string(), ".b".to_string()]);
        assert_eq!(parsed.stats.selectors_dropped, 1);
    }

    #[test]
    fn test_parse_list_is_deterministic() {
        let text = "||a.com^\n/ads/x.png\n||b.com/path\n##.x\n";
        assert_eq!(parse_list(text, 10), parse_list(text, 10));
    }
}
