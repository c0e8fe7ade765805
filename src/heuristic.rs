//! Heuristic ad-likelihood signals.
//!
//! Two tables drive the filter-list compiler:
//! - [`is_speculative_pattern`] decides whether an unanchored line is worth
//!   keeping as a loose pattern rule at all
//! - [`ad_score`] weighs the kept patterns against each other so the best
//!   ones survive when the rule budget is applied
//!
//! Both are plain substring/suffix checks over the lowercased text, evaluated
//! in a single pass over a declarative table.

/// A text predicate evaluated against a lowercased pattern.
#[derive(Debug, Clone, Copy)]
pub enum Signal {
    /// Any of the needles occurs somewhere in the text
    Contains(&'static [&'static str]),
    /// The text ends with any of the suffixes
    EndsWith(&'static [&'static str]),
}

impl Signal {
    /// Check the signal against already-lowercased text.
    pub fn matches(&self, lower: &str) -> bool {
        match self {
            Signal::Contains(needles) => needles.iter().any(|n| lower.contains(n)),
            Signal::EndsWith(suffixes) => suffixes.iter().any(|s| lower.ends_with(s)),
        }
    }
}

/// Path fragments that mark an unanchored line as ad or tracker related.
pub const AD_PATH_KEYWORDS: &[&str] = &[
    "/ads/",
    "/ad/",
    "/banner",
    "/track",
    "/pixel",
    "/beacon",
    "/analytics",
    "/telemetry",
    "/stats",
    "/click",
    "/impression",
    "/promo",
    "/sponsor",
    "/popup",
    "/advert",
];

/// Image extensions that admit a line as a pattern rule.
pub const IMAGE_EXTENSIONS: &[&str] = &[".gif", ".jpg", ".jpeg", ".png", ".webp", ".svg"];

/// Weighted score table. Each row contributes its weight at most once.
pub const SCORE_TABLE: &[(Signal, u32)] = &[
    (Signal::Contains(&["/ad/", "/ads/"]), 10),
    (Signal::Contains(&["banner"]), 10),
    (Signal::Contains(&["popup", "pop-up"]), 10),
    (Signal::Contains(&["doubleclick", "adsystem"]), 15),
    (Signal::Contains(&["track", "pixel"]), 5),
    (Signal::Contains(&["promo", "sponsor"]), 5),
    (Signal::Contains(&["click", "impression"]), 5),
    (Signal::EndsWith(&[".gif", ".jpg", ".jpeg", ".png", ".webp"]), 8),
    (Signal::Contains(&["*/ad*", "*banner*"]), 7),
];

/// Check whether an unanchored filter body looks like an ad pattern.
///
/// True when the body has a wildcard past its first character, mentions an
/// image extension, or contains one of [`AD_PATH_KEYWORDS`].
pub fn is_speculative_pattern(body: &str) -> bool {
    let has_wildcard = body.contains('*') && !body.starts_with('*');
    if has_wildcard {
        return true;
    }

    let lower = body.to_lowercase();
    Signal::Contains(IMAGE_EXTENSIONS).matches(&lower)
        || Signal::Contains(AD_PATH_KEYWORDS).matches(&lower)
}

/// Score a url filter by how likely it is to target ads or trackers.
///
/// Pure and deterministic; higher means more likely.
///
/// # Example
/// ```
/// use dnrc::heuristic::ad_score;
///
/// assert_eq!(ad_score("/ads/banner.gif"), 28);
/// assert_eq!(ad_score("/assets/logo"), 0);
/// ```
pub fn ad_score(url_filter: &str) -> u32 {
    let lower = url_filter.to_lowercase();
    SCORE_TABLE
        .iter()
        .filter(|(signal, _)| signal.matches(&lower))
        .map(|(_, weight)| weight)
        .sum()
}
