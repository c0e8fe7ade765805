//! Generic element-hiding selectors.

use ahash::AHashSet;

use super::SkipReason;

/// CSS declaration appended to the merged selector list.
const HIDE_DECLARATION: &str = "{ display: none !important; }";

/// Extract the selector from a `##` hide rule.
///
/// Only generic rules (nothing before `##`) are admitted. Scriptlets
/// (`+js(...)`) and procedural operators (`:style(`, `:remove`) are rejected.
pub fn parse_hide_selector(line: &str) -> Result<&str, SkipReason> {
    let idx = line.find("##").ok_or(SkipReason::Cosmetic)?;

    if idx > 0 {
        // example.com##.foo
        return Err(SkipReason::Cosmetic);
    }

    let selector = line[idx + 2..].trim();
    if selector.is_empty()
        || selector.starts_with("+js(")
        || selector.contains(":style(")
        || selector.contains(":remove")
    {
        return Err(SkipReason::UnsupportedSelector);
    }

    Ok(selector)
}

/// Bounded, insertion-ordered set of hide selectors.
#[derive(Debug, Clone)]
pub struct HideSelectorSet {
    selectors: Vec<String>,
    seen: AHashSet<String>,
    capacity: usize,
}

impl HideSelectorSet {
    /// Create an empty set that admits at most `capacity` selectors.
    pub fn new(capacity: usize) -> Self {
        Self {
            selectors: Vec::new(),
            seen: AHashSet::new(),
            capacity,
        }
    }

    /// Add a selector. Returns `false` if it was a duplicate or the set is full.
    pub fn insert(&mut self, selector: &str) -> bool {
        if self.is_full() || self.seen.contains(selector) {
            return false;
        }
        self.seen.insert(selector.to_string());
        self.selectors.push(selector.to_string());
        true
    }

    pub fn is_full(&self) -> bool {
        self.selectors.len() >= self.capacity
    }

    pub fn len(&self) -> usize {
        self.selectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.selectors
    }

    pub fn into_vec(self) -> Vec<String> {
        self.selectors
    }

    /// Render the set as one stylesheet rule.
    pub fn render_css(&self) -> String {
        render_hide_css(&self.selectors)
    }
}

/// Render selectors as `a,\nb { display: none !important; }`.
///
/// An empty selector list renders as the empty string.
pub fn render_hide_css(selectors: &[String]) -> String {
    if selectors.is_empty() {
        return String::new();
    }
    format!("{} {}", selectors.join(",\n"), HIDE_DECLARATION)
}
