//! Filter list converters.

mod cosmetic;
mod easylist;

pub use cosmetic::{parse_hide_selector, render_hide_css, HideSelectorSet};
pub use easylist::{classify_line, parse_list, LineKind, ParseStats, ParsedList, SkipReason};
