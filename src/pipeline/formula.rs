//! Formula tagging: fence off math so image substitution can step around it.
//!
//! Rather than teaching later passes LaTeX, every math span is wrapped in a
//! pair of sentinel tokens. Later passes only need to find sentinel pairs,
//! and [`strip_sentinels`] restores the original text exactly.
//!
//! ## Pass order
//!
//! 1. block math `$$…$$` (may span lines)
//! 2. inline math `$…$` (single line)
//! 3. `equation`, `align` and `gather` environments (may span lines)
//!
//! Each pass only scans text outside spans tagged by an earlier pass, so the
//! inline rule never re-tags the dollars of a block formula.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Opens a formula region.
pub const FORMULA_START: &str = "⚡FORMULA⚡";
/// Closes a formula region.
pub const FORMULA_END: &str = "⚡FORMULA_END⚡";

static RE_BLOCK_MATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\$\$.*?\$\$").unwrap());

static RE_INLINE_MATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$.*?\$").unwrap());

static RE_ENVIRONMENTS: Lazy<Vec<Regex>> = Lazy::new(|| {
    ["equation", "align", "gather"]
        .iter()
        .map(|env| {
            Regex::new(&format!(
                r"(?s)\s*\\begin\{{{env}\}}.*?\\end\{{{env}\}}\s*"
            ))
            .unwrap()
        })
        .collect()
});

/// Half-open byte span `[start, end)` covering a sentinel pair and its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormulaRange {
    pub start: usize,
    pub end: usize,
}

impl FormulaRange {
    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }
}

/// Wrap every math span in sentinels.
pub fn tag_formulas(text: &str) -> String {
    let text = tag_outside_regions(text, &RE_BLOCK_MATH);
    let mut text = tag_outside_regions(&text, &RE_INLINE_MATH);
    for env in RE_ENVIRONMENTS.iter() {
        text = tag_outside_regions(&text, env);
    }
    text
}

/// Remove every sentinel, leaving the math itself in place.
pub fn strip_sentinels(text: &str) -> String {
    text.replace(FORMULA_START, "").replace(FORMULA_END, "")
}

/// Forward scan for sentinel pairs.
///
/// Ranges come out non-overlapping and in ascending order. A start sentinel
/// with no end sentinel after it ends the scan; the text from there on is
/// treated as unprotected.
pub fn locate_formula_ranges(text: &str) -> Vec<FormulaRange> {
    let mut ranges = Vec::new();
    let mut from = 0;
    while from < text.len() {
        let Some(start) = text[from..].find(FORMULA_START).map(|i| i + from) else {
            break;
        };
        let Some(end) = text[start..].find(FORMULA_END).map(|i| i + start) else {
            break;
        };
        let end = end + FORMULA_END.len();
        ranges.push(FormulaRange { start, end });
        from = end;
    }
    ranges
}

/// Apply one tagging pass to the text between already-tagged regions.
fn tag_outside_regions(text: &str, re: &Regex) -> String {
    let mut out = String::with_capacity(text.len() + 64);
    let mut cursor = 0;
    for range in locate_formula_ranges(text) {
        out.push_str(&wrap_matches(&text[cursor..range.start], re));
        out.push_str(&text[range.start..range.end]);
        cursor = range.end;
    }
    out.push_str(&wrap_matches(&text[cursor..], re));
    out
}

fn wrap_matches(segment: &str, re: &Regex) -> String {
    re.replace_all(segment, |caps: &Captures<'_>| {
        format!("{FORMULA_START}{}{FORMULA_END}", &caps[0])
    })
    .into_owned()
}
