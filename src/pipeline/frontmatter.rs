//! Hexo front matter: strip whatever the export carried, then generate our own.

use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Write;

/// A `---` delimited block at the very start of the buffer.
static RE_FRONT_MATTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\A---\n(.*?\n)?---\n").unwrap());

/// Format of the `date` field, second precision.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Remove a leading front matter block. Text without one is returned as is.
pub fn strip_front_matter(text: &str) -> &str {
    match RE_FRONT_MATTER.find(text) {
        Some(m) => &text[m.end()..],
        None => text,
    }
}

/// Render the front matter block, up to and including the closing `---` line.
///
/// No blank line is written after the closing delimiter, unlike the usual
/// `---` + blank line layout. The body follows directly, so
/// [`strip_front_matter`] removes exactly what this adds and republishing a
/// post does not grow it.
pub fn build_front_matter(
    title: &str,
    tags: &[String],
    categories: &[String],
    generated_at: NaiveDateTime,
) -> String {
    let mut out = String::from("---\n");
    let _ = writeln!(out, "title: {}", quoted(title));
    out.push_str("tags:\n");
    for tag in tags {
        let _ = writeln!(out, "    - {}", quoted(tag));
    }
    out.push_str("categories:\n");
    for category in categories {
        let _ = writeln!(out, "    - {}", quoted(category));
    }
    let _ = writeln!(out, "date: \"{}\"", generated_at.format(DATE_FORMAT));
    out.push_str("---\n");
    out
}

/// YAML double-quoted scalar.
fn quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}
