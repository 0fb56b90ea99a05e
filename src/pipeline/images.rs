//! Positional image substitution.
//!
//! The Markdown export names images arbitrarily (`media/image3.png`, a
//! temporary path, a remote URL that has since been localized). The only
//! reliable link between an image placeholder and an extracted file is
//! position: the `n`-th placeholder outside math gets the `n`-th regular
//! image. Placeholders inside a formula region are left alone, since their
//! image was classified as a formula and is not part of the regular sequence.

use crate::output::{ImageRecord, RewriteStats};
use crate::pipeline::formula::FormulaRange;
use once_cell::sync::Lazy;
use regex::Regex;

static RE_IMAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"!\[(.*?)\]\(([^)]+)\)").unwrap());

/// Public URL of a localized image. Only spaces are encoded.
pub fn canonical_image_url(base_url: &str, folder_name: &str, image_name: &str) -> String {
    format!("{base_url}/{folder_name}/{image_name}").replace(' ', "%20")
}

/// Result of [`substitute_image_links`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub text: String,
    pub substituted: usize,
    pub skipped_in_formula: usize,
}

impl Substitution {
    /// Fold these counts into a document's stats.
    pub fn record_into(&self, stats: &mut RewriteStats) {
        stats.images_substituted += self.substituted;
        stats.skipped_in_formula += self.skipped_in_formula;
    }
}

/// State carried from one image match to the next.
struct Accumulator<'a> {
    out: String,
    last: usize,
    remaining: std::slice::Iter<'a, ImageRecord>,
    substituted: usize,
    skipped_in_formula: usize,
}

/// Replace image markup outside `ranges` with canonical URLs, in order.
///
/// `ranges` must be the sentinel ranges of `text` itself. Once `regular` is
/// exhausted, further placeholders are left as they are.
pub fn substitute_image_links(
    text: &str,
    ranges: &[FormulaRange],
    regular: &[ImageRecord],
    base_url: &str,
    folder_name: &str,
) -> Substitution {
    let init = Accumulator {
        out: String::with_capacity(text.len()),
        last: 0,
        remaining: regular.iter(),
        substituted: 0,
        skipped_in_formula: 0,
    };

    let mut acc = RE_IMAGE.captures_iter(text).fold(init, |mut acc, caps| {
        let Some(whole) = caps.get(0) else {
            return acc;
        };
        acc.out.push_str(&text[acc.last..whole.start()]);
        acc.last = whole.end();

        if ranges.iter().any(|r| r.contains(whole.start())) {
            acc.skipped_in_formula += 1;
            acc.out.push_str(whole.as_str());
            return acc;
        }

        match acc.remaining.next() {
            Some(image) => {
                let url = canonical_image_url(base_url, folder_name, &image.name);
                acc.out.push_str(&format!("![{}]({})", &caps[1], url));
                acc.substituted += 1;
            }
            None => acc.out.push_str(whole.as_str()),
        }
        acc
    });
    acc.out.push_str(&text[acc.last..]);

    Substitution {
        text: acc.out,
        substituted: acc.substituted,
        skipped_in_formula: acc.skipped_in_formula,
    }
}
