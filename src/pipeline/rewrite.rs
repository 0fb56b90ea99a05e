//! Content rewriting: turn an exported Markdown body into a finished post.
//!
//! Every step is a whole-buffer transformation feeding the next one:
//!
//! ```text
//! strip front matter ─▶ tag formulas ─▶ localize external images
//!   ─▶ merge image sequences ─▶ locate formula ranges
//!   ─▶ substitute image links ─▶ rewrite links ─▶ strip sentinels
//!   ─▶ prepend front matter
//! ```
//!
//! Sentinels exist only between tagging and stripping; the returned text
//! never contains them.

use crate::config::PublishConfig;
use crate::error::PublishError;
use crate::output::{ImageRecord, ImageSequences, RewriteStats};
use crate::pipeline::fetch::{fetch_and_rewrite, ImageFetcher};
use crate::pipeline::formula::{locate_formula_ranges, strip_sentinels, tag_formulas};
use crate::pipeline::frontmatter::{build_front_matter, strip_front_matter};
use crate::pipeline::images::substitute_image_links;
use crate::pipeline::links::LinkRewriter;
use chrono::NaiveDateTime;
use tracing::{debug, info};

/// Rewrite one document's Markdown.
///
/// `embedded` are the document's extracted images in extraction order.
/// `generated_at` becomes the `date` field of the front matter.
pub async fn rewrite_markdown<F: ImageFetcher>(
    content: &str,
    folder_name: &str,
    embedded: Vec<ImageRecord>,
    config: &PublishConfig,
    fetcher: &F,
    generated_at: NaiveDateTime,
) -> Result<(String, RewriteStats), PublishError> {
    let links = LinkRewriter::new(config)?;
    let mut stats = RewriteStats::default();

    let body = strip_front_matter(content);
    let tagged = tag_formulas(body);

    let (localized, external) = fetch_and_rewrite(&tagged, folder_name, config, fetcher).await;
    stats.external_downloaded = external.len();

    let sequences = ImageSequences::merge(embedded, external);
    debug!(
        "'{}': {} images, {} formula, {} regular",
        folder_name,
        sequences.all.len(),
        sequences.formula.len(),
        sequences.regular.len()
    );

    let ranges = locate_formula_ranges(&localized);
    let substitution = substitute_image_links(
        &localized,
        &ranges,
        &sequences.regular,
        &config.base_url,
        folder_name,
    );
    substitution.record_into(&mut stats);

    let linked = links.rewrite(&substitution.text, folder_name);
    let body = strip_sentinels(&linked);

    let mut post = build_front_matter(folder_name, &config.tags, &config.categories, generated_at);
    post.push_str(&body);

    info!(
        "Rewrote '{}': {} images substituted, {} downloaded, {} skipped in formulas",
        folder_name, stats.images_substituted, stats.external_downloaded, stats.skipped_in_formula
    );
    Ok((post, stats))
}
