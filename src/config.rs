//! Configuration types for publishing Word documents as Hexo posts.
//!
//! All publishing behaviour is controlled through [`PublishConfig`], built
//! via its [`PublishConfigBuilder`]. Output roots, the image base URL, the
//! front-matter lists and the link scheme are values threaded into every
//! pipeline stage rather than process-wide constants, so each stage can be
//! tested against a temporary directory.

use crate::error::PublishError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Configuration for publishing a batch of documents.
///
/// Built via [`PublishConfig::builder()`] or using [`PublishConfig::default()`].
///
/// # Example
/// ```rust
/// use docx2hexo::PublishConfig;
///
/// let config = PublishConfig::builder()
///     .publish_posts_dir("blog/source/_posts")
///     .publish_asset_root("blog/source/img/filesimg")
///     .tag("Computer Systems")
///     .category("CSAPP")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct PublishConfig {
    /// Working asset tree. Default: `img/filesimg`.
    ///
    /// Every image is written to `{asset_root}/{folder}/{name}`.
    pub asset_root: PathBuf,

    /// Publish asset tree inside the blog's source. Default:
    /// `hexo/source/img/filesimg`.
    pub publish_asset_root: PathBuf,

    /// Directory the finished post is copied into. Default: `hexo/source/_posts`.
    pub publish_posts_dir: PathBuf,

    /// URL prefix under which the blog serves `publish_asset_root`.
    /// Default: `/img/filesimg`.
    pub base_url: String,

    /// Tags written into every generated front matter.
    pub tags: Vec<String>,

    /// Categories written into every generated front matter.
    pub categories: Vec<String>,

    /// Host whose links are rewritten to the current post. Default: `www.yuque.com`.
    pub docs_domain: String,

    /// Path prefix for rewritten cross-document links. Default: `/docx`.
    pub link_prefix: String,

    /// Timeout for each external image download, in seconds. Default: 10.
    pub download_timeout_secs: u64,

    /// Aspect ratio above which an embedded image counts as a formula. Default: 5.0.
    ///
    /// Word renders equations that were pasted as pictures into thin strips,
    /// so `max(w/h, h/w) > ratio` is a cheap stand-in for "this is math".
    pub formula_aspect_ratio: f64,

    /// Order in which embedded images are numbered. Default: [`ImageOrder::Relationship`].
    pub image_order: ImageOrder,

    /// Overwrite the source Markdown with the rewritten post. Default: true.
    pub overwrite_source: bool,

    /// Receives per-document events from the batch driver.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("img/filesimg"),
            publish_asset_root: PathBuf::from("hexo/source/img/filesimg"),
            publish_posts_dir: PathBuf::from("hexo/source/_posts"),
            base_url: "/img/filesimg".to_string(),
            tags: Vec::new(),
            categories: Vec::new(),
            docs_domain: "www.yuque.com".to_string(),
            link_prefix: "/docx".to_string(),
            download_timeout_secs: 10,
            formula_aspect_ratio: crate::pipeline::classify::DEFAULT_FORMULA_RATIO,
            image_order: ImageOrder::default(),
            overwrite_source: true,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PublishConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublishConfig")
            .field("asset_root", &self.asset_root)
            .field("publish_asset_root", &self.publish_asset_root)
            .field("publish_posts_dir", &self.publish_posts_dir)
            .field("base_url", &self.base_url)
            .field("tags", &self.tags)
            .field("categories", &self.categories)
            .field("docs_domain", &self.docs_domain)
            .field("link_prefix", &self.link_prefix)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("formula_aspect_ratio", &self.formula_aspect_ratio)
            .field("image_order", &self.image_order)
            .field("overwrite_source", &self.overwrite_source)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn BatchProgressCallback>"),
            )
            .finish()
    }
}

impl PublishConfig {
    /// Create a new builder for `PublishConfig`.
    pub fn builder() -> PublishConfigBuilder {
        PublishConfigBuilder {
            config: Self::default(),
        }
    }

    /// Both asset roots, working tree first.
    pub fn asset_roots(&self) -> [&PathBuf; 2] {
        [&self.asset_root, &self.publish_asset_root]
    }

    /// Every directory that must exist before a batch starts.
    pub fn output_roots(&self) -> [&PathBuf; 3] {
        [
            &self.asset_root,
            &self.publish_asset_root,
            &self.publish_posts_dir,
        ]
    }
}

/// Builder for [`PublishConfig`].
#[derive(Debug)]
pub struct PublishConfigBuilder {
    config: PublishConfig,
}

impl PublishConfigBuilder {
    pub fn asset_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.asset_root = path.into();
        self
    }

    pub fn publish_asset_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.publish_asset_root = path.into();
        self
    }

    pub fn publish_posts_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.publish_posts_dir = path.into();
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.config.tags.push(tag.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.config.categories.push(category.into());
        self
    }

    pub fn categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    pub fn docs_domain(mut self, domain: impl Into<String>) -> Self {
        self.config.docs_domain = domain.into();
        self
    }

    pub fn link_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.link_prefix = prefix.into().trim_end_matches('/').to_string();
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn formula_aspect_ratio(mut self, ratio: f64) -> Self {
        self.config.formula_aspect_ratio = ratio;
        self
    }

    pub fn image_order(mut self, order: ImageOrder) -> Self {
        self.config.image_order = order;
        self
    }

    pub fn overwrite_source(mut self, v: bool) -> Self {
        self.config.overwrite_source = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PublishConfig, PublishError> {
        let c = &self.config;
        if c.base_url.is_empty() {
            return Err(PublishError::InvalidConfig(
                "base URL must not be empty".into(),
            ));
        }
        if c.docs_domain.trim().is_empty() {
            return Err(PublishError::InvalidConfig(
                "docs domain must not be empty".into(),
            ));
        }
        if c.download_timeout_secs == 0 {
            return Err(PublishError::InvalidConfig(
                "download timeout must be ≥ 1 second".into(),
            ));
        }
        if !(c.formula_aspect_ratio.is_finite() && c.formula_aspect_ratio >= 1.0) {
            return Err(PublishError::InvalidConfig(format!(
                "formula aspect ratio must be a finite number ≥ 1, got {}",
                c.formula_aspect_ratio
            )));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Order in which embedded images are enumerated and numbered.
///
/// The Markdown export places image placeholders in reading order, but a
/// `.docx` only promises that its relationship table lists parts in *some*
/// canonical order. For most documents authored top-to-bottom the two agree;
/// for documents with images inserted later they may not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImageOrder {
    /// Relationship-table order of `word/_rels/document.xml.rels`. (default)
    #[default]
    Relationship,
    /// Order of `a:blip` references in `word/document.xml`, falling back to
    /// relationship order when the body references no image parts.
    Document,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = PublishConfig::builder().build().expect("defaults build");
        assert_eq!(config.base_url, "/img/filesimg");
        assert_eq!(config.download_timeout_secs, 10);
        assert_eq!(config.image_order, ImageOrder::Relationship);
        assert!(config.overwrite_source);
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let config = PublishConfig::builder()
            .base_url("/img/filesimg/")
            .link_prefix("/docx/")
            .build()
            .unwrap();
        assert_eq!(config.base_url, "/img/filesimg");
        assert_eq!(config.link_prefix, "/docx");
    }

    #[test]
    fn tags_and_categories_accumulate() {
        let config = PublishConfig::builder()
            .tag("a")
            .tag("b")
            .categories(["c"])
            .build()
            .unwrap();
        assert_eq!(config.tags, vec!["a", "b"]);
        assert_eq!(config.categories, vec!["c"]);
    }

    #[test]
    fn rejects_empty_base_url() {
        let err = PublishConfig::builder().base_url("/").build().unwrap_err();
        assert!(err.to_string().contains("base URL"));
    }

    #[test]
    fn rejects_zero_timeout() {
        assert!(PublishConfig::builder()
            .download_timeout_secs(0)
            .build()
            .is_err());
    }

    #[test]
    fn rejects_ratio_below_one() {
        assert!(PublishConfig::builder()
            .formula_aspect_ratio(0.5)
            .build()
            .is_err());
        assert!(PublishConfig::builder()
            .formula_aspect_ratio(f64::NAN)
            .build()
            .is_err());
    }
}
