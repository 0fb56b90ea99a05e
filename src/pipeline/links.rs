//! Cross-document link rewriting.
//!
//! Two rules, applied in this order:
//!
//! 1. A link into the external documentation site (`docs_domain`) points at
//!    the same material this post was exported from, so it is redirected to
//!    the current post: `[text]({link_prefix}/{folder}/)`.
//! 2. Any other link that is neither `http(s)` nor an image is taken to be a
//!    reference to a sibling document titled like its link text:
//!    `[text]({link_prefix}/{text}/)`.
//!
//! Rule 1 must run first; its output is a local path and rule 2 would
//! otherwise re-key it by link text.

use crate::config::PublishConfig;
use crate::error::PublishError;
use once_cell::sync::Lazy;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::{Captures, Regex};

/// Everything except ASCII alphanumerics and `_ . - ~` is encoded.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~');

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "bmp"];

static RE_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]*)\)").unwrap());

/// Percent-encode a single path segment.
pub fn encode_segment(s: &str) -> String {
    utf8_percent_encode(s, PATH_SEGMENT).to_string()
}

/// Link rewriter bound to one configuration.
#[derive(Debug, Clone)]
pub struct LinkRewriter {
    docs_link: Regex,
    link_prefix: String,
}

impl LinkRewriter {
    pub fn new(config: &PublishConfig) -> Result<Self, PublishError> {
        let domain = regex::escape(config.docs_domain.trim());
        let docs_link = Regex::new(&format!(r"\[([^\]]+)\]\((https?://{domain}/[^)]+)\)"))
            .map_err(|e| PublishError::InvalidConfig(format!("docs domain: {e}")))?;
        Ok(Self {
            docs_link,
            link_prefix: config.link_prefix.clone(),
        })
    }

    /// Apply both rules to `text`.
    pub fn rewrite(&self, text: &str, folder_name: &str) -> String {
        let text = self.rewrite_docs_links(text, folder_name);
        self.rewrite_local_links(&text)
    }

    fn rewrite_docs_links(&self, text: &str, folder_name: &str) -> String {
        let target = format!("{}/{}/", self.link_prefix, encode_segment(folder_name));
        self.docs_link
            .replace_all(text, |caps: &Captures<'_>| format!("[{}]({})", &caps[1], target))
            .into_owned()
    }

    fn rewrite_local_links(&self, text: &str) -> String {
        RE_LINK
            .replace_all(text, |caps: &Captures<'_>| {
                let label = &caps[1];
                let target = &caps[2];
                if is_http(target) || is_image_target(target) || self.is_canonical(target) {
                    caps[0].to_string()
                } else {
                    format!("[{}]({}/{}/)", label, self.link_prefix, encode_segment(label))
                }
            })
            .into_owned()
    }

    /// Targets already in `{link_prefix}/…/` form are left as they are.
    fn is_canonical(&self, target: &str) -> bool {
        target
            .strip_prefix(self.link_prefix.as_str())
            .is_some_and(|rest| rest.starts_with('/'))
    }
}

fn is_http(target: &str) -> bool {
    target.starts_with("http://") || target.starts_with("https://")
}

/// Whether a link target names an image file, judged by its extension.
fn is_image_target(target: &str) -> bool {
    let path = target
        .split(['?', '#'])
        .next()
        .unwrap_or(target)
        .trim();
    path.rsplit_once('.').is_some_and(|(_, ext)| {
        IMAGE_EXTENSIONS
            .iter()
            .any(|known| ext.eq_ignore_ascii_case(known))
    })
}
