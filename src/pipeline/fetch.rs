//! External image localization: download `![alt](http…)` images and point
//! the markup at the local copy.
//!
//! Downloads go through the [`ImageFetcher`] trait so the rewrite logic can
//! be exercised without a network. [`HttpFetcher`] is the `reqwest`
//! implementation used in production.
//!
//! A failed download is never fatal: the markup stays byte-for-byte as it
//! was and no [`ImageRecord`] is produced.

use crate::config::PublishConfig;
use crate::error::{ImageError, PublishError};
use crate::output::ImageRecord;
use crate::pipeline::assets;
use crate::pipeline::images::canonical_image_url;
use once_cell::sync::Lazy;
use regex::Regex;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Extensions kept from the URL; anything else is stored as `.png`.
const KNOWN_EXTENSIONS: [&str; 4] = [".png", ".jpg", ".jpeg", ".gif"];

static RE_EXTERNAL_IMAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[([^\]]*)\]\((https?://[^)]+)\)").unwrap());

/// Fetches the bytes behind an image URL.
pub trait ImageFetcher {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, ImageError>> + Send;
}

/// Plain HTTP(S) GET with a per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout_secs: u64,
}

impl HttpFetcher {
    pub fn new(timeout_secs: u64) -> Result<Self, PublishError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| PublishError::HttpClient(e.to_string()))?;
        Ok(Self {
            client,
            timeout_secs,
        })
    }

    pub fn from_config(config: &PublishConfig) -> Result<Self, PublishError> {
        Self::new(config.download_timeout_secs)
    }
}

impl ImageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ImageError> {
        let classify_err = |e: reqwest::Error| {
            if e.is_timeout() {
                ImageError::FetchTimeout {
                    url: url.to_string(),
                    secs: self.timeout_secs,
                }
            } else {
                ImageError::FetchFailed {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        };

        let response = self.client.get(url).send().await.map_err(classify_err)?;

        if !response.status().is_success() {
            return Err(ImageError::FetchStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(classify_err)?;
        Ok(bytes.to_vec())
    }
}

/// Download every external image in `text` and rewrite its markup.
///
/// Returns the rewritten text and one record per localized image, in the
/// order the images appear. Files are named `{folder}_external_{n}{ext}`
/// with a counter of their own.
pub async fn fetch_and_rewrite<F: ImageFetcher>(
    text: &str,
    folder_name: &str,
    config: &PublishConfig,
    fetcher: &F,
) -> (String, Vec<ImageRecord>) {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    let mut counter = 0usize;
    let mut records = Vec::new();

    for caps in RE_EXTERNAL_IMAGE.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let alt = &caps[1];
        let url = &caps[2];

        out.push_str(&text[last..whole.start()]);
        last = whole.end();

        let bytes = match fetcher.fetch(url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Keeping remote image as-is: {}", e);
                out.push_str(whole.as_str());
                continue;
            }
        };

        let name = format!("{folder_name}_external_{counter}{}", extension_from_url(url));
        counter += 1;

        if let Err(e) = assets::store_image(config, folder_name, &name, &bytes).await {
            warn!("Keeping remote image as-is, could not store {}: {}", name, e);
            out.push_str(whole.as_str());
            continue;
        }

        let local = canonical_image_url(&config.base_url, folder_name, &name);
        debug!("Localized {} → {}", url, local);
        out.push_str(&format!("![{alt}]({local})"));
        records.push(ImageRecord::external(name));
    }
    out.push_str(&text[last..]);

    info!(
        "Downloaded {} external images for '{}'",
        records.len(),
        folder_name
    );
    (out, records)
}

/// File extension for a downloaded image, from the URL path alone.
fn extension_from_url(url: &str) -> &'static str {
    let Ok(parsed) = reqwest::Url::parse(url) else {
        return ".png";
    };
    let last = parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("");
    let Some((_, ext)) = last.rsplit_once('.') else {
        return ".png";
    };
    let ext = format!(".{}", ext.to_ascii_lowercase());
    KNOWN_EXTENSIONS
        .iter()
        .find(|known| **known == ext)
        .copied()
        .unwrap_or(".png")
}
