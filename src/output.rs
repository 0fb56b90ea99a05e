//! Records and reports produced by the publishing pipeline.

use crate::error::ImageError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where an image came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageOrigin {
    /// Stored inside the `.docx` package.
    Embedded,
    /// Downloaded from an `http(s)` URL found in the Markdown.
    External,
}

/// One localized image. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// File name inside the document's asset folder.
    pub name: String,
    /// Whether the classifier judged this a formula rendering.
    pub is_formula: bool,
    pub origin: ImageOrigin,
}

impl ImageRecord {
    pub fn embedded(name: impl Into<String>, is_formula: bool) -> Self {
        Self {
            name: name.into(),
            is_formula,
            origin: ImageOrigin::Embedded,
        }
    }

    /// External images are never formulas.
    pub fn external(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_formula: false,
            origin: ImageOrigin::External,
        }
    }
}

/// The merged image sequence of one document and its two stable partitions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageSequences {
    /// Embedded images first, then external ones, each in discovery order.
    pub all: Vec<ImageRecord>,
    pub formula: Vec<ImageRecord>,
    pub regular: Vec<ImageRecord>,
}

impl ImageSequences {
    pub fn merge(embedded: Vec<ImageRecord>, external: Vec<ImageRecord>) -> Self {
        let all: Vec<ImageRecord> = embedded.into_iter().chain(external).collect();
        let (formula, regular): (Vec<_>, Vec<_>) =
            all.iter().cloned().partition(|img| img.is_formula);
        Self {
            all,
            formula,
            regular,
        }
    }
}

/// Counters returned by one content rewrite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteStats {
    /// Image placeholders replaced with a canonical URL.
    pub images_substituted: usize,
    /// External images downloaded and localized.
    pub external_downloaded: usize,
    /// Image placeholders left alone because they sit inside a formula.
    pub skipped_in_formula: usize,
}

/// The embedded images of one document plus the failures met extracting them.
#[derive(Debug, Clone, Default)]
pub struct ExtractedImages {
    pub records: Vec<ImageRecord>,
    /// `(image name, error)` for parts whose bytes could not be written.
    pub failures: Vec<(String, ImageError)>,
}

/// Outcome of publishing one document unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentReport {
    /// Base name shared by the `.docx`, the `.md` and the asset folder.
    pub name: String,
    pub embedded_images: usize,
    pub formula_images: usize,
    pub failed_images: usize,
    pub stats: RewriteStats,
    /// Every file the rewritten post was written to.
    pub outputs: Vec<PathBuf>,
    pub duration_ms: u64,
}

/// A document that could not be published.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentFailure {
    pub name: String,
    pub error: String,
}

/// Outcome of a whole batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub published: Vec<DocumentReport>,
    pub failed: Vec<DocumentFailure>,
    /// `.docx` files without a sibling `.md`.
    pub skipped: Vec<String>,
    pub total_duration_ms: u64,
}

impl BatchReport {
    /// Number of documents successfully processed.
    pub fn published_count(&self) -> usize {
        self.published.len()
    }
}
