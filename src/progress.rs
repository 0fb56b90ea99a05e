//! Progress-callback trait for per-document batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::PublishConfigBuilder::progress_callback`] to receive
//! events as the batch driver works through a directory.
//!
//! # Example
//!
//! ```rust
//! use docx2hexo::{BatchProgressCallback, DocumentReport, PublishConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     published: Arc<AtomicUsize>,
//! }
//!
//! impl BatchProgressCallback for CountingCallback {
//!     fn on_document_complete(&self, report: &DocumentReport, index: usize, total: usize) {
//!         self.published.fetch_add(1, Ordering::SeqCst);
//!         eprintln!(
//!             "{}/{} {} done, {} images substituted",
//!             index, total, report.name, report.stats.images_substituted
//!         );
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     published: Arc::new(AtomicUsize::new(0)),
//! });
//!
//! let config = PublishConfig::builder()
//!     .progress_callback(counter as Arc<dyn BatchProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::output::DocumentReport;
use std::sync::Arc;

/// Called by the batch driver as it processes each document.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Documents are processed one at a time, but the trait
/// is `Send + Sync` so the callback can live inside a shared config.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once after discovery, before any document is processed.
    ///
    /// # Arguments
    /// * `total_documents`: number of document units found
    fn on_batch_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    /// Called before a document's images are extracted.
    ///
    /// # Arguments
    /// * `name`: base name shared by the `.docx` and `.md`
    /// * `index`: 1-indexed position in the batch
    /// * `total`: number of documents in the batch
    fn on_document_start(&self, name: &str, index: usize, total: usize) {
        let _ = (name, index, total);
    }

    /// Called when a document has been published to both destinations.
    ///
    /// `report` carries the document's name and its image counters.
    fn on_document_complete(&self, report: &DocumentReport, index: usize, total: usize) {
        let _ = (report, index, total);
    }

    /// Called when a document failed and was skipped.
    ///
    /// # Arguments
    /// * `error`: human-readable error description
    fn on_document_error(&self, name: &str, index: usize, total: usize, error: &str) {
        let _ = (name, index, total, error);
    }

    /// Called once after every document has been attempted.
    fn on_batch_complete(&self, total_documents: usize, published: usize) {
        let _ = (total_documents, published);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PublishConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;
