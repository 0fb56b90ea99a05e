//! # docx2hexo
//!
//! Publish Word documents as Hexo blog posts.
//!
//! The input is a directory of `.docx` files, each with a Markdown export of
//! the same base name beside it. The export's image references are useless
//! outside the machine that produced it, so this crate pulls the images out
//! of the Word package, downloads any remote ones, and rewrites the Markdown
//! to point at local copies served by the blog.
//!
//! ## Pipeline Overview
//!
//! ```text
//! {name}.docx + {name}.md
//!  │
//!  ├─ 1. Extract   embedded images from the zip (spawn_blocking)
//!  ├─ 2. Classify  thin strips (aspect ratio > 5) are formulas
//!  ├─ 3. Tag       fence math with sentinels
//!  ├─ 4. Fetch     download http(s) images, localize their markup
//!  ├─ 5. Replace   n-th placeholder outside math → n-th regular image
//!  ├─ 6. Links     cross-document links → /docx/{title}/
//!  └─ 7. Publish   front matter, overwrite source, copy to _posts
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docx2hexo::{run_batch, HttpFetcher, PublishConfig};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PublishConfig::builder()
//!         .tag("Computer Systems")
//!         .category("CSAPP")
//!         .build()?;
//!     let fetcher = HttpFetcher::from_config(&config)?;
//!     let report = run_batch(Path::new("."), &config, &fetcher).await?;
//!     eprintln!("published {} documents", report.published_count());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docx2hexo` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! docx2hexo = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod publish;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{discover_units, run_batch, run_batch_sync, Discovery};
pub use config::{ImageOrder, PublishConfig, PublishConfigBuilder};
pub use error::{error_chain, ImageError, PublishError};
pub use output::{
    BatchReport, DocumentFailure, DocumentReport, ImageOrigin, ImageRecord, ImageSequences,
    RewriteStats,
};
pub use pipeline::fetch::{HttpFetcher, ImageFetcher};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use publish::{publish_document, publish_sync, DocumentUnit};
