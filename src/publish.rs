//! Publishing a single document unit.
//!
//! A unit is a `.docx` and the `.md` exported from it, sharing a base name.
//! The base name doubles as the post title and the asset folder name.

use crate::config::PublishConfig;
use crate::error::PublishError;
use crate::output::DocumentReport;
use crate::pipeline::fetch::{HttpFetcher, ImageFetcher};
use crate::pipeline::{assets, extract, rewrite};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// A `.docx` and its exported Markdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentUnit {
    pub name: String,
    pub docx_path: PathBuf,
    pub markdown_path: PathBuf,
}

impl DocumentUnit {
    /// Unit for `{dir}/{name}.docx` and `{dir}/{name}.md`.
    pub fn in_dir(dir: &Path, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            docx_path: dir.join(format!("{name}.docx")),
            markdown_path: dir.join(format!("{name}.md")),
            name,
        }
    }
}

/// Publish one unit: extract its images, rewrite its Markdown, write the post.
///
/// # Errors
/// Returns `Err(PublishError)` when the `.docx` cannot be opened, the
/// Markdown cannot be read, or a post cannot be written. Individual image
/// failures never surface here; they are counted in the report.
pub async fn publish_document<F: ImageFetcher>(
    unit: &DocumentUnit,
    config: &PublishConfig,
    fetcher: &F,
) -> Result<DocumentReport, PublishError> {
    let start = Instant::now();
    info!("Publishing '{}'", unit.name);

    // ── Step 1: Embedded images ──────────────────────────────────────────
    let extracted = extract::extract_images(&unit.docx_path, &unit.name, config).await?;
    let embedded_images = extracted.records.len();
    let formula_images = extracted.records.iter().filter(|r| r.is_formula).count();
    let failed_images = extracted.failures.len();

    // ── Step 2: Read the exported Markdown ───────────────────────────────
    let content = tokio::fs::read_to_string(&unit.markdown_path)
        .await
        .map_err(|e| PublishError::ReadFailed {
            path: unit.markdown_path.clone(),
            source: e,
        })?;

    // ── Step 3: Rewrite ──────────────────────────────────────────────────
    let generated_at = chrono::Local::now().naive_local();
    let (post, stats) = rewrite::rewrite_markdown(
        &content,
        &unit.name,
        extracted.records,
        config,
        fetcher,
        generated_at,
    )
    .await?;

    // ── Step 4: Persist ──────────────────────────────────────────────────
    let mut outputs = Vec::with_capacity(2);
    if config.overwrite_source {
        outputs.push(unit.markdown_path.clone());
    }
    outputs.push(config.publish_posts_dir.join(format!("{}.md", unit.name)));
    for path in &outputs {
        assets::write_post(path, &post).await?;
    }
    debug!("'{}' written to {} locations", unit.name, outputs.len());

    Ok(DocumentReport {
        name: unit.name.clone(),
        embedded_images,
        formula_images,
        failed_images,
        stats,
        outputs,
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

/// Synchronous wrapper around [`publish_document`] using the HTTP fetcher.
///
/// Creates a temporary tokio runtime. Do not call from within an async context.
pub fn publish_sync(
    unit: &DocumentUnit,
    config: &PublishConfig,
) -> Result<DocumentReport, PublishError> {
    let fetcher = HttpFetcher::from_config(config)?;
    tokio::runtime::Runtime::new()
        .map_err(|e| PublishError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(publish_document(unit, config, &fetcher))
}
