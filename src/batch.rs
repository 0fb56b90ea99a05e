//! Batch driver: publish every document unit found in a directory.
//!
//! Documents are processed one at a time in file-name order. A failure in
//! one document is logged with its full cause chain and counted; it never
//! stops the batch. Only a failure to create the output roots is fatal.

use crate::config::PublishConfig;
use crate::error::{error_chain, PublishError};
use crate::output::{BatchReport, DocumentFailure};
use crate::pipeline::assets;
use crate::pipeline::fetch::{HttpFetcher, ImageFetcher};
use crate::publish::{publish_document, DocumentUnit};
use std::path::Path;
use std::time::Instant;
use tracing::{error, info, warn};

/// Units found in a directory, plus the `.docx` names that had no Markdown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovery {
    pub units: Vec<DocumentUnit>,
    pub skipped: Vec<String>,
}

/// List the document units in `dir`.
///
/// Any regular file whose extension is `docx` (case-insensitive) is a
/// candidate; it becomes a unit when `{base}.md` exists beside it.
pub async fn discover_units(dir: &Path) -> Result<Discovery, PublishError> {
    let read_failed = |e| PublishError::ReadFailed {
        path: dir.to_path_buf(),
        source: e,
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(read_failed)?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(read_failed)? {
        let path = entry.path();
        let is_docx = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("docx"));
        if !is_docx || !entry.file_type().await.map_err(read_failed)?.is_file() {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            names.push((stem.to_string(), path.clone()));
        } else {
            warn!("Skipping {}: file name is not valid UTF-8", path.display());
        }
    }
    names.sort();

    let mut discovery = Discovery::default();
    for (name, docx_path) in names {
        let markdown_path = dir.join(format!("{name}.md"));
        if tokio::fs::try_exists(&markdown_path).await.unwrap_or(false) {
            discovery.units.push(DocumentUnit {
                name,
                docx_path,
                markdown_path,
            });
        } else {
            warn!("Skipping '{}': no matching Markdown file", name);
            discovery.skipped.push(name);
        }
    }
    Ok(discovery)
}

/// Publish every unit in `dir`.
///
/// # Errors
/// Returns `Err(PublishError)` only when the directory cannot be listed or
/// an output root cannot be created. Per-document failures are reported in
/// [`BatchReport::failed`].
pub async fn run_batch<F: ImageFetcher>(
    dir: &Path,
    config: &PublishConfig,
    fetcher: &F,
) -> Result<BatchReport, PublishError> {
    let start = Instant::now();
    assets::ensure_output_roots(config).await?;

    let Discovery { units, skipped } = discover_units(dir).await?;
    let total = units.len();
    info!(
        "Found {} documents in {} ({} skipped)",
        total,
        dir.display(),
        skipped.len()
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total);
    }

    let mut report = BatchReport {
        skipped,
        ..BatchReport::default()
    };

    for (i, unit) in units.iter().enumerate() {
        let index = i + 1;
        if let Some(ref cb) = config.progress_callback {
            cb.on_document_start(&unit.name, index, total);
        }

        match publish_document(unit, config, fetcher).await {
            Ok(doc) => {
                info!(
                    "Published '{}': {} embedded images, {} substituted, {} downloaded, {} skipped in formulas",
                    doc.name,
                    doc.embedded_images,
                    doc.stats.images_substituted,
                    doc.stats.external_downloaded,
                    doc.stats.skipped_in_formula
                );
                if let Some(ref cb) = config.progress_callback {
                    cb.on_document_complete(&doc, index, total);
                }
                report.published.push(doc);
            }
            Err(e) => {
                let chain = error_chain(&e);
                error!("Failed to publish '{}': {}", unit.name, chain);
                if let Some(ref cb) = config.progress_callback {
                    cb.on_document_error(&unit.name, index, total, &e.to_string());
                }
                report.failed.push(DocumentFailure {
                    name: unit.name.clone(),
                    error: chain,
                });
            }
        }
    }

    report.total_duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Batch complete: {}/{} documents published in {}ms",
        report.published_count(),
        total,
        report.total_duration_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(total, report.published_count());
    }
    Ok(report)
}

/// Synchronous wrapper around [`run_batch`] using the HTTP fetcher.
///
/// Creates a temporary tokio runtime. Do not call from within an async context.
pub fn run_batch_sync(dir: &Path, config: &PublishConfig) -> Result<BatchReport, PublishError> {
    let fetcher = HttpFetcher::from_config(config)?;
    tokio::runtime::Runtime::new()
        .map_err(|e| PublishError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(run_batch(dir, config, &fetcher))
}
