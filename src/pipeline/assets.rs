//! Dual persistence: every image and every finished post lands in two places.
//!
//! Images go to `{root}/{folder}/{name}` under both the working asset root
//! and the publish asset root. Posts overwrite the source Markdown and are
//! copied into the blog's posts directory. Directories are created on demand
//! and re-creating an existing one is not an error.

use crate::config::PublishConfig;
use crate::error::{ImageError, PublishError};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Create every output root. Called once before a batch; failure is fatal.
pub async fn ensure_output_roots(config: &PublishConfig) -> Result<(), PublishError> {
    for root in config.output_roots() {
        tokio::fs::create_dir_all(root)
            .await
            .map_err(|e| PublishError::OutputDirFailed {
                path: root.clone(),
                source: e,
            })?;
    }
    Ok(())
}

/// Write one image to both asset roots, returning the paths written.
pub async fn store_image(
    config: &PublishConfig,
    folder_name: &str,
    image_name: &str,
    bytes: &[u8],
) -> Result<Vec<PathBuf>, ImageError> {
    let mut written = Vec::with_capacity(2);
    for root in config.asset_roots() {
        let dir = root.join(folder_name);
        let path = dir.join(image_name);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| ImageError::WriteFailed {
                path: dir.clone(),
                detail: e.to_string(),
            })?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| ImageError::WriteFailed {
                path: path.clone(),
                detail: e.to_string(),
            })?;
        debug!("Wrote {} ({} bytes)", path.display(), bytes.len());
        written.push(path);
    }
    Ok(written)
}

/// Blocking twin of [`store_image`] for code already on a blocking thread.
pub fn store_image_blocking(
    config: &PublishConfig,
    folder_name: &str,
    image_name: &str,
    bytes: &[u8],
) -> Result<Vec<PathBuf>, ImageError> {
    let mut written = Vec::with_capacity(2);
    for root in config.asset_roots() {
        let dir = root.join(folder_name);
        let path = dir.join(image_name);
        std::fs::create_dir_all(&dir).map_err(|e| ImageError::WriteFailed {
            path: dir.clone(),
            detail: e.to_string(),
        })?;
        std::fs::write(&path, bytes).map_err(|e| ImageError::WriteFailed {
            path: path.clone(),
            detail: e.to_string(),
        })?;
        debug!("Wrote {} ({} bytes)", path.display(), bytes.len());
        written.push(path);
    }
    Ok(written)
}

/// Write text atomically: temp file beside the target, then rename.
pub async fn write_post(path: &Path, contents: &str) -> Result<(), PublishError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| PublishError::OutputWriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
    }

    let tmp_path = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, contents)
        .await
        .map_err(|e| PublishError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| PublishError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    debug!("Wrote post {}", path.display());
    Ok(())
}
