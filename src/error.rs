//! Error types for the docx2hexo library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`PublishError`] is **fatal** for the operation that returns it: the
//!   document cannot be published (not a `.docx`, unreadable Markdown, output
//!   directory cannot be created). The batch driver catches it per document;
//!   only output-root failures at startup abort the whole batch.
//!
//! * [`ImageError`] is **non-fatal**. A single image could not be decoded,
//!   downloaded or written, but the rest of the document is fine. The caller
//!   applies the documented fallback (classify as non-formula, leave the
//!   markup unchanged, drop the record) and carries on.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the docx2hexo library.
///
/// Image-level failures use [`ImageError`] and never propagate here.
#[derive(Debug, Error)]
pub enum PublishError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The file is not a readable zip package.
    #[error("'{path}' is not a valid .docx package: {detail}")]
    NotADocx { path: PathBuf, detail: String },

    /// A part every Word document must carry is absent.
    #[error("'{path}' has no '{part}' part (is this a Word document?)")]
    MissingPart { path: PathBuf, part: String },

    /// A package XML part could not be parsed.
    #[error("Malformed XML in '{part}': {detail}")]
    MalformedXml { part: String, detail: String },

    /// Reading an input file failed.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Output errors ─────────────────────────────────────────────────────
    /// A required output root could not be created.
    #[error("Failed to create output directory '{path}': {source}")]
    OutputDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not write a rewritten post.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single image.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum ImageError {
    /// The bytes are not in a format the decoder understands (EMF, WMF, …).
    #[error("could not decode image dimensions: {detail}")]
    DecodeFailed { detail: String },

    /// One side is zero pixels, so no aspect ratio exists.
    #[error("image has a zero dimension ({width}x{height})")]
    ZeroDimension { width: u32, height: u32 },

    /// Transport-level download failure.
    #[error("failed to download '{url}': {reason}")]
    FetchFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("download of '{url}' timed out after {secs}s")]
    FetchTimeout { url: String, secs: u64 },

    /// Server answered with a non-success status.
    #[error("download of '{url}' returned HTTP {status}")]
    FetchStatus { url: String, status: u16 },

    /// Persisting the image bytes failed.
    #[error("failed to write '{path}': {detail}")]
    WriteFailed { path: PathBuf, detail: String },
}

/// Render an error followed by its whole `source()` chain, one cause per line.
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut cause = err.source();
    while let Some(c) = cause {
        out.push_str("\n  caused by: ");
        out.push_str(&c.to_string());
        cause = c.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_part_display() {
        let e = PublishError::MissingPart {
            path: PathBuf::from("notes.docx"),
            part: "word/document.xml".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("notes.docx"), "got: {msg}");
        assert!(msg.contains("word/document.xml"), "got: {msg}");
    }

    #[test]
    fn fetch_status_display() {
        let e = ImageError::FetchStatus {
            url: "https://cdn.example.org/a.png".into(),
            status: 404,
        };
        assert!(e.to_string().contains("HTTP 404"));
    }

    #[test]
    fn zero_dimension_display() {
        let e = ImageError::ZeroDimension {
            width: 12,
            height: 0,
        };
        assert!(e.to_string().contains("12x0"));
    }

    #[test]
    fn error_chain_includes_io_source() {
        let e = PublishError::OutputWriteFailed {
            path: PathBuf::from("/posts/a.md"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only fs"),
        };
        let chain = error_chain(&e);
        assert!(chain.contains("/posts/a.md"));
        assert!(chain.contains("caused by: read-only fs"), "got: {chain}");
    }
}
