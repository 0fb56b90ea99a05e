//! Reading image parts out of a `.docx` (OPC zip) package.
//!
//! Only three package parts matter here:
//!
//! - `[Content_Types].xml` maps part names and extensions to MIME types;
//! - `word/_rels/document.xml.rels` is the main document's relationship
//!   table, listing every part the body refers to by `rId`;
//! - `word/document.xml` is read only for [`ImageOrder::Document`], to learn
//!   in which order the body references its pictures.
//!
//! Nothing else about the WordprocessingML schema is interpreted.

use crate::config::ImageOrder;
use crate::error::PublishError;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};
use tracing::debug;
use zip::ZipArchive;

const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
const DOCUMENT_PART: &str = "word/document.xml";
const DOCUMENT_RELS_PART: &str = "word/_rels/document.xml.rels";

/// Upper bound on the buffer reserved from a part's declared size.
const MAX_PREALLOC: u64 = 64 << 20;

const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// One row of the relationship table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    /// Zip entry name of the target part, or the raw target for external links.
    pub target: String,
    pub external: bool,
}

/// An image-typed part referenced by the main document.
#[derive(Debug, Clone)]
pub struct ImagePart {
    pub rel_id: String,
    pub part_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// An opened `.docx` package.
pub struct DocxPackage<R: Read + Seek> {
    path: PathBuf,
    archive: ZipArchive<R>,
    content_types: ContentTypes,
    relationships: Vec<Relationship>,
}

impl DocxPackage<File> {
    /// Open a package from disk.
    pub fn open(path: &Path) -> Result<Self, PublishError> {
        let file = File::open(path).map_err(|e| PublishError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_reader(path, file)
    }
}

impl<R: Read + Seek> DocxPackage<R> {
    /// Open a package from any seekable reader; `path` is used for messages only.
    pub fn from_reader(path: &Path, reader: R) -> Result<Self, PublishError> {
        let path = path.to_path_buf();
        let mut archive = ZipArchive::new(reader).map_err(|e| PublishError::NotADocx {
            path: path.clone(),
            detail: e.to_string(),
        })?;

        let content_types = match read_part_text(&mut archive, &path, CONTENT_TYPES_PART)? {
            Some(xml) => ContentTypes::parse(&xml)?,
            None => {
                return Err(PublishError::MissingPart {
                    path,
                    part: CONTENT_TYPES_PART.to_string(),
                })
            }
        };

        // A document without pictures, links or styles may ship no rels part.
        let relationships = match read_part_text(&mut archive, &path, DOCUMENT_RELS_PART)? {
            Some(xml) => parse_relationships(&xml, "word")?,
            None => Vec::new(),
        };
        debug!(
            "Opened {}: {} relationships",
            path.display(),
            relationships.len()
        );

        Ok(Self {
            path,
            archive,
            content_types,
            relationships,
        })
    }

    /// The main document's relationship table in its native order.
    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    /// MIME type of a part, if the package declares one.
    pub fn content_type(&self, part_name: &str) -> Option<&str> {
        self.content_types.lookup(part_name)
    }

    /// Every embedded image part, in the requested order.
    ///
    /// With [`ImageOrder::Relationship`] the order is the relationship
    /// table's, which is not guaranteed to match where the pictures appear
    /// on the page.
    pub fn image_parts(&mut self, order: ImageOrder) -> Result<Vec<ImagePart>, PublishError> {
        let image_rels: Vec<Relationship> = self
            .relationships
            .iter()
            .filter(|rel| !rel.external)
            .filter(|rel| {
                self.content_types
                    .lookup(&rel.target)
                    .is_some_and(|ct| ct.starts_with("image/"))
            })
            .cloned()
            .collect();

        let ordered = match order {
            ImageOrder::Relationship => image_rels,
            ImageOrder::Document => {
                let by_body = self.order_by_body(&image_rels)?;
                if by_body.is_empty() {
                    debug!("No a:blip references in body; using relationship order");
                    image_rels
                } else {
                    by_body
                }
            }
        };

        let mut parts = Vec::with_capacity(ordered.len());
        for rel in ordered {
            let data = self.read_part(&rel.target)?;
            let content_type = self
                .content_types
                .lookup(&rel.target)
                .unwrap_or_default()
                .to_string();
            parts.push(ImagePart {
                rel_id: rel.id,
                part_name: rel.target,
                content_type,
                data,
            });
        }
        Ok(parts)
    }

    /// Image relationships in the order the body's `a:blip r:embed` attributes
    /// name them, first occurrence only.
    fn order_by_body(
        &mut self,
        image_rels: &[Relationship],
    ) -> Result<Vec<Relationship>, PublishError> {
        let Some(xml) = read_part_text(&mut self.archive, &self.path, DOCUMENT_PART)? else {
            return Err(PublishError::MissingPart {
                path: self.path.clone(),
                part: DOCUMENT_PART.to_string(),
            });
        };
        let by_id: HashMap<&str, &Relationship> =
            image_rels.iter().map(|r| (r.id.as_str(), r)).collect();

        Ok(blip_embed_ids(&xml)?
            .iter()
            .filter_map(|id| by_id.get(id.as_str()).map(|r| (*r).clone()))
            .collect())
    }

    fn read_part(&mut self, name: &str) -> Result<Vec<u8>, PublishError> {
        let mut entry = self
            .archive
            .by_name(name)
            .map_err(|_| PublishError::MissingPart {
                path: self.path.clone(),
                part: name.to_string(),
            })?;
        let mut buf = Vec::with_capacity(initial_capacity(entry.size()));
        entry
            .read_to_end(&mut buf)
            .map_err(|e| PublishError::ReadFailed {
                path: self.path.join(name),
                source: e,
            })?;
        Ok(buf)
    }
}

/// The zip header's size is untrusted; the buffer still grows past the cap
/// when a part really is larger.
fn initial_capacity(declared: u64) -> usize {
    usize::try_from(declared.min(MAX_PREALLOC)).unwrap_or(0)
}

fn read_part_text<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    path: &Path,
    name: &str,
) -> Result<Option<String>, PublishError> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => {
            return Err(PublishError::NotADocx {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })
        }
    };
    let mut text = String::new();
    entry
        .read_to_string(&mut text)
        .map_err(|e| PublishError::ReadFailed {
            path: path.join(name),
            source: e,
        })?;
    Ok(Some(text))
}

// ── Content types ────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct ContentTypes {
    /// Lower-cased extension → MIME type.
    defaults: HashMap<String, String>,
    /// Part name without leading `/` → MIME type.
    overrides: HashMap<String, String>,
}

impl ContentTypes {
    fn parse(xml: &str) -> Result<Self, PublishError> {
        let doc = roxmltree::Document::parse(xml).map_err(|e| PublishError::MalformedXml {
            part: CONTENT_TYPES_PART.to_string(),
            detail: e.to_string(),
        })?;
        let mut types = Self::default();
        for node in doc.descendants().filter(|n| n.is_element()) {
            let Some(content_type) = node.attribute("ContentType") else {
                continue;
            };
            match node.tag_name().name() {
                "Default" => {
                    if let Some(ext) = node.attribute("Extension") {
                        types
                            .defaults
                            .insert(ext.to_ascii_lowercase(), content_type.to_string());
                    }
                }
                "Override" => {
                    if let Some(part) = node.attribute("PartName") {
                        types.overrides.insert(
                            part.trim_start_matches('/').to_string(),
                            content_type.to_string(),
                        );
                    }
                }
                _ => {}
            }
        }
        Ok(types)
    }

    fn lookup(&self, part_name: &str) -> Option<&str> {
        if let Some(ct) = self.overrides.get(part_name) {
            return Some(ct);
        }
        let ext = part_name.rsplit_once('.')?.1.to_ascii_lowercase();
        self.defaults.get(&ext).map(String::as_str)
    }
}

// ── Relationships ────────────────────────────────────────────────────────

/// Parse a `.rels` part whose source part lives in `base_dir`.
fn parse_relationships(xml: &str, base_dir: &str) -> Result<Vec<Relationship>, PublishError> {
    let doc = roxmltree::Document::parse(xml).map_err(|e| PublishError::MalformedXml {
        part: DOCUMENT_RELS_PART.to_string(),
        detail: e.to_string(),
    })?;
    Ok(doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "Relationship")
        .filter_map(|n| {
            let id = n.attribute("Id")?;
            let target = n.attribute("Target")?;
            let external = n
                .attribute("TargetMode")
                .is_some_and(|m| m.eq_ignore_ascii_case("External"));
            let target = if external {
                target.to_string()
            } else {
                resolve_target(base_dir, target)
            };
            Some(Relationship {
                id: id.to_string(),
                target,
                external,
            })
        })
        .collect())
}

/// Resolve a relationship target to a zip entry name.
///
/// Absolute targets (`/word/media/a.png`) are package-rooted; relative ones
/// are joined to `base_dir`, with `.` and `..` segments folded.
fn resolve_target(base_dir: &str, target: &str) -> String {
    let joined = match target.strip_prefix('/') {
        Some(rooted) => rooted.to_string(),
        None if base_dir.is_empty() => target.to_string(),
        None => format!("{base_dir}/{target}"),
    };
    let mut segments: Vec<&str> = Vec::new();
    for seg in joined.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// `r:embed` ids of every `a:blip` in the body, in document order, deduplicated.
fn blip_embed_ids(document_xml: &str) -> Result<Vec<String>, PublishError> {
    let doc =
        roxmltree::Document::parse(document_xml).map_err(|e| PublishError::MalformedXml {
            part: DOCUMENT_PART.to_string(),
            detail: e.to_string(),
        })?;
    let mut seen = HashSet::new();
    Ok(doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "blip")
        .filter_map(|n| n.attribute((REL_NS, "embed")))
        .filter(|id| seen.insert(id.to_string()))
        .map(str::to_string)
        .collect())
}
