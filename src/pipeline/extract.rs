//! Embedded image extraction.
//!
//! Pulls every image part out of a `.docx`, classifies it, names it
//! `{formula|image}_{folder}_{n}.png` and stores the untouched bytes in both
//! asset roots. The `.png` suffix is a naming convention; a JPEG part is
//! still written as JPEG bytes.
//!
//! Numbering follows [`crate::config::ImageOrder`]. In the default
//! relationship order, image `n` is the `n`-th image relationship of the
//! package, which is usually but not always the `n`-th picture on the page.

use crate::config::PublishConfig;
use crate::error::PublishError;
use crate::output::{ExtractedImages, ImageRecord};
use crate::pipeline::assets;
use crate::pipeline::classify;
use crate::pipeline::package::{DocxPackage, ImagePart};
use std::io::{Read, Seek};
use std::path::Path;
use tracing::{debug, info, warn};

/// Extract images from the `.docx` at `docx_path`.
///
/// Zip reading and pixel probing are blocking, so the work runs inside
/// `spawn_blocking` and is awaited before anything else happens.
pub async fn extract_images(
    docx_path: &Path,
    folder_name: &str,
    config: &PublishConfig,
) -> Result<ExtractedImages, PublishError> {
    let path = docx_path.to_path_buf();
    let folder = folder_name.to_string();
    let config = config.clone();

    tokio::task::spawn_blocking(move || {
        let mut package = DocxPackage::open(&path)?;
        extract_from_package(&mut package, &folder, &config)
    })
    .await
    .map_err(|e| PublishError::Internal(format!("Extraction task panicked: {}", e)))?
}

/// Blocking implementation over an already-opened package.
pub fn extract_from_package<R: Read + Seek>(
    package: &mut DocxPackage<R>,
    folder_name: &str,
    config: &PublishConfig,
) -> Result<ExtractedImages, PublishError> {
    let parts = package.image_parts(config.image_order)?;
    info!("Found {} embedded images in '{}'", parts.len(), folder_name);
    Ok(store_parts(parts, folder_name, config))
}

fn store_parts(parts: Vec<ImagePart>, folder_name: &str, config: &PublishConfig) -> ExtractedImages {
    let mut extracted = ExtractedImages::default();

    // One counter across both classes; it advances even when a write fails so
    // that an index always names the same part.
    for (index, part) in parts.into_iter().enumerate() {
        let is_formula = match classify::classify_bytes(&part.data, config.formula_aspect_ratio) {
            Ok(v) => v,
            Err(e) => {
                warn!(
                    "Could not classify {} ({}): {}; treating as regular image",
                    part.part_name, part.content_type, e
                );
                false
            }
        };

        let prefix = if is_formula { "formula" } else { "image" };
        let name = format!("{prefix}_{folder_name}_{index}.png");

        match assets::store_image_blocking(config, folder_name, &name, &part.data) {
            Ok(_) => {
                debug!("Extracted {} → {}", part.rel_id, name);
                extracted.records.push(ImageRecord::embedded(name, is_formula));
            }
            Err(e) => {
                warn!("Skipping image {}: {}", name, e);
                extracted.failures.push((name, e));
            }
        }
    }

    extracted
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use std::collections::HashSet;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            width,
            height,
            Rgba([20, 20, 20, 255]),
        ));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    fn docx(images: &[Vec<u8>]) -> Cursor<Vec<u8>> {
        let mut rels = String::from(
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        for i in 0..images.len() {
            rels.push_str(&format!(
                r#"<Relationship Id="rId{i}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="media/image{i}.png"/>"#
            ));
        }
        rels.push_str("</Relationships>");

        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let opts =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        writer.start_file("[Content_Types].xml", opts).unwrap();
        writer
            .write_all(
                br#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="png" ContentType="image/png"/></Types>"#,
            )
            .unwrap();
        writer.start_file("word/_rels/document.xml.rels", opts).unwrap();
        writer.write_all(rels.as_bytes()).unwrap();
        for (i, data) in images.iter().enumerate() {
            writer
                .start_file(format!("word/media/image{i}.png"), opts)
                .unwrap();
            writer.write_all(data).unwrap();
        }
        let mut cursor = writer.finish().unwrap();
        cursor.set_position(0);
        cursor
    }

    fn config_in(dir: &Path) -> PublishConfig {
        PublishConfig::builder()
            .asset_root(dir.join("work"))
            .publish_asset_root(dir.join("blog"))
            .publish_posts_dir(dir.join("posts"))
            .build()
            .unwrap()
    }

    #[test]
    fn names_classify_and_store_every_part() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config_in(tmp.path());
        let images = vec![png(100, 10), png(16, 16), b"not an image".to_vec(), png(3, 30)];
        let mut pkg = DocxPackage::from_reader(Path::new("doc.docx"), docx(&images)).unwrap();

        let out = extract_from_package(&mut pkg, "doc", &config).unwrap();

        let names: Vec<_> = out.records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "formula_doc_0.png",
                "image_doc_1.png",
                "image_doc_2.png",
                "formula_doc_3.png"
            ]
        );
        assert!(out.failures.is_empty());
        // Bytes are copied verbatim, including undecodable ones.
        let stored = std::fs::read(tmp.path().join("blog/doc/image_doc_2.png")).unwrap();
        assert_eq!(stored, b"not an image");
    }

    #[test]
    fn n_parts_give_n_unique_increasing_names() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config_in(tmp.path());
        let images: Vec<_> = (1..=7).map(|n| png(n * 3, 4)).collect();
        let mut pkg = DocxPackage::from_reader(Path::new("n.docx"), docx(&images)).unwrap();

        let out = extract_from_package(&mut pkg, "n", &config).unwrap();

        assert_eq!(out.records.len(), 7);
        let unique: HashSet<_> = out.records.iter().map(|r| &r.name).collect();
        assert_eq!(unique.len(), 7);
        let indices: Vec<usize> = out
            .records
            .iter()
            .map(|r| {
                r.name
                    .trim_end_matches(".png")
                    .rsplit('_')
                    .next()
                    .unwrap()
                    .parse()
                    .unwrap()
            })
            .collect();
        assert!(indices.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn write_failure_drops_record_but_keeps_going() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config_in(tmp.path());
        // Occupy the folder path of the working root with a file.
        std::fs::create_dir_all(tmp.path().join("work")).unwrap();
        std::fs::write(tmp.path().join("work/doc"), b"").unwrap();
        let mut pkg =
            DocxPackage::from_reader(Path::new("doc.docx"), docx(&[png(8, 8), png(8, 8)])).unwrap();

        let out = extract_from_package(&mut pkg, "doc", &config).unwrap();

        assert!(out.records.is_empty());
        assert_eq!(out.failures.len(), 2);
        assert_eq!(out.failures[1].0, "image_doc_1.png");
    }
}
