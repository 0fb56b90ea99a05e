//! End-to-end integration tests for docx2hexo.
//!
//! Every test builds its `.docx` packages in memory, writes them into a
//! temporary directory next to a Markdown export, and runs the public API
//! against it. Remote images are served by [`ScriptedFetcher`], so nothing
//! here touches the network.
//!
//! Run with:
//!   cargo test --test e2e -- --nocapture

use docx2hexo::{
    publish_document, publish_sync, run_batch, BatchProgressCallback, DocumentReport,
    DocumentUnit, ImageError, ImageFetcher, ImageOrder, PublishConfig, PublishError,
};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use zip::write::SimpleFileOptions;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
        width,
        height,
        Rgba([0, 0, 0, 255]),
    ));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

/// A minimal `.docx`: content types, a relationship per image, the media
/// parts and, when given, a body that references images in `body_order`.
fn docx_bytes(images: &[Vec<u8>], body_order: Option<&[usize]>) -> Vec<u8> {
    let mut rels = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rIdStyles" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
<Relationship Id="rIdLink" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.org/a.png" TargetMode="External"/>"#,
    );
    for i in 0..images.len() {
        rels.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="media/image{}.png"/>"#,
            i + 1,
            i + 1
        ));
    }
    rels.push_str("</Relationships>");

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let opts = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    writer.start_file("[Content_Types].xml", opts).unwrap();
    writer
        .write_all(
            br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="png" ContentType="image/png"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
</Types>"#,
        )
        .unwrap();

    writer
        .start_file("word/_rels/document.xml.rels", opts)
        .unwrap();
    writer.write_all(rels.as_bytes()).unwrap();

    if let Some(order) = body_order {
        let mut body = String::from(
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><w:body>"#,
        );
        for i in order {
            body.push_str(&format!(
                r#"<w:p><w:r><w:drawing><a:blip r:embed="rId{}"/></w:drawing></w:r></w:p>"#,
                i + 1
            ));
        }
        body.push_str("</w:body></w:document>");
        writer.start_file("word/document.xml", opts).unwrap();
        writer.write_all(body.as_bytes()).unwrap();
    }

    for (i, data) in images.iter().enumerate() {
        writer
            .start_file(format!("word/media/image{}.png", i + 1), opts)
            .unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

fn write_unit(dir: &Path, name: &str, docx: &[u8], markdown: &str) -> DocumentUnit {
    std::fs::write(dir.join(format!("{name}.docx")), docx).unwrap();
    std::fs::write(dir.join(format!("{name}.md")), markdown).unwrap();
    DocumentUnit::in_dir(dir, name)
}

fn config_in(dir: &Path) -> PublishConfig {
    PublishConfig::builder()
        .asset_root(dir.join("img/filesimg"))
        .publish_asset_root(dir.join("hexo/source/img/filesimg"))
        .publish_posts_dir(dir.join("hexo/source/_posts"))
        .tag("Computer Systems")
        .category("CSAPP")
        .build()
        .unwrap()
}

/// Splits a post into its front matter and body.
fn split_post(post: &str) -> (&str, &str) {
    let rest = post.strip_prefix("---\n").expect("post starts with front matter");
    let end = rest.find("\n---\n").expect("front matter is closed");
    (&rest[..end], &rest[end + "\n---\n".len()..])
}

/// Serves canned bytes per URL; anything else is a 404.
#[derive(Default)]
struct ScriptedFetcher {
    responses: HashMap<String, Vec<u8>>,
    requested: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    fn serving(url: &str, bytes: &[u8]) -> Self {
        let mut fetcher = Self::default();
        fetcher.responses.insert(url.to_string(), bytes.to_vec());
        fetcher
    }
}

impl ImageFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ImageError> {
        self.requested.lock().unwrap().push(url.to_string());
        self.responses
            .get(url)
            .cloned()
            .ok_or_else(|| ImageError::FetchStatus {
                url: url.to_string(),
                status: 404,
            })
    }
}

#[derive(Default)]
struct CountingCallback {
    started: AtomicUsize,
    completed: AtomicUsize,
    errored: AtomicUsize,
    batch_total: AtomicUsize,
    batch_published: AtomicUsize,
    completed_reports: Mutex<Vec<DocumentReport>>,
}

impl BatchProgressCallback for CountingCallback {
    fn on_batch_start(&self, total_documents: usize) {
        self.batch_total.store(total_documents, Ordering::SeqCst);
    }
    fn on_document_start(&self, _name: &str, _index: usize, _total: usize) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }
    fn on_document_complete(&self, report: &DocumentReport, _index: usize, _total: usize) {
        self.completed.fetch_add(1, Ordering::SeqCst);
        self.completed_reports.lock().unwrap().push(report.clone());
    }
    fn on_document_error(&self, _name: &str, _index: usize, _total: usize, _error: &str) {
        self.errored.fetch_add(1, Ordering::SeqCst);
    }
    fn on_batch_complete(&self, _total: usize, published: usize) {
        self.batch_published.store(published, Ordering::SeqCst);
    }
}

// ── Single document ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_formula_regular_and_external_images() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path();
    let config = config_in(dir);
    let unit = write_unit(
        dir,
        "Doc",
        &docx_bytes(&[png(100, 10), png(20, 20)], None),
        "---\ntitle: exported\n---\n# Intro\n\n![a](img1.png) ![b](img2.png)\n\n\
         ![c](https://cdn.test/pic.jpg)\n",
    );
    let fetcher = ScriptedFetcher::serving("https://cdn.test/pic.jpg", b"remote jpeg");

    let report = publish_document(&unit, &config, &fetcher).await.unwrap();

    assert_eq!(report.embedded_images, 2);
    assert_eq!(report.formula_images, 1);
    assert_eq!(report.failed_images, 0);
    assert_eq!(report.stats.external_downloaded, 1);
    assert_eq!(report.stats.images_substituted, 2);
    assert_eq!(report.stats.skipped_in_formula, 0);

    let post = std::fs::read_to_string(&unit.markdown_path).unwrap();
    let (front, body) = split_post(&post);
    assert!(!front.contains("exported"));
    // Placeholders take the regular sequence [embedded regular, external] in order.
    assert_eq!(
        body,
        "# Intro\n\n![a](/img/filesimg/Doc/image_Doc_1.png) \
         ![b](/img/filesimg/Doc/Doc_external_0.jpg)\n\n\
         ![c](/img/filesimg/Doc/Doc_external_0.jpg)\n"
    );

    for root in ["img/filesimg/Doc", "hexo/source/img/filesimg/Doc"] {
        let folder = dir.join(root);
        assert!(folder.join("formula_Doc_0.png").is_file());
        assert!(folder.join("image_Doc_1.png").is_file());
        assert_eq!(
            std::fs::read(folder.join("Doc_external_0.jpg")).unwrap(),
            b"remote jpeg"
        );
    }
    let copy = std::fs::read_to_string(dir.join("hexo/source/_posts/Doc.md")).unwrap();
    assert_eq!(copy, post);
    assert_eq!(report.outputs.len(), 2);
}

#[tokio::test]
async fn test_front_matter_layout() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path();
    let config = PublishConfig::builder()
        .asset_root(dir.join("a"))
        .publish_asset_root(dir.join("b"))
        .publish_posts_dir(dir.join("posts"))
        .tags(["one", "two"])
        .category("notes")
        .build()
        .unwrap();
    let unit = write_unit(dir, "My Notes", &docx_bytes(&[], None), "body\n");

    publish_document(&unit, &config, &ScriptedFetcher::default())
        .await
        .unwrap();

    let post = std::fs::read_to_string(dir.join("posts/My Notes.md")).unwrap();
    let (front, body) = split_post(&post);
    let lines: Vec<&str> = front.lines().collect();
    assert_eq!(lines[0], "title: \"My Notes\"");
    assert_eq!(&lines[1..4], ["tags:", "    - \"one\"", "    - \"two\""]);
    assert_eq!(&lines[4..6], ["categories:", "    - \"notes\""]);
    assert_eq!(lines.len(), 7);
    let date = lines[6]
        .strip_prefix("date: \"")
        .and_then(|d| d.strip_suffix('"'))
        .expect("quoted date");
    assert!(chrono::NaiveDateTime::parse_from_str(date, "%Y-%m-%d %H:%M:%S").is_ok());
    assert_eq!(body, "body\n");
}

#[tokio::test]
async fn test_math_and_links_survive_rewrite() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path();
    let config = config_in(dir);
    let markdown = "Energy $E=mc^2$ and\n\n$$\n![eq](media/image1.png)\n$$\n\n\
                    ![pic](media/image2.png)\n\n\
                    See [Chapter 3](Chapter3.md) and [this page](https://www.yuque.com/u/b/x).\n";
    let unit = write_unit(
        dir,
        "CSAPP 2",
        &docx_bytes(&[png(300, 20), png(40, 30)], None),
        markdown,
    );

    let report = publish_document(&unit, &config, &ScriptedFetcher::default())
        .await
        .unwrap();

    let post = std::fs::read_to_string(&unit.markdown_path).unwrap();
    let (_, body) = split_post(&post);
    assert_eq!(
        body,
        "Energy $E=mc^2$ and\n\n$$\n![eq](media/image1.png)\n$$\n\n\
         ![pic](/img/filesimg/CSAPP%202/image_CSAPP%202_1.png)\n\n\
         See [Chapter 3](/docx/Chapter%203/) and [this page](/docx/CSAPP%202/).\n"
    );
    assert!(!body.contains('⚡'));
    assert_eq!(report.stats.skipped_in_formula, 1);
    assert_eq!(report.stats.images_substituted, 1);
}

#[tokio::test]
async fn test_failed_download_keeps_markup() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path();
    let config = config_in(dir);
    let unit = write_unit(
        dir,
        "Doc",
        &docx_bytes(&[], None),
        "![gone](https://dead.test/x.png)\n",
    );
    let fetcher = ScriptedFetcher::default();

    let report = publish_document(&unit, &config, &fetcher).await.unwrap();

    let post = std::fs::read_to_string(&unit.markdown_path).unwrap();
    assert!(post.ends_with("\n---\n![gone](https://dead.test/x.png)\n"));
    assert_eq!(report.stats.external_downloaded, 0);
    assert_eq!(*fetcher.requested.lock().unwrap(), ["https://dead.test/x.png"]);
}

#[tokio::test]
async fn test_document_order_numbering() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path();
    let config = PublishConfig::builder()
        .asset_root(dir.join("a"))
        .publish_asset_root(dir.join("b"))
        .publish_posts_dir(dir.join("posts"))
        .image_order(ImageOrder::Document)
        .build()
        .unwrap();
    // The body shows the second relationship's picture first.
    let wide = png(90, 10);
    let square = png(10, 10);
    let unit = write_unit(
        dir,
        "D",
        &docx_bytes(&[wide.clone(), square.clone()], Some(&[1, 0][..])),
        "![first](x.png)\n",
    );

    let report = publish_document(&unit, &config, &ScriptedFetcher::default())
        .await
        .unwrap();

    assert_eq!(std::fs::read(dir.join("b/D/image_D_0.png")).unwrap(), square);
    assert_eq!(std::fs::read(dir.join("b/D/formula_D_1.png")).unwrap(), wide);
    assert_eq!(report.formula_images, 1);
    let post = std::fs::read_to_string(dir.join("posts/D.md")).unwrap();
    assert!(post.ends_with("![first](/img/filesimg/D/image_D_0.png)\n"));
}

#[tokio::test]
async fn test_source_kept_when_overwrite_disabled() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path();
    let config = PublishConfig::builder()
        .asset_root(dir.join("a"))
        .publish_asset_root(dir.join("b"))
        .publish_posts_dir(dir.join("posts"))
        .overwrite_source(false)
        .build()
        .unwrap();
    let unit = write_unit(dir, "Keep", &docx_bytes(&[], None), "original\n");

    let report = publish_document(&unit, &config, &ScriptedFetcher::default())
        .await
        .unwrap();

    assert_eq!(std::fs::read_to_string(&unit.markdown_path).unwrap(), "original\n");
    assert_eq!(report.outputs, [dir.join("posts/Keep.md")]);
}

#[tokio::test]
async fn test_not_a_docx_is_an_error() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path();
    let config = config_in(dir);
    let unit = write_unit(dir, "Broken", b"plain text, not a zip", "text\n");

    let err = publish_document(&unit, &config, &ScriptedFetcher::default())
        .await
        .unwrap_err();

    assert!(matches!(err, PublishError::NotADocx { .. }), "got {err:?}");
    assert_eq!(std::fs::read_to_string(&unit.markdown_path).unwrap(), "text\n");
}

#[test]
fn test_publish_sync_without_remote_images() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path();
    let config = config_in(dir);
    let unit = write_unit(dir, "Sync", &docx_bytes(&[png(8, 8)], None), "![x](y.png)\n");

    let report = publish_sync(&unit, &config).unwrap();

    assert_eq!(report.stats.images_substituted, 1);
    assert!(dir.join("hexo/source/_posts/Sync.md").is_file());
}

// ── Batch ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_batch_continues_past_failures() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path();
    let callback = Arc::new(CountingCallback::default());
    let config = PublishConfig::builder()
        .asset_root(dir.join("out/a"))
        .publish_asset_root(dir.join("out/b"))
        .publish_posts_dir(dir.join("out/posts"))
        .progress_callback(callback.clone() as Arc<dyn BatchProgressCallback>)
        .build()
        .unwrap();

    write_unit(
        dir,
        "a-good",
        &docx_bytes(&[png(40, 4), png(4, 4)], None),
        "$$ ![f](m1.png) $$\n![i](x.png)\n![gone](https://cdn.test/missing.png)\n",
    );
    write_unit(dir, "b-corrupt", b"PK\x03\x04 truncated", "text\n");
    write_unit(dir, "c-good", &docx_bytes(&[], None), "plain\n");
    std::fs::write(dir.join("d-orphan.docx"), docx_bytes(&[], None)).unwrap();

    let report = run_batch(dir, &config, &ScriptedFetcher::default())
        .await
        .unwrap();

    let published: Vec<_> = report.published.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(published, ["a-good", "c-good"]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].name, "b-corrupt");
    assert!(report.failed[0].error.contains("b-corrupt.docx"));
    assert_eq!(report.skipped, ["d-orphan"]);

    assert_eq!(callback.batch_total.load(Ordering::SeqCst), 3);
    assert_eq!(callback.started.load(Ordering::SeqCst), 3);
    assert_eq!(callback.completed.load(Ordering::SeqCst), 2);
    assert_eq!(callback.errored.load(Ordering::SeqCst), 1);
    assert_eq!(callback.batch_published.load(Ordering::SeqCst), 2);

    let completed = callback.completed_reports.lock().unwrap();
    let first = &completed[0];
    assert_eq!(first.name, "a-good");
    assert_eq!(first.formula_images, 1);
    assert_eq!(first.stats.images_substituted, 1);
    assert_eq!(first.stats.external_downloaded, 0);
    assert_eq!(first.stats.skipped_in_formula, 1);
    assert_eq!(completed[1].name, "c-good");

    assert!(dir.join("out/posts/a-good.md").is_file());
    assert!(dir.join("out/posts/c-good.md").is_file());
    assert!(!dir.join("out/posts/b-corrupt.md").exists());

    let json = serde_json::to_string(&report).unwrap();
    assert!(json.contains("\"skipped\":[\"d-orphan\"]"));
}

#[tokio::test]
async fn test_batch_rerun_is_stable() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path();
    let config = config_in(&dir.join("site"));
    write_unit(
        dir,
        "Notes",
        &docx_bytes(&[png(60, 10), png(10, 10)], None),
        "$$x$$ ![p](media/image2.png) [Other](other.md)\n",
    );

    let first = run_batch(dir, &config, &ScriptedFetcher::default())
        .await
        .unwrap();
    let after_first = std::fs::read_to_string(dir.join("Notes.md")).unwrap();
    let second = run_batch(dir, &config, &ScriptedFetcher::default())
        .await
        .unwrap();
    let after_second = std::fs::read_to_string(dir.join("Notes.md")).unwrap();

    assert_eq!(first.published_count(), 1);
    assert_eq!(second.published_count(), 1);
    assert_eq!(split_post(&after_first).1, split_post(&after_second).1);
    assert_eq!(
        split_post(&after_second).1,
        "$$x$$ ![p](/img/filesimg/Notes/image_Notes_1.png) [Other](/docx/Other/)\n"
    );
    assert_eq!(after_second.matches("title:").count(), 1);
}

#[tokio::test]
async fn test_batch_fails_when_output_root_cannot_be_created() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path();
    std::fs::write(dir.join("blocker"), b"").unwrap();
    let config = PublishConfig::builder()
        .asset_root(dir.join("blocker/assets"))
        .publish_asset_root(dir.join("b"))
        .publish_posts_dir(dir.join("posts"))
        .build()
        .unwrap();
    write_unit(dir, "Doc", &docx_bytes(&[], None), "text\n");

    let err = run_batch(dir, &config, &ScriptedFetcher::default())
        .await
        .unwrap_err();

    assert!(matches!(err, PublishError::OutputDirFailed { .. }), "got {err:?}");
    assert_eq!(std::fs::read_to_string(dir.join("Doc.md")).unwrap(), "text\n");
}

#[test]
fn test_callback_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<CountingCallback>();
    assert_send_sync::<docx2hexo::NoopProgressCallback>();
}
