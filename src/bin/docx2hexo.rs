//! CLI binary for docx2hexo.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `PublishConfig` and prints a summary of the batch.

use anyhow::{Context, Result};
use clap::Parser;
use docx2hexo::{
    run_batch, BatchProgressCallback, BatchReport, DocumentReport, HttpFetcher, ImageOrder,
    ProgressCallback, PublishConfig,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: [&str; 11] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Live progress bar with one log line per document.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Start time of the document currently being published.
    started: Mutex<Option<Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&TICKS);
        bar.set_style(spinner_style);
        bar.set_prefix("Scanning");
        bar.set_message("Looking for documents…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            started: Mutex::new(None),
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} documents  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Publishing");
    }

    fn elapsed_secs(&self) -> f64 {
        self.started
            .lock()
            .ok()
            .and_then(|mut s| s.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_documents: usize) {
        self.activate_bar(total_documents);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Publishing {total_documents} documents…"))
        ));
    }

    fn on_document_start(&self, name: &str, _index: usize, _total: usize) {
        if let Ok(mut started) = self.started.lock() {
            *started = Some(Instant::now());
        }
        self.bar.set_message(name.to_string());
    }

    fn on_document_complete(&self, report: &DocumentReport, index: usize, total: usize) {
        let secs = self.elapsed_secs();
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}  {}",
            green("✓"),
            index,
            total,
            report.name,
            dim(&image_counts(report)),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_document_error(&self, name: &str, index: usize, total: usize, error: &str) {
        let secs = self.elapsed_secs();
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg = match error.char_indices().nth(79) {
            Some((cut, _)) => format!("{}\u{2026}", &error[..cut]),
            None => error.to_string(),
        };

        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}  {}",
            red("✗"),
            index,
            total,
            name,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_documents: usize, published: usize) {
        self.bar.finish_and_clear();
        let failed = self.errors.load(Ordering::SeqCst);

        if failed == 0 {
            eprintln!(
                "{} {} documents published",
                green("✔"),
                bold(&published.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} documents published  ({} failed)",
                if published == 0 { red("✘") } else { cyan("⚠") },
                bold(&published.to_string()),
                total_documents,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Publish every .docx/.md pair in the current directory
  docx2hexo

  # Publish a folder of notes with front-matter tags
  docx2hexo notes/ --tag "Computer Systems" --category CSAPP

  # Number images in reading order instead of relationship order
  docx2hexo --document-order

  # Machine-readable report
  docx2hexo --json > report.json

LAYOUT:
  For every {name}.docx with a {name}.md beside it:
    images  → {asset-root}/{name}/ and {publish-assets}/{name}/
    post    → {name}.md (overwritten) and {publish-posts}/{name}.md
    links   → images as {base-url}/{name}/{image}
"#;

#[derive(Parser, Debug)]
#[command(
    name = "docx2hexo",
    version,
    about = "Publish Word documents and their Markdown exports as Hexo posts",
    long_about = "Extract the images embedded in each Word document, download remote images, \
and rewrite the exported Markdown so every image and cross-document link points at the blog. \
Each rewritten post gets Hexo front matter and is copied into the blog's posts directory.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Directory holding the .docx and .md files.
    #[arg(default_value = ".")]
    dir: PathBuf,

    /// Working image tree.
    #[arg(long, env = "DOCX2HEXO_ASSET_ROOT", default_value = "img/filesimg")]
    asset_root: PathBuf,

    /// Image tree inside the blog source.
    #[arg(long, env = "DOCX2HEXO_PUBLISH_ASSETS", default_value = "hexo/source/img/filesimg")]
    publish_assets: PathBuf,

    /// Blog posts directory.
    #[arg(long, env = "DOCX2HEXO_PUBLISH_POSTS", default_value = "hexo/source/_posts")]
    publish_posts: PathBuf,

    /// URL prefix the blog serves images under.
    #[arg(long, env = "DOCX2HEXO_BASE_URL", default_value = "/img/filesimg")]
    base_url: String,

    /// Front-matter tag (repeatable).
    #[arg(long = "tag", env = "DOCX2HEXO_TAGS", value_delimiter = ',')]
    tags: Vec<String>,

    /// Front-matter category (repeatable).
    #[arg(long = "category", env = "DOCX2HEXO_CATEGORIES", value_delimiter = ',')]
    categories: Vec<String>,

    /// Host whose links are redirected to the current post.
    #[arg(long, env = "DOCX2HEXO_DOCS_DOMAIN", default_value = "www.yuque.com")]
    docs_domain: String,

    /// Path prefix for rewritten cross-document links.
    #[arg(long, env = "DOCX2HEXO_LINK_PREFIX", default_value = "/docx")]
    link_prefix: String,

    /// Timeout per remote image, in seconds.
    #[arg(long, env = "DOCX2HEXO_DOWNLOAD_TIMEOUT", default_value_t = 10)]
    download_timeout: u64,

    /// Aspect ratio above which an embedded image is a formula.
    #[arg(long, env = "DOCX2HEXO_FORMULA_RATIO", default_value_t = 5.0)]
    formula_ratio: f64,

    /// Number embedded images in body order instead of relationship order.
    #[arg(long, env = "DOCX2HEXO_DOCUMENT_ORDER")]
    document_order: bool,

    /// Print the batch report as JSON on stdout.
    #[arg(long, env = "DOCX2HEXO_JSON")]
    json: bool,

    #[arg(long, env = "DOCX2HEXO_NO_PROGRESS")]
    no_progress: bool,

    #[arg(short, long, env = "DOCX2HEXO_VERBOSE")]
    verbose: bool,

    #[arg(short, long, env = "DOCX2HEXO_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = shows_progress(&cli);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_filter(&cli))),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn BatchProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;
    let fetcher = HttpFetcher::from_config(&config).context("Failed to set up downloads")?;

    // ── Run batch ────────────────────────────────────────────────────────
    let report = run_batch(&cli.dir, &config, &fetcher)
        .await
        .with_context(|| format!("Failed to publish {}", cli.dir.display()))?;

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&report, show_progress);
    }

    Ok(())
}

fn shows_progress(cli: &Cli) -> bool {
    !cli.quiet && !cli.no_progress && !cli.json
}

/// Default log level when `RUST_LOG` is unset.
///
/// The progress bar replaces INFO logs unless --verbose is given. Per-image
/// warnings stay visible.
fn log_filter(cli: &Cli) -> &'static str {
    if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else if shows_progress(cli) {
        "warn"
    } else {
        "info"
    }
}

fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<PublishConfig> {
    let order = if cli.document_order {
        ImageOrder::Document
    } else {
        ImageOrder::Relationship
    };

    let mut builder = PublishConfig::builder()
        .asset_root(&cli.asset_root)
        .publish_asset_root(&cli.publish_assets)
        .publish_posts_dir(&cli.publish_posts)
        .base_url(&cli.base_url)
        .tags(cli.tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()))
        .categories(cli.categories.iter().map(|c| c.trim()).filter(|c| !c.is_empty()))
        .docs_domain(&cli.docs_domain)
        .link_prefix(&cli.link_prefix)
        .download_timeout_secs(cli.download_timeout)
        .formula_aspect_ratio(cli.formula_ratio)
        .image_order(order);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// The three per-document counters shown on each progress line.
fn image_counts(report: &DocumentReport) -> String {
    format!(
        "{} substituted, {} downloaded, {} skipped in formulas",
        report.stats.images_substituted,
        report.stats.external_downloaded,
        report.stats.skipped_in_formula
    )
}

fn print_summary(report: &BatchReport, show_progress: bool) {
    // The progress callback already printed the per-document lines.
    if !show_progress {
        eprintln!(
            "Published {}/{} documents in {}ms",
            report.published_count(),
            report.published_count() + report.failed.len(),
            report.total_duration_ms
        );
        for failure in &report.failed {
            eprintln!("  {} {}: {}", red("✗"), failure.name, failure.error);
        }
    }

    let images: usize = report.published.iter().map(|d| d.embedded_images).sum();
    let formulas: usize = report.published.iter().map(|d| d.formula_images).sum();
    let substituted: usize = report
        .published
        .iter()
        .map(|d| d.stats.images_substituted)
        .sum();
    let downloaded: usize = report
        .published
        .iter()
        .map(|d| d.stats.external_downloaded)
        .sum();
    let skipped: usize = report
        .published
        .iter()
        .map(|d| d.stats.skipped_in_formula)
        .sum();
    eprintln!(
        "   {} embedded images ({} formulas)  /  {} substituted  /  {} downloaded  /  \
         {} skipped in formulas  /  {}ms total",
        dim(&images.to_string()),
        dim(&formulas.to_string()),
        dim(&substituted.to_string()),
        dim(&downloaded.to_string()),
        dim(&skipped.to_string()),
        report.total_duration_ms,
    );
    for name in &report.skipped {
        eprintln!("   {} {} (no matching .md)", dim("skipped"), name);
    }
}
