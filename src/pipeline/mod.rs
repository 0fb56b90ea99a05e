//! Pipeline stages for publishing one exported document.
//!
//! Each submodule implements one step and is testable on its own.
//!
//! ## Data Flow
//!
//! ```text
//! .docx ──▶ package ──▶ classify ──▶ extract ──▶ assets
//!           (zip/OPC)   (aspect)     (naming)    (two roots)
//!
//! .md ──▶ frontmatter ──▶ formula ──▶ fetch ──▶ images ──▶ links ──▶ post
//!         (strip)         (tag)       (HTTP)    (by position)
//! ```
//!
//! 1. [`package`]: read image parts and relationships out of the zip
//! 2. [`classify`]: decide formula vs. regular image from pixel dimensions
//! 3. [`extract`]: name, classify and store every embedded image; runs in
//!    `spawn_blocking`
//! 4. [`fetch`]: download remote images; the only stage with network I/O
//! 5. [`formula`]: fence math spans with sentinels and find them again
//! 6. [`images`]: positional placeholder substitution outside formulas
//! 7. [`links`]: cross-document link rewriting
//! 8. [`frontmatter`]: strip and generate Hexo metadata
//! 9. [`rewrite`]: run steps 4-8 over one Markdown buffer
//!
//! [`assets`] holds the filesystem side shared by the stages.

pub mod assets;
pub mod classify;
pub mod extract;
pub mod fetch;
pub mod formula;
pub mod frontmatter;
pub mod images;
pub mod links;
pub mod package;
pub mod rewrite;
