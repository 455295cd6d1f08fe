//! # pdf-harvest
//!
//! Download PDF documents over HTTPS and extract what is inside them:
//! outbound hyperlinks with their page and position, the plain text, and
//! the dates mentioned in that text.
//!
//! ## Why this crate?
//!
//! Regulators and publishers post notices as PDFs whose useful content sits
//! in link annotations and in the body text. Scraping them reliably needs
//! three guarantees that ad-hoc scripts tend to miss: a failed download never
//! leaves a half-written file behind, a malformed annotation never aborts the
//! whole document, and every artifact on disk is either complete or absent.
//!
//! ## Pipeline Overview
//!
//! ```text
//! URL
//!  │
//!  ├─ 1. Fetch     stream to a temp file, fsync, rename into place
//!  ├─ 2. Parse     lopdf document, decrypted if owner-password only
//!  │               (CPU-bound, spawn_blocking)
//!  ├─ 3. Links     /Annots → typed PageAnnotation → {url, page, rect}
//!  │               + context: words under the rect
//!  ├─ 4. Text      content streams → plain text (pdf-extract)
//!  ├─ 5. Dates     regex scan of the text, with context
//!  └─ 6. Output    links.json, text.txt, report.json (atomic writes)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_harvest::{extract_links_to_file, extract_text, fetch};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     fetch("https://example.com/notice.pdf", "downloads/notice.pdf").await?;
//!
//!     let links = extract_links_to_file("downloads/notice.pdf", "extracted/links.json").await?;
//!     for link in links.iter() {
//!         println!("page {}: {}", link.page, link.url);
//!     }
//!
//!     let text = extract_text("downloads/notice.pdf").await?;
//!     println!("{} pages, {} chars", text.page_count, text.text.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfharvest` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf-harvest = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod harvest;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{document_file_name, FetchConfig, FetchConfigBuilder, OutputLayout};
pub use error::{ExtractError, FetchError, HarvestError};
pub use harvest::{
    extract_links, extract_links_to_file, extract_text, extract_text_to_file, fetch,
    fetch_document, fetch_with_config, process, process_many, process_sync,
};
pub use output::{
    DateMention, Document, DocumentReport, ExtractedLinkSet, ExtractedText, FetchStatus,
    LinkAnnotation, Rect,
};
pub use pipeline::dates::extract_dates;
pub use pipeline::fetch::FetchOutcome;
pub use progress::{FetchProgressCallback, NoopProgressCallback, ProgressCallback};
