//! Async entry points: fetch, extract, and the end-to-end harvest.
//!
//! ## Why async wrappers around sync stages?
//!
//! Downloading is naturally async, but PDF parsing and text decoding are
//! CPU-bound and would stall the runtime's worker threads. Every extraction
//! therefore runs inside [`tokio::task::spawn_blocking`]; the functions here
//! only move owned paths into the blocking pool and map a failed join onto
//! [`ExtractError::Internal`].
//!
//! [`process`] chains everything for one URL and loads the document once for
//! both extractors. [`process_many`] runs independent `process` calls with
//! bounded concurrency; documents never share mutable state.

use crate::config::{FetchConfig, OutputLayout};
use crate::error::{ExtractError, FetchError, HarvestError};
use crate::output::{
    Document, DocumentReport, ExtractedLinkSet, ExtractedText, FetchStatus,
};
use crate::pipeline::fetch::{self, FetchOutcome};
use crate::pipeline::{dates, document, links, persist, text};
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

// ── Fetch ────────────────────────────────────────────────────────────────

/// Download `url` to `dest` with the default [`FetchConfig`].
///
/// On error nothing new is left at `dest`: a pre-existing file keeps its
/// content, otherwise the path does not exist.
pub async fn fetch(url: &str, dest: impl AsRef<Path>) -> Result<(), FetchError> {
    fetch_with_config(url, dest, &FetchConfig::default())
        .await
        .map(|_| ())
}

/// Download `url` to `dest` with an explicit configuration.
pub async fn fetch_with_config(
    url: &str,
    dest: impl AsRef<Path>,
    config: &FetchConfig,
) -> Result<FetchOutcome, FetchError> {
    fetch::fetch_to_path(url, dest.as_ref(), config).await
}

/// Fetch a [`Document`] and record the outcome in its `status`.
pub async fn fetch_document(
    doc: &mut Document,
    config: &FetchConfig,
) -> Result<FetchOutcome, FetchError> {
    match fetch::fetch_to_path(&doc.source_url, &doc.path, config).await {
        Ok(outcome) => {
            doc.status = FetchStatus::Succeeded;
            Ok(outcome)
        }
        Err(e) => {
            warn!(kind = e.kind(), "Fetch failed for {}", doc.source_url);
            doc.status = FetchStatus::Failed;
            Err(e)
        }
    }
}

// ── Extract ──────────────────────────────────────────────────────────────

/// Extract every outbound URI link from a persisted document.
///
/// # Errors
/// - [`ExtractError::NotFound`] if the file is absent or unreadable
/// - [`ExtractError::Unparseable`] if it is not a parseable PDF
pub async fn extract_links(document_path: impl AsRef<Path>) -> Result<ExtractedLinkSet, ExtractError> {
    let path = document_path.as_ref().to_path_buf();
    run_blocking(move || links::extract_links_blocking(&path)).await
}

/// Extract links and write them as pretty JSON to `output_path`.
///
/// Extraction happens before anything is written, so a failed extraction
/// leaves the filesystem untouched. An empty result is written as `[]`.
pub async fn extract_links_to_file(
    document_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
) -> Result<ExtractedLinkSet, ExtractError> {
    let path = document_path.as_ref().to_path_buf();
    let out = output_path.as_ref().to_path_buf();
    run_blocking(move || {
        let links = links::extract_links_blocking(&path)?;
        write_json(&out, &links)?;
        Ok(links)
    })
    .await
}

/// Extract the plain text of a persisted document.
pub async fn extract_text(document_path: impl AsRef<Path>) -> Result<ExtractedText, ExtractError> {
    let path = document_path.as_ref().to_path_buf();
    run_blocking(move || text::extract_text_blocking(&path)).await
}

/// Extract text and write it as UTF-8 to `output_path`.
pub async fn extract_text_to_file(
    document_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
) -> Result<ExtractedText, ExtractError> {
    let path = document_path.as_ref().to_path_buf();
    let out = output_path.as_ref().to_path_buf();
    run_blocking(move || {
        let text = text::extract_text_blocking(&path)?;
        write_bytes(&out, text.as_str().as_bytes())?;
        Ok(text)
    })
    .await
}

// ── Harvest ──────────────────────────────────────────────────────────────

/// Fetch one URL and derive every artifact from it.
///
/// ```text
/// <documents_dir>/<name>.pdf          fetched document
/// <output_dir>/<stem>/links.json      ExtractedLinkSet
/// <output_dir>/<stem>/text.txt        ExtractedText
/// <output_dir>/<stem>/report.json     DocumentReport
/// ```
///
/// # Example
/// ```rust,no_run
/// use pdf_harvest::{process, FetchConfig, OutputLayout};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let report = process(
///     "https://example.com/circulars/NT105.pdf",
///     &OutputLayout::default(),
///     &FetchConfig::default(),
/// )
/// .await?;
/// println!("{} links, {} dates", report.links.len(), report.important_dates.len());
/// # Ok(())
/// # }
/// ```
pub async fn process(
    url: &str,
    layout: &OutputLayout,
    config: &FetchConfig,
) -> Result<DocumentReport, HarvestError> {
    let started = Instant::now();
    info!("Processing {}", url);

    let mut doc = Document::pending(url, layout.document_path(url));
    fetch_document(&mut doc, config).await?;

    let layout = layout.clone();
    let report = run_blocking(move || build_report(&doc, &layout)).await?;

    info!(
        "Processed {}: {} pages, {} links, {} dates in {}ms",
        url,
        report.page_count,
        report.links.len(),
        report.important_dates.len(),
        started.elapsed().as_millis()
    );
    Ok(report)
}

/// Run [`process`] for each distinct URL, at most `concurrency` at a time.
///
/// Results come back in input order, one per distinct URL. A URL whose
/// document path or artifact directory was already claimed by a different
/// URL earlier in the list is not fetched and yields
/// [`HarvestError::DuplicateDestination`]. `…/x/report.pdf` and `…/y/report`
/// download to different files but would share `<output_dir>/report/`.
pub async fn process_many<S: AsRef<str>>(
    urls: &[S],
    layout: &OutputLayout,
    config: &FetchConfig,
    concurrency: usize,
) -> Vec<(String, Result<DocumentReport, HarvestError>)> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut claimed: HashMap<PathBuf, &str> = HashMap::new();
    let mut jobs: Vec<(String, Option<HarvestError>)> = Vec::new();

    for url in urls.iter().map(AsRef::as_ref) {
        if !seen.insert(url) {
            debug!("Ignoring repeated URL {}", url);
            continue;
        }
        let path = layout.document_path(url);
        let artifacts = layout.artifact_dir(&path);
        let collision = [&path, &artifacts]
            .into_iter()
            .find_map(|p| claimed.get(p).map(|owner| (p.clone(), *owner)));
        if let Some((taken, owner)) = collision {
            warn!("{} and {} both map to {}", owner, url, taken.display());
            jobs.push((
                url.to_string(),
                Some(HarvestError::DuplicateDestination {
                    url: url.to_string(),
                    path: taken,
                }),
            ));
            continue;
        }
        claimed.insert(path, url);
        claimed.insert(artifacts, url);
        jobs.push((url.to_string(), None));
    }

    info!(
        "Harvesting {} documents with concurrency {}",
        jobs.len(),
        concurrency.max(1)
    );

    stream::iter(jobs.into_iter().map(|(url, rejected)| async move {
        let result = match rejected {
            Some(e) => Err(e),
            None => process(&url, layout, config).await,
        };
        (url, result)
    }))
    .buffered(concurrency.max(1))
    .collect()
    .await
}

/// Synchronous wrapper around [`process`].
///
/// Creates a temporary tokio runtime internally.
pub fn process_sync(
    url: &str,
    layout: &OutputLayout,
    config: &FetchConfig,
) -> Result<DocumentReport, HarvestError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ExtractError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(process(url, layout, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Parse once, run both extractors, and write all three artifacts.
fn build_report(doc: &Document, layout: &OutputLayout) -> Result<DocumentReport, ExtractError> {
    let loaded = document::load(doc.path())?;

    let links = links::collect_links_with_context(&loaded.document);
    let text = text::decode_text(&loaded)?;
    let important_dates = dates::extract_dates(text.as_str());
    debug!(
        "{}: {} links, {} chars, {} dates",
        doc.path().display(),
        links.len(),
        text.text.len(),
        important_dates.len()
    );

    write_json(&layout.links_path(doc.path()), &links)?;
    write_bytes(&layout.text_path(doc.path()), text.as_str().as_bytes())?;

    let report = DocumentReport {
        source_url: doc.source_url.clone(),
        document_path: doc.path.clone(),
        page_count: text.page_count,
        links,
        text: text.text,
        important_dates,
    };
    write_json(&layout.report_path(doc.path()), &report)?;

    Ok(report)
}

async fn run_blocking<T, F>(f: F) -> Result<T, ExtractError>
where
    F: FnOnce() -> Result<T, ExtractError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ExtractError::Internal(format!("Blocking task failed: {}", e)))?
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), ExtractError> {
    persist::write_json_atomic(path, value).map_err(|source| ExtractError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    })
}

fn write_bytes(path: &Path, contents: &[u8]) -> Result<(), ExtractError> {
    persist::write_atomic(path, contents).map_err(|source| ExtractError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_extract_links_missing_file() {
        let err = extract_links("/nonexistent/file.pdf").await.unwrap_err();
        assert!(matches!(err, ExtractError::NotFound { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn test_extract_to_file_writes_nothing_on_failure() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.pdf");
        let out = dir.path().join("out/links.json");

        assert!(extract_links_to_file(&missing, &out).await.is_err());
        assert!(extract_text_to_file(&missing, dir.path().join("out/text.txt"))
            .await
            .is_err());
        assert!(!dir.path().join("out").exists());
    }

    #[tokio::test]
    async fn test_fetch_document_records_failure() {
        let dir = TempDir::new().unwrap();
        let mut doc = Document::pending("ftp://example.com/a.pdf", dir.path().join("a.pdf"));
        let err = fetch_document(&mut doc, &FetchConfig::default()).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_url");
        assert_eq!(doc.status, FetchStatus::Failed);
    }

    #[tokio::test]
    async fn test_process_many_rejects_colliding_destinations() {
        let dir = TempDir::new().unwrap();
        let layout = OutputLayout::new(dir.path().join("dl"), dir.path().join("out"));
        // http:// is refused up front, so nothing touches the network.
        let urls = [
            "http://a.example/x/report.pdf",
            "http://b.example/y/report.pdf",
            "http://a.example/x/report.pdf",
        ];

        let results = process_many(&urls, &layout, &FetchConfig::default(), 2).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, urls[0]);
        assert!(matches!(
            results[0].1,
            Err(HarvestError::Fetch(FetchError::InsecureScheme { .. }))
        ));
        assert_eq!(results[1].0, urls[1]);
        assert!(matches!(
            results[1].1,
            Err(HarvestError::DuplicateDestination { .. })
        ));
    }

    #[tokio::test]
    async fn test_process_many_rejects_shared_artifact_dir() {
        let dir = TempDir::new().unwrap();
        let layout = OutputLayout::new(dir.path().join("dl"), dir.path().join("out"));
        let urls = ["http://a.example/x/report.pdf", "http://a.example/y/report"];
        assert_ne!(layout.document_path(urls[0]), layout.document_path(urls[1]));

        let results = process_many(&urls, &layout, &FetchConfig::default(), 2).await;
        assert_eq!(results.len(), 2);
        assert!(matches!(
            results[0].1,
            Err(HarvestError::Fetch(FetchError::InsecureScheme { .. }))
        ));
        match &results[1].1 {
            Err(HarvestError::DuplicateDestination { url, path }) => {
                assert_eq!(url, urls[1]);
                assert_eq!(path, &dir.path().join("out/report"));
            }
            other => panic!("expected DuplicateDestination, got {other:?}"),
        }
        assert!(!dir.path().join("dl").exists());
    }
}
