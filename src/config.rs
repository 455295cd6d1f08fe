//! Configuration types for fetching and output placement.
//!
//! [`FetchConfig`] controls how a single download behaves; it is built via
//! [`FetchConfigBuilder`] so callers only set what they care about.
//! [`OutputLayout`] encodes the on-disk convention used by the harvest
//! entry points: raw documents in one directory, derived artifacts in a
//! per-document subdirectory of another.

use crate::error::FetchError;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::{Path, PathBuf};

/// Fallback file name when a URL has no usable last path segment.
pub const DEFAULT_DOCUMENT_NAME: &str = "downloaded.pdf";

/// Configuration for a single fetch.
///
/// # Example
/// ```rust
/// use pdf_harvest::FetchConfig;
///
/// let config = FetchConfig::builder()
///     .timeout_secs(30)
///     .skip_existing(true)
///     .build()
///     .unwrap();
/// assert!(config.require_https);
/// ```
#[derive(Clone)]
pub struct FetchConfig {
    /// Upper bound on the whole request, headers and body. Default: 120.
    pub timeout_secs: u64,

    /// Upper bound on establishing the TCP/TLS connection. Default: 30.
    pub connect_timeout_secs: u64,

    /// Reject any URL whose scheme is not `https`. Default: true.
    pub require_https: bool,

    /// Treat an already-present destination file as a completed fetch and
    /// skip the network entirely. Default: false.
    pub skip_existing: bool,

    /// `User-Agent` header sent with the request.
    pub user_agent: String,

    /// Optional progress callback for download events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 120,
            connect_timeout_secs: 30,
            require_https: true,
            skip_existing: false,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for FetchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchConfig")
            .field("timeout_secs", &self.timeout_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("require_https", &self.require_https)
            .field("skip_existing", &self.skip_existing)
            .field("user_agent", &self.user_agent)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn FetchProgressCallback>"),
            )
            .finish()
    }
}

impl FetchConfig {
    /// Create a new builder for `FetchConfig`.
    pub fn builder() -> FetchConfigBuilder {
        FetchConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`FetchConfig`].
#[derive(Debug)]
pub struct FetchConfigBuilder {
    config: FetchConfig,
}

impl FetchConfigBuilder {
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs;
        self
    }

    pub fn connect_timeout_secs(mut self, secs: u64) -> Self {
        self.config.connect_timeout_secs = secs;
        self
    }

    pub fn require_https(mut self, v: bool) -> Self {
        self.config.require_https = v;
        self
    }

    pub fn skip_existing(mut self, v: bool) -> Self {
        self.config.skip_existing = v;
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<FetchConfig, FetchError> {
        let c = &self.config;
        if c.timeout_secs == 0 {
            return Err(FetchError::InvalidConfig("Timeout must be ≥ 1 second".into()));
        }
        if c.connect_timeout_secs == 0 {
            return Err(FetchError::InvalidConfig("Connect timeout must be ≥ 1 second".into()));
        }
        if c.user_agent.trim().is_empty() {
            return Err(FetchError::InvalidConfig("User agent must not be empty".into()));
        }
        Ok(self.config)
    }
}

/// Where documents and their derived artifacts live on disk.
///
/// ```text
/// <documents_dir>/<name>.pdf
/// <output_dir>/<name>/links.json
/// <output_dir>/<name>/text.txt
/// <output_dir>/<name>/report.json
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    /// Directory holding raw fetched documents. Default: `downloads`.
    pub documents_dir: PathBuf,
    /// Directory holding one subdirectory of artifacts per document.
    /// Default: `extracted`.
    pub output_dir: PathBuf,
}

impl Default for OutputLayout {
    fn default() -> Self {
        Self {
            documents_dir: PathBuf::from("downloads"),
            output_dir: PathBuf::from("extracted"),
        }
    }
}

impl OutputLayout {
    pub fn new(documents_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            documents_dir: documents_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    /// Local path a URL is downloaded to.
    pub fn document_path(&self, url: &str) -> PathBuf {
        self.documents_dir.join(document_file_name(url))
    }

    /// Per-document artifact directory, named after the document's stem.
    pub fn artifact_dir(&self, document_path: &Path) -> PathBuf {
        let stem = document_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "document".to_string());
        self.output_dir.join(stem)
    }

    pub fn links_path(&self, document_path: &Path) -> PathBuf {
        self.artifact_dir(document_path).join("links.json")
    }

    pub fn text_path(&self, document_path: &Path) -> PathBuf {
        self.artifact_dir(document_path).join("text.txt")
    }

    pub fn report_path(&self, document_path: &Path) -> PathBuf {
        self.artifact_dir(document_path).join("report.json")
    }
}

/// Derive a file name from the last non-empty path segment of a URL.
///
/// Query strings and fragments are ignored. Falls back to
/// [`DEFAULT_DOCUMENT_NAME`] when the URL cannot be parsed or has no
/// usable segment.
pub fn document_file_name(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(segments) = parsed.path_segments() {
            if let Some(last) = segments.filter(|s| !s.is_empty()).last() {
                if last != "." && last != ".." {
                    return last.to_string();
                }
            }
        }
    }

    DEFAULT_DOCUMENT_NAME.to_string()
}
