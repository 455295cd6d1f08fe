//! Error types for the pdf-harvest library.
//!
//! One enum per pipeline stage:
//!
//! * [`FetchError`]: the download could not be completed. Whatever the
//!   cause, no partially written file is left at the destination path.
//!
//! * [`ExtractError`]: a persisted document could not be read, parsed, or
//!   its derived artifact could not be written.
//!
//! * [`HarvestError`]: returned by the orchestration entry points in
//!   [`crate::harvest`] that chain both stages for one URL.
//!
//! Every error is terminal for the call that raised it. Nothing in the
//! library retries; callers own their retry policy.

use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by the fetch stage.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The source locator could not be parsed as a URL.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The URL is well-formed but does not use HTTPS.
    #[error("Refusing to fetch '{url}' over an insecure scheme\nOnly https:// URLs are accepted.")]
    InsecureScheme { url: String },

    /// The server answered with a non-success status code.
    #[error("Failed to get '{url}' (HTTP {code})")]
    BadStatus { url: String, code: u16 },

    /// DNS failure, refused connection, reset, or a body cut short.
    #[error("Transport error fetching '{url}': {source}\nCheck your internet connection.")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The request did not complete within the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nRaise FetchConfig::timeout_secs for slow servers.")]
    Timeout { url: String, secs: u64 },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Creating the destination directory or writing the file failed.
    #[error("Failed to write '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    /// Short, stable label for the variant. Used in log fields and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::InvalidUrl { .. } => "invalid_url",
            FetchError::InsecureScheme { .. } => "insecure_scheme",
            FetchError::BadStatus { .. } => "bad_status",
            FetchError::Transport { .. } => "transport",
            FetchError::Timeout { .. } => "timeout",
            FetchError::InvalidConfig(_) => "invalid_config",
            FetchError::Io { .. } => "io",
        }
    }
}

/// Errors returned by the link, text, and date extraction stages.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The document is absent or cannot be opened for reading.
    #[error("PDF file does not exist: '{path}'\nCheck the path exists and is readable.")]
    NotFound { path: PathBuf },

    /// The document was read but its structure could not be parsed.
    #[error("PDF '{path}' could not be parsed: {detail}")]
    Unparseable { path: PathBuf, detail: String },

    /// Could not create or write an output artifact.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Unexpected internal error (a blocking task panicked, etc.).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors returned by the end-to-end harvest entry points.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    /// Two different URLs in one batch resolve to the same document path or
    /// artifact directory.
    #[error("'{url}' would overwrite '{path}', already claimed by another URL in this batch")]
    DuplicateDestination { url: String, path: PathBuf },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_status_display() {
        let e = FetchError::BadStatus {
            url: "https://example.com/a.pdf".into(),
            code: 404,
        };
        let msg = e.to_string();
        assert!(msg.contains("404"), "got: {msg}");
        assert!(msg.contains("a.pdf"), "got: {msg}");
        assert_eq!(e.kind(), "bad_status");
    }

    #[test]
    fn timeout_display() {
        let e = FetchError::Timeout {
            url: "https://example.com".into(),
            secs: 30,
        };
        let msg = e.to_string();
        assert!(msg.contains("30s"), "got: {msg}");
        assert!(msg.contains("FetchConfig::timeout_secs"), "got: {msg}");
        assert!(!msg.contains("--"), "got: {msg}");
    }

    #[test]
    fn not_found_display() {
        let e = ExtractError::NotFound {
            path: PathBuf::from("downloads/missing.pdf"),
        };
        assert!(e.to_string().contains("missing.pdf"));
    }

    #[test]
    fn harvest_error_is_transparent() {
        let inner = ExtractError::Unparseable {
            path: PathBuf::from("x.pdf"),
            detail: "no trailer".into(),
        };
        let expected = inner.to_string();
        let e: HarvestError = inner.into();
        assert_eq!(e.to_string(), expected);
    }
}
