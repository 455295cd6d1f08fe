//! Fetch stage: stream one remote document to a local path.
//!
//! The response body is streamed into a staging file next to the
//! destination and renamed into place only after the last byte has been
//! written, flushed and synced. Any failure before that point drops the
//! staging file, so the destination path either keeps its previous content
//! or does not exist. Any status other than `200 OK` is rejected before a
//! file is created at all; `206` fragments and empty `204` bodies are never
//! committed as documents.
//!
//! With `require_https` set, redirects are held to the same rule as the
//! initial URL: a hop to a non-HTTPS location fails the fetch.

use crate::config::FetchConfig;
use crate::error::FetchError;
use crate::pipeline::persist;
use futures::StreamExt;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Redirect hops followed before giving up.
const MAX_REDIRECTS: usize = 10;

/// What a successful fetch did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The body was downloaded and committed; `bytes` were written.
    Downloaded { bytes: u64 },
    /// `skip_existing` was set and the destination already existed.
    AlreadyPresent,
}

/// Parse `url` and enforce the scheme policy.
pub fn validate_url(url: &str, require_https: bool) -> Result<reqwest::Url, FetchError> {
    let parsed = reqwest::Url::parse(url).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    match parsed.scheme() {
        "https" => Ok(parsed),
        "http" if !require_https => Ok(parsed),
        "http" => Err(FetchError::InsecureScheme {
            url: url.to_string(),
        }),
        other => Err(FetchError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme '{other}'"),
        }),
    }
}

/// Why a redirect to `next` must not be followed, if it must not.
///
/// `hops` counts the URLs already requested in the chain.
fn redirect_refusal(require_https: bool, next: &reqwest::Url, hops: usize) -> Option<String> {
    if hops > MAX_REDIRECTS {
        return Some(format!("more than {MAX_REDIRECTS} redirects"));
    }
    if require_https && next.scheme() != "https" {
        return Some(format!("redirect to insecure location '{next}'"));
    }
    None
}

fn redirect_policy(require_https: bool) -> reqwest::redirect::Policy {
    reqwest::redirect::Policy::custom(move |attempt| {
        match redirect_refusal(require_https, attempt.url(), attempt.previous().len()) {
            Some(reason) => {
                debug!("Refusing redirect: {}", reason);
                attempt.error(reason)
            }
            None => attempt.follow(),
        }
    })
}

/// Download `url` to `dest`.
///
/// Single attempt, no retries. Progress events go to the configured
/// callback, including `on_fetch_error` for every failure.
pub async fn fetch_to_path(
    url: &str,
    dest: &Path,
    config: &FetchConfig,
) -> Result<FetchOutcome, FetchError> {
    let result = fetch_inner(url, dest, config).await;
    if let (Err(e), Some(cb)) = (&result, &config.progress_callback) {
        cb.on_fetch_error(url, &e.to_string());
    }
    result
}

async fn fetch_inner(
    url: &str,
    dest: &Path,
    config: &FetchConfig,
) -> Result<FetchOutcome, FetchError> {
    let parsed = validate_url(url, config.require_https)?;

    if config.skip_existing && tokio::fs::try_exists(dest).await.unwrap_or(false) {
        info!("Already downloaded, skipping: {}", dest.display());
        return Ok(FetchOutcome::AlreadyPresent);
    }

    info!("Downloading PDF from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .user_agent(config.user_agent.as_str())
        .https_only(config.require_https)
        .redirect(redirect_policy(config.require_https))
        .build()
        .map_err(|e| transport_error(url, config, e))?;

    let response = client
        .get(parsed)
        .send()
        .await
        .map_err(|e| transport_error(url, config, e))?;

    let status = response.status();
    if status != reqwest::StatusCode::OK {
        return Err(FetchError::BadStatus {
            url: url.to_string(),
            code: status.as_u16(),
        });
    }

    let total = response.content_length();
    debug!(?total, "Response headers received: HTTP {}", status);
    if let Some(ref cb) = config.progress_callback {
        cb.on_fetch_start(url, total);
    }

    let io_error = |source: std::io::Error| FetchError::Io {
        path: dest.to_path_buf(),
        source,
    };

    let staging_dest = dest.to_path_buf();
    let staged = tokio::task::spawn_blocking(move || persist::staging_file(&staging_dest))
        .await
        .map_err(|e| io_error(std::io::Error::other(e)))?
        .map_err(io_error)?;
    let mut file = tokio::fs::File::from_std(staged.as_file().try_clone().map_err(io_error)?);

    let mut downloaded: u64 = 0;
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| transport_error(url, config, e))?;
        file.write_all(&chunk).await.map_err(io_error)?;
        downloaded += chunk.len() as u64;
        if let Some(ref cb) = config.progress_callback {
            cb.on_bytes(url, downloaded, total);
        }
    }

    file.flush().await.map_err(io_error)?;
    file.sync_all().await.map_err(io_error)?;
    drop(file);

    staged.persist(dest).map_err(|e| io_error(e.error))?;

    info!("PDF downloaded and saved to {} ({} bytes)", dest.display(), downloaded);
    if let Some(ref cb) = config.progress_callback {
        cb.on_fetch_complete(url, downloaded);
    }

    Ok(FetchOutcome::Downloaded { bytes: downloaded })
}

fn transport_error(url: &str, config: &FetchConfig, source: reqwest::Error) -> FetchError {
    if source.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
            secs: config.timeout_secs,
        }
    } else {
        FetchError::Transport {
            url: url.to_string(),
            source,
        }
    }
}
