//! Fetch unit: one resource retrieval per work item
//!
//! Each attempt runs the same sequence from the top:
//! 1. skip if a valid file already exists at the destination
//! 2. reject URLs that do not parse or use a scheme outside the allow-list
//! 3. issue the request under a hard time budget and stream the body to a `.part` file
//!    unique to this attempt
//! 4. validate declared and received sizes, then rename the `.part` file into place
//!    unless a concurrent fetch of the same file already put a valid copy there
//!
//! The `.part` file is deleted on every failure path, so a terminal failure never
//! leaves a file behind. Transport failures re-enter the sequence
//! through [`download_with_retry`]; every other error is terminal on first sight.

use crate::config::{Config, DownloadConfig, RetryConfig};
use crate::error::{Error, FetchError, Result};
use crate::fs_guard::has_valid_file;
use crate::retry::download_with_retry;
use crate::types::{DownloadOutcome, WorkItem};
use async_trait::async_trait;
use futures::StreamExt;
use std::path::Path;
use std::time::Duration;
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;
use url::Url;

/// Suffix of in-progress downloads
const PART_SUFFIX: &str = ".part";

/// Something that can drive a work item to a terminal outcome
///
/// The scheduler only talks to this trait, which keeps it independent of the
/// transport and lets tests substitute scripted fetchers.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Fetch `item` into `dir`; the directory must already exist
    async fn fetch(&self, item: &WorkItem, dir: &Path) -> DownloadOutcome;
}

/// Successful result of a single attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    Written(u64),
    AlreadyPresent,
}

/// HTTP fetcher backed by a shared `reqwest::Client`
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    download: DownloadConfig,
    retry: RetryConfig,
}

impl HttpFetcher {
    /// Build a fetcher from the download and retry sections of `config`
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.download.user_agent.clone())
            .build()
            .map_err(Error::Network)?;

        Ok(Self::with_client(client, config))
    }

    /// Build a fetcher around an existing client
    pub fn with_client(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            download: config.download.clone(),
            retry: config.retry.clone(),
        }
    }

    async fn fetch_with_retry(
        &self,
        item: &WorkItem,
        dir: &Path,
    ) -> std::result::Result<Attempt, FetchError> {
        download_with_retry(&self.retry, || self.attempt(item, dir)).await
    }

    async fn attempt(
        &self,
        item: &WorkItem,
        dir: &Path,
    ) -> std::result::Result<Attempt, FetchError> {
        let dest = dir.join(&item.filename);
        if has_valid_file(&dest, self.download.min_file_size) {
            return Ok(Attempt::AlreadyPresent);
        }

        let url = validate_source(&item.url, &self.download.allowed_schemes)?;

        // Dropping the future on timeout drops its TempPath, which deletes the file
        let budget = self.download.request_timeout;
        let (part, written) =
            match tokio::time::timeout(budget, self.stream_to_part(url, dir, &item.filename)).await {
                Ok(result) => result?,
                Err(_) => return Err(FetchError::Timeout { after: budget }),
            };

        if self.commit(part, &dest)? {
            Ok(Attempt::Written(written))
        } else {
            Ok(Attempt::AlreadyPresent)
        }
    }

    /// Move a completed `.part` file into place
    ///
    /// Returns `Ok(false)` when another fetch of the same file won the race and a
    /// valid copy is already in place; the `.part` file is discarded in that case.
    fn commit(&self, part: TempPath, dest: &Path) -> std::result::Result<bool, FetchError> {
        let err = match part.persist_noclobber(dest) {
            Ok(()) => return Ok(true),
            Err(err) => err,
        };
        if err.error.kind() != std::io::ErrorKind::AlreadyExists {
            return Err(persist_error(&err.error, dest));
        }

        let part = err.path;
        if has_valid_file(dest, self.download.min_file_size) {
            discard_partial(part);
            return Ok(false);
        }
        part.persist(dest).map_err(|err| persist_error(&err.error, dest))?;
        Ok(true)
    }

    async fn stream_to_part(
        &self,
        url: Url,
        dir: &Path,
        filename: &str,
    ) -> std::result::Result<(TempPath, u64), FetchError> {
        let minimum = self.download.min_file_size;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(e, self.download.request_timeout))?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(FetchError::Http {
                status: response.status().as_u16(),
            });
        }

        let declared = response.content_length();
        if let Some(len) = declared
            && len < minimum
        {
            return Err(FetchError::SizeViolation {
                declared,
                actual: 0,
                minimum,
            });
        }

        // Each attempt gets its own .part file, so concurrent fetches of the same
        // destination never share one
        let (file, part) = tempfile::Builder::new()
            .prefix(&format!("{}.", filename))
            .suffix(PART_SUFFIX)
            .tempfile_in(dir)?
            .into_parts();
        let mut file = tokio::fs::File::from_std(file);
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk =
                chunk.map_err(|e| classify_reqwest_error(e, self.download.request_timeout))?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
            tracing::trace!(chunk_size = chunk.len(), total = written, "Received chunk");
        }
        file.flush().await?;
        drop(file);

        if written < minimum {
            return Err(FetchError::SizeViolation {
                declared,
                actual: written,
                minimum,
            });
        }

        Ok((part, written))
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, item: &WorkItem, dir: &Path) -> DownloadOutcome {
        match self.fetch_with_retry(item, dir).await {
            Ok(Attempt::Written(bytes)) => {
                tracing::info!(file = %item.filename, bytes, "Downloaded");
                DownloadOutcome::Downloaded(bytes)
            }
            Ok(Attempt::AlreadyPresent) => {
                tracing::info!(file = %item.filename, "Already present, skipping");
                DownloadOutcome::Skipped
            }
            Err(e) => {
                tracing::warn!(
                    file = %item.filename,
                    url = %item.url,
                    kind = e.error_code(),
                    error = %e,
                    "Download failed"
                );
                DownloadOutcome::Failed(e)
            }
        }
    }
}

/// Parse `raw` and check its scheme against `allowed`
pub fn validate_source(raw: &str, allowed: &[String]) -> std::result::Result<Url, FetchError> {
    let url = Url::parse(raw).map_err(|e| FetchError::InvalidSource {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    if !allowed.iter().any(|s| s.eq_ignore_ascii_case(url.scheme())) {
        return Err(FetchError::InvalidSource {
            url: raw.to_string(),
            reason: format!("scheme '{}' is not allowed", url.scheme()),
        });
    }

    if url.host_str().is_none() {
        return Err(FetchError::InvalidSource {
            url: raw.to_string(),
            reason: "missing host".to_string(),
        });
    }

    Ok(url)
}

fn persist_error(e: &std::io::Error, dest: &Path) -> FetchError {
    FetchError::Io(format!("failed to move download into {}: {}", dest.display(), e))
}

fn discard_partial(part: TempPath) {
    let path = part.to_path_buf();
    match part.close() {
        Ok(()) => tracing::debug!(path = %path.display(), "Removed partial file"),
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to remove partial file"),
    }
}

fn classify_reqwest_error(e: reqwest::Error, budget: Duration) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout { after: budget }
    } else {
        FetchError::Transport(e.to_string())
    }
}
