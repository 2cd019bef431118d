//! Report documents and work-item extraction
//!
//! A report export is a JSON object with a `results` array. Each result carries a
//! `created` timestamp and zero or more `attached_images`, each with a numeric `id`
//! and an `original` (full-resolution) URL. Every image becomes one [`WorkItem`]
//! named `{YYYYMMDD}-{HHMMSS}-{id}{ext}`.
//!
//! No URL-level deduplication happens here: file names are deterministic, so repeated
//! images collapse at write time through the fetcher's skip-if-exists check.

use crate::error::{Error, Result};
use crate::types::WorkItem;
use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Extension used when the source URL does not carry one
pub const DEFAULT_EXTENSION: &str = ".jpg";

/// Image identifier; the service emits numbers, older exports strings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageId {
    /// Numeric id
    Number(u64),
    /// String id
    Text(String),
}

impl std::fmt::Display for ImageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageId::Number(n) => write!(f, "{}", n),
            ImageId::Text(s) => write!(f, "{}", s),
        }
    }
}

/// An image attached to a report record
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AttachedImage {
    /// Image id
    pub id: ImageId,
    /// Full-resolution source URL
    #[serde(default)]
    pub original: Option<String>,
}

/// One entry of a report export
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReportRecord {
    /// Creation timestamp as written by the service
    pub created: String,
    /// Attached images, possibly empty
    #[serde(default)]
    pub attached_images: Vec<AttachedImage>,
}

/// A parsed report export
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Report {
    /// Report entries
    pub results: Vec<ReportRecord>,
}

impl Report {
    /// Parse a report from JSON text
    pub fn from_json(content: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(content)?;
        if value.get("results").is_none() {
            return Err(Error::InvalidReport(
                "document has no `results` collection".to_string(),
            ));
        }
        Ok(serde_json::from_value(value)?)
    }
}

/// Read and parse a report file
///
/// # Errors
///
/// [`Error::NotFound`] if the file does not exist, [`Error::Serialization`] for
/// malformed JSON, [`Error::InvalidReport`] if `results` is missing.
pub fn load_report(path: &Path) -> Result<Report> {
    if !path.is_file() {
        return Err(Error::NotFound(format!(
            "report file '{}'",
            path.display()
        )));
    }
    let content = std::fs::read_to_string(path)?;
    Report::from_json(&content)
}

/// Normalize a creation timestamp into the fixed-width `YYYYMMDD-HHMMSS` token
///
/// Accepts RFC 3339 timestamps (the wall-clock time as written is kept, the offset is
/// dropped) and naive `YYYY-MM-DDTHH:MM:SS[.fff]` or space-separated forms.
pub fn capture_token(created: &str) -> Option<String> {
    let created = created.trim();
    let naive = DateTime::parse_from_rfc3339(created)
        .map(|dt| dt.naive_local())
        .or_else(|_| NaiveDateTime::parse_from_str(created, "%Y-%m-%dT%H:%M:%S%.f"))
        .or_else(|_| NaiveDateTime::parse_from_str(created, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()?;
    Some(naive.format("%Y%m%d-%H%M%S").to_string())
}

/// File extension of the URL's last path segment, including the dot
///
/// Falls back to [`DEFAULT_EXTENSION`] when the URL has no usable extension.
pub fn extension_of(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|parsed| {
            let segment = parsed.path_segments()?.next_back()?.to_string();
            let ext = Path::new(&segment).extension()?.to_str()?.to_string();
            let usable = !ext.is_empty()
                && ext.len() <= 5
                && ext.chars().all(|c| c.is_ascii_alphanumeric());
            usable.then(|| format!(".{}", ext))
        })
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

/// Destination file name for one image of a record
pub fn derive_filename(token: &str, image_id: &ImageId, url: &str) -> String {
    format!("{}-{}{}", token, image_id, extension_of(url))
}

/// Walk the report and build the work list in report order
///
/// Images without a source URL and records with an unparseable timestamp are
/// skipped with a warning.
pub fn extract_work_items(report: &Report) -> Vec<WorkItem> {
    let mut items = Vec::new();

    for record in &report.results {
        if record.attached_images.is_empty() {
            continue;
        }

        let Some(token) = capture_token(&record.created) else {
            tracing::warn!(
                created = %record.created,
                images = record.attached_images.len(),
                "Unrecognized creation timestamp, skipping record"
            );
            continue;
        };

        for image in &record.attached_images {
            match image.original.as_deref().map(str::trim) {
                Some(url) if !url.is_empty() => {
                    items.push(WorkItem::new(url, derive_filename(&token, &image.id, url)));
                }
                _ => {
                    tracing::warn!(image_id = %image.id, created = %record.created, "Image has no source URL, skipping");
                }
            }
        }
    }

    tracing::debug!(items = items.len(), records = report.results.len(), "Extracted work items");
    items
}
