//! # album-dl
//!
//! Batch downloader for images referenced by exported childcare report documents,
//! plus the small tools around it.
//!
//! ## Design
//!
//! - **Bounded batches** - items are fetched in fixed-width batches; a batch finishes
//!   completely before the next one starts, with a configurable pause in between
//! - **Isolated failures** - a failed item is logged and counted, never fatal to the run
//! - **Idempotent** - files already on disk above the size threshold are skipped, and
//!   writes land atomically, so an interrupted run can simply be repeated
//! - **Event-driven** - consumers subscribe to progress events instead of polling
//!
//! ## Quick Start
//!
//! ```no_run
//! use album_dl::{BatchScheduler, Config, HttpFetcher, load_report, extract_work_items};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let report = load_report(Path::new("report.json"))?;
//!     let items = extract_work_items(&report);
//!
//!     let fetcher = Arc::new(HttpFetcher::new(&config)?);
//!     let scheduler = BatchScheduler::new(fetcher, &config.download);
//!
//!     let mut events = scheduler.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let summary = scheduler.run(items).await?;
//!     println!("{} downloaded, {} failed", summary.downloaded, summary.failed);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// URL builders for report and album endpoints
pub mod endpoints;
/// Error types
pub mod error;
/// Single-item fetch with retry, validation, and atomic writes
pub mod fetch;
/// Destination directory and existing-file checks
pub mod fs_guard;
/// Tracing subscriber setup for the binaries
pub mod logging;
/// Progress bars and human-readable formatting
pub mod progress;
/// Report parsing and work-item extraction
pub mod report;
/// Retry logic with backoff
pub mod retry;
/// Batch scheduling and run statistics
pub mod scheduler;
/// File timestamp sync from capture-time file names
pub mod timesync;
/// Core types and events
pub mod types;

use std::path::Path;
use std::sync::Arc;

// Re-export commonly used types
pub use config::{ApiConfig, Config, DownloadConfig, RetryConfig, SyncConfig};
pub use error::{Error, FetchError, Result};
pub use fetch::{Fetch, HttpFetcher};
pub use report::{Report, extract_work_items, load_report};
pub use scheduler::{BatchScheduler, RunStatistics, plan_batches};
pub use timesync::{SyncOutcome, SyncReport, sync_file, sync_path};
pub use types::{DownloadOutcome, Event, RunSummary, WorkItem};

/// Download every image referenced by the report at `report_path`
///
/// Convenience wrapper over [`load_report`], [`extract_work_items`], and a
/// [`BatchScheduler`] driving an [`HttpFetcher`]. Use the pieces directly to
/// subscribe to progress events.
///
/// # Errors
///
/// Setup failures only: missing or malformed report, an unusable destination, or
/// an HTTP client that cannot be built. Per-item failures are counted in the
/// returned summary.
pub async fn download_report(config: &Config, report_path: &Path) -> Result<RunSummary> {
    let report = load_report(report_path)?;
    let items = extract_work_items(&report);
    tracing::info!(
        report = %report_path.display(),
        items = items.len(),
        dir = %config.download_dir().display(),
        "Loaded report"
    );

    let fetcher = Arc::new(HttpFetcher::new(config)?);
    BatchScheduler::new(fetcher, &config.download).run(items).await
}
