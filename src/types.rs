//! Core types and events for album-dl

use crate::error::FetchError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One (source URL, destination filename) pair to be fetched
///
/// Created by report extraction and consumed exactly once by the scheduler.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkItem {
    /// Absolute, scheme-qualified source URL
    pub url: String,
    /// File name (no directory part) under the download directory
    pub filename: String,
}

impl WorkItem {
    /// Create a new work item
    pub fn new(url: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            filename: filename.into(),
        }
    }
}

/// Terminal outcome of one work item
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// File fetched and written; carries the number of bytes written
    Downloaded(u64),
    /// A valid file already existed at the destination
    Skipped,
    /// The item failed terminally
    Failed(FetchError),
}

impl DownloadOutcome {
    /// Short label used in logs and events
    pub fn label(&self) -> &'static str {
        match self {
            DownloadOutcome::Downloaded(_) => "downloaded",
            DownloadOutcome::Skipped => "skipped",
            DownloadOutcome::Failed(_) => "failed",
        }
    }
}

/// Snapshot of run-level counters
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Number of work items submitted
    pub total: u64,
    /// Items fetched and written
    pub downloaded: u64,
    /// Items skipped because a valid file already existed
    pub skipped: u64,
    /// Items that failed terminally
    pub failed: u64,
    /// Bytes written by downloaded items
    pub bytes: u64,
    /// Wall-clock duration of the run
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
}

impl RunSummary {
    /// Items that reached a terminal outcome
    pub fn processed(&self) -> u64 {
        self.downloaded + self.skipped + self.failed
    }

    /// Average throughput in bytes per second over the whole run
    pub fn throughput_bps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.bytes as f64 / secs
        } else {
            0.0
        }
    }

    /// Average number of processed items per second
    pub fn items_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.processed() as f64 / secs
        } else {
            0.0
        }
    }
}

/// Progress events emitted by the scheduler
///
/// Consumers subscribe through [`crate::scheduler::BatchScheduler::subscribe`].
#[derive(Clone, Debug)]
pub enum Event {
    /// A batch is about to start
    BatchStarted {
        /// Zero-based batch index
        index: usize,
        /// Total number of batches in the run
        batches: usize,
        /// Number of items in this batch
        size: usize,
    },

    /// One item reached its terminal outcome
    ItemFinished {
        /// The item
        item: WorkItem,
        /// Its outcome
        outcome: DownloadOutcome,
    },

    /// Every item of a batch reached a terminal outcome
    BatchCompleted {
        /// Zero-based batch index
        index: usize,
        /// Items processed so far in the run
        processed: u64,
        /// Total items in the run
        total: u64,
        /// Progress percentage (0.0 to 100.0)
        percent: f32,
    },

    /// The whole run finished
    RunCompleted(RunSummary),
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
