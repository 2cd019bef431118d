//! Timestamp sync: set file times from capture times encoded in file names
//!
//! Downloaded images are named `{YYYYMMDD}-{HHMMSS}-{id}.{ext}`. This module parses
//! that local wall-clock time and writes it back as the file's modification and access
//! time (and creation time on platforms that allow setting it), so photo libraries sort
//! the files by when they were taken rather than when they were downloaded.
//!
//! Directories are processed by a pool of worker threads. Each worker owns a contiguous
//! slice of the file list and reports per-file outcomes to the calling thread, which
//! acts as coordinator and feeds a progress callback.

use crate::error::{Error, Result};
use chrono::{Local, NaiveDateTime, TimeZone};
use regex::Regex;
use std::fs::{File, FileTimes};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::{SystemTime, UNIX_EPOCH};

static CAPTURE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{8})-(\d{6})-(\d+)\.([A-Za-z0-9]+)$").unwrap_or_else(|e| {
        unreachable!("capture name pattern is a valid regex: {e}")
    })
});

/// Outcome of syncing one file
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Timestamps were rewritten
    Updated,
    /// Nothing to do; carries the reason
    Skipped(String),
    /// The file could not be updated; carries the reason
    Failed(String),
}

/// Tally of a sync run
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Number of files whose timestamps were rewritten
    pub updated: usize,
    /// Skipped files with the reason
    pub skipped: Vec<(PathBuf, String)>,
    /// Failed files with the reason
    pub failed: Vec<(PathBuf, String)>,
}

impl SyncReport {
    /// Number of files examined
    pub fn total(&self) -> usize {
        self.updated + self.skipped.len() + self.failed.len()
    }

    fn record(&mut self, path: PathBuf, outcome: SyncOutcome) {
        match outcome {
            SyncOutcome::Updated => self.updated += 1,
            SyncOutcome::Skipped(reason) => self.skipped.push((path, reason)),
            SyncOutcome::Failed(reason) => self.failed.push((path, reason)),
        }
    }
}

/// Parse the capture time out of a `{YYYYMMDD}-{HHMMSS}-{id}.{ext}` file name
pub fn parse_capture_time(filename: &str) -> Option<NaiveDateTime> {
    let caps = CAPTURE_NAME.captures(filename)?;
    let stamp = format!("{}{}", &caps[1], &caps[2]);
    NaiveDateTime::parse_from_str(&stamp, "%Y%m%d%H%M%S").ok()
}

/// Interpret a capture time in the local time zone
///
/// Returns `None` for wall-clock times skipped by a DST transition.
pub fn local_system_time(capture: NaiveDateTime) -> Option<SystemTime> {
    Local
        .from_local_datetime(&capture)
        .earliest()
        .map(SystemTime::from)
}

fn epoch_secs(time: SystemTime) -> Option<u64> {
    time.duration_since(UNIX_EPOCH).ok().map(|d| d.as_secs())
}

fn timestamps_match(meta: &std::fs::Metadata, target: SystemTime) -> bool {
    let target = epoch_secs(target);
    let modified_ok = meta.modified().ok().and_then(epoch_secs) == target;

    // Only platforms that can set a creation time are held to it
    #[cfg(any(target_os = "macos", windows))]
    let created_ok = meta.created().ok().and_then(epoch_secs) == target;
    #[cfg(not(any(target_os = "macos", windows)))]
    let created_ok = true;

    modified_ok && created_ok
}

fn target_times(target: SystemTime) -> FileTimes {
    let times = FileTimes::new().set_modified(target).set_accessed(target);

    #[cfg(target_os = "macos")]
    let times = {
        use std::os::macos::fs::FileTimesExt;
        times.set_created(target)
    };
    #[cfg(windows)]
    let times = {
        use std::os::windows::fs::FileTimesExt;
        times.set_created(target)
    };

    times
}

/// Sync the timestamps of one file from its name
pub fn sync_file(path: &Path) -> SyncOutcome {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return SyncOutcome::Skipped("file name is not valid UTF-8".to_string());
    };
    let Some(capture) = parse_capture_time(name) else {
        return SyncOutcome::Skipped("file name does not match YYYYMMDD-HHMMSS-ID.ext".to_string());
    };
    let Some(target) = local_system_time(capture) else {
        return SyncOutcome::Failed(format!("{} does not exist in the local time zone", capture));
    };

    let meta = match std::fs::metadata(path) {
        Ok(meta) => meta,
        Err(e) => return SyncOutcome::Failed(format!("cannot read metadata: {}", e)),
    };
    if !meta.is_file() {
        return SyncOutcome::Skipped("not a regular file".to_string());
    }
    if timestamps_match(&meta, target) {
        return SyncOutcome::Skipped("timestamps already match".to_string());
    }

    let file = match File::options().append(true).open(path).or_else(|_| File::open(path)) {
        Ok(file) => file,
        Err(e) => return SyncOutcome::Failed(format!("cannot open: {}", e)),
    };
    match file.set_times(target_times(target)) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), capture = %capture, "Timestamps updated");
            SyncOutcome::Updated
        }
        Err(e) => SyncOutcome::Failed(format!("cannot set times: {}", e)),
    }
}

fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Sync a single file, or every regular file directly inside a directory
///
/// `workers` threads share a directory's files in contiguous slices; `on_progress` is
/// called on the calling thread once per file as results arrive.
///
/// # Errors
///
/// Only when `path` does not exist or the directory cannot be listed. Per-file
/// problems end up in the report.
pub fn sync_path<F>(path: &Path, workers: usize, mut on_progress: F) -> Result<SyncReport>
where
    F: FnMut(&Path, &SyncOutcome, usize, usize),
{
    let meta = std::fs::metadata(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::NotFound(format!("'{}'", path.display())),
        _ => Error::Io(e),
    })?;

    let mut report = SyncReport::default();

    if !meta.is_dir() {
        let outcome = sync_file(path);
        on_progress(path, &outcome, 1, 1);
        report.record(path.to_path_buf(), outcome);
        return Ok(report);
    }

    let files = list_files(path)?;
    let total = files.len();
    if total == 0 {
        return Ok(report);
    }

    let workers = workers.clamp(1, total);
    let slice_len = total.div_ceil(workers);
    tracing::info!(files = total, workers, dir = %path.display(), "Syncing timestamps");

    let (tx, rx) = crossbeam_channel::unbounded::<(PathBuf, SyncOutcome)>();

    std::thread::scope(|scope| {
        for slice in files.chunks(slice_len) {
            let tx = tx.clone();
            scope.spawn(move || {
                for file in slice {
                    let outcome = sync_file(file);
                    if tx.send((file.clone(), outcome)).is_err() {
                        return;
                    }
                }
            });
        }
        drop(tx);

        let mut done = 0;
        for (file, outcome) in rx {
            done += 1;
            on_progress(&file, &outcome, done, total);
            report.record(file, outcome);
        }
    });

    Ok(report)
}
