//! Configuration types for album-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Download behavior configuration (directory, batch width, size and time limits)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Download directory (default: "downloads")
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Number of items fetched concurrently within one batch (default: 10)
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Pause between consecutive batches, in seconds (default: 1)
    #[serde(default = "default_batch_delay", with = "duration_serde")]
    pub batch_delay: Duration,

    /// Minimum size in bytes for a file to count as valid (default: 100)
    ///
    /// Used both for the skip-if-exists check and for rejecting tiny responses.
    #[serde(default = "default_min_file_size")]
    pub min_file_size: u64,

    /// Lifetime budget of a single request attempt, in seconds (default: 30)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// URL schemes a source is allowed to use (default: ["https"])
    #[serde(default = "default_allowed_schemes")]
    pub allowed_schemes: Vec<String>,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            concurrency: default_concurrency(),
            batch_delay: default_batch_delay(),
            min_file_size: default_min_file_size(),
            request_timeout: default_request_timeout(),
            allowed_schemes: default_allowed_schemes(),
            user_agent: default_user_agent(),
        }
    }
}

/// Retry configuration for transient failures
///
/// The defaults reproduce a fixed-delay policy: three extra attempts, two seconds apart.
/// Raising `backoff_multiplier` above 1.0 turns it into exponential backoff capped at
/// `max_delay`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first try (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry, in seconds (default: 2)
    #[serde(default = "default_retry_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries, in seconds (default: 2)
    #[serde(default = "default_retry_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier applied to the delay after each retry (default: 1.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: false)
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_retry_delay(),
            max_delay: default_retry_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: false,
        }
    }
}

/// Upstream API settings used by the URL builders
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the reporting service (default: "https://www.kidsnote.com")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// `page_size` query parameter appended to list endpoints (default: 9999)
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            page_size: default_page_size(),
        }
    }
}

/// Timestamp sync settings
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Worker threads; 0 means one per available CPU (default: 0)
    #[serde(default)]
    pub workers: usize,
}

impl SyncConfig {
    /// Effective worker count after resolving the "0 = all CPUs" convention
    pub fn effective_workers(&self) -> usize {
        if self.workers == 0 {
            num_cpus::get().max(1)
        } else {
            self.workers
        }
    }
}

/// Main configuration
///
/// Every section has serde defaults, so an empty JSON object `{}` is a valid config.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Download behavior settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// Retry policy for transport failures
    #[serde(default)]
    pub retry: RetryConfig,

    /// Upstream API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Timestamp sync settings
    #[serde(default)]
    pub sync: SyncConfig,
}

impl Config {
    /// Load configuration from a JSON file and validate it
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read config file '{}': {}", path.display(), e),
            key: None,
        })?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check settings that would make a run meaningless
    pub fn validate(&self) -> Result<()> {
        if self.download.concurrency == 0 {
            return Err(Error::Config {
                message: "concurrency must be at least 1".to_string(),
                key: Some("concurrency".to_string()),
            });
        }
        if self.download.allowed_schemes.is_empty() {
            return Err(Error::Config {
                message: "at least one URL scheme must be allowed".to_string(),
                key: Some("allowed_schemes".to_string()),
            });
        }
        if self.download.request_timeout.is_zero() {
            return Err(Error::Config {
                message: "request timeout must be greater than zero".to_string(),
                key: Some("request_timeout".to_string()),
            });
        }
        if self.retry.backoff_multiplier < 1.0 {
            return Err(Error::Config {
                message: "backoff multiplier must be >= 1.0".to_string(),
                key: Some("backoff_multiplier".to_string()),
            });
        }
        Ok(())
    }

    /// Download directory
    pub fn download_dir(&self) -> &PathBuf {
        &self.download.download_dir
    }
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_concurrency() -> usize {
    10
}

fn default_batch_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_min_file_size() -> u64 {
    100
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_allowed_schemes() -> Vec<String> {
    vec!["https".to_string()]
}

fn default_user_agent() -> String {
    format!("album-dl/{}", env!("CARGO_PKG_VERSION"))
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay() -> Duration {
    Duration::from_secs(2)
}

fn default_backoff_multiplier() -> f64 {
    1.0
}

fn default_base_url() -> String {
    "https://www.kidsnote.com".to_string()
}

fn default_page_size() -> u32 {
    9999
}

// Durations are written as (fractional) seconds
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(D::Error::custom)
    }
}
