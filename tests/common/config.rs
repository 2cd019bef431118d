//! Test configurations

use album_dl::Config;
use std::path::Path;
use std::time::Duration;

/// Config writing into `dir`, allowing plain HTTP for the mock server, with no
/// inter-batch pause and millisecond retry delays
pub fn test_config(dir: &Path, concurrency: usize) -> Config {
    let mut config = Config::default();
    config.download.download_dir = dir.to_path_buf();
    config.download.concurrency = concurrency;
    config.download.batch_delay = Duration::ZERO;
    config.download.request_timeout = Duration::from_secs(5);
    config.download.allowed_schemes = vec!["http".to_string(), "https".to_string()];
    config.retry.initial_delay = Duration::from_millis(10);
    config.retry.max_delay = Duration::from_millis(10);
    config
}
