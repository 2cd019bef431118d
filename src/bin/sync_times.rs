//! Set file timestamps from `YYYYMMDD-HHMMSS-ID.ext` names
//!
//! ```text
//! sync-times <path>
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use album_dl::progress::create_progress_bar;
use album_dl::{Config, SyncOutcome, SyncReport, logging, sync_path};
use anyhow::{Context, Result};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about = "Set file times to the capture time encoded in the file name")]
struct Cli {
    /// A downloaded file, or a directory of them (not recursive)
    path: PathBuf,

    /// Number of worker threads (default: one per CPU)
    #[arg(long)]
    workers: Option<usize>,

    /// Optional path to a JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

fn run(cli: &Cli) -> Result<SyncReport> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(workers) = cli.workers {
        config.sync.workers = workers;
    }

    let pb = create_progress_bar(0, &format!("Syncing {}", cli.path.display()));
    let report = sync_path(&cli.path, config.sync.effective_workers(), |path, outcome, done, total| {
        pb.set_length(total as u64);
        pb.set_position(done as u64);
        if let SyncOutcome::Failed(reason) = outcome {
            pb.suspend(|| tracing::warn!(path = %path.display(), reason = %reason, "Timestamp sync failed"));
        }
    });
    pb.finish_and_clear();

    Ok(report?)
}

fn print_report(report: &SyncReport) {
    println!(
        "{} files: {} updated, {} skipped, {} failed",
        report.total(),
        report.updated,
        report.skipped.len(),
        report.failed.len()
    );
    if !report.skipped.is_empty() {
        println!("Skipped:");
        for (path, reason) in &report.skipped {
            println!("  {}: {}", path.display(), reason);
        }
    }
    if !report.failed.is_empty() {
        println!("Failed:");
        for (path, reason) in &report.failed {
            println!("  {}: {}", path.display(), reason);
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match run(&cli) {
        Ok(report) => {
            print_report(&report);
            if report.failed.is_empty() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
