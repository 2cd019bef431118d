//! Download every image referenced by a report export
//!
//! ```text
//! downloader <jsonReportPath> [downloadDirectory]
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use album_dl::progress::{format_bytes, format_elapsed, format_rate};
use album_dl::{
    BatchScheduler, Config, DownloadOutcome, Event, HttpFetcher, RunSummary, extract_work_items,
    load_report, logging,
};
use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser};
use tokio::sync::broadcast;

#[derive(Parser, Debug)]
#[command(author, version, about = "Download the images attached to a report export")]
struct Cli {
    /// Report JSON saved from the service
    report: PathBuf,

    /// Destination directory (overrides the config file)
    download_dir: Option<PathBuf>,

    /// Optional path to a JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Items fetched concurrently per batch (overrides the config file)
    #[arg(short, long)]
    concurrency: Option<usize>,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(dir) = &cli.download_dir {
        config.download.download_dir = dir.clone();
    }
    if let Some(concurrency) = cli.concurrency {
        config.download.concurrency = concurrency;
    }
    config.validate()?;
    Ok(config)
}

/// Print one line per finished batch until the scheduler goes away
async fn print_progress(mut events: broadcast::Receiver<Event>) {
    let mut batches = 0;
    loop {
        match events.recv().await {
            Ok(Event::BatchStarted { batches: n, .. }) => batches = n,
            Ok(Event::ItemFinished { item, outcome: DownloadOutcome::Failed(e) }) => {
                println!("  failed   {} ({})", item.filename, e);
            }
            Ok(Event::BatchCompleted { index, processed, total, percent }) => {
                println!(
                    "[batch {}/{}] {}/{} items ({:.1}%)",
                    index + 1,
                    batches,
                    processed,
                    total,
                    percent
                );
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "Progress printer lagged behind");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!("Download summary");
    println!("  total:      {}", summary.total);
    println!("  downloaded: {}", summary.downloaded);
    println!("  skipped:    {}", summary.skipped);
    println!("  failed:     {}", summary.failed);
    println!("  received:   {}", format_bytes(summary.bytes));
    println!("  elapsed:    {}", format_elapsed(summary.elapsed));
    println!(
        "  throughput: {} ({:.1} items/s)",
        format_rate(summary.throughput_bps()),
        summary.items_per_sec()
    );
}

async fn run(cli: &Cli) -> Result<RunSummary> {
    if !cli.report.is_file() {
        eprintln!("{}", Cli::command().render_usage());
        bail!("report file '{}' not found", cli.report.display());
    }

    let config = load_config(cli)?;
    let report = load_report(&cli.report)?;
    let items = extract_work_items(&report);

    let fetcher = Arc::new(HttpFetcher::new(&config).context("building HTTP client")?);
    let scheduler = BatchScheduler::new(fetcher, &config.download);
    println!(
        "{} images in {} records -> {}",
        items.len(),
        report.results.len(),
        scheduler.download_dir().display()
    );
    let printer = tokio::spawn(print_progress(scheduler.subscribe()));

    let result = scheduler.run(items).await;
    drop(scheduler);
    printer.await.ok();

    Ok(result?)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let start = Instant::now();
    match run(&cli).await {
        Ok(summary) => {
            print_summary(&summary);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!();
            eprintln!("Download aborted after {}", format_elapsed(start.elapsed()));
            eprintln!("  error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
