//! Print the report and album endpoints for an account
//!
//! ```text
//! report-urls <info.json> [--center <center.json>] [--open]
//! ```
//!
//! Open the printed URLs in a logged-in browser and save each response as JSON; the
//! saved report files are the input of `downloader`.

use std::path::PathBuf;
use std::process::ExitCode;

use album_dl::endpoints::{
    CenterDocument, InfoDocument, center_ids, center_urls, enrollment_album_urls,
    open_in_browser, report_urls,
};
use album_dl::{Config, logging};
use anyhow::{Context, Result};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about = "Build report and album URLs from saved account documents")]
struct Cli {
    /// Account info document (lists children and enrollments)
    info: PathBuf,

    /// Center document; prints one album URL per class of that center
    #[arg(long)]
    center: Option<PathBuf>,

    /// Open every printed URL in the system browser
    #[arg(long)]
    open: bool,

    /// Service base URL (overrides the config file)
    #[arg(long)]
    base_url: Option<String>,

    /// Optional path to a JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

fn print_section(title: &str, urls: &[String]) {
    if urls.is_empty() {
        return;
    }
    println!("{}:", title);
    for url in urls {
        println!("  {}", url);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(base_url) = &cli.base_url {
        config.api.base_url = base_url.clone();
    }

    let info = InfoDocument::load(&cli.info)
        .with_context(|| format!("reading info document {}", cli.info.display()))?;

    let ids: Vec<String> = center_ids(&info).iter().map(u64::to_string).collect();
    println!("Centers: {}", if ids.is_empty() { "-".to_string() } else { ids.join(", ") });

    let mut urls = report_urls(&config.api, &info);
    print_section("Reports", &urls);

    let albums = enrollment_album_urls(&config.api, &info);
    print_section("Class albums", &albums);
    urls.extend(albums);

    if let Some(path) = &cli.center {
        let center = CenterDocument::load(path)
            .with_context(|| format!("reading center document {}", path.display()))?;
        let classes = center_urls(&config.api, &center);
        print_section(&format!("Center {} albums", center.id), &classes);
        for url in classes {
            if !urls.contains(&url) {
                urls.push(url);
            }
        }
    }

    if cli.open {
        for url in &urls {
            open_in_browser(url).with_context(|| format!("opening {}", url))?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
