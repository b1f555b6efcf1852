//! # NBA Video Downloader
//!
//! Finds yesterday's NBA replays for a set of tracked teams on a replay
//! listing site and saves every quarter into dated, team-named directories
//! through the external `you-get` tool.
//!
//! ## Usage
//!
//! ```sh
//! nba_video_downloader -c nba.yaml
//! nba_video_downloader tidy
//! ```
//!
//! ## Architecture
//!
//! A run is a strictly sequential pipeline:
//! 1. **Discover**: fetch the script-rendered listing page and parse match entries
//! 2. **Filter**: keep entries for the target date that mention a tracked team
//! 3. **Resolve**: fetch each match's detail page and rank its video links
//! 4. **Download**: name each link's file and hand it to `you-get` with retries
//! 5. **Summarize**: log totals and write a JSON run report
//!
//! The `tidy` subcommand sort-prefixes match directories and prunes old ones.

use clap::Parser;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing::{error, info, instrument};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod cli;
mod config;
mod downloader;
mod error;
mod fetch;
mod matching;
mod models;
mod naming;
mod outputs;
mod pipeline;
mod scrapers;
mod tidy;
mod utils;

use cli::{Cli, Command};
use config::Config;
use downloader::YouGet;
use fetch::Fetcher;
use matching::DateMatcher;
use outputs::json;
use pipeline::Pipeline;
use utils::ensure_writable_dir;

type BoxError = Box<dyn std::error::Error>;

fn init_tracing(log_file: Option<&Path>) -> Result<(), BoxError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                tfmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_timer(UtcTime::rfc_3339())
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tfmt::layer()
                .with_target(true)
                .with_file(false)
                .with_line_number(false)
                .with_timer(UtcTime::rfc_3339()),
        )
        .with(file_layer)
        .init();
    Ok(())
}

#[instrument(level = "info", skip_all)]
async fn run(config: &Config, dates: DateMatcher) -> Result<(), BoxError> {
    let fetcher = Fetcher::from_config(config)?;
    let pipeline = Pipeline::new(config, &fetcher, YouGet::from_config(config), dates);

    let summary = match pipeline.run().await {
        Ok(summary) => summary,
        Err(e) => {
            error!(error = %e, "Run aborted");
            return Err(e.into());
        }
    };

    if config.write_report {
        if let Err(e) = json::write_report(&summary, &config.download_root).await {
            error!(error = %e, "Failed to write run report");
        }
    }

    if config.tidy_after_run {
        if let Err(e) = tidy::tidy(
            &config.download_root,
            Some(dates.target()),
            config.max_kept_directories,
        )
        .await
        {
            error!(error = %e, "Tidy after run failed");
        }
    }

    info!(
        eligible = summary.eligible,
        successful = summary.successful,
        failed = summary.eligible - summary.successful,
        "Matches processed"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let args = Cli::parse();
    init_tracing(args.log_file.as_deref())?;

    let start_time = std::time::Instant::now();
    info!("nba_video_downloader starting up");

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    args.apply(&mut config);
    config.validate()?;
    let dates = DateMatcher::from_now(config.days_to_look_back)?;

    if let Err(e) = ensure_writable_dir(&config.download_root).await {
        error!(
            path = %config.download_root.display(),
            error = %e,
            "Download root is not writable (fix perms or choose a different path)"
        );
        return Err(e.into());
    }

    match args.command.clone().unwrap_or(Command::Run) {
        Command::Run => run(&config, dates).await?,
        Command::Tidy { all } => {
            let only = (!all).then(|| dates.target());
            tidy::tidy(&config.download_root, only, config.max_kept_directories).await?;
        }
    }

    let elapsed = start_time.elapsed();
    info!(?elapsed, secs = elapsed.as_secs(), "Execution complete");
    Ok(())
}
