//! Command-line harvest runner.
//!
//! Runs one harvest to completion, streaming progress through tracing, and
//! prints the product document set as JSON on stdout. Ctrl-C requests
//! cooperative cancellation; whatever was harvested so far is still
//! printed.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use catalog_harvester::application::{HarvestService, ProgressChannel, ProgressSink};
use catalog_harvester::infrastructure::{HarvesterConfig, init_logging_with_config};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("harvest failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let (url, config_path) = parse_args()?;

    let config = HarvesterConfig::load_layered(config_path.as_deref())?;
    init_logging_with_config(&config.logging)?;

    let token = CancellationToken::new();
    let interrupt = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing in-flight pages before stopping");
            interrupt.cancel();
        }
    });

    let sink: ProgressSink = Arc::new(|update| {
        info!("[{:>3}%] {}", update.percent, update.stage);
    });
    let progress = ProgressChannel::new(Some(sink), token);

    let service = HarvestService::new(config);
    let outcome = service.harvest(&url, &progress).await?;

    info!(
        "Harvest finished: {} products ({} found, {} enriched)",
        outcome.summary.unique, outcome.summary.total_found, outcome.summary.enriched
    );

    let document = outcome.to_document(&Uuid::new_v4().to_string(), &url, Utc::now());
    let rendered =
        serde_json::to_string_pretty(&document).context("Failed to serialize the harvest document")?;
    println!("{rendered}");
    Ok(())
}

fn parse_args() -> Result<(String, Option<PathBuf>)> {
    let mut url = None;
    let mut config_path = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let path = args.next().context("--config requires a path")?;
                config_path = Some(PathBuf::from(path));
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            _ if arg.starts_with('-') => bail!("unknown flag: {arg}"),
            _ => {
                if url.is_some() {
                    bail!("exactly one seed URL is expected");
                }
                url = Some(arg);
            }
        }
    }

    let Some(url) = url else {
        print_usage();
        bail!("a seed URL is required");
    };
    Ok((url, config_path))
}

fn print_usage() {
    eprintln!("Usage: harvest <seed-url> [--config <path>]");
    eprintln!();
    eprintln!("Runs one catalog harvest and prints the product document set as JSON.");
    eprintln!("Settings may be overridden per run with HARVESTER_-prefixed");
    eprintln!("environment variables, e.g. HARVESTER_CRAWL__MAX_TOTAL_PAGES=10.");
}
