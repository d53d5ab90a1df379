//! CLI entry point for room-export.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use room_export::api::{ApiClient, ApiConfig, RetryBudget};
use room_export::export::{ExportOptions, RunOptions, parse_time_bound, run};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    // Bounds are validated before any network call.
    let after = args.after.as_deref().map(parse_time_bound).transpose()?;
    let before = args
        .before
        .as_deref()
        .map(|value| parse_time_bound(value).map(|_| value.trim().to_string()))
        .transpose()?;

    let mut budget = RetryBudget::unbounded();
    if let Some(max_retries) = args.max_retries {
        budget = budget.with_max_attempts(max_retries);
    }
    if let Some(secs) = args.max_rate_limit_wait {
        budget = budget.with_max_wait(Duration::from_secs(secs));
    }

    let config = ApiConfig::from_env()?.with_retry_budget(budget);
    let cancel = CancellationToken::new();
    let client = ApiClient::new(config)
        .context("failed to initialize API client")?
        .with_cancellation(cancel.clone());

    // First Ctrl-C stops the run and closes open documents; a second one exits at once.
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping (press Ctrl-C again to quit immediately)");
            cancel.cancel();
        }
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });

    let options = RunOptions {
        output_dir: args.output,
        max_rooms: args.rooms,
        room_file: args.room_file,
        rooms_only: args.only_rooms,
        export: ExportOptions {
            page_size: args.page_size,
            after,
            before,
            download_files: !args.no_files,
        },
    };

    info!("room-export starting");
    let summary = run(&client, &options).await?;

    info!(
        rooms = summary.rooms,
        exported = summary.rooms_exported,
        skipped = summary.rooms_skipped,
        failed = summary.rooms_failed,
        messages = summary.messages_written,
        messages_skipped = summary.messages_skipped,
        files = summary.files_downloaded,
        files_failed = summary.files_failed,
        "export complete"
    );

    Ok(())
}
