// src/main.rs

use anyhow::Context;
use clap::Parser;
use log::LevelFilter;
use log4rs::{
    append::console::ConsoleAppender,
    append::file::FileAppender,
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
    Config,
};
use std::fs;
use std::path::Path;
use std::time::Duration;
use xunblock::analytics::log_banner;
use xunblock::pacing::{format_wait, remaining_wait};
use xunblock::{
    AppError, CheckpointStore, CommandLineInput, JobConfig, JobOptions, JobOutcome, JobReport,
    SystemTimekeeper, Timekeeper, UnblockJob, XHttpClient,
};

/// Sets up logging configuration.
fn setup_logging(verbose: bool) -> anyhow::Result<()> {
    let log_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let log_file_path = std::env::temp_dir().join("xunblock.log");
    if let Some(parent) = log_file_path.parent() {
        fs::create_dir_all(parent)?;
    }

    // Waits run for hours, so the console always shows when a line was written
    let pattern = if verbose {
        "{d(%Y-%m-%d %H:%M:%S)} [{l}] - {m}{n}"
    } else {
        "{d(%Y-%m-%d %H:%M:%S)} {m}{n}"
    };

    let stdout_appender = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(pattern)))
        .build();

    let file_appender = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} [{l}] {t} - {m}{n}",
        )))
        .build(&log_file_path)?;

    let config = Config::builder()
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(log_level)))
                .build("stdout", Box::new(stdout_appender)),
        )
        .appender(Appender::builder().build("file", Box::new(file_appender)))
        .build(
            Root::builder()
                .appender("stdout")
                .appender("file")
                .build(LevelFilter::Debug),
        )?;

    log4rs::init_config(config)?;
    log::debug!("Logging initialized. Log file: {}", log_file_path.display());
    Ok(())
}

/// Prints saved progress without touching the network.
async fn show_status(checkpoint_path: &Path, interval: Duration) -> Result<(), AppError> {
    let store = CheckpointStore::new(checkpoint_path);
    let Some(checkpoint) = store.try_load().await? else {
        println!("No saved progress at {}", checkpoint_path.display());
        return Ok(());
    };

    println!("Progress file: {}", checkpoint_path.display());
    println!("Processed users: {}", checkpoint.processed_count());
    match checkpoint.cursor() {
        Some(cursor) => println!("Saved list position: {}", cursor),
        None => println!("Saved list position: start of list"),
    }
    match checkpoint.last_request() {
        Some(last) => {
            println!("Last request: {}", last.format("%Y-%m-%d %H:%M:%S UTC"));
            let wait = remaining_wait(Some(last), SystemTimekeeper.now(), interval);
            if wait.is_zero() {
                println!("Next request allowed: now");
            } else {
                println!("Next request allowed in {}", format_wait(wait));
            }
        }
        None => println!("Last request: never"),
    }
    Ok(())
}

/// Runs the unblock job to completion.
async fn execute_job(config: &JobConfig) -> Result<JobReport, AppError> {
    let client = XHttpClient::new(config.credentials.clone(), config.api_base_url.clone())?;
    let clock = SystemTimekeeper;
    let store = CheckpointStore::new(&config.checkpoint_path);
    let job = UnblockJob::new(&client, &clock, store, JobOptions::from(config));
    job.run().await
}

fn report_completion(config: &JobConfig, report: &JobReport) {
    if config.dry_run {
        println!(
            "Dry run finished: {} users would be unblocked ({} already processed).",
            report.would_unblock, report.skipped
        );
        return;
    }

    match report.outcome {
        JobOutcome::Drained => println!(
            "✓ Block list is empty. Unblocked {} users this run.",
            report.unblocked
        ),
        JobOutcome::LimitReached => println!(
            "✓ Stopped after {} unblocks. Run again to continue from {}.",
            report.unblocked,
            config.checkpoint_path.display()
        ),
    }
    if report.retries > 0 {
        println!("  Recovered from {} errors along the way.", report.retries);
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = CommandLineInput::parse();

    setup_logging(cli.verbose).context("Failed to initialize logging")?;

    if cli.status {
        show_status(&cli.checkpoint, Duration::from_secs(cli.request_interval))
            .await
            .with_context(|| format!("Failed to read {}", cli.checkpoint.display()))?;
        return Ok(());
    }

    log_banner(Duration::from_secs(cli.request_interval));

    let config = match JobConfig::resolve(cli) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };

    let report = execute_job(&config)
        .await
        .context("Unblock run stopped")?;
    report_completion(&config, &report);

    Ok(())
}
