//! StressPulse CLI entry point

use anyhow::Result;
use clap::CommandFactory;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use stresspulse::config::cli::Cli;
use stresspulse::config::{toml::load_config, validator::warn_config, BenchmarkConfig};
use stresspulse::coordinator::Coordinator;
use stresspulse::output::text::{print_configuration, print_results};
use stresspulse::stats::live::LiveMonitor;
use stresspulse::stats::{ProgressBoard, RunReport};
use stresspulse::util::verification::verify_files;

fn main() -> Result<()> {
    let cli = Cli::parse_args();

    let llv = if cli.debug {
        simplelog::LevelFilter::Debug
    } else {
        simplelog::LevelFilter::Info
    };
    let mut lcfg = simplelog::ConfigBuilder::new();
    lcfg.set_time_level(simplelog::LevelFilter::Error)
        .set_location_level(simplelog::LevelFilter::Off)
        .set_target_level(simplelog::LevelFilter::Off)
        .set_thread_level(simplelog::LevelFilter::Off);
    simplelog::TermLogger::init(
        llv,
        lcfg.build(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    )?;

    if let Err(e) = cli.validate() {
        usage_error(&e);
    }

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => usage_error(&e),
    };
    log::debug!("configuration: {}", config);

    warn_config(&config);
    print_configuration(&config);

    if cli.dry_run {
        println!("Dry run mode - configuration validated successfully");
        return Ok(());
    }

    let report = execute(&config, cli.live_interval)?;
    print_results(&report);

    if cli.verify && !verify_written_files(&config, &report)? {
        process::exit(1);
    }

    Ok(())
}

/// Report a configuration problem with usage guidance and exit 1
fn usage_error(err: &anyhow::Error) -> ! {
    eprintln!("Error: {:#}", err);
    eprintln!();
    eprintln!("{}", Cli::command().render_usage());
    eprintln!("Run with --help for details and examples.");
    process::exit(1);
}

/// Run the benchmark, with a live progress line if requested
fn execute(config: &BenchmarkConfig, live_interval: Option<u64>) -> Result<RunReport> {
    let mut coordinator = Coordinator::new(Arc::new(config.clone()));

    let Some(secs) = live_interval else {
        return coordinator.run();
    };

    let board = Arc::new(ProgressBoard::new(config.workers()));
    let monitor = LiveMonitor::spawn(
        board.clone(),
        Duration::from_secs(secs),
        config.total_units(),
    );
    coordinator = coordinator.with_progress(board);
    let report = coordinator.run();
    monitor.stop();
    report
}

/// Check every written scratch file; returns false on any mismatch
fn verify_written_files(config: &BenchmarkConfig, report: &RunReport) -> Result<bool> {
    let files = report.written_files(config);
    if files.is_empty() {
        println!("Verification: no files were written");
        return Ok(true);
    }

    let results = verify_files(&files, config.payload_bytes())?;
    let failures: Vec<_> = results.iter().filter(|(_, r)| !r.is_success()).collect();

    for (path, result) in &failures {
        log::error!("verification failed for {}: {:?}", path.display(), result);
    }
    println!(
        "Verification: {} of {} files OK",
        results.len() - failures.len(),
        results.len()
    );

    Ok(failures.is_empty())
}
