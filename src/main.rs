use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::PathBuf;

mod cli;

use cli::Cli;
use cli::commands::Commands;
use offloadr::config::{self, OffloadConfig};
use offloadr::scenario::{PlanPreview, Scenario};
use offloadr::stats::RunReport;

fn setup_logging() -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(config::APP_NAME)
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("offloadr.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn run_application(cli: &Cli, config: OffloadConfig) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        None => handle_run_command(config, false, cli.is_verbose()),
        Some(Commands::Run { json, .. }) => handle_run_command(config, *json, cli.is_verbose()),
        Some(Commands::Plan { json, .. }) => handle_plan_command(config, *json),
        Some(Commands::Sweep { json }) => handle_sweep_command(config, *json),
        Some(Commands::Config { .. }) => handle_config_command(&config),
    }
}

fn handle_run_command(config: OffloadConfig, json: bool, verbose: bool) -> Result<()> {
    let scenario = Scenario::new(config).context("Failed to build scenario")?;
    let report = scenario.run().context("Simulation failed")?;
    info!("Run finished: {:?}", report.tasks);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    print_report(&report, verbose);
    Ok(())
}

fn handle_plan_command(config: OffloadConfig, json: bool) -> Result<()> {
    let scenario = Scenario::new(config).context("Failed to build scenario")?;
    let preview = scenario.plan().context("Planning failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&preview)?);
        return Ok(());
    }
    print_plan(&preview);
    Ok(())
}

fn handle_sweep_command(config: OffloadConfig, json: bool) -> Result<()> {
    let scenario = Scenario::new(config).context("Failed to build scenario")?;
    let reports = scenario.sweep().context("Sweep failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    println!(
        "{:>8}  {:<14} {:>9} {:>9} {:>10} {:>10}  {}",
        "deadline", "strategy", "quality", "ratio", "makespan", "limit", "status"
    );
    for report in &reports {
        println!(
            "{:>7}%  {:<14} {:>9.2} {:>9.3} {:>10.3} {:>10.3}  {}",
            report.deadline_percentage,
            report.strategy.as_str(),
            report.total_quality,
            report.quality_ratio(),
            report.makespan,
            report.deadline,
            status_label(report)
        );
    }
    Ok(())
}

fn handle_config_command(config: &OffloadConfig) -> Result<()> {
    print!("{}", serde_yaml::to_string(config)?);
    Ok(())
}

fn status_label(report: &RunReport) -> ColoredString {
    if report.aborted {
        "aborted".red()
    } else if report.deadline_met {
        "met".green()
    } else {
        "missed".yellow()
    }
}

fn print_report(report: &RunReport, verbose: bool) {
    println!("{} {} at {}%", "Strategy:".cyan(), report.strategy, report.deadline_percentage);
    println!("  deadline   {:.3}s", report.deadline);
    if let Some(estimate) = report.estimated_time {
        println!("  estimate   {:.3}s", estimate);
    }
    println!("  makespan   {:.3}s ({})", report.makespan, status_label(report));
    println!(
        "  quality    {:.2} / {:.2} ({:.1}%)",
        report.total_quality,
        report.max_quality,
        report.quality_ratio() * 100.0
    );
    println!(
        "  tasks      {} dispatched, {} completed, {} rejected, {} failed",
        report.tasks.dispatched,
        report.tasks.completed,
        report.tasks.rejected_vm_capacity + report.tasks.rejected_bandwidth,
        report.tasks.failed_bandwidth + report.tasks.failed_mobility
    );
    if report.replans > 0 {
        println!("  replans    {}", report.replans);
    }
    if let Some(reason) = &report.abort_reason {
        println!("{} {}", "Aborted:".red(), reason);
    }
    if verbose {
        for (class, count) in &report.assignments {
            let completed = report.completed_by_class.get(class).copied().unwrap_or(0);
            println!("  {:<6} {} assigned, {} completed", class.to_string(), count, completed);
        }
        println!("  events     {}", report.events_processed);
    }
}

fn print_plan(preview: &PlanPreview) {
    println!("{} {}", "Strategy:".cyan(), preview.strategy);
    println!("  deadline   {:.3}s", preview.deadline);
    if !preview.feasible {
        println!("{}", "No feasible plan within the deadline".red());
        return;
    }
    if let Some(estimate) = preview.estimated_time {
        println!("  estimate   {:.3}s", estimate);
    }
    println!("  quality    {:.2}", preview.total_quality);
    for (position, entry) in preview.entries.iter().enumerate() {
        println!(
            "  {:>4}  group {:<4} variant {:<4} venue {:<4} quality {:.2}",
            position, entry.group, entry.assignment.variant, entry.assignment.venue, entry.quality
        );
    }
}

fn main() -> Result<()> {
    // Setup logging first
    setup_logging().context("Failed to setup logging")?;

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = config::load_config(cli.config.as_ref(), &cli.overrides()).context("Failed to load configuration")?;

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, config).context("Application failed")?;

    Ok(())
}
