//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - run: simulate one scenario and report
//! - plan: show the plan without simulating
//! - sweep: run every strategy across the deadline grid
//! - config: print the effective configuration

use clap::{Args, Parser, Subcommand};
use offloadr::config::ConfigOverrides;
use offloadr::scheduler::{InfeasibilityPolicy, Strategy};
use std::path::PathBuf;

/// offloadr - deadline-aware task offloading planner and simulator
#[derive(Parser, Debug)]
#[command(name = "offloadr")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute; defaults to `run`
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Overrides carried by the subcommand, if any
    pub fn overrides(&self) -> ConfigOverrides {
        match &self.command {
            Some(Commands::Run { scheduler, .. }) | Some(Commands::Plan { scheduler, .. }) => scheduler.to_overrides(),
            Some(Commands::Config { scheduler }) => scheduler.to_overrides(),
            Some(Commands::Sweep { .. }) | None => ConfigOverrides::default(),
        }
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Simulate the scenario and print the run report
    Run {
        #[command(flatten)]
        scheduler: SchedulerArgs,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Plan the scenario without simulating it
    Plan {
        #[command(flatten)]
        scheduler: SchedulerArgs,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run every configured strategy at every configured deadline percentage
    Sweep {
        /// Print the reports as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration as YAML
    Config {
        #[command(flatten)]
        scheduler: SchedulerArgs,
    },
}

/// Scheduler flags overriding the config file
#[derive(Args, Debug, Clone, Default)]
pub struct SchedulerArgs {
    /// Planning strategy (adaptive, greedy, value-density, minimal, only-local, only-edge, only-cloud, random)
    #[arg(short, long)]
    pub strategy: Option<Strategy>,

    /// Deadline as a percentage of the all-local runtime
    #[arg(short, long)]
    pub deadline_percentage: Option<f64>,

    /// Ticks per second of the planning grid
    #[arg(short, long)]
    pub precision: Option<u32>,

    /// Infeasibility policy (no, minimal, keep)
    #[arg(long)]
    pub on_infeasible: Option<InfeasibilityPolicy>,

    /// Replan when active client counts change
    #[arg(long)]
    pub reoptimize: bool,

    /// Seed for the random strategy and the arrival process
    #[arg(long)]
    pub seed: Option<u64>,
}

impl SchedulerArgs {
    pub fn to_overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            strategy: self.strategy,
            deadline_percentage: self.deadline_percentage,
            precision: self.precision,
            on_infeasible: self.on_infeasible,
            reoptimize: self.reoptimize.then_some(true),
            seed: self.seed,
        }
    }
}
