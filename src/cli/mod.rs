pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "sift",
    version,
    about = "Online-learning candidate selection: pick a daily top-K, learn from outcomes"
)]
pub struct Cli {
    /// Path to a config file (overrides discovery)
    #[arg(long, global = true, env = "SIFT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Machine-readable JSON output
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress logging entirely
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Select the top-K candidates from a scored pool
    Select(commands::select::SelectArgs),

    /// Record an observed outcome and fold it into bandit state
    Outcome(commands::outcome::OutcomeArgs),

    /// Run one policy-adaptation cycle over recent outcomes
    Adapt(commands::adapt::AdaptArgs),

    /// Inspect stored policy weights and confidence thresholds
    Policy(commands::policy::PolicyArgs),

    /// Inspect or reset bandit state
    Bandit(commands::bandit::BanditArgs),

    /// Generate shell completions
    Completions(commands::completions::CompletionsArgs),
}
