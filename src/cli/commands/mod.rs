pub mod adapt;
pub mod bandit;
pub mod completions;
pub mod outcome;
pub mod policy;
pub mod select;

use crate::app::AppContext;
use crate::cli::Commands;
use crate::error::Result;

pub fn run(ctx: &AppContext, command: &Commands) -> Result<()> {
    match command {
        Commands::Select(args) => select::run(ctx, args),
        Commands::Outcome(args) => outcome::run(ctx, args),
        Commands::Adapt(args) => adapt::run(ctx, args),
        Commands::Policy(args) => policy::run(ctx, args),
        Commands::Bandit(args) => bandit::run(ctx, args),
        Commands::Completions(args) => completions::run(args),
    }
}
