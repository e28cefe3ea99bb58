use clap::{Args, Subcommand};

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_json};
use crate::error::Result;

#[derive(Args, Debug)]
pub struct BanditArgs {
    #[command(subcommand)]
    pub command: BanditCommand,
}

#[derive(Subcommand, Debug)]
pub enum BanditCommand {
    /// Show arm counts and posterior summaries
    Stats,

    /// Delete persisted bandit snapshots
    Reset,
}

pub fn run(ctx: &AppContext, args: &BanditArgs) -> Result<()> {
    match &args.command {
        BanditCommand::Stats => stats(ctx),
        BanditCommand::Reset => reset(ctx),
    }
}

fn stats(ctx: &AppContext) -> Result<()> {
    let arms = ctx.engine.beta_summary();
    let linucb_arms = ctx.engine.linucb_arm_count();
    let outcomes = ctx.engine.outcome_count();

    if ctx.json {
        return emit_json(&serde_json::json!({
            "beta_arms": arms,
            "linucb_arms": linucb_arms,
            "outcomes": outcomes,
        }));
    }

    let mut layout = HumanLayout::new();
    layout
        .title("Bandit stats")
        .kv("Beta arms", &arms.len().to_string())
        .kv("LinUCB arms", &linucb_arms.to_string())
        .kv("Outcomes", &outcomes.to_string())
        .blank()
        .section("Posteriors");
    for arm in &arms {
        layout.push_line(format!(
            "{:<24} alpha {:>8.2}  beta {:>8.2}  mean {:.3}",
            arm.id, arm.alpha, arm.beta, arm.mean
        ));
    }
    emit_human(layout);
    Ok(())
}

fn reset(ctx: &AppContext) -> Result<()> {
    let dir = ctx.engine.root().join("bandits");
    for file in ["beta_bandit.json", "linucb_bandit.json"] {
        let path = dir.join(file);
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
    }
    if ctx.json {
        emit_json(&serde_json::json!({ "reset": true }))
    } else {
        println!("Bandit snapshots removed; state restarts fresh next cycle.");
        Ok(())
    }
}
