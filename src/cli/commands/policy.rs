use clap::{Args, Subcommand};

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_json};
use crate::error::Result;

#[derive(Args, Debug)]
pub struct PolicyArgs {
    #[command(subcommand)]
    pub command: PolicyCommand,
}

#[derive(Subcommand, Debug)]
pub enum PolicyCommand {
    /// Show stored weights and thresholds (defaults if never adapted)
    Show,
}

pub fn run(ctx: &AppContext, args: &PolicyArgs) -> Result<()> {
    match &args.command {
        PolicyCommand::Show => show(ctx),
    }
}

fn show(ctx: &AppContext) -> Result<()> {
    let (weights, weights_version) = ctx.engine.policies().load_weights()?;
    let (thresholds, thresholds_version) = ctx.engine.policies().load_thresholds()?;

    if ctx.json {
        return emit_json(&serde_json::json!({
            "weights": {
                "version": weights_version,
                "values": weights.weights,
                "positive_sum": weights.positive_sum(),
            },
            "thresholds": {
                "version": thresholds_version,
                "values": thresholds.thresholds,
            },
        }));
    }

    let mut layout = HumanLayout::new();
    layout
        .title("Policy")
        .section(&format!("Scoring weights (v{weights_version})"));
    for (name, weight) in &weights.weights {
        layout.kv(name, &format!("{weight:+.4}"));
    }
    layout
        .blank()
        .kv("positive sum", &format!("{:.4}", weights.positive_sum()))
        .blank()
        .section(&format!("Confidence thresholds (v{thresholds_version})"));
    for (decision_type, threshold) in &thresholds.thresholds {
        layout.kv(decision_type, &format!("{threshold:.2}"));
    }
    emit_human(layout);
    Ok(())
}
