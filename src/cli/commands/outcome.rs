use std::collections::BTreeMap;

use clap::Args;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_json};
use crate::error::{Result, SiftError};
use crate::rewards::{OutcomeReport, OutcomeType};

#[derive(Args, Debug)]
pub struct OutcomeArgs {
    /// Candidate the outcome belongs to
    #[arg(long, short)]
    pub subject: String,

    #[arg(long, value_enum)]
    pub outcome_type: OutcomeType,

    /// Quality/review score on a 0-10 scale
    #[arg(long)]
    pub review_score: Option<f64>,

    #[arg(long, default_value_t = 0)]
    pub compliance_defects: u32,

    /// The required deadline was missed
    #[arg(long)]
    pub deadline_missed: bool,

    /// Signed deviation from the market price reference, in percent
    #[arg(long)]
    pub pricing_deviation: Option<f64>,

    /// Decision type / agent that acted on the candidate
    #[arg(long)]
    pub agent: Option<String>,

    /// A human overrode the automated decision
    #[arg(long)]
    pub human_override: bool,

    /// Named feature observed at decision time, as name=value; repeatable
    #[arg(long = "feature", value_name = "NAME=VALUE")]
    pub features: Vec<String>,
}

pub fn run(ctx: &AppContext, args: &OutcomeArgs) -> Result<()> {
    let mut report = OutcomeReport::new(&args.subject, args.outcome_type);
    report.review_score = args.review_score;
    report.compliance_defects = args.compliance_defects;
    if args.deadline_missed {
        report.deadline_met = Some(false);
    }
    report.pricing_deviation_pct = args.pricing_deviation;
    report.decision_agent = args.agent.clone();
    report.human_override = args.human_override;
    report.context_features = parse_features(&args.features)?;

    let recorded = ctx.engine.record_outcome(&report);
    ctx.engine.persist()?;

    if ctx.json {
        emit_json(&recorded)
    } else {
        let mut layout = HumanLayout::new();
        layout
            .title("Outcome recorded")
            .kv("Subject", &args.subject)
            .kv("Record", &recorded.record_id)
            .kv("Reward", &format!("{:.2}", recorded.reward))
            .kv("Persisted", &recorded.persisted.to_string());
        emit_human(layout);
        Ok(())
    }
}

fn parse_features(raw: &[String]) -> Result<BTreeMap<String, f64>> {
    let mut features = BTreeMap::new();
    for entry in raw {
        let (name, value) = entry.split_once('=').ok_or_else(|| {
            SiftError::InvalidInput(format!("feature '{entry}' is not NAME=VALUE"))
        })?;
        let value: f64 = value.parse().map_err(|_| {
            SiftError::InvalidInput(format!("feature '{name}' has non-numeric value '{value}'"))
        })?;
        features.insert(name.trim().to_string(), value);
    }
    Ok(features)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_name_value_pairs() {
        let raw = vec!["naics_match=1.0".to_string(), " risk_penalty =0.5".to_string()];
        let features = parse_features(&raw).unwrap();
        assert!((features["naics_match"] - 1.0).abs() < 1e-12);
        assert!((features["risk_penalty"] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn rejects_malformed_pairs() {
        assert!(parse_features(&["naics_match".to_string()]).is_err());
        assert!(parse_features(&["naics_match=abc".to_string()]).is_err());
    }
}
