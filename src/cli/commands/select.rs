use std::io::Read;
use std::path::{Path, PathBuf};

use clap::Args;

use crate::app::AppContext;
use crate::bandit::Candidate;
use crate::cli::output::{HumanLayout, emit_human, emit_json};
use crate::error::{Result, SiftError};

#[derive(Args, Debug)]
pub struct SelectArgs {
    /// JSON file holding the candidate pool ("-" reads stdin)
    #[arg(long, short)]
    pub input: PathBuf,

    /// Size of the selected subset
    #[arg(long, short = 'k', default_value_t = 5)]
    pub top_k: usize,

    /// Prefer context-aware LinUCB scoring when feature vectors exist
    #[arg(long)]
    pub contextual: bool,
}

pub fn run(ctx: &AppContext, args: &SelectArgs) -> Result<()> {
    let pool = read_pool(&args.input)?;
    let (picked, path) = ctx.engine.select(&pool, args.top_k, args.contextual);
    ctx.engine.persist()?;

    if ctx.json {
        emit_json(&serde_json::json!({
            "path": format!("{path:?}"),
            "pool": pool.len(),
            "selected": picked,
        }))
    } else {
        let mut layout = HumanLayout::new();
        layout
            .title("Selection")
            .kv("Pool", &pool.len().to_string())
            .kv("Strategy", &format!("{path:?}"))
            .blank()
            .section("Selected");
        for (rank, sel) in picked.iter().enumerate() {
            layout.push_line(format!("{:>3}. {}  ({:.4})", rank + 1, sel.id, sel.score));
        }
        emit_human(layout);
        Ok(())
    }
}

fn read_pool(input: &Path) -> Result<Vec<Candidate>> {
    let raw = if input.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(input)?
    };
    let pool: Vec<Candidate> = serde_json::from_str(&raw)?;
    if pool.is_empty() {
        return Err(SiftError::InvalidInput("candidate pool is empty".to_string()));
    }
    Ok(pool)
}
