use clap::Args;

use crate::app::AppContext;
use crate::cli::output::emit_json;
use crate::error::Result;

#[derive(Args, Debug, Default)]
pub struct AdaptArgs {}

pub fn run(ctx: &AppContext, _args: &AdaptArgs) -> Result<()> {
    let report = ctx.engine.adapt()?;

    if ctx.json {
        emit_json(&report)
    } else {
        println!("{}", report.summary());
        Ok(())
    }
}
