//! plan command - Show what a run would change

use super::Context;
use crate::git::SystemRunner;
use crate::sync::{JobPlan, Orchestrator};
use crate::ui::output;
use anyhow::Result;

/// Classify every selected job against the live remotes and print the result.
pub fn plan(ctx: &Context, job: Option<&str>, json: bool) -> Result<()> {
    let config = ctx.load_config()?;
    ctx.init_logging(None);

    let orchestrator = Orchestrator::new(SystemRunner);
    let plans = config
        .select_jobs(job)?
        .into_iter()
        .map(|job| orchestrator.plan_job(job))
        .collect::<Result<Vec<JobPlan>, _>>()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plans)?);
    } else {
        let text: Vec<String> = plans.iter().map(output::format_job_plan).collect();
        output::print(text.join("\n"), ctx.verbosity());
    }

    Ok(())
}
