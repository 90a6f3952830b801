//! config command - Locate or validate the configuration file

use super::Context;
use crate::core::config::Config;
use crate::ui::output;
use anyhow::Result;

/// Print the configuration path that would be used.
pub fn path(ctx: &Context) -> Result<()> {
    let path = Config::resolve_path(ctx.config.as_deref())?;
    println!("{}", path.display());
    Ok(())
}

/// Load and validate the configuration, then list its jobs.
pub fn check(ctx: &Context) -> Result<()> {
    let config = ctx.load_config()?;
    let verbosity = ctx.verbosity();

    output::print(format!("{}: ok", config.path.display()), verbosity);
    let jobs: Vec<String> = config
        .file
        .jobs
        .iter()
        .map(|job| {
            format!(
                "{}: {} <-> {} ({})",
                job.name, job.origin, job.mirror, job.direction
            )
        })
        .collect();
    output::print(output::format_list(&jobs, "  "), verbosity);

    Ok(())
}
