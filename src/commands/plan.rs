//! `plan` - preview a reconciliation without pushing anything

use anyhow::{Context as AnyhowContext, Result};
use converge::{ConvergenceMode, FactsProvider, Resource, report, reconcile};

use crate::Context;
use crate::cli::PlanArgs;
use crate::config::{JsonFileFacts, load_desired};
use crate::resource;

use super::{print_commands, print_result};

pub fn run(ctx: &Context, args: PlanArgs) -> Result<()> {
    let target = args.target;
    let resource = resource::find(&target.resource)?;
    let desired = load_desired(target.config.as_deref())?;
    let current = match &target.facts {
        Some(path) => JsonFileFacts::load(path)?.facts(resource.name())?,
        None => serde_json::Value::Null,
    };
    let mode = ConvergenceMode::from(target.state);

    let mut result = reconcile(resource.as_ref(), &desired, &current, mode)
        .with_context(|| format!("Could not reconcile {}", resource.name()))?;
    if target.diff && result.changed {
        result.diff = Some(report::unified_diff(&result.before, &result.after));
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    print_result(&result);
    if result.changed && !ctx.quiet {
        println!();
        print_commands(&result);
    }
    Ok(())
}
