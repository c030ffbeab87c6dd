//! `apply` - converge one resource and push its commands

use anyhow::{Context as AnyhowContext, Result};
use colored::Colorize;
use converge::{
    ApplyContext, ConvergenceMode, FactsProvider, Resource, StaticFacts, converge, reconcile,
    report,
};

use crate::Context;
use crate::cli::ApplyArgs;
use crate::config::{JsonFileFacts, load_desired};
use crate::resource;
use crate::sink;
use crate::ui::{self, PromptConfirm};

use super::print_result;

pub fn run(ctx: &Context, args: ApplyArgs) -> Result<()> {
    let ApplyArgs { target, push } = args;
    let resource = resource::find(&target.resource)?;
    let name = resource.name();
    let desired = load_desired(target.config.as_deref())?;
    let mode = ConvergenceMode::from(target.state);

    let mut facts = match &target.facts {
        Some(path) => Some(JsonFileFacts::load(path)?),
        None => None,
    };
    let empty = StaticFacts::new();

    if !ctx.quiet {
        ui::header(&format!("Converging {name}"));
        ui::kv("Description", &resource.description());
    }

    // 1. Show what will change
    let provider: &dyn FactsProvider = match &facts {
        Some(f) => f,
        None => &empty,
    };
    let current = provider.facts(name)?;
    let mut preview = reconcile(resource.as_ref(), &desired, &current, mode)
        .with_context(|| format!("Could not reconcile {name}"))?;
    if target.diff && preview.changed {
        preview.diff = Some(report::unified_diff(&preview.before, &preview.after));
    }
    print_result(&preview);
    if !preview.changed {
        return Ok(());
    }
    println!();

    // 2. Confirm (unless --yes) and push
    let mut sink = sink::for_output(push.output.as_deref());
    let mut prompt = PromptConfirm;
    let outcome = {
        let mut apply_ctx = ApplyContext::new(provider, sink.as_mut());
        apply_ctx.check_mode = push.check;
        if !push.yes {
            apply_ctx = apply_ctx.with_confirm(&mut prompt);
        }
        converge(resource.as_ref(), &desired, mode, &mut apply_ctx)?
    };

    if push.check {
        ui::info("Check mode - no commands pushed");
        return Ok(());
    }
    if !outcome.pushed {
        println!("  {} Aborted", "✗".red());
        return Ok(());
    }
    ui::success(&format!(
        "Pushed {} command(s) to {name}",
        outcome.result.commands.len()
    ));

    // 3. Record the new state
    if push.update_facts {
        match (&mut facts, &target.facts) {
            (Some(facts), Some(path)) => {
                facts.update(name, outcome.result.after);
                facts.save()?;
                ui::dim(&format!("Facts updated in {}", path.display()));
            }
            _ => ui::warn("--update-facts needs a facts file"),
        }
    }
    Ok(())
}
