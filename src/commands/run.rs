//! `run` - reconcile a playbook of tasks as one batch
//!
//! Every task is reconciled up front on a thread pool and the combined plan
//! is shown. After one confirmation, changed tasks are converged one by one,
//! so facts written back by an earlier task are seen by the next.

use anyhow::{Context as AnyhowContext, Result};
use colored::Colorize;
use converge::{
    ApplyContext, BoxedResource, CommandSink, ConfirmCallback, FactsProvider, OperationSummary,
    ReconcileResult, Resource, StaticFacts, Task, converge, reconcile_batch, report,
};
use serde_json::Value;
use std::path::PathBuf;

use crate::Context;
use crate::cli::RunArgs;
use crate::config::{JsonFileFacts, Playbook, PlaybookTask};
use crate::progress::BarProgress;
use crate::resource;
use crate::sink;
use crate::ui::{self, PromptConfirm};

use super::{print_result, print_summary};

/// A playbook task with everything it needs loaded
struct Prepared {
    resource: BoxedResource,
    task: PlaybookTask,
    desired: Value,
    current: Value,
    facts_file: Option<PathBuf>,
}

pub fn run(ctx: &Context, args: RunArgs) -> Result<()> {
    let playbook = Playbook::load(&args.playbook)?;
    let default_facts = playbook.facts_file.clone().or(args.facts.clone());

    if !ctx.quiet {
        ui::header(&format!("Playbook {}", args.playbook.display()));
        ui::kv("Tasks", &playbook.tasks.len().to_string());
        ui::kv("Jobs", &args.jobs.to_string());
    }

    let prepared = playbook
        .tasks
        .into_iter()
        .enumerate()
        .map(|(i, task)| {
            prepare(task, default_facts.as_ref()).with_context(|| format!("Task {}", i + 1))
        })
        .collect::<Result<Vec<_>>>()?;

    // 1. Reconcile everything in parallel
    let tasks: Vec<Task> = prepared
        .iter()
        .map(|p| Task {
            resource: p.resource.as_ref(),
            desired: &p.desired,
            current: &p.current,
            mode: p.task.state,
        })
        .collect();
    let mut progress = BarProgress::new(ctx.quiet);
    let results = reconcile_batch(&tasks, args.jobs, &mut progress)?;

    // 2. Show the combined plan
    let mut summary = OperationSummary::default();
    let mut changed = Vec::new();
    let mut failed = 0;
    for (prepared, result) in prepared.iter().zip(results) {
        match result {
            Ok(mut result) => {
                if args.diff && result.changed {
                    result.diff = Some(report::unified_diff(&result.before, &result.after));
                }
                print_result(&result);
                summary.merge(&result.summary());
                if result.changed {
                    changed.push(prepared);
                }
            }
            Err(e) => {
                failed += 1;
                ui::section(prepared.resource.name());
                ui::error(&format!("{e}"));
            }
        }
    }
    print_summary(&summary, changed.len());

    if failed > 0 {
        anyhow::bail!("{failed} task(s) failed to reconcile; nothing was pushed");
    }
    if changed.is_empty() {
        return Ok(());
    }
    if args.push.check {
        println!();
        ui::info("Check mode - no commands pushed");
        return Ok(());
    }

    // 3. Confirm once, then converge changed tasks in order
    if !args.push.yes {
        let mut prompt = PromptConfirm;
        if !prompt.confirm("Continue?")? {
            println!();
            println!("  {} Aborted", "✗".red());
            return Ok(());
        }
    }

    let mut sink = sink::for_output(args.push.output.as_deref());
    let mut pushed = 0;
    println!();
    for prepared in changed {
        let result = push_task(prepared, sink.as_mut(), args.push.update_facts)?;
        pushed += result.commands.len();
    }
    println!();
    ui::success(&format!("Pushed {pushed} command(s)"));
    Ok(())
}

fn prepare(task: PlaybookTask, default_facts: Option<&PathBuf>) -> Result<Prepared> {
    let resource = resource::find(&task.resource)?;
    let desired = task.desired()?;
    let facts_file = task.facts_file.clone().or_else(|| default_facts.cloned());
    let current = match &facts_file {
        Some(path) => JsonFileFacts::load(path)?.facts(resource.name())?,
        None => Value::Null,
    };
    Ok(Prepared {
        resource,
        task,
        desired,
        current,
        facts_file,
    })
}

/// Converge one task against freshly loaded facts
fn push_task(
    prepared: &Prepared,
    sink: &mut dyn CommandSink,
    update_facts: bool,
) -> Result<ReconcileResult> {
    let name = prepared.resource.name();
    let mut facts = match &prepared.facts_file {
        Some(path) => Some(JsonFileFacts::load(path)?),
        None => None,
    };
    let empty = StaticFacts::new();
    let outcome = {
        let provider: &dyn FactsProvider = match &facts {
            Some(f) => f,
            None => &empty,
        };
        let mut apply_ctx = ApplyContext::new(provider, sink);
        converge(
            prepared.resource.as_ref(),
            &prepared.desired,
            prepared.task.state,
            &mut apply_ctx,
        )?
    };

    if outcome.pushed {
        ui::success(&format!("{name}: {} command(s)", outcome.result.commands.len()));
        if update_facts && let Some(facts) = &mut facts {
            facts.update(name, outcome.result.after.clone());
            facts.save()?;
        }
    } else {
        ui::dim(&format!("{name}: already converged"));
    }
    Ok(outcome.result)
}
