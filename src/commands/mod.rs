//! Command implementations
//!
//! Shared rendering of reconciliation results lives here.

pub mod apply;
pub mod plan;
pub mod resources;
pub mod run;
pub mod validate;

use colored::Colorize;
use converge::{OpKind, OperationSummary, ReconcileResult, report};

use crate::ui;

/// Print what a reconciliation changes
pub fn print_result(result: &ReconcileResult) {
    ui::section(&format!("{} ({})", result.resource, result.state));

    if !result.changed {
        println!("  {} No changes needed", "✓".green());
        return;
    }

    for op in &result.operations {
        let symbol = match op.kind {
            OpKind::Add => "+".green(),
            OpKind::Modify => "~".yellow(),
            OpKind::Remove | OpKind::RemoveFields => "-".red(),
        };
        let marker = if op.recreate {
            " (recreate)".yellow().to_string()
        } else {
            String::new()
        };
        println!("  {symbol} {op}{marker}");
    }

    for warning in &result.warnings {
        ui::warn(warning);
    }

    if let Some(diff) = &result.diff
        && !diff.is_empty()
    {
        let (inserted, deleted) = report::line_changes(&result.before, &result.after);
        println!();
        ui::diff(diff);
        ui::dim(&format!("{inserted} insertion(s), {deleted} deletion(s)"));
    }
}

/// Print the commands a result would send
pub fn print_commands(result: &ReconcileResult) {
    for command in &result.commands {
        ui::dim(command);
    }
}

/// Print totals over several results
pub fn print_summary(summary: &OperationSummary, resources: usize) {
    println!();
    if !summary.has_changes() {
        println!("  {} Everything up to date", "✓".green().bold());
        return;
    }
    println!(
        "  {} {} operation(s) across {} resource(s)",
        "→".cyan(),
        summary.total(),
        resources
    );
    if summary.adds > 0 {
        println!("    • {} added", summary.adds);
    }
    if summary.modifies > 0 {
        println!("    • {} modified", summary.modifies);
    }
    if summary.removes > 0 {
        println!("    • {} removed", summary.removes);
    }
    if summary.field_removals > 0 {
        println!("    • {} field removal(s)", summary.field_removals);
    }
}
