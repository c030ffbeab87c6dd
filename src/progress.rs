//! Progress bar for playbook runs

use colored::Colorize;
use converge::{ProgressCallback, ReconcileResult};
use indicatif::{ProgressBar, ProgressStyle};

/// Reports batch reconciliation on an indicatif bar
pub struct BarProgress {
    bar: Option<ProgressBar>,
    quiet: bool,
}

impl BarProgress {
    pub fn new(quiet: bool) -> Self {
        Self { bar: None, quiet }
    }
}

impl ProgressCallback for BarProgress {
    fn on_batch_start(&mut self, count: usize) {
        if self.quiet {
            return;
        }
        let pb = ProgressBar::new(count as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb.set_message("Reconciling");
        self.bar = Some(pb);
    }

    fn on_task_complete(&mut self, resource: &str, result: Option<&ReconcileResult>) {
        let Some(pb) = &self.bar else {
            return;
        };
        let symbol = match result {
            Some(r) if r.changed => "~".yellow(),
            Some(_) => "○".dimmed(),
            None => "✗".red(),
        };
        pb.set_message(format!("{symbol} {resource}"));
        pb.inc(1);
    }

    fn on_batch_complete(&mut self) {
        if let Some(pb) = self.bar.take() {
            pb.finish_and_clear();
        }
    }
}
