//! Apply context and provider traits
//!
//! The engine never talks to a device. Facts come in through a
//! [`FactsProvider`], commands go out through a [`CommandSink`], and the
//! caller decides how to confirm and report.

use anyhow::Result;
use serde_json::Value;
use std::collections::HashMap;

use crate::types::{Command, ReconcileResult};

/// Supplies the current configuration of a resource
///
/// The returned document is expected to match the resource's schema; a
/// mismatch surfaces as a schema error when it is normalized.
pub trait FactsProvider: Send + Sync {
    fn facts(&self, resource: &str) -> Result<Value>;
}

/// Receives the commands of a reconciliation
///
/// Pushing to the device, reporting per-command failures and any retry
/// policy belong to the sink.
pub trait CommandSink: Send {
    fn push(&mut self, resource: &str, commands: &[Command]) -> Result<()>;
}

/// Progress callback for batch reconciliation
pub trait ProgressCallback: Send {
    /// Called before a batch of tasks starts
    fn on_batch_start(&mut self, count: usize);

    /// Called when a task finishes, successfully or not
    fn on_task_complete(&mut self, resource: &str, result: Option<&ReconcileResult>);

    fn on_batch_complete(&mut self);
}

/// Confirmation callback before commands are pushed
pub trait ConfirmCallback: Send {
    /// Ask to confirm an action, `true` to go ahead
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

/// Facts held in memory, keyed by resource name
///
/// Resources without an entry have no configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticFacts {
    facts: HashMap<String, Value>,
}

impl StaticFacts {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, resource: &str, facts: Value) -> Self {
        self.facts.insert(resource.to_string(), facts);
        self
    }

    pub fn insert(&mut self, resource: &str, facts: Value) {
        self.facts.insert(resource.to_string(), facts);
    }
}

impl FactsProvider for StaticFacts {
    fn facts(&self, resource: &str) -> Result<Value> {
        Ok(self.facts.get(resource).cloned().unwrap_or(Value::Null))
    }
}

/// Sink that discards everything
pub struct NoSink;

impl CommandSink for NoSink {
    fn push(&mut self, _resource: &str, _commands: &[Command]) -> Result<()> {
        Ok(())
    }
}

/// Sink that keeps every pushed command in memory
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub pushed: Vec<(String, Command)>,
}

impl CommandSink for RecordingSink {
    fn push(&mut self, resource: &str, commands: &[Command]) -> Result<()> {
        self.pushed
            .extend(commands.iter().map(|c| (resource.to_string(), c.clone())));
        Ok(())
    }
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_batch_start(&mut self, _count: usize) {}
    fn on_task_complete(&mut self, _resource: &str, _result: Option<&ReconcileResult>) {}
    fn on_batch_complete(&mut self) {}
}

/// Auto-confirm callback (always returns true)
pub struct AutoConfirm;

impl ConfirmCallback for AutoConfirm {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(true)
    }
}

/// Auto-decline callback (always returns false)
pub struct AutoDecline;

impl ConfirmCallback for AutoDecline {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(false)
    }
}

/// Context passed to [`converge`](crate::engine::converge)
pub struct ApplyContext<'a> {
    /// Compute everything but push nothing
    pub check_mode: bool,
    /// Attach a unified before/after diff to the result
    pub diff: bool,
    pub facts: &'a dyn FactsProvider,
    pub sink: &'a mut dyn CommandSink,
    /// Asked before pushing; `None` pushes without asking
    pub confirm: Option<&'a mut dyn ConfirmCallback>,
}

impl<'a> ApplyContext<'a> {
    pub fn new(facts: &'a dyn FactsProvider, sink: &'a mut dyn CommandSink) -> Self {
        Self {
            check_mode: false,
            diff: false,
            facts,
            sink,
            confirm: None,
        }
    }

    #[must_use]
    pub fn with_confirm(mut self, confirm: &'a mut dyn ConfirmCallback) -> Self {
        self.confirm = Some(confirm);
        self
    }

    /// Ask the confirm callback, if any
    pub fn confirm(&mut self, prompt: &str) -> Result<bool> {
        match self.confirm.as_deref_mut() {
            Some(confirm) => confirm.confirm(prompt),
            None => Ok(true),
        }
    }
}
