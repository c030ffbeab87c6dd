//! Command sinks
//!
//! Pushing to a live device is left to external tooling; commands are either
//! printed or appended to a file that such tooling consumes.

use anyhow::{Context, Result};
use colored::Colorize;
use converge::{Command, CommandSink, Method};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Prints commands to stdout
pub struct ConsoleSink;

impl CommandSink for ConsoleSink {
    fn push(&mut self, resource: &str, commands: &[Command]) -> Result<()> {
        for command in commands {
            let method = match command.method {
                Method::Patch => "PATCH".yellow(),
                Method::Delete => "DELETE".red(),
            };
            println!("  {} {} {}", resource.dimmed(), method, command.path);
            if let Some(body) = &command.body {
                println!("      {}", body.to_string().dimmed());
            }
        }
        Ok(())
    }
}

/// Appends commands to a file, one JSON object per line
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

impl CommandSink for FileSink {
    fn push(&mut self, resource: &str, commands: &[Command]) -> Result<()> {
        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            fs::create_dir_all(dir)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Could not open {}", self.path.display()))?;
        for command in commands {
            let line = serde_json::json!({
                "resource": resource,
                "method": command.method,
                "path": command.path,
                "body": command.body,
            });
            writeln!(file, "{line}")
                .with_context(|| format!("Could not write {}", self.path.display()))?;
        }
        log::info!(
            "{resource}: wrote {} command(s) to {}",
            commands.len(),
            self.path.display()
        );
        Ok(())
    }
}

/// Sink chosen by the `--output` flag
pub fn for_output(output: Option<&Path>) -> Box<dyn CommandSink> {
    match output {
        Some(path) => Box::new(FileSink::new(path)),
        None => Box::new(ConsoleSink),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use tempfile::TempDir;

    #[test]
    fn test_file_sink_appends_json_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("commands.jsonl");
        let mut sink = FileSink::new(&path);
        let patch = Command {
            method: Method::Patch,
            path: "data/openconfig-system:system/ntp".into(),
            body: Some(json!({"enable-ntp-auth": true})),
        };
        let delete = Command {
            method: Method::Delete,
            path: "data/openconfig-system:system/ntp/trusted-keys=10".into(),
            body: None,
        };
        sink.push("ntp", &[patch]).unwrap();
        sink.push("ntp", &[delete]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["method"], "PATCH");
        assert_eq!(lines[0]["body"], json!({"enable-ntp-auth": true}));
        assert_eq!(lines[1]["method"], "DELETE");
        assert_eq!(lines[1]["body"], Value::Null);
    }
}
