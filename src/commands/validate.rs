//! `validate` - check a configuration document against a resource schema

use anyhow::Result;
use converge::{Resource, normalize};
use std::path::Path;

use crate::Context;
use crate::config::load_document;
use crate::resource;
use crate::ui;

pub fn run(ctx: &Context, resource_name: &str, file: &Path) -> Result<()> {
    let resource = resource::find(resource_name)?;

    let problems = resource.schema().problems();
    for problem in &problems {
        ui::warn(&format!("schema: {problem}"));
    }

    let document = load_document(file)?;
    match normalize(&document, resource.schema()) {
        Ok(node) => {
            ui::success(&format!(
                "{} is a valid {} configuration",
                file.display(),
                resource.name()
            ));
            // the canonical form is what gets compared against the device
            if ctx.verbose > 0 {
                println!("{}", serde_json::to_string_pretty(&node.to_json())?);
            }
            Ok(())
        }
        Err(e) => {
            ui::error(&format!("{}: {e}", file.display()));
            anyhow::bail!("Validation failed")
        }
    }
}
