//! `resources` - list the catalogue or describe one schema

use anyhow::Result;
use colored::Colorize;
use converge::schema::{ObjectSchema, ScalarSpec, Schema};
use converge::{ConvergenceMode, Resource, ResourceExt};

use crate::resource;
use crate::ui;

pub fn run(name: Option<&str>) -> Result<()> {
    match name {
        Some(name) => describe(name),
        None => {
            list();
            Ok(())
        }
    }
}

fn list() {
    ui::header("Resources");
    for resource in resource::all() {
        let modes: Vec<String> = resource
            .supported_modes()
            .iter()
            .map(ToString::to_string)
            .collect();
        println!(
            "  {:<20} {} {}",
            resource.name().bold(),
            resource.description(),
            format!("[{}]", modes.join(", ")).dimmed()
        );
    }
}

fn describe(name: &str) -> Result<()> {
    let resource = resource::find(name)?;
    let schema = resource.schema();

    ui::header(resource.name());
    ui::kv("Description", &resource.description());
    ui::kv(
        "Root",
        if schema.is_list_root() {
            "keyed list"
        } else {
            "object"
        },
    );
    let unsupported: Vec<String> = ConvergenceMode::ALL
        .iter()
        .filter(|m| !resource.supports(**m))
        .map(ToString::to_string)
        .collect();
    if !unsupported.is_empty() {
        ui::kv("Unsupported", &unsupported.join(", "));
    }

    if let Some(root) = schema.root_object() {
        println!();
        print_object(root, 1);
    }
    Ok(())
}

fn print_object(object: &ObjectSchema, depth: usize) {
    let indent = "  ".repeat(depth);
    for (name, field) in &object.fields {
        let mut flags = Vec::new();
        if object.keys.is_identity(name) {
            flags.push("identity".cyan().to_string());
        }
        if object.keys.required_for_create.contains(name) {
            flags.push("required".yellow().to_string());
        }
        if !object.keys.is_deletable(name) {
            flags.push("undeletable".magenta().to_string());
        }
        if object.keys.is_immutable(name) {
            flags.push("immutable".red().to_string());
        }

        let detail = match field {
            Schema::Scalar(spec) | Schema::Set(spec) => scalar_detail(spec),
            Schema::Object(_) | Schema::List(_) => String::new(),
        };
        println!(
            "{indent}{} {}{}{}",
            name.bold(),
            field.kind().dimmed(),
            detail,
            if flags.is_empty() {
                String::new()
            } else {
                format!(" ({})", flags.join(", "))
            }
        );

        if let Some(child) = field.as_object() {
            print_object(child, depth + 1);
        }
    }
}

fn scalar_detail(spec: &ScalarSpec) -> String {
    let mut parts = Vec::new();
    if let Some(default) = &spec.default {
        parts.push(format!("default {default}"));
    }
    if let Some((min, max)) = spec.range {
        parts.push(format!("{min}..={max}"));
    }
    if !spec.choices.is_empty() {
        let choices: Vec<String> = spec.choices.iter().map(ToString::to_string).collect();
        parts.push(format!("one of {}", choices.join("|")));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" {}", parts.join(", ").dimmed())
    }
}
