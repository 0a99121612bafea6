//! Output renderers and formatting helpers for CLI commands.

use anyhow::anyhow;
use serde::Serialize;
use serde_json::Value;
use weldr_api_models::ComposeTypesResponse;

use crate::client::{CliError, CliResult};

/// How successful results are written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    pub(crate) const fn from_json_flag(json: bool) -> Self {
        if json { Self::Json } else { Self::Text }
    }
}

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
    println!("{text}");
    Ok(())
}

/// Print text lines, or the payload as JSON.
pub(crate) fn render<T: Serialize + ?Sized>(
    payload: &T,
    lines: impl FnOnce() -> Vec<String>,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(payload),
        OutputFormat::Text => {
            for line in lines() {
                println!("{line}");
            }
            Ok(())
        }
    }
}

pub(crate) fn compose_queued(build_id: &str) -> String {
    format!("Compose {build_id} added to the queue")
}

pub(crate) fn compose_type_lines(types: &ComposeTypesResponse) -> Vec<String> {
    types
        .types
        .iter()
        .filter(|kind| kind.enabled)
        .map(|kind| kind.name.clone())
        .collect()
}

pub(crate) fn project_name_lines(projects: &[Value]) -> Vec<String> {
    projects
        .iter()
        .map(|project| field(project, "name").to_string())
        .collect()
}

/// Name, summary and homepage, then the description after a blank line.
pub(crate) fn project_info_lines(projects: &[Value]) -> Vec<String> {
    let mut lines = Vec::new();
    for (index, project) in projects.iter().enumerate() {
        if index > 0 {
            lines.push(String::new());
        }
        lines.push(format!("Name: {}", field(project, "name")));
        lines.push(format!("Summary: {}", field(project, "summary")));
        lines.push(format!("Homepage: {}", field(project, "homepage")));
        lines.push(String::new());
        lines.push(field(project, "description").to_string());
    }
    lines
}

pub(crate) fn dependency_lines(dependencies: &[Value]) -> Vec<String> {
    dependencies
        .iter()
        .map(|dep| format!("    {}", nevra(dep)))
        .collect()
}

/// `name-[epoch:]version-release.arch`; the epoch only when non-zero.
pub(crate) fn nevra(dep: &Value) -> String {
    let epoch = dep.get("epoch").and_then(Value::as_u64).unwrap_or(0);
    let epoch = if epoch == 0 {
        String::new()
    } else {
        format!("{epoch}:")
    };
    format!(
        "{}-{epoch}{}-{}.{}",
        field(dep, "name"),
        field(dep, "version"),
        field(dep, "release"),
        field(dep, "arch")
    )
}

fn field<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or_default()
}
