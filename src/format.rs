//! Output formatting for resolved components and the dependency forest.

use crate::config::{ComponentConfig, ComponentMap, DependencyForest};
use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;
use std::fmt;

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Yaml,
    /// One line per component, children indented under their parent.
    Text,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Yaml => write!(f, "yaml"),
            OutputFormat::Text => write!(f, "text"),
        }
    }
}

fn serialize<T: Serialize>(value: &T, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Yaml => Ok(serde_yaml::to_string(value)?),
        _ => Ok(serde_json::to_string_pretty(value)?),
    }
}

fn component_line(component: &ComponentConfig) -> String {
    let name = component.display_name();
    if name == component.path {
        format!("{} {}", component.id.short(), component.path)
    } else {
        format!("{} {} ({})", component.id.short(), name, component.path)
    }
}

/// Format the flat component map.
pub fn format_components(components: &ComponentMap, format: OutputFormat) -> Result<String> {
    if format != OutputFormat::Text {
        return serialize(components, format);
    }

    let mut out = String::new();
    for component in components.values() {
        out.push_str(&component_line(component));
        out.push('\n');
    }
    Ok(out)
}

/// Format the dependency forest.
pub fn format_forest(forest: &DependencyForest, format: OutputFormat) -> Result<String> {
    if format != OutputFormat::Text {
        return serialize(forest, format);
    }

    fn render(component: &ComponentConfig, depth: usize, out: &mut String) {
        out.push_str(&"  ".repeat(depth));
        out.push_str(&component_line(component));
        out.push('\n');
        for child in &component.children {
            render(child, depth + 1, out);
        }
    }

    let mut out = String::new();
    for component in forest.values() {
        render(component, 0, &mut out);
    }
    Ok(out)
}
