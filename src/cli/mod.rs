//! CLI command definitions for terrahub-config
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

use crate::config::{DocumentKind, Environment};
use crate::format::OutputFormat;
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use std::path::PathBuf;

/// Document kind selector for `list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum KindArg {
    /// Base documents only (default)
    #[default]
    Default,
    /// Documents of the active environment
    Specific,
    /// Every configuration document
    Every,
}

impl KindArg {
    /// Document kind for `environment`.
    pub fn to_kind(self, environment: &Environment) -> DocumentKind {
        match self {
            KindArg::Default => DocumentKind::Default,
            KindArg::Specific => DocumentKind::Specific(environment.name.clone()),
            KindArg::Every => DocumentKind::Every,
        }
    }
}

impl std::fmt::Display for KindArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KindArg::Default => write!(f, "default"),
            KindArg::Specific => write!(f, "specific"),
            KindArg::Every => write!(f, "every"),
        }
    }
}

/// Resolve hierarchical component configuration
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory to start the root search from (default: current directory)
    #[arg(short, long, global = true)]
    pub dir: Option<PathBuf>,

    /// Active environment (overrides TERRAHUB_ENV)
    #[arg(short, long, global = true)]
    pub env: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the root config path
    Root,

    /// List configuration documents
    List {
        /// Which documents to list
        #[arg(short, long, value_enum, default_value_t = KindArg::Default)]
        kind: KindArg,

        /// Search below this directory only (relative to the project root)
        #[arg(short, long)]
        path: Option<PathBuf>,
    },

    /// Print the resolved component map
    Resolve {
        /// Output format: json, yaml or text (one line per component)
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },

    /// Print the dependency forest
    Tree {
        /// Output format: text, json or yaml
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Set a key of the root `project` section
    Set {
        /// Key inside `project`
        key: String,

        /// Value, parsed as a YAML scalar (falls back to a plain string)
        value: String,
    },
}

/// Parse a command-line value as a YAML scalar.
///
/// `42` becomes a number and `true` a boolean. Anything that is not a
/// non-null scalar is kept as the raw string.
pub fn parse_scalar(raw: &str) -> Value {
    match serde_yaml::from_str::<Value>(raw) {
        Ok(value @ (Value::Bool(_) | Value::Number(_) | Value::String(_))) => value,
        _ => Value::String(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scalar() {
        assert_eq!(parse_scalar("42"), Value::from(42));
        assert_eq!(parse_scalar("true"), Value::Bool(true));
        assert_eq!(parse_scalar("demo"), Value::from("demo"));
        assert_eq!(parse_scalar("'007'"), Value::from("007"));
        assert_eq!(parse_scalar(""), Value::from(""));
        assert_eq!(parse_scalar("[a, b]"), Value::from("[a, b]"));
        assert_eq!(parse_scalar("key: value"), Value::from("key: value"));
    }

    #[test]
    fn test_parse_list_with_kind() {
        let cli = Cli::parse_from(["terrahub-config", "--env", "stage", "list", "--kind", "specific"]);
        assert_eq!(cli.env.as_deref(), Some("stage"));
        match cli.command {
            Command::List { kind, path } => {
                assert_eq!(kind, KindArg::Specific);
                assert!(path.is_none());
                assert_eq!(
                    kind.to_kind(&Environment::named("stage")),
                    DocumentKind::Specific("stage".to_string())
                );
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_tree_defaults_to_text() {
        let cli = Cli::parse_from(["terrahub-config", "tree"]);
        assert_eq!(cli.log, "2");
        assert!(matches!(cli.command, Command::Tree { format: OutputFormat::Text }));
    }

    #[test]
    fn test_parse_resolve_formats() {
        let cli = Cli::parse_from(["terrahub-config", "resolve"]);
        assert!(matches!(cli.command, Command::Resolve { format: OutputFormat::Json }));

        let cli = Cli::parse_from(["terrahub-config", "resolve", "--format", "text"]);
        assert!(matches!(cli.command, Command::Resolve { format: OutputFormat::Text }));

        assert!(Cli::try_parse_from(["terrahub-config", "resolve", "--format", "markdown"]).is_err());
    }

    #[test]
    fn test_parse_set() {
        let cli = Cli::parse_from(["terrahub-config", "-d", "/work", "set", "code", "abcd1234"]);
        assert_eq!(cli.dir, Some(PathBuf::from("/work")));
        match cli.command {
            Command::Set { key, value } => {
                assert_eq!(key, "code");
                assert_eq!(value, "abcd1234");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
