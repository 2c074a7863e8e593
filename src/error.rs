//! Error taxonomy for configuration resolution.
//!
//! Every variant is fatal to the resolution that raised it. Messages carry the
//! offending path or component so they can be shown to users as-is.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Errors raised while discovering, reading, or resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// More than one directory declares a `project` section.
    #[error("{}", multiple_roots_message(.paths))]
    MultipleRoots { paths: Vec<PathBuf> },

    /// `dependsOn` or `mapping` is present but not a list of paths.
    #[error("Error in {component}'s configuration! `{field}` must be an array of paths")]
    StructuralField { component: String, field: &'static str },

    /// A dependency path does not resolve to any registered component.
    #[error("Couldn't find dependency '{dependency}' of component '{component}'")]
    UnresolvedDependency { component: String, dependency: String },

    /// No reader/writer is registered for the document extension.
    #[error("'{extension}' config is not supported (expected .json, .yml or .yaml)")]
    UnsupportedFormat { extension: String },

    /// The document parsed but its content is not a configuration mapping.
    #[error("Invalid config document {}: {message}", .path.display())]
    InvalidDocument { path: PathBuf, message: String },

    /// The merged settings of a component do not fit the component record.
    #[error("Invalid configuration for component '{component}': {source}")]
    InvalidComponent {
        component: String,
        #[source]
        source: serde_json::Error,
    },

    /// A discovery glob (e.g. from `project.ignore`) does not compile.
    #[error("Invalid glob pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// An operation needs the root document but the project is unconfigured.
    #[error("No root config found (no .terrahub.* file with a `project` section)")]
    NoRootConfig,

    /// Reading or writing a document failed.
    #[error("Failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_document(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::InvalidDocument {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

fn multiple_roots_message(paths: &[PathBuf]) -> String {
    let mut message = String::from("Multiple root configs identified in this project:\n");
    for (index, path) in paths.iter().enumerate() {
        message.push_str(&format!("  {}. {}\n", index + 1, path.display()));
    }
    message.push_str(
        "ONLY 1 root config per project is allowed. Please remove all the other and try again.",
    );
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiple_roots_lists_every_directory() {
        let err = ConfigError::MultipleRoots {
            paths: vec![PathBuf::from("/work/a"), PathBuf::from("/work/b")],
        };
        let message = err.to_string();
        assert!(message.contains("  1. /work/a\n"));
        assert!(message.contains("  2. /work/b\n"));
        assert!(message.ends_with("Please remove all the other and try again."));
    }

    #[test]
    fn test_structural_field_names_component() {
        let err = ConfigError::StructuralField {
            component: "vpc".to_string(),
            field: "dependsOn",
        };
        assert_eq!(
            err.to_string(),
            "Error in vpc's configuration! `dependsOn` must be an array of paths"
        );
    }

    #[test]
    fn test_unsupported_format_message() {
        let err = ConfigError::UnsupportedFormat {
            extension: ".toml".to_string(),
        };
        assert!(err.to_string().starts_with("'.toml' config is not supported"));
    }
}
