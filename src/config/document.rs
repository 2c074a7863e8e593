//! Reading and writing configuration documents.
//!
//! Documents are dispatched on their extension (`.json`, `.yml`, `.yaml`)
//! and always decode into a [`RawLayer`], the unit the merger works on.

use crate::error::{ConfigError, ConfigResult};
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// One parsed configuration document.
pub type RawLayer = Map<String, Value>;

/// Base name shared by root, component and environment documents.
pub const BASE_NAME: &str = ".terrahub";

/// Supported document formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DocumentFormat {
    Json,
    #[default]
    Yml,
    Yaml,
}

impl DocumentFormat {
    pub const ALL: [DocumentFormat; 3] = [Self::Json, Self::Yml, Self::Yaml];

    /// Extension including the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => ".json",
            Self::Yml => ".yml",
            Self::Yaml => ".yaml",
        }
    }

    /// Format of a document, from its file extension.
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let extension = path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        extension.parse()
    }

    /// File name of the default (environment-independent) document.
    pub fn default_file_name(self) -> String {
        format!("{}{}", BASE_NAME, self.extension())
    }

    /// File name of the document for `environment`.
    pub fn environment_file_name(self, environment: &str) -> String {
        format!("{}.{}{}", BASE_NAME, environment, self.extension())
    }
}

impl FromStr for DocumentFormat {
    type Err = ConfigError;

    /// Accepts the extension with or without its leading dot.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim_start_matches('.').to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "yml" => Ok(Self::Yml),
            "yaml" => Ok(Self::Yaml),
            _ => Err(ConfigError::UnsupportedFormat {
                extension: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension().trim_start_matches('.'))
    }
}

/// Parse the document at `path` into a layer.
pub fn read_document(path: &Path) -> ConfigResult<RawLayer> {
    let format = DocumentFormat::from_path(path)?;
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
    if content.trim().is_empty() {
        return Ok(RawLayer::new());
    }

    let value: Value = match format {
        DocumentFormat::Json => {
            serde_json::from_str(&content).map_err(|e| ConfigError::invalid_document(path, e))?
        }
        DocumentFormat::Yml | DocumentFormat::Yaml => {
            serde_yaml::from_str(&content).map_err(|e| ConfigError::invalid_document(path, e))?
        }
    };

    match value {
        Value::Object(map) => Ok(map),
        // comment-only YAML document
        Value::Null => Ok(RawLayer::new()),
        other => Err(ConfigError::invalid_document(
            path,
            format!("expected a mapping at the top level, found {}", kind_of(&other)),
        )),
    }
}

/// Serialize `layer` to `path`, creating parent directories as needed.
pub fn write_document(layer: &RawLayer, path: &Path) -> ConfigResult<()> {
    let format = DocumentFormat::from_path(path)?;

    let content = match format {
        DocumentFormat::Json => {
            let mut text = serde_json::to_string_pretty(layer)
                .map_err(|e| ConfigError::invalid_document(path, e))?;
            text.push('\n');
            text
        }
        DocumentFormat::Yml | DocumentFormat::Yaml => {
            serde_yaml::to_string(layer).map_err(|e| ConfigError::invalid_document(path, e))?
        }
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::io(parent, e))?;
    }
    std::fs::write(path, content).map_err(|e| ConfigError::io(path, e))
}

/// Human-readable name of a value's type, for error messages.
pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "a mapping",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_format_from_path() {
        assert_eq!(DocumentFormat::from_path(Path::new("a/.terrahub.yml")).unwrap(), DocumentFormat::Yml);
        assert_eq!(DocumentFormat::from_path(Path::new(".terrahub.yaml")).unwrap(), DocumentFormat::Yaml);
        assert_eq!(DocumentFormat::from_path(Path::new(".terrahub.json")).unwrap(), DocumentFormat::Json);
        assert!(matches!(
            DocumentFormat::from_path(Path::new(".terrahub.toml")),
            Err(ConfigError::UnsupportedFormat { .. })
        ));
        assert!(DocumentFormat::from_path(Path::new("Makefile")).is_err());
    }

    #[test]
    fn test_file_names() {
        assert_eq!(DocumentFormat::Yml.default_file_name(), ".terrahub.yml");
        assert_eq!(DocumentFormat::Json.environment_file_name("stage"), ".terrahub.stage.json");
    }

    #[test]
    fn test_read_yaml_document() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".terrahub.yml");
        std::fs::write(&path, "component:\n  name: vpc\ndependsOn:\n  - ../iam\n").unwrap();

        let layer = read_document(&path).unwrap();
        assert_eq!(layer["component"], json!({"name": "vpc"}));
        assert_eq!(layer["dependsOn"], json!(["../iam"]));
    }

    #[test]
    fn test_read_empty_yaml_is_empty_layer() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".terrahub.yaml");
        std::fs::write(&path, "").unwrap();

        assert!(read_document(&path).unwrap().is_empty());
    }

    #[test]
    fn test_read_rejects_non_mapping() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".terrahub.json");
        std::fs::write(&path, "[1, 2]").unwrap();

        assert!(matches!(
            read_document(&path),
            Err(ConfigError::InvalidDocument { .. })
        ));
    }

    #[test]
    fn test_read_missing_file_is_io_error() {
        let temp = TempDir::new().unwrap();
        let result = read_document(&temp.path().join(".terrahub.yml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_write_then_read_json() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/dir/.terrahub.json");
        let layer = json!({"project": {"name": "demo", "code": "abcd1234"}});
        let layer = layer.as_object().unwrap().clone();

        write_document(&layer, &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\n  \"project\": {"));
        assert_eq!(read_document(&path).unwrap(), layer);
    }

    #[test]
    fn test_write_unsupported_format() {
        let temp = TempDir::new().unwrap();
        let result = write_document(&RawLayer::new(), &temp.path().join("config.ini"));
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat { .. })));
    }
}
