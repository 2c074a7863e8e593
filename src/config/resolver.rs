//! Component resolution.
//!
//! Turns the root document and every discovered component document into the
//! flat [`ComponentMap`]. Each component is merged, lowest precedence first,
//! from: `{ path }`, built-in defaults, the root defaults layer, and the
//! component's own (normalized) document.

use super::document::{DocumentFormat, RawLayer, read_document};
use super::hashing::ComponentId;
use super::loader::Environment;
use super::merge::{ArrayPolicy, merge_layers};
use super::types::{ComponentConfig, ComponentMap, ProjectConfig, StageConfig};
use crate::error::{ConfigError, ConfigResult};
use crate::paths::{
    join_normalized, normalize_path_components, path_to_forward_slashes, relative_to_root,
    resolve_from_root,
};
use serde_json::{Map, Value, json};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Read a document and, for a non-default environment, merge its
/// environment sibling over it.
///
/// The sibling is `<dir>/.terrahub.<env><ext>` where `<ext>` is the root
/// document's extension. Its arrays replace the base arrays, and the
/// workspace is pinned to the environment name.
pub fn read_layered(
    path: &Path,
    root_format: DocumentFormat,
    environment: &Environment,
) -> ConfigResult<RawLayer> {
    let base = read_document(path)?;
    if environment.is_default {
        return Ok(base);
    }

    let Some(dir) = path.parent() else {
        return Ok(base);
    };
    let overlay_path = dir.join(root_format.environment_file_name(&environment.name));
    if !overlay_path.is_file() {
        return Ok(base);
    }

    debug!(
        path = %path.display(),
        overlay = %overlay_path.display(),
        "Applying environment overlay"
    );
    let overlay = read_document(&overlay_path)?;
    let mut terraform = Map::new();
    terraform.insert(
        "workspace".to_string(),
        Value::String(environment.name.clone()),
    );
    let mut forced = RawLayer::new();
    forced.insert("terraform".to_string(), Value::Object(terraform));

    Ok(merge_layers(base, [overlay, forced], ArrayPolicy::Replace))
}

/// The parsed root document.
#[derive(Debug, Clone, PartialEq)]
pub struct RootDocument {
    /// Absolute path of the root document.
    pub path: PathBuf,
    /// Format of the root document; decides environment file names.
    pub format: DocumentFormat,
    pub project: ProjectConfig,
    /// Everything except `project`: applied to every component.
    pub defaults: RawLayer,
}

impl RootDocument {
    /// Read the root document (with environment overlay).
    pub fn read(path: &Path, environment: &Environment) -> ConfigResult<Self> {
        let path = std::path::absolute(path).map_err(|e| ConfigError::io(path, e))?;
        let path = normalize_path_components(&path);
        let format = DocumentFormat::from_path(&path)?;
        let layer = read_layered(&path, format, environment)?;
        Self::from_layer(path, format, layer)
    }

    /// Split a root layer into its project section and the defaults layer.
    pub fn from_layer(path: PathBuf, format: DocumentFormat, mut layer: RawLayer) -> ConfigResult<Self> {
        let root_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

        let mut section = match layer.remove("project") {
            Some(Value::Object(map)) => map,
            None | Some(Value::Null) => Map::new(),
            Some(_) => {
                return Err(ConfigError::invalid_document(
                    &path,
                    "`project` must be a mapping",
                ));
            }
        };

        if let Some(mapping) = section.get_mut("mapping") {
            rewrite_paths(mapping, "project", "mapping", |entry| join_normalized("", entry))?;
        }
        section.insert(
            "root".to_string(),
            Value::String(path_to_forward_slashes(&root_dir)),
        );

        let project: ProjectConfig = serde_json::from_value(Value::Object(section))
            .map_err(|e| ConfigError::invalid_document(&path, e))?;

        Ok(Self {
            path,
            format,
            project,
            defaults: layer,
        })
    }

    /// Directory holding the root document.
    pub fn root_dir(&self) -> &Path {
        &self.project.root
    }
}

/// Resolves component documents against one root document.
#[derive(Debug, Clone)]
pub struct ComponentResolver<'a> {
    root: &'a RootDocument,
    environment: &'a Environment,
}

impl<'a> ComponentResolver<'a> {
    pub fn new(root: &'a RootDocument, environment: &'a Environment) -> Self {
        Self { root, environment }
    }

    /// Resolve every component declared inline in the root document or in
    /// one of `component_files`.
    ///
    /// Fails if any document other than the root one declares `project`.
    pub fn resolve(&self, component_files: &[PathBuf]) -> ConfigResult<ComponentMap> {
        let root_dir = self.root.root_dir();
        let defaults = self.defaults()?;
        let mut root_defaults = self.root.defaults.clone();
        let mut components = self.inline_components(&mut root_defaults, &defaults)?;
        let mut root_dirs: Vec<PathBuf> = Vec::new();

        for file in component_files {
            let file = std::path::absolute(file).map_err(|e| ConfigError::io(file, e))?;
            let file = normalize_path_components(&file);
            let dir = file.parent().map(Path::to_path_buf).unwrap_or_default();
            let layer = read_layered(&file, self.root.format, self.environment)?;

            if layer.contains_key("project") {
                debug!(path = %file.display(), "Config declares a project section");
                if !root_dirs.contains(&dir) {
                    root_dirs.push(dir);
                }
                continue;
            }

            let path = relative_to_root(root_dir, &dir);
            let component = self.resolve_component(&path, layer, &defaults, &root_defaults)?;
            debug!(path = %component.path, id = %component.id.short(), "Resolved component");
            components.insert(component.id.clone(), component);
        }

        if !root_dirs.iter().any(|dir| dir == root_dir) {
            root_dirs.push(root_dir.to_path_buf());
        }
        if root_dirs.len() > 1 {
            return Err(ConfigError::MultipleRoots { paths: root_dirs });
        }

        info!(count = components.len(), "Resolved components");
        Ok(components)
    }

    /// Built-in defaults shared by every component.
    fn defaults(&self) -> ConfigResult<RawLayer> {
        let project = serde_json::to_value(&self.root.project)
            .map_err(|e| ConfigError::invalid_document(&self.root.path, e))?;
        let mut defaults = RawLayer::new();
        defaults.insert(
            "cfgEnv".to_string(),
            Value::String(self.environment.name.clone()),
        );
        defaults.insert("project".to_string(), project);
        for key in ["hook", "build", "terraform"] {
            defaults.insert(key.to_string(), Value::Object(Map::new()));
        }
        for key in ["mapping", "children", "dependsOn"] {
            defaults.insert(key.to_string(), Value::Array(Vec::new()));
        }
        defaults.insert("env".to_string(), json!({ "variables": {} }));
        Ok(defaults)
    }

    /// Components declared in the root document by a section with a `root` key.
    ///
    /// The sections are removed from `root_defaults` before any of them is
    /// merged, so no inline component inherits another one.
    fn inline_components(
        &self,
        root_defaults: &mut RawLayer,
        defaults: &RawLayer,
    ) -> ConfigResult<ComponentMap> {
        let root_dir = self.root.root_dir();
        let keys: Vec<String> = root_defaults
            .iter()
            .filter(|(_, value)| value.get("root").is_some())
            .map(|(key, _)| key.clone())
            .collect();

        let mut sections = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(Value::Object(section)) = root_defaults.remove(&key) {
                sections.push((key, section));
            }
        }

        let mut components = ComponentMap::new();
        for (key, mut section) in sections {
            let dir = match section.remove("root") {
                Some(Value::String(dir)) => dir,
                _ => {
                    return Err(ConfigError::invalid_document(
                        &self.root.path,
                        format!("`root` of component '{}' must be a path", key),
                    ));
                }
            };
            let path = relative_to_root(root_dir, &resolve_from_root(root_dir, &dir));

            if let Some(depends_on) = section.get_mut("dependsOn") {
                rewrite_paths(depends_on, &key, "dependsOn", |dep| {
                    relative_to_root(root_dir, &resolve_from_root(root_dir, dep))
                })?;
            }
            if let Some(mapping) = section.get_mut("mapping") {
                rewrite_paths(mapping, &key, "mapping", |entry| join_normalized(&path, entry))?;
            }

            let component = self.merge_component(&path, &key, section, defaults, root_defaults)?;
            debug!(path = %component.path, key = %key, "Resolved inline component");
            components.insert(component.id.clone(), component);
        }

        Ok(components)
    }

    /// Normalize one component document and merge it.
    fn resolve_component(
        &self,
        path: &str,
        mut layer: RawLayer,
        defaults: &RawLayer,
        root_defaults: &RawLayer,
    ) -> ConfigResult<ComponentConfig> {
        let root_dir = self.root.root_dir();

        if let Some(Value::Object(overrides)) = layer.remove("component") {
            layer.extend(overrides);
        }

        let name = layer
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(path)
            .to_string();

        if let Some(depends_on) = layer.get_mut("dependsOn") {
            let component_dir = root_dir.join(path);
            rewrite_paths(depends_on, &name, "dependsOn", |dep| {
                relative_to_root(root_dir, &normalize_path_components(&component_dir.join(dep)))
            })?;
        }

        if let Some(mapping) = layer.get_mut("mapping") {
            rewrite_paths(mapping, &name, "mapping", |entry| join_normalized(path, entry))?;
        }

        if let Some(env) = layer.get("env") {
            let inherited = env
                .get("variables")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();

            for key in ["hook", "build"] {
                let Some(section) = layer.get_mut(key) else {
                    continue;
                };
                if section.is_null() {
                    continue;
                }
                let mut stage: StageConfig = serde_json::from_value(section.take())
                    .map_err(|source| ConfigError::InvalidComponent {
                        component: name.clone(),
                        source,
                    })?;
                stage.inherit_env(&inherited);
                *section = serde_json::to_value(stage).map_err(|source| {
                    ConfigError::InvalidComponent {
                        component: name.clone(),
                        source,
                    }
                })?;
            }
        }

        layer.remove("env");
        layer.remove("component");

        self.merge_component(path, &name, layer, defaults, root_defaults)
    }

    /// Merge `{ path } < defaults < root defaults < layer` and decode it.
    fn merge_component(
        &self,
        path: &str,
        name: &str,
        layer: RawLayer,
        defaults: &RawLayer,
        root_defaults: &RawLayer,
    ) -> ConfigResult<ComponentConfig> {
        let mut seed = RawLayer::new();
        seed.insert("path".to_string(), Value::String(path.to_string()));

        let merged = merge_layers(
            seed,
            [defaults.clone(), root_defaults.clone(), layer],
            ArrayPolicy::Concat,
        );

        let mut component: ComponentConfig = serde_json::from_value(Value::Object(merged))
            .map_err(|source| ConfigError::InvalidComponent {
                component: name.to_string(),
                source,
            })?;
        component.id = ComponentId::of(path);
        Ok(component)
    }
}

/// Check that `value` is a list of path strings and rewrite every entry.
fn rewrite_paths(
    value: &mut Value,
    component: &str,
    field: &'static str,
    rewrite: impl Fn(&str) -> String,
) -> ConfigResult<()> {
    let structural = || ConfigError::StructuralField {
        component: component.to_string(),
        field,
    };

    let Value::Array(items) = value else {
        return Err(structural());
    };
    for item in items.iter_mut() {
        let rewritten = match item {
            Value::String(entry) => rewrite(entry.as_str()),
            _ => return Err(structural()),
        };
        *item = Value::String(rewritten);
    }
    Ok(())
}
