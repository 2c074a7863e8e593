//! Resolved configuration records.
//!
//! Documents are merged as untyped layers; once merged, each component is
//! decoded into a [`ComponentConfig`]. Keys the records do not name are kept
//! in their `settings` maps so nothing a document declares is lost.

use super::hashing::ComponentId;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Flat map of every resolved component, keyed by identifier.
pub type ComponentMap = BTreeMap<ComponentId, ComponentConfig>;

/// Components with no dependency, each carrying its descendants in `children`.
pub type DependencyForest = BTreeMap<ComponentId, ComponentConfig>;

/// Decode a record field, treating an explicit `null` (`hook:` with no
/// value) like a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Root-level `project` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Absolute path of the directory holding the root document.
    #[serde(default)]
    pub root: PathBuf,

    /// Directories (relative to the root) that restrict component discovery.
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,

    /// Glob exclusions for discovery. `None` means the built-in defaults.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore: Option<Vec<String>>,

    /// Normalized CI path mapping.
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub mapping: Vec<String>,

    /// Any other project key (`name`, `code`, ...).
    #[serde(flatten)]
    pub settings: Map<String, Value>,
}

/// An `env` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvConfig {
    #[serde(default, deserialize_with = "null_as_default")]
    pub variables: Map<String, Value>,

    #[serde(flatten)]
    pub settings: Map<String, Value>,
}

/// A `hook` or `build` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<EnvConfig>,

    #[serde(flatten)]
    pub settings: Map<String, Value>,
}

impl StageConfig {
    /// Take `inherited` as the base of this stage's `env.variables`.
    ///
    /// Variables the stage already declares win over inherited ones.
    pub fn inherit_env(&mut self, inherited: &Map<String, Value>) {
        let env = self.env.get_or_insert_with(EnvConfig::default);
        let mut variables = inherited.clone();
        variables.extend(std::mem::take(&mut env.variables));
        env.variables = variables;
    }

    pub fn variables(&self) -> Option<&Map<String, Value>> {
        self.env.as_ref().map(|env| &env.variables)
    }
}

/// Fully merged settings of one component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentConfig {
    /// Identifier derived from `path`; assigned after decoding.
    #[serde(default, skip_deserializing, skip_serializing_if = "ComponentId::is_empty")]
    pub id: ComponentId,

    /// Directory of the component relative to the project root (`./a/b`).
    pub path: String,

    /// Name of the environment the component was resolved for.
    #[serde(default, deserialize_with = "null_as_default")]
    pub cfg_env: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub project: ProjectConfig,

    /// Root-relative dependency paths. Only the first one places the
    /// component in the dependency forest.
    #[serde(default)]
    pub depends_on: Vec<String>,

    /// Root-relative CI mapping paths.
    #[serde(default)]
    pub mapping: Vec<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub children: Vec<ComponentConfig>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub hook: StageConfig,

    #[serde(default, deserialize_with = "null_as_default")]
    pub build: StageConfig,

    /// Backend, provider and workspace settings.
    #[serde(default, deserialize_with = "null_as_default")]
    pub terraform: Map<String, Value>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub env: EnvConfig,

    /// Remaining free-form keys (`name`, ...).
    #[serde(flatten)]
    pub settings: Map<String, Value>,
}

impl ComponentConfig {
    /// `name` setting when present, otherwise the component path.
    pub fn display_name(&self) -> &str {
        self.settings
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(&self.path)
    }

    /// The dependency that decides the component's place in the forest.
    pub fn parent_dependency(&self) -> Option<&str> {
        self.depends_on.first().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stage_inherits_env_variables() {
        let mut stage: StageConfig = serde_json::from_value(json!({
            "env": {"variables": {"TF_LOG": "debug"}},
            "plan": {"before": ["./scripts/lint.sh"]}
        }))
        .unwrap();
        let inherited = json!({"TF_LOG": "info", "REGION": "us-east-1"});

        stage.inherit_env(inherited.as_object().unwrap());

        let variables = stage.variables().unwrap();
        assert_eq!(variables["TF_LOG"], "debug");
        assert_eq!(variables["REGION"], "us-east-1");
        assert_eq!(stage.settings["plan"], json!({"before": ["./scripts/lint.sh"]}));
    }

    #[test]
    fn test_stage_without_env_gets_inherited_copy() {
        let mut stage = StageConfig::default();
        let inherited = json!({"A": "1"});
        stage.inherit_env(inherited.as_object().unwrap());
        assert_eq!(stage.variables().unwrap()["A"], "1");
    }

    #[test]
    fn test_component_decodes_camel_case_and_extra_keys() {
        let component: ComponentConfig = serde_json::from_value(json!({
            "path": "./network/vpc",
            "name": "vpc",
            "dependsOn": ["./iam"],
            "cfgEnv": "default",
            "terraform": {"version": "1.5"}
        }))
        .unwrap();

        assert_eq!(component.depends_on, vec!["./iam"]);
        assert_eq!(component.display_name(), "vpc");
        assert_eq!(component.parent_dependency(), Some("./iam"));
        assert_eq!(component.terraform["version"], "1.5");
        assert!(component.children.is_empty());
    }

    #[test]
    fn test_display_name_falls_back_to_path() {
        let component = ComponentConfig {
            path: "./app".to_string(),
            ..Default::default()
        };
        assert_eq!(component.display_name(), "./app");
        assert_eq!(component.parent_dependency(), None);
    }

    #[test]
    fn test_null_sections_decode_as_empty() {
        let component: ComponentConfig = serde_json::from_value(json!({
            "path": "./app",
            "hook": null,
            "build": null,
            "terraform": null,
            "env": null,
            "project": null,
            "children": null
        }))
        .unwrap();

        assert!(component.hook.env.is_none());
        assert!(component.build.settings.is_empty());
        assert!(component.terraform.is_empty());
        assert!(component.env.variables.is_empty());
        assert!(component.children.is_empty());
        assert_eq!(component.project, ProjectConfig::default());
    }

    #[test]
    fn test_id_serialized_only_when_assigned() {
        let mut component = ComponentConfig {
            path: "./app".to_string(),
            ..Default::default()
        };
        assert!(serde_json::to_value(&component).unwrap().get("id").is_none());

        component.id = ComponentId::of("./app");
        let value = serde_json::to_value(&component).unwrap();
        assert_eq!(value["id"], ComponentId::of("./app").as_str());
    }

    #[test]
    fn test_project_keeps_unknown_keys() {
        let project: ProjectConfig = serde_json::from_value(json!({
            "root": "/work/project",
            "name": "demo",
            "include": ["infra"]
        }))
        .unwrap();
        assert_eq!(project.include, vec!["infra"]);
        assert!(project.ignore.is_none());
        assert_eq!(project.settings["name"], "demo");
    }
}
