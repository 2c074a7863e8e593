//! Integration tests for component resolution and the dependency forest.
//!
//! Each test lays out a small project tree in a temp directory and drives it
//! through the ConfigLoader:
//! - resolve() - Flat component map
//! - forest() - Components nested under their first dependency

use serde_json::json;
use std::fs;
use std::path::Path;
use terrahub_config::config::{
    ComponentId, ConfigError, ConfigLoader, Environment, LoaderSettings, forest_size,
};
use tempfile::TempDir;

/// Write `content` to `relative` below `root`, creating directories.
fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn load(root: &Path) -> ConfigLoader {
    ConfigLoader::load_with_settings(LoaderSettings::new(root)).expect("Failed to load project")
}

fn load_env(root: &Path, environment: &str) -> ConfigLoader {
    let settings = LoaderSettings::new(root).with_environment(Environment::named(environment));
    ConfigLoader::load_with_settings(settings).expect("Failed to load project")
}

fn root_config() -> &'static str {
    r#"
project:
  name: demo
  code: abcd1234
terraform:
  version: 1.5.7
  backend:
    bucket: demo-state
"#
}

#[test]
fn test_root_child_grandchild_forest() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), ".terrahub.yml", root_config());
    write(temp.path(), "base/.terrahub.yml", "component:\n  name: base\n");
    write(
        temp.path(),
        "base/a/.terrahub.yml",
        "component:\n  name: a\n  dependsOn:\n    - ..\n",
    );
    write(
        temp.path(),
        "base/a/b/.terrahub.yml",
        "component:\n  name: b\n  dependsOn:\n    - ../\n",
    );

    let mut loader = load(temp.path());
    let components = loader.resolve().unwrap();
    assert_eq!(components.len(), 3);
    assert_eq!(
        components[&ComponentId::of("./base/a/b")].depends_on,
        vec!["./base/a"]
    );

    let forest = loader.forest().unwrap();
    assert_eq!(forest.len(), 1);
    assert_eq!(forest_size(&forest), 3);

    let base = &forest[&ComponentId::of("./base")];
    assert_eq!(base.display_name(), "base");
    assert_eq!(base.children.len(), 1);
    assert_eq!(base.children[0].path, "./base/a");
    assert_eq!(base.children[0].children.len(), 1);
    assert_eq!(base.children[0].children[0].path, "./base/a/b");
}

#[test]
fn test_components_inherit_root_defaults() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), ".terrahub.yml", root_config());
    write(
        temp.path(),
        "network/vpc/.terrahub.yml",
        "component:\n  name: vpc\nterraform:\n  backend:\n    key: vpc.tfstate\n",
    );

    let mut loader = load(temp.path());
    let root = loader.app_path().unwrap().to_path_buf();
    let components = loader.resolve().unwrap();
    let vpc = &components[&ComponentId::of("./network/vpc")];

    assert_eq!(vpc.path, "./network/vpc");
    assert_eq!(vpc.cfg_env, "default");
    assert_eq!(vpc.project.settings["name"], "demo");
    assert_eq!(vpc.project.root, root);
    assert_eq!(vpc.terraform["version"], "1.5.7");
    assert_eq!(
        vpc.terraform["backend"],
        json!({"bucket": "demo-state", "key": "vpc.tfstate"})
    );
    assert!(vpc.children.is_empty());
}

#[test]
fn test_unresolved_dependency() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), ".terrahub.yml", root_config());
    write(
        temp.path(),
        "app/.terrahub.yml",
        "component:\n  name: app\n  dependsOn:\n    - ../missing\n",
    );

    let mut loader = load(temp.path());
    // the flat map resolves; only the forest needs the dependency
    assert_eq!(loader.components_count().unwrap(), 1);

    match loader.forest().unwrap_err() {
        ConfigError::UnresolvedDependency {
            component,
            dependency,
        } => {
            assert_eq!(component, "app");
            assert_eq!(dependency, "./missing");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_multiple_roots_lists_both_directories() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), ".terrahub.yml", root_config());
    write(temp.path(), "legacy/.terrahub.yml", "project:\n  name: legacy\n");

    let mut loader = load(temp.path());
    let err = loader.resolve().unwrap_err();
    let message = err.to_string();

    match err {
        ConfigError::MultipleRoots { paths } => {
            assert_eq!(paths.len(), 2);
            assert_eq!(paths[0], loader.app_path().unwrap());
            assert_eq!(paths[1], loader.app_path().unwrap().join("legacy"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(message.starts_with("Multiple root configs identified in this project:"));
    assert!(message.contains("  1. "));
    assert!(message.contains("  2. "));
    assert!(message.contains("legacy"));
}

#[test]
fn test_depends_on_scalar_is_structural_error() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), ".terrahub.yml", root_config());
    write(
        temp.path(),
        "app/.terrahub.yml",
        "component:\n  name: app\n  dependsOn: not-an-array\n",
    );

    let mut loader = load(temp.path());
    let err = loader.resolve().unwrap_err();
    assert_eq!(
        err.to_string(),
        "Error in app's configuration! `dependsOn` must be an array of paths"
    );
}

#[test]
fn test_environment_overlay_replaces_arrays_and_pins_workspace() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), ".terrahub.yml", root_config());
    write(
        temp.path(),
        "app/.terrahub.yml",
        "component:\n  name: app\nmapping:\n  - base.tf\n  - vars.tf\nterraform:\n  workspace: default\n",
    );
    write(temp.path(), "app/.terrahub.stage.yml", "mapping:\n  - stage.tf\n");

    let mut stage = load_env(temp.path(), "stage");
    let components = stage.resolve().unwrap();
    let app = &components[&ComponentId::of("./app")];
    assert_eq!(app.cfg_env, "stage");
    assert_eq!(app.mapping, vec!["app/stage.tf"]);
    assert_eq!(app.terraform["workspace"], "stage");
    // root defaults still apply under the overlay
    assert_eq!(app.terraform["version"], "1.5.7");

    let mut default = load(temp.path());
    let components = default.resolve().unwrap();
    let app = &components[&ComponentId::of("./app")];
    assert_eq!(app.mapping, vec!["app/base.tf", "app/vars.tf"]);
    assert_eq!(app.terraform["workspace"], "default");
}

#[test]
fn test_overlay_uses_root_document_extension() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), ".terrahub.json", r#"{"project": {"name": "demo"}}"#);
    write(temp.path(), "app/.terrahub.yml", "component:\n  name: app\n");
    write(temp.path(), "app/.terrahub.prod.json", r#"{"terraform": {"version": "1.6"}}"#);
    write(temp.path(), "app/.terrahub.prod.yml", "terraform:\n  version: ignored\n");

    let mut loader = load_env(temp.path(), "prod");
    let components = loader.resolve().unwrap();
    let app = &components[&ComponentId::of("./app")];
    assert_eq!(app.terraform["version"], "1.6");
    assert_eq!(app.terraform["workspace"], "prod");
}

#[test]
fn test_env_variables_inherited_by_hook_and_build() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), ".terrahub.yml", root_config());
    write(
        temp.path(),
        "app/.terrahub.yml",
        r#"
component:
  name: app
env:
  variables:
    AWS_REGION: us-east-1
    STAGE: component
build:
  env:
    variables:
      STAGE: build
  phases:
    build:
      commands:
        - make
"#,
    );

    let mut loader = load(temp.path());
    let components = loader.resolve().unwrap();
    let app = &components[&ComponentId::of("./app")];

    let build = app.build.variables().unwrap();
    assert_eq!(build["STAGE"], "build");
    assert_eq!(build["AWS_REGION"], "us-east-1");
    assert_eq!(app.build.settings["phases"]["build"]["commands"], json!(["make"]));
    // hook was not declared, so it stays empty
    assert!(app.hook.env.is_none());
}

#[test]
fn test_include_and_ignore_restrict_discovery() {
    let temp = TempDir::new().unwrap();
    write(
        temp.path(),
        ".terrahub.yml",
        "project:\n  name: demo\n  include:\n    - network\n  ignore:\n    - '**/skip/**'\n",
    );
    write(temp.path(), "network/vpc/.terrahub.yml", "component:\n  name: vpc\n");
    write(temp.path(), "network/skip/old/.terrahub.yml", "component:\n  name: old\n");
    write(temp.path(), "app/.terrahub.yml", "component:\n  name: app\n");
    // default exclusions no longer apply once `ignore` is declared
    write(temp.path(), "network/node_modules/x/.terrahub.yml", "component:\n  name: x\n");

    let mut loader = load(temp.path());
    let components = loader.resolve().unwrap();
    let mut paths: Vec<&str> = components.values().map(|c| c.path.as_str()).collect();
    paths.sort();

    assert_eq!(paths, vec!["./network/node_modules/x", "./network/vpc"]);
}

#[test]
fn test_default_ignores_skip_vendor_directories() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), ".terrahub.yml", root_config());
    write(temp.path(), "app/.terrahub.yml", "component:\n  name: app\n");
    write(temp.path(), "app/.terraform/modules/m/.terrahub.yml", "component:\n  name: m\n");
    write(temp.path(), "node_modules/pkg/.terrahub.yml", "component:\n  name: pkg\n");

    let mut loader = load(temp.path());
    assert_eq!(loader.components_count().unwrap(), 1);
}

#[test]
fn test_inline_component_in_root_document() {
    let temp = TempDir::new().unwrap();
    write(
        temp.path(),
        ".terrahub.yml",
        r#"
project:
  name: demo
iam:
  root: ./iam
  name: iam
lambda:
  root: ./functions/lambda
  name: lambda
  dependsOn:
    - ./iam
"#,
    );

    let mut loader = load(temp.path());
    let forest = loader.forest().unwrap();

    assert_eq!(forest.len(), 1);
    let iam = &forest[&ComponentId::of("./iam")];
    assert_eq!(iam.display_name(), "iam");
    assert_eq!(iam.children[0].path, "./functions/lambda");
    assert!(!iam.settings.contains_key("lambda"));
}

#[test]
fn test_component_section_overrides_top_level() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), ".terrahub.yml", root_config());
    write(
        temp.path(),
        "app/.terrahub.yml",
        "name: outer\ncomponent:\n  name: inner\n  dependsOn: []\n",
    );

    let mut loader = load(temp.path());
    let components = loader.resolve().unwrap();
    let app = &components[&ComponentId::of("./app")];
    assert_eq!(app.display_name(), "inner");
    assert!(!app.settings.contains_key("component"));
}
