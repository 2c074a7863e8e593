//! Configuration loader with explicit phases.
//!
//! The loader owns the discovered root document and, once resolved, the flat
//! component map. Nothing is re-read behind the caller's back: cached results
//! are dropped only by [`ConfigLoader::invalidate`] or
//! [`ConfigLoader::reload`].

use super::discovery::{DEFAULT_IGNORE_PATTERNS, DocumentKind, find_root, list_config_files};
use super::document::{DocumentFormat, read_document, write_document};
use super::forest::build_forest;
use super::hashing::ComponentId;
use super::resolver::{ComponentResolver, RootDocument};
use super::types::{ComponentMap, DependencyForest, ProjectConfig};
use crate::error::{ConfigError, ConfigResult};
use crate::paths::{path_to_forward_slashes, relative_to_root, resolve_from_root};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Returned by [`ConfigLoader::resolve`] for an unconfigured project.
static EMPTY_COMPONENTS: ComponentMap = BTreeMap::new();

/// The active environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    pub name: String,
    /// Whether `name` is the default environment (no overlay documents).
    pub is_default: bool,
}

impl Environment {
    pub const DEFAULT_NAME: &'static str = "default";

    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        let is_default = name == Self::DEFAULT_NAME;
        Self { name, is_default }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::named(Self::DEFAULT_NAME)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Inputs of a [`ConfigLoader`].
#[derive(Debug, Clone, PartialEq)]
pub struct LoaderSettings {
    /// Directory the upward root search starts from.
    pub start_dir: PathBuf,
    pub environment: Environment,
    /// Document format used when the project has no root document yet.
    pub format: DocumentFormat,
}

impl LoaderSettings {
    pub fn new(start_dir: impl Into<PathBuf>) -> Self {
        Self {
            start_dir: start_dir.into(),
            environment: Environment::default(),
            format: DocumentFormat::default(),
        }
    }

    /// Settings from the process environment.
    ///
    /// - `TERRAHUB_ENV` - active environment (default: `default`)
    /// - `TERRAHUB_FORMAT` - format for new documents (default: `yml`)
    ///
    /// Discovery starts from the current directory.
    pub fn from_env() -> ConfigResult<Self> {
        let start_dir = std::env::current_dir().map_err(|e| ConfigError::io(".", e))?;
        Self::from_vars(start_dir, |key| std::env::var(key).ok())
    }

    /// Settings from an arbitrary variable lookup.
    pub fn from_vars(
        start_dir: impl Into<PathBuf>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> ConfigResult<Self> {
        let mut settings = Self::new(start_dir);

        if let Some(name) = lookup("TERRAHUB_ENV")
            && !name.trim().is_empty()
        {
            settings.environment = Environment::named(name.trim());
        }

        if let Some(format) = lookup("TERRAHUB_FORMAT")
            && !format.trim().is_empty()
        {
            settings.format = format.trim().parse()?;
        }

        Ok(settings)
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_format(mut self, format: DocumentFormat) -> Self {
        self.format = format;
        self
    }
}

/// Observable phase of a [`ConfigLoader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderPhase {
    /// No root document was found.
    Unconfigured,
    /// The root document is loaded; components have not been resolved.
    Discovered,
    /// The component map is cached.
    Resolved,
}

impl fmt::Display for LoaderPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoaderPhase::Unconfigured => write!(f, "unconfigured"),
            LoaderPhase::Discovered => write!(f, "discovered"),
            LoaderPhase::Resolved => write!(f, "resolved"),
        }
    }
}

#[derive(Debug, Clone)]
enum LoaderState {
    Unconfigured,
    Discovered(RootDocument),
    Resolved {
        root: RootDocument,
        components: ComponentMap,
    },
}

/// Options of [`ConfigLoader::list_config`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Search only below this directory (relative paths are taken from the
    /// project root).
    pub dir: Option<PathBuf>,
    pub kind: DocumentKind,
}

/// Loader for one project.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    settings: LoaderSettings,
    state: LoaderState,
}

impl ConfigLoader {
    /// Load using [`LoaderSettings::from_env`].
    pub fn load() -> ConfigResult<Self> {
        Self::load_with_settings(LoaderSettings::from_env()?)
    }

    /// Discover the root document from `settings.start_dir`.
    pub fn load_with_settings(settings: LoaderSettings) -> ConfigResult<Self> {
        let state = discover(&settings)?;
        Ok(Self { settings, state })
    }

    pub fn settings(&self) -> &LoaderSettings {
        &self.settings
    }

    pub fn environment(&self) -> &Environment {
        &self.settings.environment
    }

    pub fn phase(&self) -> LoaderPhase {
        match self.state {
            LoaderState::Unconfigured => LoaderPhase::Unconfigured,
            LoaderState::Discovered(_) => LoaderPhase::Discovered,
            LoaderState::Resolved { .. } => LoaderPhase::Resolved,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.root_document().is_some()
    }

    pub fn root_document(&self) -> Option<&RootDocument> {
        match &self.state {
            LoaderState::Unconfigured => None,
            LoaderState::Discovered(root) | LoaderState::Resolved { root, .. } => Some(root),
        }
    }

    /// Project root directory.
    pub fn app_path(&self) -> Option<&Path> {
        self.root_document().map(RootDocument::root_dir)
    }

    pub fn project_config(&self) -> Option<&ProjectConfig> {
        self.root_document().map(|root| &root.project)
    }

    /// Format of the root document, or the configured default.
    pub fn project_format(&self) -> DocumentFormat {
        self.root_document()
            .map(|root| root.format)
            .unwrap_or(self.settings.format)
    }

    /// Name of the document for the active environment.
    pub fn file_name(&self) -> String {
        let environment = &self.settings.environment;
        if environment.is_default {
            self.default_file_name()
        } else {
            self.project_format().environment_file_name(&environment.name)
        }
    }

    pub fn default_file_name(&self) -> String {
        self.project_format().default_file_name()
    }

    /// `project.ignore` when declared, otherwise the built-in exclusions.
    pub fn ignore_patterns(&self) -> Vec<String> {
        effective_ignore_patterns(self.project_config())
    }

    /// `path` relative to the project root (`./a/b`).
    ///
    /// Without a root, the path is returned unchanged.
    pub fn relative_path(&self, path: &Path) -> String {
        match self.app_path() {
            Some(root) => relative_to_root(root, path),
            None => path_to_forward_slashes(path),
        }
    }

    pub fn component_hash(&self, path: &Path) -> ComponentId {
        ComponentId::of(&self.relative_path(path))
    }

    /// Enumerate documents of `options.kind`.
    ///
    /// Searches `options.dir` when given, else every `project.include`
    /// directory, else the project root (the start directory when
    /// unconfigured).
    pub fn list_config(&self, options: &ListOptions) -> ConfigResult<Vec<PathBuf>> {
        let search_paths = match self.root_document() {
            Some(root) => search_paths(root, options.dir.as_deref()),
            None => vec![
                options
                    .dir
                    .clone()
                    .unwrap_or_else(|| self.settings.start_dir.clone()),
            ],
        };
        list_config_files(&search_paths, &options.kind, &self.ignore_patterns())
    }

    /// Resolve every component, caching the result.
    ///
    /// An unconfigured project resolves to an empty map.
    pub fn resolve(&mut self) -> ConfigResult<&ComponentMap> {
        let state = std::mem::replace(&mut self.state, LoaderState::Unconfigured);
        let state = match state {
            LoaderState::Discovered(root) => match resolve_components(&root, &self.settings) {
                Ok(components) => LoaderState::Resolved { root, components },
                Err(e) => {
                    self.state = LoaderState::Discovered(root);
                    return Err(e);
                }
            },
            other => other,
        };
        self.state = state;

        match &self.state {
            LoaderState::Resolved { components, .. } => Ok(components),
            _ => Ok(&EMPTY_COMPONENTS),
        }
    }

    pub fn components_count(&mut self) -> ConfigResult<usize> {
        Ok(self.resolve()?.len())
    }

    /// Dependency forest of the resolved components.
    pub fn forest(&mut self) -> ConfigResult<DependencyForest> {
        build_forest(self.resolve()?)
    }

    /// Drop the cached component map; the root document is kept.
    pub fn invalidate(&mut self) {
        let state = std::mem::replace(&mut self.state, LoaderState::Unconfigured);
        self.state = match state {
            LoaderState::Resolved { root, .. } => LoaderState::Discovered(root),
            other => other,
        };
        debug!(phase = %self.phase(), "Invalidated component cache");
    }

    /// Drop everything and rediscover the root document.
    pub fn reload(&mut self) -> ConfigResult<()> {
        self.state = LoaderState::Unconfigured;
        self.state = discover(&self.settings)?;
        info!(phase = %self.phase(), "Reloaded configuration");
        Ok(())
    }

    /// Set `project.<key>` in the root document and reload.
    pub fn set_project_value(&mut self, key: &str, value: Value) -> ConfigResult<()> {
        let path = self
            .root_document()
            .map(|root| root.path.clone())
            .ok_or(ConfigError::NoRootConfig)?;

        let mut layer = read_document(&path)?;
        let project = layer
            .entry("project")
            .or_insert_with(|| Value::Object(Map::new()));
        if !project.is_object() {
            *project = Value::Object(Map::new());
        }
        if let Value::Object(project) = project {
            project.insert(key.to_string(), value);
        }

        write_document(&layer, &path)?;
        info!(path = %path.display(), key, "Updated project setting");
        self.reload()
    }
}

fn discover(settings: &LoaderSettings) -> ConfigResult<LoaderState> {
    match find_root(&settings.start_dir)? {
        Some(path) => {
            let root = RootDocument::read(&path, &settings.environment)?;
            info!(
                root = %root.root_dir().display(),
                environment = %settings.environment,
                "Discovered project"
            );
            Ok(LoaderState::Discovered(root))
        }
        None => {
            debug!(start = %settings.start_dir.display(), "Project is not configured");
            Ok(LoaderState::Unconfigured)
        }
    }
}

fn search_paths(root: &RootDocument, dir: Option<&Path>) -> Vec<PathBuf> {
    let root_dir = root.root_dir();
    if let Some(dir) = dir {
        return vec![root_dir.join(dir)];
    }
    if root.project.include.is_empty() {
        return vec![root_dir.to_path_buf()];
    }
    root.project
        .include
        .iter()
        .map(|include| resolve_from_root(root_dir, include))
        .collect()
}

fn effective_ignore_patterns(project: Option<&ProjectConfig>) -> Vec<String> {
    project
        .and_then(|project| project.ignore.clone())
        .unwrap_or_else(|| DEFAULT_IGNORE_PATTERNS.iter().map(|p| p.to_string()).collect())
}

fn resolve_components(root: &RootDocument, settings: &LoaderSettings) -> ConfigResult<ComponentMap> {
    let files = list_config_files(
        &search_paths(root, None),
        &DocumentKind::Default,
        &effective_ignore_patterns(Some(&root.project)),
    )?;
    debug!(count = files.len(), "Component documents found");

    ComponentResolver::new(root, &settings.environment).resolve(&files)
}
