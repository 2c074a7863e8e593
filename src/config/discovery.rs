//! Locating the root document and enumerating component documents.

use super::document::{BASE_NAME, DocumentFormat, read_document};
use crate::error::{ConfigError, ConfigResult};
use crate::paths::{normalize_path_components, path_to_forward_slashes};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Exclusions used when the project does not declare `ignore`.
pub const DEFAULT_IGNORE_PATTERNS: [&str; 3] = ["**/node_modules/**", "**/.terraform/**", "**/.git/**"];

/// Which documents a listing returns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DocumentKind {
    /// Base documents: `.terrahub.{json,yml,yaml}`.
    #[default]
    Default,
    /// Documents of one environment: `.terrahub.<env>.{json,yml,yaml}`.
    Specific(String),
    /// Every document: `.terrahub*.{json,yml,yaml}`.
    Every,
}

impl DocumentKind {
    /// Whether a file name belongs to this kind.
    pub fn matches(&self, file_name: &str) -> bool {
        match self {
            Self::Default => DocumentFormat::ALL
                .iter()
                .any(|format| file_name == format.default_file_name()),
            Self::Specific(environment) => DocumentFormat::ALL
                .iter()
                .any(|format| file_name == format.environment_file_name(environment)),
            Self::Every => {
                file_name.starts_with(BASE_NAME)
                    && DocumentFormat::ALL.iter().any(|format| {
                        file_name.len() > BASE_NAME.len()
                            && file_name.ends_with(format.extension())
                    })
            }
        }
    }
}

/// Walk upward from `start_dir` to the first directory whose root-named
/// document declares a `project` section.
///
/// When a directory holds several candidates, the last one in sorted order
/// is the one inspected. Returns `None` once the filesystem root has been
/// checked without success.
pub fn find_root(start_dir: &Path) -> ConfigResult<Option<PathBuf>> {
    let start = std::path::absolute(start_dir).map_err(|e| ConfigError::io(start_dir, e))?;
    let mut dir = normalize_path_components(&start);

    loop {
        if let Some(candidate) = root_candidates(&dir).pop() {
            let layer = read_document(&candidate)?;
            if layer.contains_key("project") {
                debug!(path = %candidate.display(), "Found root config");
                return Ok(Some(candidate));
            }
            debug!(path = %candidate.display(), "Config without project section, continuing upward");
        }

        match dir.parent() {
            Some(parent) if parent != dir => dir = parent.to_path_buf(),
            _ => {
                debug!(start = %start.display(), "No root config found");
                return Ok(None);
            }
        }
    }
}

/// Root-named documents directly inside `dir`, sorted by name.
fn root_candidates(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    // `Path::is_file` follows symlinks
    let mut candidates: Vec<PathBuf> = entries
        .flatten()
        .filter(|entry| entry.path().is_file())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| DocumentKind::Default.matches(name))
        })
        .map(|entry| entry.path())
        .collect();
    candidates.sort();
    candidates
}

/// Compile ignore globs. `*` does not cross directory separators.
pub fn build_ignore_set<S: AsRef<str>>(patterns: &[S]) -> ConfigResult<GlobSet> {
    compile_globs(patterns.iter().map(|p| p.as_ref()))
}

/// Directories whose whole subtree is ignored.
///
/// Only patterns of the form `<dir>/**` qualify: every path below a
/// directory matching `<dir>` matches the pattern, so the walk can skip it.
pub fn build_prune_set<S: AsRef<str>>(patterns: &[S]) -> ConfigResult<GlobSet> {
    compile_globs(
        patterns
            .iter()
            .filter_map(|p| p.as_ref().strip_suffix("/**"))
            .filter(|dir| !dir.is_empty()),
    )
}

fn compile_globs<'a>(patterns: impl Iterator<Item = &'a str> + Clone) -> ConfigResult<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns.clone() {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| ConfigError::InvalidPattern {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| ConfigError::InvalidPattern {
        pattern: patterns.collect::<Vec<_>>().join(", "),
        message: e.to_string(),
    })
}

/// Enumerate documents of `kind` below each of `search_paths`.
///
/// Ignore patterns are matched against the path relative to the search path
/// being walked. Hidden files and directories are included, and symlinked
/// documents are listed; symlinked directories are not descended into.
/// Unreadable entries are logged and skipped. Results are sorted within each
/// search path and concatenated in search-path order.
pub fn list_config_files<S: AsRef<str>>(
    search_paths: &[PathBuf],
    kind: &DocumentKind,
    ignore: &[S],
) -> ConfigResult<Vec<PathBuf>> {
    let ignore_set = build_ignore_set(ignore)?;
    let prune_set = build_prune_set(ignore)?;
    let mut files = Vec::new();

    for search_path in search_paths {
        if !search_path.is_dir() {
            warn!(path = %search_path.display(), "Search path is not a directory, skipping");
            continue;
        }

        let relative = |path: &Path| {
            path_to_forward_slashes(path.strip_prefix(search_path).unwrap_or(path))
        };

        let walker = WalkDir::new(search_path)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0
                    || !entry.file_type().is_dir()
                    || !prune_set.is_match(relative(entry.path()))
            });

        let mut found = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable entry");
                    continue;
                }
            };
            let matches_kind = entry
                .file_name()
                .to_str()
                .is_some_and(|name| kind.matches(name));
            if matches_kind
                && entry.path().is_file()
                && !ignore_set.is_match(relative(entry.path()))
            {
                found.push(entry.into_path());
            }
        }
        found.sort();

        debug!(path = %search_path.display(), count = found.len(), "Listed config files");
        files.extend(found);
    }

    Ok(files)
}
