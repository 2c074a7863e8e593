//! Lexical path handling for component addressing.
//!
//! Component paths are stored root-relative with a leading `./` marker
//! (e.g. `./network/vpc`), always using forward slashes. Nothing in this
//! module touches the filesystem: dependency targets are normalized even
//! when they do not exist yet.

use std::path::{Component, Path, PathBuf};

/// Marker that replaces the absolute project root in relative paths.
pub const ROOT_MARKER: &str = ".";

/// Normalize path components without requiring the file to exist.
/// Handles `.` and `..` components.
pub fn normalize_path_components(path: &Path) -> PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::Prefix(p) => components.push(Component::Prefix(p)),
            Component::RootDir => components.push(Component::RootDir),
            Component::CurDir => {}
            Component::ParentDir => match components.last() {
                Some(Component::Normal(_)) => {
                    components.pop();
                }
                // `/..` stays at the root
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => components.push(Component::ParentDir),
            },
            Component::Normal(name) => components.push(Component::Normal(name)),
        }
    }

    components.iter().collect()
}

/// Convert path to string using forward slashes.
pub fn path_to_forward_slashes(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Join two path strings and normalize the result.
///
/// Unlike [`Path::join`], an absolute `tail` does not discard `base`: the two
/// are concatenated and then normalized. An empty result collapses to `.`.
pub fn join_normalized(base: &str, tail: &str) -> String {
    let joined = if base.is_empty() {
        tail.to_string()
    } else {
        format!("{}/{}", base.trim_end_matches('/'), tail)
    };
    let normalized = path_to_forward_slashes(&normalize_path_components(Path::new(&joined)));
    if normalized.is_empty() {
        ROOT_MARKER.to_string()
    } else {
        normalized
    }
}

/// Re-express `path` relative to `root`, replacing the root prefix with `.`.
///
/// Paths outside `root` are returned unchanged (in forward-slash form).
pub fn relative_to_root(root: &Path, path: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(rest) if rest.as_os_str().is_empty() => ROOT_MARKER.to_string(),
        Ok(rest) => format!("{}/{}", ROOT_MARKER, path_to_forward_slashes(rest)),
        Err(_) => path_to_forward_slashes(path),
    }
}

/// Resolve `relative` against `root` into an absolute, normalized path.
pub fn resolve_from_root(root: &Path, relative: &str) -> PathBuf {
    normalize_path_components(&root.join(relative))
}
