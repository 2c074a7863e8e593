//! Content-addressed component identifiers.

use crate::paths::relative_to_root;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;

/// Identifier of a component: SHA-256 (lowercase hex) of its root-relative path.
///
/// Two components at the same normalized path always share an identifier.
/// Distinct paths are assumed to produce distinct identifiers; collisions are
/// not handled.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(String);

impl ComponentId {
    /// Hex length of an identifier.
    pub const LEN: usize = 64;

    /// Hash a root-relative path string (e.g. `./network/vpc`) as-is.
    pub fn of(relative_path: &str) -> Self {
        Self(hex::encode(Sha256::digest(relative_path.as_bytes())))
    }

    /// Re-express `path` relative to `project_root`, then hash it.
    pub fn for_path(project_root: &Path, path: &Path) -> Self {
        Self::of(&relative_to_root(project_root, path))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether no identifier has been assigned yet.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First eight hex characters, for display.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(8)]
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ComponentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
