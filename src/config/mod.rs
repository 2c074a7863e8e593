//! Hierarchical component configuration.
//!
//! A project is a directory tree holding one root document (a `.terrahub.*`
//! file with a `project` section) and any number of component documents.
//! Resolution runs in four steps:
//! 1. **Discovery** - walk upward to the root document, then enumerate
//!    component documents below it
//! 2. **Merge** - layer built-in defaults, root settings, component settings
//!    and environment overlays
//! 3. **Addressing** - identify each component by the hash of its
//!    root-relative path
//! 4. **Forest** - nest components under their first dependency
//!
//! ## Environment Variables
//! - `TERRAHUB_ENV` - Active environment (overlay documents `.terrahub.<env>.*`)
//! - `TERRAHUB_FORMAT` - Document format for projects without a root document

mod discovery;
mod document;
mod forest;
mod hashing;
mod loader;
mod merge;
mod resolver;
mod types;

pub use crate::error::{ConfigError, ConfigResult};
pub use discovery::{
    DEFAULT_IGNORE_PATTERNS, DocumentKind, build_ignore_set, find_root, list_config_files,
};
pub use document::{BASE_NAME, DocumentFormat, RawLayer, read_document, write_document};
pub use forest::{build_forest, forest_size};
pub use hashing::ComponentId;
pub use loader::{ConfigLoader, Environment, ListOptions, LoaderPhase, LoaderSettings};
pub use merge::{ArrayPolicy, deep_merge, merge, merge_layers};
pub use resolver::{ComponentResolver, RootDocument, read_layered};
pub use types::*;
