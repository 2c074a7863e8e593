//! Dependency forest.
//!
//! A component's first `dependsOn` entry names its parent; components with no
//! dependency are roots. Additional dependencies are kept on the record but
//! do not affect placement.

use super::hashing::ComponentId;
use super::types::{ComponentConfig, ComponentMap, DependencyForest};
use crate::error::{ConfigError, ConfigResult};
use std::collections::BTreeMap;
use tracing::debug;

/// Arrange `components` into a forest keyed by root identifier.
///
/// Every component appears exactly once, either as a root or nested in the
/// `children` of its parent. Components are copied; `components` is not
/// modified. Fails on the first dependency that names no known component.
pub fn build_forest(components: &ComponentMap) -> ConfigResult<DependencyForest> {
    let mut roots = Vec::new();
    let mut children: BTreeMap<ComponentId, Vec<ComponentId>> = BTreeMap::new();

    for (id, component) in components {
        let Some(dependency) = component.parent_dependency() else {
            roots.push(id.clone());
            continue;
        };

        let parent = ComponentId::of(dependency);
        if !components.contains_key(&parent) {
            return Err(ConfigError::UnresolvedDependency {
                component: component.display_name().to_string(),
                dependency: dependency.to_string(),
            });
        }
        children.entry(parent).or_default().push(id.clone());
    }

    let forest: DependencyForest = roots
        .into_iter()
        .filter_map(|id| {
            let node = attach(&id, components, &children)?;
            Some((id, node))
        })
        .collect();

    debug!(
        roots = forest.len(),
        components = components.len(),
        "Built dependency forest"
    );
    Ok(forest)
}

/// Copy `id` and, recursively, every component whose parent it is.
fn attach(
    id: &ComponentId,
    components: &ComponentMap,
    children: &BTreeMap<ComponentId, Vec<ComponentId>>,
) -> Option<ComponentConfig> {
    let mut node = components.get(id)?.clone();
    if let Some(child_ids) = children.get(id) {
        node.children.extend(
            child_ids
                .iter()
                .filter_map(|child| attach(child, components, children)),
        );
    }
    Some(node)
}

/// Number of components in `forest`, descendants included.
pub fn forest_size(forest: &DependencyForest) -> usize {
    fn count(node: &ComponentConfig) -> usize {
        1 + node.children.iter().map(count).sum::<usize>()
    }
    forest.values().map(count).sum()
}
