//! Deep merge functionality for configuration layers.
//!
//! Objects are merged field-by-field, scalars are replaced by the later
//! layer. Arrays are concatenated by default so that every layer keeps its
//! contributions; [`ArrayPolicy::Replace`] lets a later layer pin an exact
//! list instead.

use serde_json::{Map, Value};

/// How two arrays at the same key are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ArrayPolicy {
    /// Earlier elements first, later layer's elements appended (no de-duplication).
    #[default]
    Concat,
    /// The later layer's array replaces the earlier one.
    Replace,
}

/// Deep merge two JSON values, with `overlay` taking precedence over `base`.
///
/// - Objects are merged recursively: keys in overlay override keys in base
/// - Arrays follow `policy`
/// - Everything else (including `null` and type mismatches) is replaced by overlay
///
/// # Example
/// ```
/// use serde_json::json;
/// use terrahub_config::config::{ArrayPolicy, deep_merge};
///
/// let base = json!({"terraform": {"version": "1.5"}, "dependsOn": ["./a"]});
/// let overlay = json!({"terraform": {"workspace": "stage"}, "dependsOn": ["./b"]});
/// let result = deep_merge(base, overlay, ArrayPolicy::Concat);
/// assert_eq!(
///     result,
///     json!({"terraform": {"version": "1.5", "workspace": "stage"}, "dependsOn": ["./a", "./b"]})
/// );
/// ```
pub fn deep_merge(base: Value, overlay: Value, policy: ArrayPolicy) -> Value {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            Value::Object(merge_maps(base_map, overlay_map, policy))
        }
        (Value::Array(mut base_items), Value::Array(overlay_items))
            if policy == ArrayPolicy::Concat =>
        {
            base_items.extend(overlay_items);
            Value::Array(base_items)
        }
        (_, overlay) => overlay,
    }
}

fn merge_maps(
    mut base: Map<String, Value>,
    overlay: Map<String, Value>,
    policy: ArrayPolicy,
) -> Map<String, Value> {
    for (key, overlay_value) in overlay {
        let merged_value = match base.remove(&key) {
            Some(base_value) => deep_merge(base_value, overlay_value, policy),
            None => overlay_value,
        };
        base.insert(key, merged_value);
    }
    base
}

/// Merge mapping `layers` over the accumulator `base`, in order (last layer wins).
pub fn merge_layers(
    base: Map<String, Value>,
    layers: impl IntoIterator<Item = Map<String, Value>>,
    policy: ArrayPolicy,
) -> Map<String, Value> {
    layers
        .into_iter()
        .fold(base, |merged, layer| merge_maps(merged, layer, policy))
}

/// Merge `layers` over the accumulator `base`, in order (last layer wins).
pub fn merge(base: Value, layers: impl IntoIterator<Item = Value>, policy: ArrayPolicy) -> Value {
    layers
        .into_iter()
        .fold(base, |merged, layer| deep_merge(merged, layer, policy))
}
