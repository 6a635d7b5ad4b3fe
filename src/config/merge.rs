//! Fallback merge for configuration trees.
//!
//! Implements key-by-key merging where the override tree wins on collisions.
//! Lists are replaced entirely, not concatenated. An explicit null in the
//! override is a value and replaces whatever the fallback holds.

use super::tree::ConfigTree;
use serde_json::Value;

/// Deep merge two JSON values, with `overlay` taking precedence over `base`.
///
/// - Objects are merged recursively: keys in overlay override keys in base
/// - Lists, strings, numbers, booleans and nulls replace the base entirely
/// - Keys only present in base keep their position and value
///
/// # Example
/// ```
/// use serde_json::json;
/// use overridable_config::config::deep_merge;
///
/// let base = json!({
///     "service": { "size": "10GB", "size2": "10kB" },
///     "hosts": ["a", "b"]
/// });
/// let overlay = json!({
///     "service": { "size": 123 },
///     "hosts": ["c"]
/// });
/// let result = deep_merge(base, overlay);
/// assert_eq!(result, json!({
///     "service": { "size": 123, "size2": "10kB" },
///     "hosts": ["c"]
/// }));
/// ```
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        // Both are objects: merge recursively
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(slot) => {
                        let base_value = slot.take();
                        *slot = deep_merge(base_value, overlay_value);
                    }
                    None => {
                        base_map.insert(key, overlay_value);
                    }
                }
            }
            Value::Object(base_map)
        }
        // Any other case: overlay replaces base entirely
        (_, overlay) => overlay,
    }
}

/// Merge `overlay` onto `fallback`, returning a new tree.
///
/// Neither input is modified.
pub fn with_fallback(overlay: &ConfigTree, fallback: &ConfigTree) -> ConfigTree {
    let merged = deep_merge(fallback.clone().into_value(), overlay.clone().into_value());
    match merged {
        Value::Object(map) => ConfigTree::from_map(map),
        // Two object roots always merge to an object.
        _ => ConfigTree::empty(),
    }
}

/// Merge trees in order, with later trees taking precedence.
///
/// Equivalent to folding `with_fallback` over the list.
pub fn merge_all(layers: impl IntoIterator<Item = ConfigTree>) -> ConfigTree {
    layers
        .into_iter()
        .fold(ConfigTree::empty(), |acc, layer| with_fallback(&layer, &acc))
}

impl ConfigTree {
    /// Return a new tree where `self` wins and `fallback` fills the gaps.
    pub fn with_fallback(&self, fallback: &ConfigTree) -> ConfigTree {
        with_fallback(self, fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tree(value: Value) -> ConfigTree {
        ConfigTree::from_value(value, "test").unwrap()
    }

    #[test]
    fn test_merge_simple_objects() {
        let base = json!({"a": 1, "b": 2});
        let overlay = json!({"b": 3, "c": 4});
        let result = deep_merge(base, overlay);
        assert_eq!(result, json!({"a": 1, "b": 3, "c": 4}));
    }

    #[test]
    fn test_merge_nested_objects() {
        let base = json!({
            "service": {"one": {"size": "10GB", "size2": "10kB"}},
            "myDuration": "12h"
        });
        let overlay = json!({
            "service": {"one": {"size": 123}}
        });
        let result = deep_merge(base, overlay);
        assert_eq!(
            result,
            json!({
                "service": {"one": {"size": 123, "size2": "10kB"}},
                "myDuration": "12h"
            })
        );
    }

    #[test]
    fn test_lists_replaced_not_merged() {
        let base = json!({"items": [1, 2, 3]});
        let overlay = json!({"items": [4, 5]});
        let result = deep_merge(base, overlay);
        assert_eq!(result, json!({"items": [4, 5]}));
    }

    #[test]
    fn test_null_overrides_base() {
        let base = json!({"a": 1, "b": {"c": 2}});
        let overlay = json!({"a": null});
        let result = deep_merge(base, overlay);
        assert_eq!(result, json!({"a": null, "b": {"c": 2}}));
    }

    #[test]
    fn test_value_replaces_null() {
        let base = json!({"service2": {"one": {"foo": null, "size": "10GB"}}});
        let overlay = json!({"service2": {"one": {"foo": "bar"}}});
        let result = deep_merge(base, overlay);
        assert_eq!(
            result,
            json!({"service2": {"one": {"foo": "bar", "size": "10GB"}}})
        );
    }

    #[test]
    fn test_overlay_replaces_primitive_with_object() {
        let base = json!({"value": 42});
        let overlay = json!({"value": {"nested": true}});
        let result = deep_merge(base, overlay);
        assert_eq!(result, json!({"value": {"nested": true}}));
    }

    #[test]
    fn test_overlay_replaces_object_with_primitive() {
        let base = json!({"value": {"nested": true}});
        let overlay = json!({"value": 42});
        let result = deep_merge(base, overlay);
        assert_eq!(result, json!({"value": 42}));
    }

    #[test]
    fn test_merge_keeps_base_key_order() {
        let base = json!({"first": 1, "second": 2, "third": 3});
        let overlay = json!({"first": 10, "fourth": 4});
        let result = deep_merge(base, overlay);
        let keys: Vec<&String> = result.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["first", "second", "third", "fourth"]);
    }

    #[test]
    fn test_with_fallback_leaves_inputs_untouched() {
        let fallback = tree(json!({"a": {"b": 1, "c": 2}}));
        let overlay = tree(json!({"a": {"b": 9}}));
        let merged = overlay.with_fallback(&fallback);

        assert_eq!(merged.into_value(), json!({"a": {"b": 9, "c": 2}}));
        assert_eq!(fallback.clone().into_value(), json!({"a": {"b": 1, "c": 2}}));
        assert_eq!(overlay.clone().into_value(), json!({"a": {"b": 9}}));
    }

    #[test]
    fn test_merge_all_later_wins() {
        let layers = vec![
            tree(json!({"a": 1, "n": {"x": 1}})),
            tree(json!({"b": 2, "n": {"y": 2}})),
            tree(json!({"a": 3, "n": {"x": 3}})),
        ];
        let result = merge_all(layers);
        assert_eq!(
            result.into_value(),
            json!({"a": 3, "n": {"x": 3, "y": 2}, "b": 2})
        );
    }

    #[test]
    fn test_merge_with_empty_is_identity() {
        let t = tree(json!({"a": {"b": [1, 2]}}));
        assert_eq!(t.with_fallback(&ConfigTree::empty()), t);
        assert_eq!(ConfigTree::empty().with_fallback(&t), t);
    }
}
