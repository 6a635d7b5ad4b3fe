//! Immutable configuration tree addressed by dotted paths.
//!
//! A tree is always an object at the root. Leaves are plain JSON values;
//! durations and byte sizes stay as numbers or strings until a typed
//! accessor interprets them (see `typed.rs`).

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Hierarchical configuration value produced by a parser.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigTree {
    root: Map<String, Value>,
}

impl ConfigTree {
    /// An empty tree.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Wrap an object map.
    pub fn from_map(root: Map<String, Value>) -> Self {
        Self { root }
    }

    /// Build a tree from a parsed document root.
    ///
    /// A `null` root (empty document) becomes an empty tree; any other
    /// non-object root is rejected.
    pub fn from_value(value: Value, origin: &str) -> Result<Self> {
        match value {
            Value::Object(root) => Ok(Self { root }),
            Value::Null => Ok(Self::empty()),
            other => Err(ConfigError::parse(
                origin,
                format!(
                    "document root must be an object, found {}",
                    value_type_name(&other)
                ),
            )),
        }
    }

    /// Build a tree from `(dotted.key, value)` pairs.
    ///
    /// `a.b = 1` becomes `{ a: { b: 1 } }`. When a scalar and an object claim
    /// the same path the object wins, whatever order the pairs arrive in.
    pub fn from_dotted_pairs<I, K>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let mut root = Map::new();
        for (key, value) in pairs {
            let segments = parse_path(key.as_ref())?;
            insert_path(&mut root, &segments, value);
        }
        Ok(Self { root })
    }

    /// The root object.
    pub fn root(&self) -> &Map<String, Value> {
        &self.root
    }

    /// Consume the tree, returning the root as a JSON value.
    pub fn into_value(self) -> Value {
        Value::Object(self.root)
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Top-level keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.root.keys().map(String::as_str)
    }

    /// Look up the raw value at `path`.
    ///
    /// Returns `Ok(None)` when any segment is absent or an intermediate value
    /// is not an object.
    pub fn get_value(&self, path: &str) -> Result<Option<&Value>> {
        let segments = parse_path(path)?;
        Ok(lookup(&self.root, &segments))
    }

    /// True when `path` exists and is not null. Malformed paths are never present.
    pub fn has_path(&self, path: &str) -> bool {
        matches!(self.get_value(path), Ok(Some(v)) if !v.is_null())
    }

    /// True when `path` is set to an explicit null.
    pub fn is_null(&self, path: &str) -> Result<bool> {
        match self.get_value(path)? {
            Some(value) => Ok(value.is_null()),
            None => Err(ConfigError::missing(path)),
        }
    }

    /// A tree containing only `path` (and its parents), or an empty tree.
    pub fn with_only_path(&self, path: &str) -> Result<Self> {
        let segments = parse_path(path)?;
        let mut root = Map::new();
        if let Some(value) = lookup(&self.root, &segments) {
            insert_path(&mut root, &segments, value.clone());
        }
        Ok(Self { root })
    }

    /// A copy of this tree with `path` removed.
    pub fn without_path(&self, path: &str) -> Result<Self> {
        let segments = parse_path(path)?;
        let mut root = self.root.clone();
        remove_path(&mut root, &segments);
        Ok(Self { root })
    }

    /// Every leaf as `(dotted.path, value)`, depth first in insertion order.
    ///
    /// Empty objects produce no entries. Segments containing a dot are quoted.
    pub fn entries(&self) -> Vec<(String, &Value)> {
        let mut out = Vec::new();
        collect_entries(&self.root, &mut Vec::new(), &mut out);
        out
    }

    /// Pretty-printed JSON, keys in insertion order.
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.root).map_err(|e| ConfigError::render("json", e))
    }

    /// YAML document, keys in insertion order.
    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(&self.root).map_err(|e| ConfigError::render("yaml", e))
    }
}

impl fmt::Display for ConfigTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = Value::Object(self.root.clone());
        if f.alternate() {
            write!(f, "{:#}", value)
        } else {
            write!(f, "{}", value)
        }
    }
}

/// Split a dotted path into segments.
///
/// Segments may be wrapped in double quotes to contain literal dots,
/// e.g. `a."b.c".d`.
pub fn parse_path(path: &str) -> Result<Vec<String>> {
    if path.is_empty() {
        return Err(ConfigError::bad_path(path, "path is empty"));
    }

    let mut segments = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut in_quotes = false;

    for ch in path.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                quoted = true;
            }
            '.' if !in_quotes => {
                if current.is_empty() && !quoted {
                    return Err(ConfigError::bad_path(path, "path has an empty segment"));
                }
                segments.push(std::mem::take(&mut current));
                quoted = false;
            }
            _ => current.push(ch),
        }
    }

    if in_quotes {
        return Err(ConfigError::bad_path(path, "unterminated quote"));
    }
    if current.is_empty() && !quoted {
        return Err(ConfigError::bad_path(path, "path has an empty segment"));
    }
    segments.push(current);
    Ok(segments)
}

/// Render segments back into a dotted path, quoting where needed.
pub fn render_path(segments: &[String]) -> String {
    segments
        .iter()
        .map(|s| {
            if s.is_empty() || s.contains('.') || s.contains('"') {
                format!("\"{}\"", s.replace('"', ""))
            } else {
                s.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Human-readable type name used in error messages.
pub fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

fn lookup<'a>(root: &'a Map<String, Value>, segments: &[String]) -> Option<&'a Value> {
    let (last, parents) = segments.split_last()?;
    let mut current = root;
    for segment in parents {
        current = current.get(segment)?.as_object()?;
    }
    current.get(last)
}

fn insert_path(root: &mut Map<String, Value>, segments: &[String], value: Value) {
    let Some((last, parents)) = segments.split_last() else {
        return;
    };

    let mut current = root;
    for segment in parents {
        let slot = current
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        current = match slot {
            Value::Object(map) => map,
            _ => return,
        };
    }

    match current.get_mut(last) {
        // An object already at this path wins over a scalar.
        Some(existing) if existing.is_object() && !value.is_object() => {}
        Some(existing) => *existing = value,
        None => {
            current.insert(last.clone(), value);
        }
    }
}

fn remove_path(root: &mut Map<String, Value>, segments: &[String]) {
    let Some((last, parents)) = segments.split_last() else {
        return;
    };
    let mut current = root;
    for segment in parents {
        current = match current.get_mut(segment) {
            Some(Value::Object(map)) => map,
            _ => return,
        };
    }
    current.shift_remove(last);
}

fn collect_entries<'a>(
    map: &'a Map<String, Value>,
    prefix: &mut Vec<String>,
    out: &mut Vec<(String, &'a Value)>,
) {
    for (key, value) in map {
        prefix.push(key.clone());
        match value {
            Value::Object(child) => collect_entries(child, prefix, out),
            leaf => out.push((render_path(prefix), leaf)),
        }
        prefix.pop();
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
    fn test_parse_path_segments() {
        assert_eq!(parse_path("a.b.c").unwrap(), vec!["a", "b", "c"]);
        assert_eq!(parse_path("a.\"b.c\".d").unwrap(), vec!["a", "b.c", "d"]);
        assert_eq!(parse_path("single").unwrap(), vec!["single"]);
    }

    #[test]
    fn test_parse_path_rejects_malformed() {
        assert!(parse_path("").is_err());
        assert!(parse_path("a..b").is_err());
        assert!(parse_path(".a").is_err());
        assert!(parse_path("a.").is_err());
        assert!(parse_path("a.\"b").is_err());
    }

    #[test]
    fn test_render_path_quotes_dotted_segments() {
        let segments = vec!["a".to_string(), "b.c".to_string()];
        assert_eq!(render_path(&segments), "a.\"b.c\"");
    }

    #[test]
    fn test_from_value_root_rules() {
        assert!(ConfigTree::from_value(Value::Null, "x").unwrap().is_empty());
        let err = ConfigTree::from_value(json!([1, 2]), "x").unwrap_err();
        assert!(err.to_string().contains("list"));
    }

    #[test]
    fn test_get_value_nested() {
        let t = tree(json!({"service": {"one": {"size": "10GB"}}}));
        assert_eq!(
            t.get_value("service.one.size").unwrap(),
            Some(&json!("10GB"))
        );
        assert_eq!(t.get_value("service.two.size").unwrap(), None);
        // Walking through a scalar is simply absent
        assert_eq!(t.get_value("service.one.size.x").unwrap(), None);
    }

    #[test]
    fn test_has_path_and_is_null() {
        let t = tree(json!({"a": {"foo": null, "bar": 1}}));
        assert!(t.has_path("a.bar"));
        assert!(!t.has_path("a.foo"));
        assert!(t.is_null("a.foo").unwrap());
        assert!(!t.is_null("a.bar").unwrap());
        assert!(t.is_null("a.missing").is_err());
        assert!(!t.has_path("a..bar"));
    }

    #[test]
    fn test_from_dotted_pairs_expands_paths() {
        let t = ConfigTree::from_dotted_pairs(vec![
            ("service2.one.size2", json!("123")),
            ("myDuration", json!("10 seconds")),
        ])
        .unwrap();
        assert_eq!(
            t.into_value(),
            json!({"service2": {"one": {"size2": "123"}}, "myDuration": "10 seconds"})
        );
    }

    #[test]
    fn test_from_dotted_pairs_object_wins_either_order() {
        let first = ConfigTree::from_dotted_pairs(vec![("a", json!("x")), ("a.b", json!("y"))])
            .unwrap();
        let second = ConfigTree::from_dotted_pairs(vec![("a.b", json!("y")), ("a", json!("x"))])
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(first.into_value(), json!({"a": {"b": "y"}}));
    }

    #[test]
    fn test_with_only_and_without_path() {
        let t = tree(json!({"a": {"b": 1, "c": 2}, "d": 3}));
        assert_eq!(
            t.with_only_path("a.b").unwrap().into_value(),
            json!({"a": {"b": 1}})
        );
        assert_eq!(
            t.without_path("a.b").unwrap().into_value(),
            json!({"a": {"c": 2}, "d": 3})
        );
        assert!(t.with_only_path("nope").unwrap().is_empty());
    }

    #[test]
    fn test_entries_flatten_leaves() {
        let t = tree(json!({"a": {"b": 1, "c.d": 2}, "e": [1], "empty": {}}));
        let entries: Vec<String> = t.entries().into_iter().map(|(k, _)| k).collect();
        assert_eq!(entries, vec!["a.b", "a.\"c.d\"", "e"]);
    }

    #[test]
    fn test_render_keeps_key_order() {
        let t = tree(json!({"zeta": {"b": 1, "a": null}, "alpha": "x"}));

        let pretty = t.to_json_string().unwrap();
        assert_eq!(
            pretty,
            "{\n  \"zeta\": {\n    \"b\": 1,\n    \"a\": null\n  },\n  \"alpha\": \"x\"\n}"
        );

        let yaml = t.to_yaml_string().unwrap();
        assert_eq!(yaml, "zeta:\n  b: 1\n  a: null\nalpha: x\n");
    }

    #[test]
    fn test_display_is_json() {
        let t = tree(json!({"a": 1}));
        assert_eq!(t.to_string(), r#"{"a":1}"#);
    }
}
