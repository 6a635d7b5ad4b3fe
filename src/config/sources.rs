//! Configuration sources: resources, files and the formats they are written in.
//!
//! Resources are looked up by relative name, first among embedded entries and
//! then under each resource root in order (first-found-wins). Files are read
//! straight from the filesystem.

use super::tree::ConfigTree;
use crate::error::{ConfigError, Result};
use serde_json::Value;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Syntax of a configuration source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Json,
    Toml,
    Properties,
}

impl Format {
    /// Extensions probed, in order, when a resource name has none.
    pub const PROBE_EXTENSIONS: [&'static str; 5] = ["yaml", "yml", "json", "toml", "properties"];

    /// Detect the format from a file name. Unknown or missing extensions
    /// are read as YAML, which also accepts JSON documents.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        match ext.as_str() {
            "json" => Format::Json,
            "toml" => Format::Toml,
            "properties" => Format::Properties,
            _ => Format::Yaml,
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Format::Yaml => write!(f, "yaml"),
            Format::Json => write!(f, "json"),
            Format::Toml => write!(f, "toml"),
            Format::Properties => write!(f, "properties"),
        }
    }
}

/// Parse source text into a tree.
pub fn parse_str(text: &str, format: Format, origin: &str) -> Result<ConfigTree> {
    if text.trim().is_empty() {
        return Ok(ConfigTree::empty());
    }

    match format {
        Format::Yaml => {
            let value: Value =
                serde_yaml::from_str(text).map_err(|e| ConfigError::parse(origin, e))?;
            ConfigTree::from_value(value, origin)
        }
        Format::Json => {
            let value: Value =
                serde_json::from_str(text).map_err(|e| ConfigError::parse(origin, e))?;
            ConfigTree::from_value(value, origin)
        }
        Format::Toml => {
            let value: toml::Value =
                toml::from_str(text).map_err(|e| ConfigError::parse(origin, e))?;
            ConfigTree::from_value(toml_to_json(value), origin)
        }
        Format::Properties => {
            let pairs = parse_properties(text)
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)));
            ConfigTree::from_dotted_pairs(pairs).map_err(|e| ConfigError::parse(origin, e))
        }
    }
}

/// Convert a TOML value to JSON.
fn toml_to_json(toml: toml::Value) -> Value {
    match toml {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

/// Parse `.properties` text into ordered `(key, value)` pairs.
///
/// Supports `=`, `:` or whitespace separators, `#`/`!` comments, trailing
/// backslash continuations and the usual escapes. Later duplicates win.
pub fn parse_properties(text: &str) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = Vec::new();
    let mut logical = String::new();

    for raw in text.lines() {
        let line = raw.trim_start();
        if logical.is_empty() && (line.is_empty() || line.starts_with('#') || line.starts_with('!'))
        {
            continue;
        }

        if ends_with_continuation(line) {
            logical.push_str(&line[..line.len() - 1]);
            continue;
        }
        logical.push_str(line);
        push_property(&mut pairs, &logical);
        logical.clear();
    }

    // Continuation on the last line
    if !logical.is_empty() {
        push_property(&mut pairs, &logical);
    }

    pairs
}

fn push_property(pairs: &mut Vec<(String, String)>, logical: &str) {
    let (key, value) = split_property(logical);
    let key = unescape(key.trim_end());
    let value = unescape(value);
    match pairs.iter_mut().find(|(k, _)| *k == key) {
        Some(existing) => existing.1 = value,
        None => pairs.push((key, value)),
    }
}

fn ends_with_continuation(line: &str) -> bool {
    let trailing = line.chars().rev().take_while(|c| *c == '\\').count();
    trailing % 2 == 1
}

fn split_property(line: &str) -> (&str, &str) {
    let mut escaped = false;
    for (i, ch) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '=' | ':' => return (&line[..i], line[i + 1..].trim()),
            c if c.is_whitespace() => {
                let rest = line[i..].trim_start();
                let rest = rest
                    .strip_prefix('=')
                    .or_else(|| rest.strip_prefix(':'))
                    .unwrap_or(rest);
                return (&line[..i], rest.trim());
            }
            _ => {}
        }
    }
    (line, "")
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{000C}'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

/// Where a resolved resource came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceOrigin {
    /// Found under one of the resource roots
    Disk,
    /// Registered in memory
    Embedded,
}

impl std::fmt::Display for ResourceOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceOrigin::Disk => write!(f, "disk"),
            ResourceOrigin::Embedded => write!(f, "embedded"),
        }
    }
}

/// A resolved resource with its content and metadata.
#[derive(Debug, Clone)]
pub struct ResolvedResource {
    /// Normalized resource name
    pub name: String,
    /// The resource text
    pub content: String,
    /// The path where the resource was found (None for embedded)
    pub path: Option<PathBuf>,
    pub origin: ResourceOrigin,
}

impl ResolvedResource {
    pub fn format(&self) -> Format {
        Format::from_path(&self.name)
    }

    /// Parse the resource text into a tree.
    pub fn parse(&self) -> Result<ConfigTree> {
        parse_str(&self.content, self.format(), &self.name)
    }
}

#[derive(Debug, Clone)]
struct EmbeddedResource {
    name: String,
    content: Cow<'static, str>,
}

/// Resolves resource names against embedded entries and root directories.
#[derive(Debug, Clone, Default)]
pub struct ResourceLocator {
    roots: Vec<PathBuf>,
    embedded: Vec<EmbeddedResource>,
}

impl ResourceLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a root directory searched after existing ones.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.roots.push(root.into());
        self
    }

    /// Register an in-memory resource, e.g. one included with `include_str!`.
    pub fn with_embedded(
        mut self,
        name: impl Into<String>,
        content: impl Into<Cow<'static, str>>,
    ) -> Self {
        let name: String = name.into();
        self.embedded.push(EmbeddedResource {
            name: normalize_name(&name).to_string(),
            content: content.into(),
        });
        self
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Find a resource by exact name.
    ///
    /// Returns `Ok(None)` when nothing matches; read failures of a matching
    /// file are parse errors.
    pub fn find(&self, name: &str) -> Result<Option<ResolvedResource>> {
        let name = normalize_name(name);
        if name.is_empty() {
            return Ok(None);
        }

        if let Some(entry) = self.embedded.iter().find(|e| e.name == name) {
            return Ok(Some(ResolvedResource {
                name: name.to_string(),
                content: entry.content.to_string(),
                path: None,
                origin: ResourceOrigin::Embedded,
            }));
        }

        for root in &self.roots {
            let path = root.join(name);
            if path.is_file() {
                let content = std::fs::read_to_string(&path)
                    .map_err(|e| ConfigError::parse(path.display().to_string(), e))?;
                debug!(resource = %name, path = %path.display(), "resolved resource");
                return Ok(Some(ResolvedResource {
                    name: name.to_string(),
                    content,
                    path: Some(path),
                    origin: ResourceOrigin::Disk,
                }));
            }
        }

        Ok(None)
    }

    /// Find a resource by base name, probing each known extension when the
    /// name has none.
    pub fn find_any(&self, name: &str) -> Result<Option<ResolvedResource>> {
        if Path::new(normalize_name(name)).extension().is_some() {
            return self.find(name);
        }
        for ext in Format::PROBE_EXTENSIONS {
            if let Some(found) = self.find(&format!("{}.{}", name, ext))? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    /// Resolve a resource that must exist.
    pub fn resolve(&self, name: &str) -> Result<ResolvedResource> {
        self.find_any(name)?
            .ok_or_else(|| ConfigError::not_found(name))
    }
}

fn normalize_name(name: &str) -> &str {
    name.trim().trim_start_matches('/')
}

/// Read and parse a file, choosing the format from its extension.
pub fn parse_file_path(path: &Path) -> Result<ConfigTree> {
    let origin = path.display().to_string();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::parse(&origin, e))?;
    parse_str(&content, Format::from_path(path), &origin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_format_from_path() {
        assert_eq!(Format::from_path("a/b.yaml"), Format::Yaml);
        assert_eq!(Format::from_path("a/b.YML"), Format::Yaml);
        assert_eq!(Format::from_path("b.json"), Format::Json);
        assert_eq!(Format::from_path("b.toml"), Format::Toml);
        assert_eq!(Format::from_path("b.properties"), Format::Properties);
        assert_eq!(Format::from_path("b.conf"), Format::Yaml);
        assert_eq!(Format::from_path("noext"), Format::Yaml);
    }

    #[test]
    fn test_parse_each_format() {
        let yaml = parse_str("a:\n  b: 1\n", Format::Yaml, "y").unwrap();
        let json = parse_str(r#"{"a": {"b": 1}}"#, Format::Json, "j").unwrap();
        let toml = parse_str("[a]\nb = 1\n", Format::Toml, "t").unwrap();
        assert_eq!(yaml, json);
        assert_eq!(json, toml);

        let props = parse_str("a.b = 1\n", Format::Properties, "p").unwrap();
        assert_eq!(props.into_value(), json!({"a": {"b": "1"}}));
    }

    #[test]
    fn test_parse_empty_and_malformed() {
        assert!(parse_str("   \n", Format::Json, "e").unwrap().is_empty());
        let err = parse_str("{ not json", Format::Json, "broken.json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { ref origin, .. } if origin == "broken.json"));
        assert!(parse_str("- 1\n- 2\n", Format::Yaml, "list.yaml").is_err());
        assert!(parse_str("a = [", Format::Toml, "bad.toml").is_err());
    }

    #[test]
    fn test_properties_syntax() {
        let text = "\
# comment
! also comment

service2.one.size3=20000000000000000
service2.one.foo = bar
colon: value
spaced value here
multi = one, \\
        two
escaped\\=key = tab\\there
unicode = \\u0041
";
        let pairs = parse_properties(text);
        assert_eq!(
            pairs,
            vec![
                ("service2.one.size3".to_string(), "20000000000000000".to_string()),
                ("service2.one.foo".to_string(), "bar".to_string()),
                ("colon".to_string(), "value".to_string()),
                ("spaced".to_string(), "value here".to_string()),
                ("multi".to_string(), "one, two".to_string()),
                ("escaped=key".to_string(), "tab\there".to_string()),
                ("unicode".to_string(), "A".to_string()),
            ]
        );
    }

    #[test]
    fn test_properties_later_duplicate_wins() {
        let pairs = parse_properties("a=1\na=2\n");
        assert_eq!(pairs, vec![("a".to_string(), "2".to_string())]);
    }

    #[test]
    fn test_locator_embedded_before_roots() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("app.yaml"), "from: disk\n").unwrap();

        let locator = ResourceLocator::new()
            .with_root(dir.path())
            .with_embedded("/app.yaml", "from: embedded\n");

        let found = locator.resolve("app.yaml").unwrap();
        assert_eq!(found.origin, ResourceOrigin::Embedded);
        assert_eq!(found.parse().unwrap().get_string("from").unwrap(), "embedded");
    }

    #[test]
    fn test_locator_first_root_wins() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        std::fs::create_dir_all(first.path().join("path/to")).unwrap();
        std::fs::create_dir_all(second.path().join("path/to")).unwrap();
        std::fs::write(first.path().join("path/to/x.json"), r#"{"n": 1}"#).unwrap();
        std::fs::write(second.path().join("path/to/x.json"), r#"{"n": 2}"#).unwrap();

        let locator = ResourceLocator::new()
            .with_root(first.path())
            .with_root(second.path());
        let found = locator.resolve("/path/to/x.json").unwrap();
        assert_eq!(found.origin, ResourceOrigin::Disk);
        assert_eq!(found.path.as_deref(), Some(first.path().join("path/to/x.json").as_path()));
        assert_eq!(found.parse().unwrap().get_i64("n").unwrap(), 1);
    }

    #[test]
    fn test_locator_probes_extensions() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("application.toml"), "k = 'v'\n").unwrap();
        let locator = ResourceLocator::new().with_root(dir.path());

        let found = locator.find_any("application").unwrap().unwrap();
        assert_eq!(found.name, "application.toml");
        assert_eq!(found.format(), Format::Toml);
    }

    #[test]
    fn test_locator_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("adir")).unwrap();
        let locator = ResourceLocator::new().with_root(dir.path());

        assert!(matches!(
            locator.resolve("nope.yaml"),
            Err(ConfigError::NotFound { .. })
        ));
        // Directories are not resources
        assert!(matches!(
            locator.resolve("adir"),
            Err(ConfigError::NotFound { .. })
        ));
        assert!(matches!(locator.resolve(""), Err(ConfigError::NotFound { .. })));
    }

    #[test]
    fn test_parse_file_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("override.properties");
        std::fs::write(&path, "service.one.size=123\n").unwrap();
        let tree = parse_file_path(&path).unwrap();
        assert_eq!(tree.get_bytes("service.one.size").unwrap(), 123);

        let missing = dir.path().join("missing.yaml");
        assert!(matches!(
            parse_file_path(&missing),
            Err(ConfigError::Parse { .. })
        ));
    }
}
