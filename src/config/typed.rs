//! Typed reads over a [`ConfigTree`].
//!
//! Values coming from properties files and system properties are always
//! strings, so every numeric accessor also accepts a string and parses it.

use super::tree::{ConfigTree, value_type_name};
use super::units;
use crate::error::{ConfigError, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

impl ConfigTree {
    /// Fetch a value that must be present and non-null.
    fn require(&self, path: &str) -> Result<&Value> {
        match self.get_value(path)? {
            None => Err(ConfigError::missing(path)),
            Some(Value::Null) => Err(ConfigError::null(path)),
            Some(value) => Ok(value),
        }
    }

    /// String value; numbers and booleans are rendered as text.
    pub fn get_string(&self, path: &str) -> Result<String> {
        match self.require(path)? {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            other => Err(ConfigError::wrong_type(path, "string", value_type_name(other))),
        }
    }

    /// Like [`get_string`](Self::get_string), but an explicit null yields `None`.
    ///
    /// A missing path is still an error.
    pub fn get_optional_string(&self, path: &str) -> Result<Option<String>> {
        if self.is_null(path)? {
            Ok(None)
        } else {
            self.get_string(path).map(Some)
        }
    }

    pub fn get_i64(&self, path: &str) -> Result<i64> {
        match self.require(path)? {
            Value::Number(n) => {
                if let Some(v) = n.as_i64() {
                    Ok(v)
                } else if n.is_u64() {
                    Err(ConfigError::bad_value(path, format!("{} is out of range", n)))
                } else {
                    Err(ConfigError::wrong_type(path, "integer", "fractional number"))
                }
            }
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|e| ConfigError::bad_value(path, format!("'{}': {}", s, e))),
            other => Err(ConfigError::wrong_type(path, "number", value_type_name(other))),
        }
    }

    pub fn get_f64(&self, path: &str) -> Result<f64> {
        match self.require(path)? {
            Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| ConfigError::bad_value(path, format!("{} is not finite", n))),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|e| ConfigError::bad_value(path, format!("'{}': {}", s, e))),
            other => Err(ConfigError::wrong_type(path, "number", value_type_name(other))),
        }
    }

    /// Boolean value; strings `true/false/yes/no/on/off` are accepted.
    pub fn get_bool(&self, path: &str) -> Result<bool> {
        match self.require(path)? {
            Value::Bool(b) => Ok(*b),
            Value::String(s) => match s.trim() {
                "true" | "yes" | "on" => Ok(true),
                "false" | "no" | "off" => Ok(false),
                other => Err(ConfigError::bad_value(
                    path,
                    format!("'{}' is not a boolean", other),
                )),
            },
            other => Err(ConfigError::wrong_type(path, "boolean", value_type_name(other))),
        }
    }

    /// Duration value. Plain numbers are milliseconds.
    pub fn get_duration(&self, path: &str) -> Result<Duration> {
        match self.require(path)? {
            Value::Number(n) => {
                if let Some(millis) = n.as_u64() {
                    Ok(Duration::from_millis(millis))
                } else {
                    let millis = n.as_f64().unwrap_or(f64::NAN);
                    units::duration_from_millis(millis)
                        .map_err(|e| ConfigError::bad_value(path, e))
                }
            }
            Value::String(s) => {
                units::parse_duration(s).map_err(|e| ConfigError::bad_value(path, e))
            }
            other => Err(ConfigError::wrong_type(
                path,
                "duration",
                value_type_name(other),
            )),
        }
    }

    /// Byte-size value in bytes. Plain numbers are bytes.
    pub fn get_bytes(&self, path: &str) -> Result<u64> {
        match self.require(path)? {
            Value::Number(n) => {
                if let Some(bytes) = n.as_u64() {
                    Ok(bytes)
                } else {
                    // Negative or fractional numbers go through the string parser
                    // so they get the same truncation and range rules.
                    units::parse_bytes(&n.to_string())
                        .map_err(|e| ConfigError::bad_value(path, e))
                }
            }
            Value::String(s) => units::parse_bytes(s).map_err(|e| ConfigError::bad_value(path, e)),
            other => Err(ConfigError::wrong_type(path, "size", value_type_name(other))),
        }
    }

    pub fn get_list(&self, path: &str) -> Result<&[Value]> {
        match self.require(path)? {
            Value::Array(items) => Ok(items.as_slice()),
            other => Err(ConfigError::wrong_type(path, "list", value_type_name(other))),
        }
    }

    pub fn get_string_list(&self, path: &str) -> Result<Vec<String>> {
        self.get_list(path)?
            .iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::String(s) => Ok(s.clone()),
                Value::Number(n) => Ok(n.to_string()),
                Value::Bool(b) => Ok(b.to_string()),
                other => Err(ConfigError::wrong_type(
                    &format!("{}[{}]", path, i),
                    "string",
                    value_type_name(other),
                )),
            })
            .collect()
    }

    /// The object at `path` as its own tree.
    pub fn at_path(&self, path: &str) -> Result<ConfigTree> {
        match self.require(path)? {
            Value::Object(map) => Ok(ConfigTree::from_map(map.clone())),
            other => Err(ConfigError::wrong_type(path, "object", value_type_name(other))),
        }
    }

    /// Deserialize the value at `path` with serde.
    pub fn extract<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let value = self
            .get_value(path)?
            .cloned()
            .ok_or_else(|| ConfigError::missing(path))?;
        serde_json::from_value(value).map_err(|e| ConfigError::bad_value(path, e.to_string()))
    }
}
