//! Structured error types for configuration loading and typed reads.

use std::fmt;
use thiserror::Error;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Load errors
    Parse,
    NotFound,

    // Read errors
    Missing,
    Null,
    WrongType,
    BadValue,
    BadPath,

    // Output errors
    Render,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCode::Parse => "PARSE",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Missing => "MISSING",
            ErrorCode::Null => "NULL",
            ErrorCode::WrongType => "WRONG_TYPE",
            ErrorCode::BadValue => "BAD_VALUE",
            ErrorCode::BadPath => "BAD_PATH",
            ErrorCode::Render => "RENDER",
        };
        f.write_str(name)
    }
}

/// Errors raised while loading or reading a configuration tree.
///
/// `load()` only ever yields [`ConfigError::Parse`] or [`ConfigError::NotFound`].
/// The remaining variants come from the typed accessors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Malformed syntax in the default tree, a resource, or a file.
    #[error("{origin}: {message}")]
    Parse { origin: String, message: String },

    /// A resource override path did not resolve.
    #[error("resource not found: {resource}")]
    NotFound { resource: String },

    #[error("no configuration setting found for key '{path}'")]
    Missing { path: String },

    #[error("configuration key '{path}' is set to null")]
    Null { path: String },

    #[error("{path} has type {found} rather than {expected}")]
    WrongType {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("invalid value at '{path}': {message}")]
    BadValue { path: String, message: String },

    #[error("invalid path '{path}': {message}")]
    BadPath { path: String, message: String },

    /// A tree could not be serialized to the requested format.
    #[error("cannot render configuration as {format}: {message}")]
    Render { format: &'static str, message: String },
}

impl ConfigError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ConfigError::Parse { .. } => ErrorCode::Parse,
            ConfigError::NotFound { .. } => ErrorCode::NotFound,
            ConfigError::Missing { .. } => ErrorCode::Missing,
            ConfigError::Null { .. } => ErrorCode::Null,
            ConfigError::WrongType { .. } => ErrorCode::WrongType,
            ConfigError::BadValue { .. } => ErrorCode::BadValue,
            ConfigError::BadPath { .. } => ErrorCode::BadPath,
            ConfigError::Render { .. } => ErrorCode::Render,
        }
    }

    // Convenience constructors

    pub fn parse(origin: impl Into<String>, err: impl fmt::Display) -> Self {
        Self::Parse {
            origin: origin.into(),
            message: err.to_string(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn missing(path: &str) -> Self {
        Self::Missing {
            path: path.to_string(),
        }
    }

    pub fn null(path: &str) -> Self {
        Self::Null {
            path: path.to_string(),
        }
    }

    pub fn wrong_type(path: &str, expected: &'static str, found: &'static str) -> Self {
        Self::WrongType {
            path: path.to_string(),
            expected,
            found,
        }
    }

    pub fn bad_value(path: &str, message: impl Into<String>) -> Self {
        Self::BadValue {
            path: path.to_string(),
            message: message.into(),
        }
    }

    pub fn bad_path(path: &str, message: impl Into<String>) -> Self {
        Self::BadPath {
            path: path.to_string(),
            message: message.into(),
        }
    }

    pub fn render(format: &'static str, err: impl fmt::Display) -> Self {
        Self::Render {
            format,
            message: err.to_string(),
        }
    }

    /// True for errors that `load()` can surface.
    pub fn is_load_error(&self) -> bool {
        matches!(self.code(), ErrorCode::Parse | ErrorCode::NotFound)
    }
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_match_variants() {
        assert_eq!(ConfigError::parse("a.yaml", "bad").code(), ErrorCode::Parse);
        assert_eq!(ConfigError::not_found("x").code(), ErrorCode::NotFound);
        assert_eq!(ConfigError::missing("a.b").code(), ErrorCode::Missing);
        assert_eq!(
            ConfigError::wrong_type("a", "number", "string").code(),
            ErrorCode::WrongType
        );
        assert_eq!(ConfigError::render("yaml", "boom").code(), ErrorCode::Render);
        assert!(!ConfigError::render("json", "boom").is_load_error());
    }

    #[test]
    fn test_only_parse_and_not_found_are_load_errors() {
        assert!(ConfigError::parse("a", "b").is_load_error());
        assert!(ConfigError::not_found("a").is_load_error());
        assert!(!ConfigError::null("a").is_load_error());
        assert!(!ConfigError::bad_value("a", "b").is_load_error());
    }

    #[test]
    fn test_display_messages() {
        let err = ConfigError::parse("application.yaml", "unexpected end of input");
        assert_eq!(err.to_string(), "application.yaml: unexpected end of input");

        let err = ConfigError::missing("service.one.size");
        assert_eq!(
            err.to_string(),
            "no configuration setting found for key 'service.one.size'"
        );
        assert_eq!(ErrorCode::NotFound.to_string(), "NOT_FOUND");
    }
}
