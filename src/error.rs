//! Error types for wtypes

use std::fmt;

use thiserror::Error;

/// Result type for trait operations
pub type Result<T> = std::result::Result<T, TraitError>;

/// A single failed constraint reported by a validation backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// JSON pointer to the offending part of the instance ("" for the root)
    pub path: String,
    /// Backend message
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Every violation found while validating one instance
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Violations(pub Vec<Violation>);

impl Violations {
    pub fn single(message: impl Into<String>) -> Self {
        Self(vec![Violation {
            path: String::new(),
            message: message.into(),
        }])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Violation> {
        self.0.iter()
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, violation) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  - {}", violation)?;
        }
        Ok(())
    }
}

/// Errors raised while building, validating or mutating typed values
#[derive(Error, Debug)]
pub enum TraitError {
    #[error("Invalid schema for {name}: {reason}")]
    InvalidSchema { name: String, reason: String },

    #[error("Validation failed for {name}:\n{violations}")]
    Validation { name: String, violations: Violations },

    #[error("Cannot initialize the type: {0}")]
    CannotInstantiate(String),

    #[error("No validation backend answered the {0} hook")]
    NoBackend(&'static str),

    #[error("Index {index} is out of range for a list of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Linking '{key}' to itself causes recursion")]
    RecursiveLink { key: String },

    #[error("Unknown string format: {0}")]
    UnknownFormat(String),

    #[error("JSON pointer does not resolve: {0}")]
    Pointer(String),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Config error: {0}")]
    Config(#[from] config_crate::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TraitError {
    /// Whether this error is a failed instance validation (as opposed to a broken schema)
    pub fn is_validation(&self) -> bool {
        matches!(self, TraitError::Validation { .. })
    }

    pub(crate) fn invalid(name: impl Into<String>, violations: Violations) -> Self {
        TraitError::Validation {
            name: name.into(),
            violations,
        }
    }
}
