//! Error types for the scenesort-rs library.
//!
//! This module provides structured error handling for all scenesort
//! operations, with error types that preserve context and enable proper
//! propagation from the scene store up through the rule engine.

use std::io;

use thiserror::Error;

/// Main result type for scenesort operations.
pub type Result<T> = std::result::Result<T, ScenesortError>;

/// Comprehensive error type for all scenesort operations.
#[derive(Error, Debug)]
pub enum ScenesortError {
    /// I/O related errors (configuration files, rule lists)
    #[error("I/O error: {message}")]
    Io {
        /// Human-readable error message
        message: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        /// Error description
        message: String,
        /// Configuration field that caused the error
        field: Option<String>,
    },

    /// Validation errors for input data
    #[error("Validation error: {message}")]
    Validation {
        /// Error description
        message: String,
        /// Field or input that failed validation
        field: Option<String>,
    },

    /// Scene store errors (stale ids, broken hierarchy invariants)
    #[error("Scene error: {message}")]
    Scene {
        /// Error description
        message: String,
        /// Entity or container involved
        element: Option<String>,
    },

    /// Host-level operation failures (merge, delete primitives)
    #[error("Operation '{operation}' failed: {message}")]
    Operation {
        /// Operation that failed
        operation: String,
        /// Error description
        message: String,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error description
        message: String,
        /// Underlying serialization error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal {
        /// Error description
        message: String,
    },
}

impl ScenesortError {
    /// Create a new I/O error with context
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            field: None,
        }
    }

    /// Create a configuration error tied to a specific field
    pub fn config_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a new validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: None,
        }
    }

    /// Create a validation error tied to a specific field
    pub fn validation_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a new scene store error
    pub fn scene(message: impl Into<String>) -> Self {
        Self::Scene {
            message: message.into(),
            element: None,
        }
    }

    /// Create a scene store error naming the offending element
    pub fn scene_element(message: impl Into<String>, element: impl Into<String>) -> Self {
        Self::Scene {
            message: message.into(),
            element: Some(element.into()),
        }
    }

    /// Create a host-level operation failure
    pub fn operation(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Operation {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a generic internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl From<serde_yaml::Error> for ScenesortError {
    fn from(error: serde_yaml::Error) -> Self {
        Self::Serialization {
            message: error.to_string(),
            source: Some(Box::new(error)),
        }
    }
}

impl From<serde_json::Error> for ScenesortError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization {
            message: error.to_string(),
            source: Some(Box::new(error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ScenesortError::config_field("threshold must be positive", "proximity.threshold");
        assert_eq!(
            err.to_string(),
            "Configuration error: threshold must be positive"
        );

        let err = ScenesortError::operation("merge_entities", "primary entity is stale");
        assert_eq!(
            err.to_string(),
            "Operation 'merge_entities' failed: primary entity is stale"
        );
    }

    #[test]
    fn test_scene_element_field() {
        let err = ScenesortError::scene_element("container not found", "Walls");
        if let ScenesortError::Scene { element, .. } = &err {
            assert_eq!(element.as_deref(), Some("Walls"));
        } else {
            panic!("Expected Scene error");
        }
    }

    #[test]
    fn test_io_error_source() {
        use std::error::Error;

        let inner = io::Error::new(io::ErrorKind::NotFound, "missing");
        let err = ScenesortError::io("failed to read rules file", inner);
        assert!(err.source().is_some());
    }
}
