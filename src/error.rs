//! Error types for the object generator

use std::path::PathBuf;

use thiserror::Error;

/// Result type for generation operations
pub type Result<T> = std::result::Result<T, CodegenError>;

/// Generation-time errors.
///
/// Every variant is fatal for the entity being generated. Sibling entities
/// driven independently may still succeed.
#[derive(Error, Debug)]
pub enum CodegenError {
    #[error("Unsupported schema kind: {kind} ({context})")]
    UnsupportedSchemaKind { kind: String, context: String },

    #[error("Failed to load template {template}: {reason}")]
    TemplateLoad { template: PathBuf, reason: String },

    #[error("Failed to render template {template}: {reason}")]
    TemplateRender { template: PathBuf, reason: String },

    #[error("Schema parse error in {path}: {source}")]
    SchemaParse {
        path: PathBuf,
        #[source]
        source: apache_avro::Error,
    },

    #[error("Invalid protocol {path}: {reason}")]
    InvalidProtocol { path: PathBuf, reason: String },

    #[error("Unknown generation profile: {0}")]
    UnknownProfile(String),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),
}

impl CodegenError {
    /// Shorthand for an unsupported-kind failure
    pub fn unsupported(kind: impl Into<String>, context: impl Into<String>) -> Self {
        Self::UnsupportedSchemaKind {
            kind: kind.into(),
            context: context.into(),
        }
    }

    /// Attach a path to an IO failure
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True for failures raised by the template engine
    pub fn is_template_failure(&self) -> bool {
        matches!(self, Self::TemplateLoad { .. } | Self::TemplateRender { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_display() {
        let err = CodegenError::unsupported("duration", "field 'elapsed'");
        assert_eq!(
            err.to_string(),
            "Unsupported schema kind: duration (field 'elapsed')"
        );
        assert!(!err.is_template_failure());
    }

    #[test]
    fn test_template_failures() {
        let err = CodegenError::TemplateLoad {
            template: PathBuf::from("templates/java/core/record.vm"),
            reason: "not found".to_string(),
        };
        assert!(err.is_template_failure());
        assert!(err.to_string().contains("record.vm"));
    }
}
