//! Error types for the ocsf-datacontract crate.

use std::path::PathBuf;

/// Boxed low-level failure carried inside [`Error::Schema`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while importing OCSF schemas or exporting contracts.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The OCSF schema document could not be read or parsed.
    ///
    /// `operation` names what was being attempted, `reason` includes the
    /// source identifier, and `source` is the originating failure.
    #[error("schema error: {operation}: {reason}")]
    Schema {
        operation: &'static str,
        reason: String,
        #[source]
        source: BoxError,
    },

    /// A requested class was not found in the schema.
    #[error("class '{name}' not found in schema (available: {available})")]
    ClassNotFound { name: String, available: String },

    /// Failed to write generated output.
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to read a file from disk.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// JSON (de)serialization error.
    #[error("failed to process JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML (de)serialization error.
    #[error("failed to process YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Network error during schema download.
    #[cfg(feature = "download")]
    #[error("download failed: {0}")]
    Download(String),

    /// Contract export error.
    #[error("export error: {0}")]
    Export(String),
}

impl Error {
    /// Fixed category tag, so callers can tell a bad input document apart
    /// from other failure classes without matching on variants.
    pub fn category(&self) -> &'static str {
        match self {
            Error::Schema { .. } => "schema",
            Error::ClassNotFound { .. } => "lookup",
            Error::Write { .. } => "write",
            Error::Read { .. } => "read",
            Error::Json(_) => "json",
            Error::Yaml(_) => "yaml",
            #[cfg(feature = "download")]
            Error::Download(_) => "download",
            Error::Export(_) => "export",
        }
    }
}

/// Convenience alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_carries_category_and_source() {
        let cause = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = Error::Schema {
            operation: "parse OCSF schema",
            reason: "failed to parse OCSF schema from schema.json".to_string(),
            source: Box::new(cause),
        };

        assert_eq!(err.category(), "schema");
        let msg = err.to_string();
        assert!(msg.contains("parse OCSF schema"));
        assert!(msg.contains("schema.json"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn class_not_found_is_a_lookup_failure() {
        let err = Error::ClassNotFound {
            name: "nope".to_string(),
            available: "login".to_string(),
        };
        assert_eq!(err.category(), "lookup");
        assert!(err.to_string().contains("'nope' not found"));
    }
}
