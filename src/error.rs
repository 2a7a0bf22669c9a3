//! Unified error types for Switchyard.
//!
//! Defines [`SwitchyardError`] (the main crate error enum) and
//! [`ValidationError`] for services file validation failures. Both use
//! `thiserror` for `Display` and `Error` derives. Every input error
//! carries the offending path so a failed compilation can be diagnosed
//! without re-running it.

use std::path::PathBuf;

use serde::Serialize;

use crate::template::TemplateError;

#[derive(Debug, Clone, Serialize)]
pub struct ValidationError {
    pub service: String,
    pub field: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "  service {}: {} - {}",
            self.service, self.field, self.message
        )?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, " ({suggestion})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SwitchyardError {
    #[error("Services file not found: {}", path.display())]
    ServicesFileNotFound { path: PathBuf },

    #[error("Services file parse error in {path}:\n  {source}")]
    ServicesParse {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Services validation failed:\n{}", format_errors(.errors))]
    ServiceValidation { errors: Vec<ValidationError> },

    #[error("Unsupported services file format: '{0}'")]
    UnsupportedFormat(String),

    #[error("Could not read the directory {}: {source}", path.display())]
    FragmentDirRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not read the file {}: {source}", path.display())]
    FragmentRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid setting {key}: {message}")]
    InvalidSetting { key: String, message: String },

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("File already exists: {}", path.display())]
    FileExists { path: PathBuf },

    #[error("Could not write routing rules: {0}")]
    Routing(#[from] std::fmt::Error),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}
