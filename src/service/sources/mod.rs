//! Services file formats and the file-backed [`ServiceSource`](super::ServiceSource).
//!
//! The format is picked from the file extension. YAML and JSON are each
//! gated behind their feature flag.

pub mod file_source;

use std::path::Path;

use sha2::{Digest, Sha256};

pub use file_source::FileSource;

use super::model::ServicesFile;
use super::ServiceSource;
use crate::error::SwitchyardError;

/// Serialization format of a services file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServicesFormat {
    #[cfg(feature = "yaml")]
    Yaml,
    #[cfg(feature = "json")]
    Json,
}

impl ServicesFormat {
    pub fn from_extension(ext: &str) -> Result<Self, SwitchyardError> {
        match ext {
            #[cfg(feature = "yaml")]
            "yaml" | "yml" => Ok(Self::Yaml),
            #[cfg(feature = "json")]
            "json" => Ok(Self::Json),
            other => Err(SwitchyardError::UnsupportedFormat(other.to_string())),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, SwitchyardError> {
        Self::from_extension(path.extension().and_then(|e| e.to_str()).unwrap_or(""))
    }

    /// Deserialize `content`, naming `path_display` in parse errors.
    pub fn parse(self, content: &str, path_display: &str) -> Result<ServicesFile, SwitchyardError> {
        let parsed: Result<ServicesFile, Box<dyn std::error::Error + Send + Sync>> = match self {
            #[cfg(feature = "yaml")]
            Self::Yaml => serde_yml::from_str(content).map_err(Into::into),
            #[cfg(feature = "json")]
            Self::Json => serde_json::from_str(content).map_err(Into::into),
        };
        parsed.map_err(|source| SwitchyardError::ServicesParse {
            path: path_display.to_string(),
            source,
        })
    }
}

/// Parse a services string based on file extension.
pub fn parse_services_str(
    ext: &str,
    content: &str,
    path_display: &str,
) -> Result<ServicesFile, SwitchyardError> {
    ServicesFormat::from_extension(ext)?.parse(content, path_display)
}

/// Open a file source, picking the format by extension.
pub fn create_file_source(path: &Path) -> Result<Box<dyn ServiceSource>, SwitchyardError> {
    Ok(Box::new(FileSource::open(path)?))
}

/// Compute a lowercase hex-encoded SHA-256 digest.
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}
