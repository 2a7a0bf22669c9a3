//! Services file source with SHA-256 change detection.
//!
//! [`FileSource`] reads the file through Tokio, parses it in the format
//! chosen from its extension, rejects invalid service sets, and hands back
//! normalized services ready for
//! [`ServiceRegistry::replace_all`](crate::service::registry::ServiceRegistry::replace_all).
//! The content hash doubles as the version, so a rewrite that leaves the
//! bytes unchanged is not a change.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{sha256_hex, ServicesFormat};
use crate::error::SwitchyardError;
use crate::service::model::normalize;
use crate::service::validation::validate;
use crate::service::{LoadedServices, ServiceSource, SourceVersion};

#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    format: ServicesFormat,
}

impl FileSource {
    pub fn open(path: &Path) -> Result<Self, SwitchyardError> {
        Ok(Self {
            format: ServicesFormat::from_path(path)?,
            path: path.to_path_buf(),
        })
    }

    #[must_use]
    pub const fn format(&self) -> ServicesFormat {
        self.format
    }

    async fn read_content(&self) -> Result<String, SwitchyardError> {
        tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SwitchyardError::ServicesFileNotFound {
                    path: self.path.clone(),
                }
            } else {
                SwitchyardError::Io(e)
            }
        })
    }
}

#[async_trait]
impl ServiceSource for FileSource {
    fn origin(&self) -> String {
        self.path.display().to_string()
    }

    async fn load(&self) -> Result<LoadedServices, SwitchyardError> {
        let content = self.read_content().await?;
        let version = SourceVersion::Hash(sha256_hex(content.as_bytes()));
        let file = self.format.parse(&content, &self.origin())?;

        validate(&file.services).map_err(|errors| SwitchyardError::ServiceValidation { errors })?;

        let services = file.services.iter().map(normalize).collect();
        Ok(LoadedServices { services, version })
    }

    async fn has_changed(&self, current: &SourceVersion) -> Result<bool, SwitchyardError> {
        let content = self.read_content().await?;
        Ok(*current != SourceVersion::Hash(sha256_hex(content.as_bytes())))
    }
}
