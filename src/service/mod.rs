//! Service definitions, the in-memory registry, and services file loading.
//!
//! A [`ServiceSource`] produces [`LoadedServices`]: a validated, normalized
//! service set tagged with the [`SourceVersion`] it was read at, which the
//! render loop swaps into the [`ServiceRegistry`](registry::ServiceRegistry)
//! in one step.

pub mod model;
pub mod registry;
pub mod sources;
pub mod validation;

use async_trait::async_trait;

use crate::error::SwitchyardError;
use model::Service;

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SourceVersion {
    Hash(String),
}

/// Services ready for the registry: validated, with defaults filled in.
#[derive(Debug, Clone)]
pub struct LoadedServices {
    pub services: Vec<Service>,
    pub version: SourceVersion,
}

impl LoadedServices {
    #[must_use]
    pub fn total_destinations(&self) -> usize {
        self.services.iter().map(|s| s.service_dest.len()).sum()
    }
}

// async_trait is required here because ServiceSource is used as Box<dyn ServiceSource>
// and native async fn in traits does not support dyn dispatch.
#[async_trait]
pub trait ServiceSource: Send + Sync {
    /// Where the services come from, for logs and reports.
    fn origin(&self) -> String;
    async fn load(&self) -> Result<LoadedServices, SwitchyardError>;
    async fn has_changed(&self, current: &SourceVersion) -> Result<bool, SwitchyardError>;
}
