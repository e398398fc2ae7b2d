//! Catalog handle for deployments that reload artifact data at runtime.
//!
//! Updates replace the whole catalog. A resolution works on the snapshot it
//! loaded and never observes a half-updated bundle.

use std::sync::Arc;

use arc_swap::ArcSwap;

use super::ArtifactCatalog;

#[derive(Debug)]
pub struct SharedCatalog {
    current: ArcSwap<ArtifactCatalog>,
}

impl SharedCatalog {
    pub fn new(catalog: ArtifactCatalog) -> Self {
        Self {
            current: ArcSwap::from_pointee(catalog),
        }
    }

    /// Snapshot of the catalog in effect right now.
    pub fn snapshot(&self) -> Arc<ArtifactCatalog> {
        self.current.load_full()
    }

    /// Replace the catalog, returning the previous one.
    pub fn replace(&self, catalog: ArtifactCatalog) -> Arc<ArtifactCatalog> {
        self.current.swap(Arc::new(catalog))
    }

    /// Handle starting from the built-in RStudio catalog.
    pub fn rstudio() -> crate::error::Result<Self> {
        Ok(Self::new(ArtifactCatalog::rstudio()?))
    }
}
