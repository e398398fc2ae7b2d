//! Version-gated RStudio provisioning for image builds.
//!
//! Given the R version an environment asks for, this crate picks the matching
//! RStudio Server / Shiny Server packages (URL, SHA-256, companion proxy
//! version) and turns them into an ordered list of shell steps, each tagged
//! with the user it must run as. The image-build engine runs those steps
//! verbatim; nothing here touches the network or the filesystem.
//!
//! # Architecture
//!
//! ```text
//! requested version ──► version::Version
//!                           │
//!                           ▼
//!        artifact::ArtifactCatalog::resolve   (tier tables, injected catalog)
//!                           │
//!                           ▼
//!             assembler::build_steps          (closed-key templates)
//!                           │
//!                           ▼
//!        Vec<component::ProvisioningStep> ──► build engine
//! ```
//!
//! # Example
//!
//! ```rust
//! use rstudio_provision::{rstudio_base_steps, ArtifactCatalog, ExecutorIdentity};
//!
//! let catalog = ArtifactCatalog::rstudio().unwrap();
//! let steps = rstudio_base_steps(&catalog, Some("4.1")).unwrap();
//! assert_eq!(steps.len(), 4);
//! assert_eq!(steps[2].identity, ExecutorIdentity::Unprivileged);
//! assert!(steps[2].command.contains("jupyter-rsession-proxy==1.4"));
//! ```

pub mod artifact;
pub mod assembler;
pub mod component;
pub mod config;
pub mod error;
pub mod template;
pub mod version;

pub use artifact::shared::SharedCatalog;
pub use artifact::{ArtifactBundle, ArtifactCatalog, ResolvedArtifact};
pub use assembler::build_steps;
pub use component::{ExecutorIdentity, Phase, ProvisioningStep};
pub use error::{ProvisionError, Result};
pub use version::Version;

/// Parse `requested`, resolve every artifact and assemble the steps.
///
/// `None` means the caller has no preference and gets the newest tier.
/// Either the full step list is returned or nothing is.
pub fn rstudio_base_steps(
    catalog: &ArtifactCatalog,
    requested: Option<&str>,
) -> Result<Vec<ProvisioningStep>> {
    let requested = Version::parse_optional(requested)?;
    let resolved = catalog.resolve(requested.as_ref())?;
    build_steps(&resolved, catalog.layout())
}
