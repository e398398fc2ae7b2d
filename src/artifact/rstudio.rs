//! Built-in RStudio Server and Shiny Server artifacts.
//!
//! R 4.1 and older get RStudio Server 1.3 with `jupyter-rsession-proxy` 1.4;
//! anything newer (or no R version at all) gets 2021.09 with 2.0.1. Shiny
//! Server is the same for every R version.

use super::{Artifact, ArtifactBundle, ArtifactCatalog, RuntimeLayout, Tier, TierTable};
use crate::error::Result;
use crate::version::Version;

pub const RSTUDIO_LEGACY_CEILING: &str = "4.1";

pub const RSTUDIO_LEGACY_URL: &str =
    "https://download2.rstudio.org/server/bionic/amd64/rstudio-server-1.3.959-amd64.deb";
pub const RSTUDIO_LEGACY_SHA256: &str =
    "187af05cab1221282487fdc33f4b161484c3228eaade3d6697b1d41c206ee6d9";
pub const RSESSION_PROXY_LEGACY_VERSION: &str = "1.4";

pub const RSTUDIO_URL: &str =
    "https://download2.rstudio.org/server/bionic/amd64/rstudio-server-2021.09.1-372-amd64.deb";
pub const RSTUDIO_SHA256: &str =
    "c58df09468870b89f1796445853dce2dacaa0fc5b7bb1f92b036fa8da1d1f8a3";
pub const RSESSION_PROXY_VERSION: &str = "2.0.1";

pub const SHINY_SERVER_URL: &str =
    "https://download3.rstudio.org/ubuntu-14.04/x86_64/shiny-server-1.5.17.973-amd64.deb";
pub const SHINY_SERVER_SHA256: &str =
    "80f1e48f6c824be7ef9c843bb7911d4981ac7e8a963e0eff823936a8b28476ee";
pub const SHINY_PROXY_VERSION: &str = "1.1";

/// Engine variable naming the unprivileged runtime user.
pub const NB_USER: &str = "${NB_USER}";

/// Shiny Server paths that are not configurable and must exist up front.
pub const SHINY_DIRECTORIES: &[&str] = &["/var/log/shiny-server", "/var/lib/shiny-server"];
pub const SHINY_FILES: &[&str] = &["/var/log/shiny-server.log", "/var/run/shiny-server.pid"];

fn rstudio_artifact() -> Result<Artifact> {
    let table = TierTable::new(vec![
        Tier::up_to(
            Version::parse(RSTUDIO_LEGACY_CEILING)?,
            ArtifactBundle::new(
                RSTUDIO_LEGACY_URL,
                RSTUDIO_LEGACY_SHA256,
                RSESSION_PROXY_LEGACY_VERSION,
            ),
        ),
        Tier::latest(ArtifactBundle::new(
            RSTUDIO_URL,
            RSTUDIO_SHA256,
            RSESSION_PROXY_VERSION,
        )),
    ])?;
    Ok(Artifact::new("rstudio", "jupyter-rsession-proxy", table))
}

fn shiny_artifact() -> Artifact {
    Artifact::fixed(
        "shiny",
        "jupyter-shiny-proxy",
        ArtifactBundle::new(SHINY_SERVER_URL, SHINY_SERVER_SHA256, SHINY_PROXY_VERSION),
    )
}

fn shiny_layout() -> RuntimeLayout {
    RuntimeLayout {
        owner: NB_USER.to_string(),
        directories: SHINY_DIRECTORIES.iter().map(|d| d.to_string()).collect(),
        files: SHINY_FILES.iter().map(|f| f.to_string()).collect(),
    }
}

impl ArtifactCatalog {
    /// The built-in RStudio Server / Shiny Server catalog.
    pub fn rstudio() -> Result<Self> {
        Self::new(vec![rstudio_artifact()?, shiny_artifact()], shiny_layout())
    }
}
