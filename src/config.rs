//! Load an [`ArtifactCatalog`] from TOML.
//!
//! ```toml
//! [[artifact]]
//! name = "rstudio"
//! companion_package = "jupyter-rsession-proxy"
//!
//! [[artifact.tier]]
//! max_version = "4.1"
//! url = "https://download2.rstudio.org/server/bionic/amd64/rstudio-server-1.3.959-amd64.deb"
//! sha256 = "187af05cab1221282487fdc33f4b161484c3228eaade3d6697b1d41c206ee6d9"
//! companion_version = "1.4"
//!
//! [[artifact.tier]]
//! url = "https://download2.rstudio.org/server/bionic/amd64/rstudio-server-2021.09.1-372-amd64.deb"
//! sha256 = "c58df09468870b89f1796445853dce2dacaa0fc5b7bb1f92b036fa8da1d1f8a3"
//! companion_version = "2.0.1"
//!
//! [runtime_layout]
//! owner = "${NB_USER}"
//! directories = ["/var/log/shiny-server"]
//! files = ["/var/run/shiny-server.pid"]
//! ```
//!
//! A tier without `max_version` is the unbounded latest tier. `[runtime_layout]`
//! is required and must list at least one directory or file.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::artifact::{Artifact, ArtifactBundle, ArtifactCatalog, RuntimeLayout, Tier, TierTable};
use crate::version::Version;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogToml {
    #[serde(default)]
    artifact: Vec<ArtifactToml>,
    runtime_layout: RuntimeLayoutToml,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ArtifactToml {
    name: String,
    companion_package: String,
    #[serde(default)]
    tier: Vec<TierToml>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TierToml {
    max_version: Option<String>,
    url: String,
    sha256: String,
    companion_version: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuntimeLayoutToml {
    owner: String,
    #[serde(default)]
    directories: Vec<String>,
    #[serde(default)]
    files: Vec<String>,
}

/// Read and validate a catalog file.
pub fn load_catalog(path: &Path) -> Result<ArtifactCatalog> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading artifact catalog '{}'", path.display()))?;
    parse_catalog(&text)
        .with_context(|| format!("parsing artifact catalog '{}'", path.display()))
}

/// Parse and validate catalog TOML.
pub fn parse_catalog(text: &str) -> Result<ArtifactCatalog> {
    let parsed: CatalogToml = toml::from_str(text).context("decoding catalog TOML")?;

    let mut artifacts = Vec::with_capacity(parsed.artifact.len());
    for artifact in parsed.artifact {
        if artifact.tier.is_empty() {
            bail!("artifact '{}' has no [[artifact.tier]] entries", artifact.name);
        }
        let tiers = artifact
            .tier
            .into_iter()
            .map(|tier| parse_tier(&artifact.name, tier))
            .collect::<Result<Vec<_>>>()?;
        let table = TierTable::new(tiers)
            .with_context(|| format!("artifact '{}' tiers", artifact.name))?;
        artifacts.push(Artifact::new(
            artifact.name.trim(),
            artifact.companion_package.trim(),
            table,
        ));
    }

    let layout = RuntimeLayout {
        owner: parsed.runtime_layout.owner.trim().to_string(),
        directories: parsed.runtime_layout.directories,
        files: parsed.runtime_layout.files,
    };

    Ok(ArtifactCatalog::new(artifacts, layout)?)
}

fn parse_tier(artifact: &str, tier: TierToml) -> Result<Tier> {
    let bundle = ArtifactBundle::new(
        tier.url.trim(),
        tier.sha256.trim().to_ascii_lowercase(),
        tier.companion_version.trim(),
    );
    match tier.max_version.as_deref() {
        Some(raw) => {
            let ceiling = Version::parse(raw).with_context(|| {
                format!("artifact '{}': invalid max_version '{}'", artifact, raw)
            })?;
            Ok(Tier::up_to(ceiling, bundle))
        }
        None => Ok(Tier::latest(bundle)),
    }
}
