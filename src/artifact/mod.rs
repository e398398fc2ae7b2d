//! Artifact bundles and version-gated resolution.
//!
//! Every downloadable package is an [`Artifact`]: a name, the companion proxy
//! package that ships alongside it, and a [`TierTable`] of bundles keyed by the
//! highest runtime version each bundle supports. Version-independent packages
//! are simply artifacts with a single unbounded tier.
//!
//! - [`rstudio`] - the built-in RStudio Server / Shiny Server catalog
//! - [`shared`] - a catalog handle that can be swapped atomically
//!
//! # Resolution
//!
//! Tiers are ordered from lowest to highest ceiling. A requested version picks
//! the first tier whose ceiling is at or above it; anything newer than every
//! ceiling, and "no preference", picks the last tier.
//!
//! ```rust
//! use rstudio_provision::artifact::ArtifactCatalog;
//! use rstudio_provision::version::Version;
//!
//! let catalog = ArtifactCatalog::rstudio().unwrap();
//! let old = catalog.resolve(Some(&Version::parse("4.1").unwrap())).unwrap();
//! assert_eq!(old[0].bundle.companion_version, "1.4");
//! ```

pub mod rstudio;
pub mod shared;

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::debug;

use crate::error::{ProvisionError, Result};
use crate::version::Version;

/// Length of a hex-encoded SHA-256 digest.
pub const SHA256_HEX_LEN: usize = 64;

/// One downloadable package for a single version tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactBundle {
    pub download_url: String,
    /// Hex-encoded SHA-256 of the downloaded file.
    pub checksum: String,
    /// Version of the companion proxy package to install with this bundle.
    pub companion_version: String,
}

impl ArtifactBundle {
    pub fn new(
        download_url: impl Into<String>,
        checksum: impl Into<String>,
        companion_version: impl Into<String>,
    ) -> Self {
        Self {
            download_url: download_url.into(),
            checksum: checksum.into(),
            companion_version: companion_version.into(),
        }
    }

    fn validate(&self, artifact: &str) -> Result<()> {
        let field = format!("artifact '{}' download URL", artifact);
        check_word(&field, &self.download_url, URL_CHARS)?;
        if !(self.download_url.starts_with("https://") || self.download_url.starts_with("http://"))
        {
            return Err(ProvisionError::InvalidCatalog(format!(
                "{} '{}' must be an http(s) URL",
                field, self.download_url
            )));
        }
        if self.checksum.len() != SHA256_HEX_LEN
            || !self.checksum.bytes().all(|b| b.is_ascii_hexdigit())
        {
            return Err(ProvisionError::InvalidCatalog(format!(
                "artifact '{}' checksum '{}' is not a {}-character hex SHA-256 digest",
                artifact, self.checksum, SHA256_HEX_LEN
            )));
        }
        check_word(
            &format!("artifact '{}' companion version", artifact),
            &self.companion_version,
            VERSION_CHARS,
        )
    }
}

// Catalog values are spliced into shell text unquoted, so each field is
// limited to characters the shell treats literally.
const URL_CHARS: &str = "-._~:/%+@=,";
const NAME_CHARS: &str = "-_.";
const VERSION_CHARS: &str = "-_.+";
const PATH_CHARS: &str = "/-_.";

fn check_word(field: &str, value: &str, extra: &str) -> Result<()> {
    if value.is_empty() {
        return Err(ProvisionError::InvalidCatalog(format!("{} is empty", field)));
    }
    if let Some(bad) = value
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || extra.contains(*c)))
    {
        return Err(ProvisionError::InvalidCatalog(format!(
            "{} '{}' contains disallowed character {:?}",
            field, value, bad
        )));
    }
    Ok(())
}

/// Owners are a plain user name or an engine variable such as `${NB_USER}`.
fn check_owner(owner: &str) -> Result<()> {
    let name = owner
        .strip_prefix("${")
        .and_then(|rest| rest.strip_suffix('}'))
        .unwrap_or(owner);
    let extra = if name.len() == owner.len() { NAME_CHARS } else { "_" };
    check_word("runtime layout owner", name, extra)
}

fn check_path(field: &str, path: &str) -> Result<()> {
    check_word(field, path, PATH_CHARS)?;
    if !path.starts_with('/') {
        return Err(ProvisionError::InvalidCatalog(format!(
            "{} '{}' must be absolute",
            field, path
        )));
    }
    Ok(())
}

/// A bundle together with the highest runtime version it serves.
///
/// `ceiling: None` marks the unbounded "latest" tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tier {
    pub ceiling: Option<Version>,
    pub bundle: ArtifactBundle,
}

impl Tier {
    /// Tier serving every version at or below `ceiling`.
    pub fn up_to(ceiling: Version, bundle: ArtifactBundle) -> Self {
        Self {
            ceiling: Some(ceiling),
            bundle,
        }
    }

    /// Tier serving everything the bounded tiers do not.
    pub fn latest(bundle: ArtifactBundle) -> Self {
        Self {
            ceiling: None,
            bundle,
        }
    }
}

/// Ordered tier list for one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierTable {
    tiers: Vec<Tier>,
}

/// Outcome of a single table lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution<'a> {
    /// Position of the selected tier, 0 being the oldest.
    pub tier: usize,
    pub bundle: &'a ArtifactBundle,
}

impl TierTable {
    /// Build a table. Ceilings must be strictly ascending and only the last
    /// tier may be unbounded.
    ///
    /// An empty table is accepted here and reported by [`TierTable::resolve`].
    pub fn new(tiers: Vec<Tier>) -> Result<Self> {
        for (idx, pair) in tiers.windows(2).enumerate() {
            match (&pair[0].ceiling, &pair[1].ceiling) {
                (None, _) => {
                    return Err(ProvisionError::InvalidCatalog(format!(
                        "unbounded tier at position {} is not the last tier",
                        idx
                    )))
                }
                (Some(lower), Some(upper)) if lower >= upper => {
                    return Err(ProvisionError::InvalidCatalog(format!(
                        "tier ceilings must be strictly ascending ({} then {})",
                        lower, upper
                    )))
                }
                _ => {}
            }
        }
        Ok(Self { tiers })
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    /// Select a bundle for `requested`. `None` selects the newest tier.
    pub fn resolve(&self, artifact: &str, requested: Option<&Version>) -> Result<Resolution<'_>> {
        let last = self
            .tiers
            .len()
            .checked_sub(1)
            .ok_or_else(|| ProvisionError::UnsupportedVersion {
                artifact: artifact.to_string(),
            })?;

        let tier = match requested {
            None => last,
            Some(version) => self
                .tiers
                .iter()
                .position(|tier| {
                    tier.ceiling
                        .as_ref()
                        .is_some_and(|ceiling| version <= ceiling)
                })
                .unwrap_or(last),
        };

        Ok(Resolution {
            tier,
            bundle: &self.tiers[tier].bundle,
        })
    }
}

/// A package to download and install, plus its companion proxy package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Short name; also names the download path `/tmp/<name>.deb`.
    pub name: String,
    /// Python package installed for the unprivileged user alongside it.
    pub companion_package: String,
    pub table: TierTable,
}

impl Artifact {
    pub fn new(
        name: impl Into<String>,
        companion_package: impl Into<String>,
        table: TierTable,
    ) -> Self {
        Self {
            name: name.into(),
            companion_package: companion_package.into(),
            table,
        }
    }

    /// Version-independent artifact with a single bundle.
    pub fn fixed(
        name: impl Into<String>,
        companion_package: impl Into<String>,
        bundle: ArtifactBundle,
    ) -> Self {
        Self {
            name: name.into(),
            companion_package: companion_package.into(),
            table: TierTable {
                tiers: vec![Tier::latest(bundle)],
            },
        }
    }
}

/// Directories and files that must exist, owned by the runtime user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeLayout {
    /// Owner and group for every entry. Usually an engine variable such as `${NB_USER}`.
    pub owner: String,
    pub directories: Vec<String>,
    pub files: Vec<String>,
}

/// Immutable set of artifacts injected into every resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactCatalog {
    artifacts: Vec<Artifact>,
    layout: RuntimeLayout,
}

/// An artifact with its bundle chosen for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedArtifact {
    pub name: String,
    pub companion_package: String,
    pub tier: usize,
    pub bundle: ArtifactBundle,
}

impl ResolvedArtifact {
    /// Where the download step writes this artifact.
    pub fn download_path(&self) -> String {
        format!("/tmp/{}.deb", self.name)
    }
}

impl ArtifactCatalog {
    /// Validate and build a catalog. Artifact order is preserved in every
    /// emitted step.
    pub fn new(artifacts: Vec<Artifact>, layout: RuntimeLayout) -> Result<Self> {
        if artifacts.is_empty() {
            return Err(ProvisionError::InvalidCatalog(
                "catalog has no artifacts".to_string(),
            ));
        }

        let mut seen = BTreeSet::new();
        for artifact in &artifacts {
            let name = artifact.name.as_str();
            check_word("artifact name", name, "-_")?;
            if !seen.insert(name) {
                return Err(ProvisionError::InvalidCatalog(format!(
                    "artifact '{}' is listed more than once",
                    name
                )));
            }
            check_word(
                &format!("artifact '{}' companion package", name),
                &artifact.companion_package,
                NAME_CHARS,
            )?;
            for tier in artifact.table.tiers() {
                tier.bundle.validate(name)?;
            }
        }

        // The directory-setup step is always emitted, so it needs something to set up.
        if layout.directories.is_empty() && layout.files.is_empty() {
            return Err(ProvisionError::InvalidCatalog(
                "runtime layout lists no directories or files".to_string(),
            ));
        }
        check_owner(&layout.owner)?;
        for dir in &layout.directories {
            check_path("runtime layout directory", dir)?;
        }
        for file in &layout.files {
            check_path("runtime layout file", file)?;
        }

        Ok(Self { artifacts, layout })
    }

    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    pub fn layout(&self) -> &RuntimeLayout {
        &self.layout
    }

    /// Resolve every artifact for `requested`, in catalog order.
    pub fn resolve(&self, requested: Option<&Version>) -> Result<Vec<ResolvedArtifact>> {
        self.artifacts
            .iter()
            .map(|artifact| {
                let resolution = artifact.table.resolve(&artifact.name, requested)?;
                debug!(
                    artifact = %artifact.name,
                    requested = ?requested.map(|v| v.to_string()),
                    tier = resolution.tier,
                    companion_version = %resolution.bundle.companion_version,
                    "resolved artifact bundle"
                );
                Ok(ResolvedArtifact {
                    name: artifact.name.clone(),
                    companion_package: artifact.companion_package.clone(),
                    tier: resolution.tier,
                    bundle: resolution.bundle.clone(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn bundle(tag: &str) -> ArtifactBundle {
        ArtifactBundle::new(
            format!("https://example.invalid/{}.deb", tag),
            "a".repeat(SHA256_HEX_LEN),
            tag,
        )
    }

    fn layout() -> RuntimeLayout {
        RuntimeLayout {
            owner: "${NB_USER}".into(),
            directories: vec!["/var/lib/tool".into()],
            files: vec!["/var/log/tool.log".into()],
        }
    }

    fn fixed_catalog(bundle: ArtifactBundle, layout: RuntimeLayout) -> Result<ArtifactCatalog> {
        ArtifactCatalog::new(vec![Artifact::fixed("tool", "tool-proxy", bundle)], layout)
    }

    fn three_tier_table() -> TierTable {
        TierTable::new(vec![
            Tier::up_to(v("3.6"), bundle("old")),
            Tier::up_to(v("4.1"), bundle("mid")),
            Tier::latest(bundle("new")),
        ])
        .unwrap()
    }

    fn pick(table: &TierTable, requested: Option<&str>) -> (usize, String) {
        let requested = requested.map(v);
        let resolution = table.resolve("test", requested.as_ref()).unwrap();
        (resolution.tier, resolution.bundle.companion_version.clone())
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let table = three_tier_table();
        assert_eq!(pick(&table, Some("3.6")), (0, "old".into()));
        assert_eq!(pick(&table, Some("3.6.0")), (0, "old".into()));
        assert_eq!(pick(&table, Some("3.6.1")), (1, "mid".into()));
        assert_eq!(pick(&table, Some("4.1")), (1, "mid".into()));
        assert_eq!(pick(&table, Some("4.1.1")), (2, "new".into()));
    }

    #[test]
    fn test_no_preference_selects_latest() {
        let table = three_tier_table();
        assert_eq!(pick(&table, None), pick(&table, Some("999999")));
        assert_eq!(pick(&table, None), (2, "new".into()));
    }

    #[test]
    fn test_versions_past_every_ceiling_fall_through_to_last() {
        let table = TierTable::new(vec![
            Tier::up_to(v("3.6"), bundle("old")),
            Tier::up_to(v("4.1"), bundle("newest-bounded")),
        ])
        .unwrap();
        assert_eq!(pick(&table, Some("5.0")), (1, "newest-bounded".into()));
        assert_eq!(pick(&table, None), (1, "newest-bounded".into()));
    }

    #[test]
    fn test_resolution_is_monotonic() {
        let table = three_tier_table();
        let mut versions: Vec<Version> = [
            "1", "3.5.9", "3.6", "3.6.0.1", "4", "4.0.5", "4.1", "4.1.0", "4.1.1", "4.2", "10.0",
        ]
        .iter()
        .map(|s| v(s))
        .collect();
        versions.sort();

        let tiers: Vec<usize> = versions
            .iter()
            .map(|version| table.resolve("test", Some(version)).unwrap().tier)
            .collect();
        assert!(tiers.windows(2).all(|w| w[0] <= w[1]), "{:?}", tiers);
    }

    #[test]
    fn test_empty_table_is_unsupported() {
        let table = TierTable::new(Vec::new()).unwrap();
        let err = table.resolve("rstudio", Some(&v("4.1"))).unwrap_err();
        assert_eq!(
            err,
            ProvisionError::UnsupportedVersion {
                artifact: "rstudio".into()
            }
        );
        assert!(table.resolve("rstudio", None).is_err());
    }

    #[test]
    fn test_table_rejects_unordered_ceilings() {
        let result = TierTable::new(vec![
            Tier::up_to(v("4.1"), bundle("a")),
            Tier::up_to(v("4.1.0"), bundle("b")),
        ]);
        assert!(matches!(result, Err(ProvisionError::InvalidCatalog(_))));

        let result = TierTable::new(vec![
            Tier::latest(bundle("a")),
            Tier::up_to(v("4.1"), bundle("b")),
        ]);
        assert!(matches!(result, Err(ProvisionError::InvalidCatalog(_))));
    }

    #[test]
    fn test_catalog_rejects_bad_checksum() {
        let mut bad = bundle("x");
        bad.checksum = "deadbeef".into();
        let result = ArtifactCatalog::new(
            vec![Artifact::fixed("x", "x-proxy", bad)],
            layout(),
        );
        assert!(matches!(result, Err(ProvisionError::InvalidCatalog(_))));

        let mut bad = bundle("x");
        bad.checksum = "z".repeat(SHA256_HEX_LEN);
        let result = ArtifactCatalog::new(
            vec![Artifact::fixed("x", "x-proxy", bad)],
            layout(),
        );
        assert!(matches!(result, Err(ProvisionError::InvalidCatalog(_))));
    }

    #[test]
    fn test_catalog_rejects_duplicates_and_bad_names() {
        let dup = ArtifactCatalog::new(
            vec![
                Artifact::fixed("x", "x-proxy", bundle("1")),
                Artifact::fixed("x", "x-proxy", bundle("2")),
            ],
            layout(),
        );
        assert!(dup.is_err());

        let spaced = ArtifactCatalog::new(
            vec![Artifact::fixed("bad name", "x-proxy", bundle("1"))],
            layout(),
        );
        assert!(spaced.is_err());

        assert!(ArtifactCatalog::new(Vec::new(), layout()).is_err());
    }

    #[test]
    fn test_catalog_resolves_in_declaration_order() {
        let catalog = ArtifactCatalog::new(
            vec![
                Artifact::new("gated", "gated-proxy", three_tier_table()),
                Artifact::fixed("fixed", "fixed-proxy", bundle("only")),
            ],
            layout(),
        )
        .unwrap();

        let resolved = catalog.resolve(Some(&v("3.0"))).unwrap();
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].name, "gated");
        assert_eq!(resolved[0].tier, 0);
        assert_eq!(resolved[1].name, "fixed");
        assert_eq!(resolved[1].tier, 0);
        assert_eq!(resolved[1].download_path(), "/tmp/fixed.deb");
    }

    #[test]
    fn test_catalog_rejects_shell_metacharacters() {
        let mut query = bundle("1.0");
        query.download_url = "https://x/a.deb?a=1&b=2".into();
        assert!(fixed_catalog(query, layout()).is_err());

        let mut chained = bundle("1.0");
        chained.companion_version = "1.0 && rm -rf ~".into();
        assert!(fixed_catalog(chained, layout()).is_err());

        let mut not_http = bundle("1.0");
        not_http.download_url = "file:///etc/passwd".into();
        assert!(fixed_catalog(not_http, layout()).is_err());

        let piped = ArtifactCatalog::new(
            vec![Artifact::fixed("tool", "tool-proxy;curl|sh", bundle("1.0"))],
            layout(),
        );
        assert!(matches!(piped, Err(ProvisionError::InvalidCatalog(_))));
    }

    #[test]
    fn test_catalog_rejects_bad_layout() {
        let mut empty = layout();
        empty.directories.clear();
        empty.files.clear();
        assert!(fixed_catalog(bundle("1.0"), empty).is_err());

        let mut blank_dir = layout();
        blank_dir.directories.push(String::new());
        assert!(fixed_catalog(bundle("1.0"), blank_dir).is_err());

        let mut relative = layout();
        relative.files.push("var/log/x.log".into());
        assert!(fixed_catalog(bundle("1.0"), relative).is_err());

        let mut spaced = layout();
        spaced.directories.push("/var/lib/a b".into());
        assert!(fixed_catalog(bundle("1.0"), spaced).is_err());

        let mut owner = layout();
        owner.owner = "root; reboot".into();
        assert!(fixed_catalog(bundle("1.0"), owner).is_err());

        let mut plain_owner = layout();
        plain_owner.owner = "jovyan".into();
        assert!(fixed_catalog(bundle("1.0"), plain_owner).is_ok());
    }
}
