//! Assemble resolved artifacts into ordered provisioning steps.
//!
//! One step per [`Phase`], in phase order:
//!
//! 1. root: download every artifact, then check every digest with `sha256sum -c`
//! 2. root: install all packages in one `apt` call and clean up
//! 3. `${NB_USER}`: `pip install` the companion proxy packages
//! 4. root: create runtime directories/files owned by the runtime user
//!
//! All four steps are always emitted; an empty runtime layout is an error.
//! Identities are never mixed inside a step.

use tracing::debug;

use crate::artifact::{ResolvedArtifact, RuntimeLayout};
use crate::component::{step, Phase, ProvisioningStep};
use crate::error::{ProvisionError, Result};
use crate::template::Template;

/// Continuation used between commands of one step.
const AND_THEN: &str = " && \\\n    ";

const FETCH: Template = Template::new(
    "fetch",
    "curl --silent --location --fail {url} > {path}",
    &["url", "path"],
);

const VERIFY: Template = Template::new(
    "verify",
    "echo '{checksum} {path}' | sha256sum -c -",
    &["checksum", "path"],
);

// --no-install-recommends matters here: these packages recommend r-base,
// which would replace the pinned R version.
const INSTALL: Template = Template::new(
    "install",
    "apt-get update > /dev/null && \\
    apt install -y --no-install-recommends {paths} && \\
    rm {paths} && \\
    apt-get -qq purge && \\
    apt-get -qq clean && \\
    rm -rf /var/lib/apt/lists/*",
    &["paths"],
);

const REQUIREMENT: Template = Template::new(
    "requirement",
    "{package}=={version}",
    &["package", "version"],
);

const HELPERS: Template = Template::new(
    "helpers",
    "pip install --no-cache {requirements}",
    &["requirements"],
);

const LAYOUT_DIR: Template = Template::new(
    "layout-dir",
    "install -o {owner} -g {owner} -d {path}",
    &["owner", "path"],
);

const LAYOUT_FILE: Template = Template::new(
    "layout-file",
    "install -o {owner} -g {owner} /dev/null {path}",
    &["owner", "path"],
);

/// Build the step list for `artifacts` and `layout`.
///
/// Output depends only on the inputs, so identical inputs give identical
/// steps. Any template failure aborts the whole assembly.
pub fn build_steps(
    artifacts: &[ResolvedArtifact],
    layout: &RuntimeLayout,
) -> Result<Vec<ProvisioningStep>> {
    if artifacts.is_empty() {
        return Err(ProvisionError::InvalidCatalog(
            "nothing to provision: no resolved artifacts".to_string(),
        ));
    }

    let steps = vec![
        step(Phase::Fetch, fetch_command(artifacts)?),
        step(Phase::Install, install_command(artifacts)?),
        step(Phase::Helpers, helpers_command(artifacts)?),
        step(Phase::Layout, layout_command(layout)?),
    ];

    debug!(
        artifacts = artifacts.len(),
        steps = steps.len(),
        "assembled provisioning steps"
    );
    Ok(steps)
}

fn fetch_command(artifacts: &[ResolvedArtifact]) -> Result<String> {
    let mut commands = Vec::with_capacity(artifacts.len() * 2);
    for artifact in artifacts {
        let path = artifact.download_path();
        commands.push(FETCH.render(&[
            ("url", artifact.bundle.download_url.as_str()),
            ("path", path.as_str()),
        ])?);
    }
    // Every digest is checked before the install step can run.
    for artifact in artifacts {
        let path = artifact.download_path();
        commands.push(VERIFY.render(&[
            ("checksum", artifact.bundle.checksum.as_str()),
            ("path", path.as_str()),
        ])?);
    }
    Ok(commands.join(AND_THEN))
}

fn install_command(artifacts: &[ResolvedArtifact]) -> Result<String> {
    let paths = artifacts
        .iter()
        .map(ResolvedArtifact::download_path)
        .collect::<Vec<_>>()
        .join(" ");
    INSTALL.render(&[("paths", paths.as_str())])
}

fn helpers_command(artifacts: &[ResolvedArtifact]) -> Result<String> {
    let requirements = artifacts
        .iter()
        .map(|artifact| {
            REQUIREMENT.render(&[
                ("package", artifact.companion_package.as_str()),
                ("version", artifact.bundle.companion_version.as_str()),
            ])
        })
        .collect::<Result<Vec<_>>>()?
        .join(" ");
    HELPERS.render(&[("requirements", requirements.as_str())])
}

fn layout_command(layout: &RuntimeLayout) -> Result<String> {
    let owner = layout.owner.as_str();
    let mut commands = Vec::with_capacity(layout.directories.len() + layout.files.len());
    for dir in &layout.directories {
        commands.push(LAYOUT_DIR.render(&[("owner", owner), ("path", dir.as_str())])?);
    }
    for file in &layout.files {
        commands.push(LAYOUT_FILE.render(&[("owner", owner), ("path", file.as_str())])?);
    }
    if commands.is_empty() {
        return Err(ProvisionError::InvalidCatalog(
            "runtime layout lists no directories or files".to_string(),
        ));
    }
    Ok(commands.join(AND_THEN))
}
