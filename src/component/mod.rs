//! Provisioning steps handed to the image-build engine.
//!
//! A step is data: WHO runs it and WHAT shell text runs. The engine executes
//! each step as its own operation under the named principal, in order, and
//! treats a non-zero exit as fatal to the whole build.
//!
//! # Example
//!
//! ```rust
//! use rstudio_provision::component::{step, ExecutorIdentity, Phase};
//!
//! let step = step(Phase::Layout, "install -d /var/lib/app");
//! assert_eq!(step.identity, ExecutorIdentity::Privileged);
//! assert_eq!(step.as_pair(), ("root", "install -d /var/lib/app"));
//! ```

use std::fmt;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

/// Principal a step runs as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutorIdentity {
    /// `root`.
    Privileged,
    /// The runtime user, left as `${NB_USER}` for the engine to expand.
    Unprivileged,
}

impl ExecutorIdentity {
    /// User name as the build engine expects it.
    pub fn principal(&self) -> &'static str {
        match self {
            ExecutorIdentity::Privileged => "root",
            ExecutorIdentity::Unprivileged => "${NB_USER}",
        }
    }
}

impl fmt::Display for ExecutorIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.principal())
    }
}

/// Installation phases, in the order their steps are emitted.
///
/// Downloads are verified before anything is installed, packages are
/// installed before helper tooling, and runtime paths are created last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Phase {
    /// Download every artifact and check its digest.
    Fetch = 1,
    /// Install all downloaded packages in one operation and clean up.
    Install = 2,
    /// Companion proxy packages for the runtime user.
    Helpers = 3,
    /// Runtime directories and files with the right ownership.
    Layout = 4,
}

impl Phase {
    pub const ALL: [Phase; 4] = [Phase::Fetch, Phase::Install, Phase::Helpers, Phase::Layout];

    /// Identity every step of this phase runs as.
    pub fn identity(&self) -> ExecutorIdentity {
        match self {
            Phase::Helpers => ExecutorIdentity::Unprivileged,
            Phase::Fetch | Phase::Install | Phase::Layout => ExecutorIdentity::Privileged,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Fetch => write!(f, "Fetch"),
            Phase::Install => write!(f, "Install"),
            Phase::Helpers => write!(f, "Helpers"),
            Phase::Layout => write!(f, "Layout"),
        }
    }
}

/// One unit of work for the build engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningStep {
    pub phase: Phase,
    pub identity: ExecutorIdentity,
    /// Shell text with every bundle placeholder already substituted.
    pub command: String,
}

impl ProvisioningStep {
    /// `(principal, command)` as the engine consumes it.
    pub fn as_pair(&self) -> (&'static str, &str) {
        (self.identity.principal(), &self.command)
    }
}

// Wire shape is the (user, command) pair; the phase is internal bookkeeping.
impl Serialize for ProvisioningStep {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ProvisioningStep", 2)?;
        state.serialize_field("user", self.identity.principal())?;
        state.serialize_field("command", &self.command)?;
        state.end()
    }
}

/// Step run as whoever the phase requires.
pub fn step(phase: Phase, command: impl Into<String>) -> ProvisioningStep {
    ProvisioningStep {
        phase,
        identity: phase.identity(),
        command: command.into(),
    }
}

/// Serialize steps as a JSON array of `{"user", "command"}` objects.
pub fn steps_to_json(steps: &[ProvisioningStep]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(steps)
}
