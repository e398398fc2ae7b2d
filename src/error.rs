//! Error taxonomy for resolution and assembly.
//!
//! None of these are retried internally. [`ProvisionError::InvalidVersion`] is
//! the only variant caused by user input; every other variant points at a
//! defect in the static catalog or templates.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProvisionError {
    /// The requested version string is empty or not dotted-numeric.
    #[error("invalid version '{input}': {reason}")]
    InvalidVersion { input: String, reason: String },

    /// A tier table has no entries to choose from.
    #[error("no artifact bundle available for '{artifact}': tier table is empty")]
    UnsupportedVersion { artifact: String },

    /// A template and its bindings disagree.
    #[error("template '{template}' cannot substitute '{key}': {reason}")]
    TemplateSubstitution {
        template: String,
        key: String,
        reason: String,
    },

    /// Catalog data failed validation when it was constructed.
    #[error("invalid artifact catalog: {0}")]
    InvalidCatalog(String),
}

pub type Result<T> = std::result::Result<T, ProvisionError>;

pub(crate) fn invalid_version(input: &str, reason: impl Into<String>) -> ProvisionError {
    ProvisionError::InvalidVersion {
        input: input.to_string(),
        reason: reason.into(),
    }
}

pub(crate) fn substitution(
    template: &str,
    key: &str,
    reason: impl Into<String>,
) -> ProvisionError {
    ProvisionError::TemplateSubstitution {
        template: template.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_offending_input() {
        let err = invalid_version("4.x", "component 'x' is not numeric");
        assert_eq!(
            err.to_string(),
            "invalid version '4.x': component 'x' is not numeric"
        );

        let err = substitution("install", "paths", "no binding supplied");
        assert!(err.to_string().contains("'install'"));
        assert!(err.to_string().contains("'paths'"));
    }
}
