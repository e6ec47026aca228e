use thiserror::Error;

use fiddle_backend::{BackendError, VersionIdentifier, VersionParseError};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("No known versions to build the catalog from")]
    Empty,

    /// A version that was never seeded was addressed. Seeding happens before
    /// any switch, so this points at a programming error.
    #[error("Version {version} is not in the catalog")]
    UnknownVersion { version: String },
}

impl CatalogError {
    pub fn unknown_version(version: &VersionIdentifier) -> Self {
        Self::UnknownVersion {
            version: version.to_string(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SwitchError {
    #[error(transparent)]
    InvalidVersion(#[from] VersionParseError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Failed to provision {version}: {source}")]
    Provisioning {
        version: String,
        #[source]
        source: BackendError,
    },

    #[error("Failed to list downloaded versions: {0}")]
    Inventory(#[source] BackendError),
}

impl SwitchError {
    pub fn provisioning(version: &VersionIdentifier, source: BackendError) -> Self {
        Self::Provisioning {
            version: version.to_string(),
            source,
        }
    }

    /// Whether the caller can sensibly offer a retry for this failure.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Provisioning { .. } | Self::Inventory(_))
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorError {
    #[error("Preference mirrors are already armed for this state")]
    AlreadyArmed,
}

#[cfg(test)]
mod tests {
    use fiddle_backend::{BackendError, VersionParseError, normalize};

    use super::{CatalogError, SwitchError};

    #[test]
    fn invalid_version_display_is_transparent() {
        let error = SwitchError::from(VersionParseError::Empty);
        assert_eq!(error.to_string(), "Version input is empty");
        assert!(!error.is_retryable());
    }

    #[test]
    fn unknown_version_carries_canonical_id() {
        let id = normalize("v9.0.0").expect("valid version");
        let error = SwitchError::from(CatalogError::unknown_version(&id));

        assert_eq!(error.to_string(), "Version 9.0.0 is not in the catalog");
    }

    #[test]
    fn provisioning_error_is_retryable_and_keeps_source() {
        let id = normalize("1.0.0").expect("valid version");
        let error = SwitchError::provisioning(
            &id,
            BackendError::CommandFailed {
                stderr: "404".to_string(),
            },
        );

        assert!(error.is_retryable());
        assert_eq!(
            error.to_string(),
            "Failed to provision 1.0.0: Command failed: 404"
        );
        assert!(std::error::Error::source(&error).is_some());
    }
}
