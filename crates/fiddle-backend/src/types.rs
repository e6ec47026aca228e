use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Canonical key for a runtime version, for example `2.0.0` or
/// `3.0.0-beta.4`.
///
/// Only [`normalize`] builds one, so two identifiers compare equal exactly
/// when their canonical strings do.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionIdentifier {
    canonical: String,
    version: semver::Version,
}

impl VersionIdentifier {
    /// Normalize arbitrary version-like input into an identifier.
    ///
    /// # Errors
    /// Returns [`VersionParseError`] when the input is not a semantic
    /// version once whitespace and a leading `v` are removed.
    pub fn parse(input: &str) -> Result<Self, VersionParseError> {
        normalize(input)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.canonical
    }

    #[must_use]
    pub fn is_prerelease(&self) -> bool {
        !self.version.pre.is_empty()
    }
}

/// Map version-like input to its canonical identifier.
///
/// Surrounding whitespace and one leading `v`/`V` are ignored and build
/// metadata is dropped. The result normalizes to itself.
///
/// # Errors
/// Returns [`VersionParseError::Empty`] for blank input and
/// [`VersionParseError::InvalidFormat`] for anything that is not a semantic
/// version.
pub fn normalize(input: &str) -> Result<VersionIdentifier, VersionParseError> {
    let trimmed = input.trim();
    let bare = trimmed.strip_prefix(['v', 'V']).unwrap_or(trimmed);
    if bare.is_empty() {
        return Err(VersionParseError::Empty);
    }

    let mut version =
        semver::Version::parse(bare).map_err(|error| VersionParseError::InvalidFormat {
            input: trimmed.to_string(),
            reason: error.to_string(),
        })?;
    version.build = semver::BuildMetadata::EMPTY;

    Ok(VersionIdentifier {
        canonical: version.to_string(),
        version,
    })
}

impl PartialEq for VersionIdentifier {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for VersionIdentifier {}

impl Hash for VersionIdentifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical.hash(state);
    }
}

impl Ord for VersionIdentifier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.version
            .cmp(&other.version)
            .then_with(|| self.canonical.cmp(&other.canonical))
    }
}

impl PartialOrd for VersionIdentifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for VersionIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

impl FromStr for VersionIdentifier {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        normalize(s)
    }
}

impl TryFrom<String> for VersionIdentifier {
    type Error = VersionParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        normalize(&value)
    }
}

impl From<VersionIdentifier> for String {
    fn from(value: VersionIdentifier) -> Self {
        value.canonical
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionParseError {
    #[error("Version input is empty")]
    Empty,
    #[error("Invalid version '{input}': {reason}")]
    InvalidFormat { input: String, reason: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadState {
    #[default]
    Unknown,
    Downloading,
    Ready,
    Failed,
}

impl DownloadState {
    /// Whether moving from `self` to `next` is a legal lifecycle step.
    ///
    /// Staying in the same state is always allowed.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        use DownloadState::{Downloading, Failed, Ready, Unknown};

        self == next
            || matches!(
                (self, next),
                (Unknown | Failed, Downloading) | (Unknown | Downloading | Failed, Ready) | (Downloading, Failed)
            )
    }
}

impl fmt::Display for DownloadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Downloading => write!(f, "downloading"),
            Self::Ready => write!(f, "ready"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Release metadata for a known version, as published on the release feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseInfo {
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub published_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default, alias = "html_url")]
    pub url: Option<String>,
}

impl ReleaseInfo {
    #[must_use]
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            name: None,
            prerelease: false,
            published_at: None,
            url: None,
        }
    }
}
