use std::path::Path;

use log::{info, warn};

use fiddle_backend::{BackendError, KnownVersionsSource, ReleaseInfo};

use crate::error::AppError;

const BUNDLED_RELEASES: &str = include_str!("../data/releases.json");

/// Known releases, newest first.
#[derive(Debug, Clone)]
pub struct ReleaseList {
    releases: Vec<ReleaseInfo>,
}

impl ReleaseList {
    pub fn from_json(json: &str, source: &'static str) -> Result<Self, AppError> {
        let releases: Vec<ReleaseInfo> = serde_json::from_str(json)
            .map_err(|error| AppError::known_versions_load_failed(source, error))?;
        Ok(Self { releases })
    }

    pub fn bundled() -> Result<Self, AppError> {
        Self::from_json(BUNDLED_RELEASES, "bundled releases")
    }

    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        let content = std::fs::read_to_string(path)
            .map_err(|error| AppError::known_versions_load_failed("releases file", error))?;
        Self::from_json(&content, "releases file")
    }

    /// The user's file when one is configured and readable, else the bundled
    /// list.
    pub fn load(custom: Option<&Path>) -> Result<Self, AppError> {
        if let Some(path) = custom {
            match Self::from_file(path) {
                Ok(list) => {
                    info!(
                        "Loaded {} known versions from {}",
                        list.releases.len(),
                        path.display()
                    );
                    return Ok(list);
                }
                Err(error) => warn!("{error}; falling back to bundled releases"),
            }
        }
        Self::bundled()
    }

    pub fn release_count(&self) -> usize {
        self.releases.len()
    }
}

impl KnownVersionsSource for ReleaseList {
    fn known_versions(&self) -> Result<Vec<ReleaseInfo>, BackendError> {
        Ok(self.releases.clone())
    }
}

#[cfg(test)]
mod tests {
    use fiddle_backend::KnownVersionsSource;

    use super::ReleaseList;
    use crate::error::AppError;

    #[test]
    fn bundled_releases_parse_and_seed() {
        let list = ReleaseList::bundled().expect("bundled releases parse");
        let known = list.known_versions().expect("known versions");

        assert!(list.release_count() > 1);
        assert_eq!(known[0].tag_name, "v33.2.1");
        assert!(fiddle_core::VersionCatalog::seed(&known).is_ok());
    }

    #[test]
    fn malformed_json_reports_its_source() {
        let result = ReleaseList::from_json("{", "test data");

        assert!(matches!(
            result,
            Err(AppError::KnownVersionsLoadFailed {
                source: "test data",
                ..
            })
        ));
    }

    #[test]
    fn custom_file_overrides_bundled_list() {
        let dir = tempfile::tempdir().expect("temporary directory should be created");
        let path = dir.path().join("releases.json");
        std::fs::write(&path, r#"[{"tag_name": "v9.0.0"}, {"tag_name": "v8.1.0"}]"#)
            .expect("write releases");

        let list = ReleaseList::load(Some(&path)).expect("load releases");
        let known = list.known_versions().expect("known versions");

        assert_eq!(known.len(), 2);
        assert_eq!(known[0].tag_name, "v9.0.0");
    }

    #[test]
    fn unreadable_custom_file_falls_back_to_bundled() {
        let dir = tempfile::tempdir().expect("temporary directory should be created");

        let list = ReleaseList::load(Some(&dir.path().join("missing.json")))
            .expect("fallback to bundled");

        assert_eq!(
            list.release_count(),
            ReleaseList::bundled()
                .expect("bundled releases parse")
                .release_count()
        );
    }
}
