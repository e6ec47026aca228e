use async_trait::async_trait;
use std::collections::HashSet;

use crate::error::BackendError;
use crate::types::{ReleaseInfo, VersionIdentifier};

/// Static list of versions the playground knows about.
///
/// The first entry is treated as the default, most recent version.
pub trait KnownVersionsSource: Send + Sync {
    fn known_versions(&self) -> Result<Vec<ReleaseInfo>, BackendError>;
}

/// Makes runtime binaries available locally.
#[async_trait]
pub trait BinaryProvisioner: Send + Sync {
    fn name(&self) -> &'static str;

    /// Ensure the binary for `version` is present locally.
    async fn setup(&self, version: &VersionIdentifier) -> Result<(), BackendError>;

    /// Authoritative inventory of versions already present locally.
    async fn downloaded_versions(&self) -> Result<HashSet<VersionIdentifier>, BackendError>;
}

/// Refreshes editor type definitions for a version.
#[async_trait]
pub trait TypeDefinitionService: Send + Sync {
    async fn refresh(&self, version: &VersionIdentifier) -> Result<(), BackendError>;
}

/// Type definition service used when editor integration is switched off.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTypeDefinitions;

#[async_trait]
impl TypeDefinitionService for NoTypeDefinitions {
    async fn refresh(&self, _version: &VersionIdentifier) -> Result<(), BackendError> {
        Ok(())
    }
}

/// Durable string key-value storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, BackendError>;

    fn set(&self, key: &str, value: &str) -> Result<(), BackendError>;
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::types::normalize;

    struct MockProvisioner {
        downloaded: Mutex<HashSet<VersionIdentifier>>,
    }

    impl MockProvisioner {
        fn new(downloaded: &[&str]) -> Self {
            Self {
                downloaded: Mutex::new(
                    downloaded
                        .iter()
                        .map(|v| normalize(v).expect("valid version in test"))
                        .collect(),
                ),
            }
        }
    }

    #[async_trait]
    impl BinaryProvisioner for MockProvisioner {
        fn name(&self) -> &'static str {
            "mock"
        }

        async fn setup(&self, version: &VersionIdentifier) -> Result<(), BackendError> {
            self.downloaded
                .lock()
                .expect("mock lock")
                .insert(version.clone());
            Ok(())
        }

        async fn downloaded_versions(&self) -> Result<HashSet<VersionIdentifier>, BackendError> {
            Ok(self.downloaded.lock().expect("mock lock").clone())
        }
    }

    #[tokio::test]
    async fn setup_adds_version_to_inventory_behind_trait_object() {
        let provisioner: std::sync::Arc<dyn BinaryProvisioner> =
            std::sync::Arc::new(MockProvisioner::new(&["v1.0.0"]));
        let missing = normalize("2.0.0").expect("valid version");

        assert!(!provisioner.downloaded_versions().await.expect("inventory").contains(&missing));
        provisioner.setup(&missing).await.expect("setup succeeds");

        let inventory = provisioner.downloaded_versions().await.expect("inventory");
        assert_eq!(inventory.len(), 2);
        assert!(inventory.contains(&missing));
    }

    #[tokio::test]
    async fn no_type_definitions_always_succeeds() {
        let version = normalize("2.0.0").expect("valid version");
        assert_eq!(NoTypeDefinitions.refresh(&version).await, Ok(()));
    }

    #[test]
    fn trait_objects_are_usable_behind_arc() {
        let provisioner: std::sync::Arc<dyn BinaryProvisioner> =
            std::sync::Arc::new(MockProvisioner::new(&[]));
        assert_eq!(provisioner.name(), "mock");
    }
}
