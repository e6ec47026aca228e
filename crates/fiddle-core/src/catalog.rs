use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use log::{debug, warn};

use fiddle_backend::{DownloadState, ReleaseInfo, VersionIdentifier, normalize};

use crate::error::CatalogError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRecord {
    pub id: VersionIdentifier,
    pub release: Arc<ReleaseInfo>,
    pub download_state: DownloadState,
}

impl VersionRecord {
    fn with_state(&self, download_state: DownloadState) -> Self {
        Self {
            id: self.id.clone(),
            release: Arc::clone(&self.release),
            download_state,
        }
    }
}

/// Every known version keyed by identifier.
///
/// A catalog is never mutated after construction. Each change builds a new
/// catalog that shares the untouched records with the previous one, so a
/// consumer holding an older snapshot keeps a complete, consistent view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionCatalog {
    order: Arc<[VersionIdentifier]>,
    entries: HashMap<VersionIdentifier, Arc<VersionRecord>>,
}

impl VersionCatalog {
    /// Build the catalog from the known-versions list, every entry starting
    /// as [`DownloadState::Unknown`].
    ///
    /// Tags that do not normalize are skipped and duplicate identifiers keep
    /// their first occurrence.
    ///
    /// # Errors
    /// Returns [`CatalogError::Empty`] when no usable version remains.
    pub fn seed(known: &[ReleaseInfo]) -> Result<Self, CatalogError> {
        let mut order = Vec::with_capacity(known.len());
        let mut entries = HashMap::with_capacity(known.len());

        for release in known {
            let id = match normalize(&release.tag_name) {
                Ok(id) => id,
                Err(error) => {
                    warn!("Skipping known version {:?}: {error}", release.tag_name);
                    continue;
                }
            };

            if entries.contains_key(&id) {
                debug!("Skipping duplicate known version {id}");
                continue;
            }

            order.push(id.clone());
            entries.insert(
                id.clone(),
                Arc::new(VersionRecord {
                    id,
                    release: Arc::new(release.clone()),
                    download_state: DownloadState::Unknown,
                }),
            );
        }

        if order.is_empty() {
            return Err(CatalogError::Empty);
        }

        Ok(Self {
            order: order.into(),
            entries,
        })
    }

    /// Copy of this catalog with a single entry moved to `state`.
    ///
    /// # Errors
    /// Returns [`CatalogError::UnknownVersion`] if `id` was never seeded.
    pub fn with_download_state(
        &self,
        id: &VersionIdentifier,
        state: DownloadState,
    ) -> Result<Self, CatalogError> {
        let record = self
            .entries
            .get(id)
            .ok_or_else(|| CatalogError::unknown_version(id))?;

        let mut entries = self.entries.clone();
        entries.insert(id.clone(), Arc::new(record.with_state(state)));

        Ok(Self {
            order: Arc::clone(&self.order),
            entries,
        })
    }

    /// Mark every catalog entry found in `downloaded` as ready.
    ///
    /// Entries missing from `downloaded` keep their state, including ones
    /// that are still downloading.
    #[must_use]
    pub fn reconcile(&self, downloaded: &HashSet<VersionIdentifier>) -> Self {
        let mut entries = self.entries.clone();

        for id in downloaded {
            if let Some(record) = self.entries.get(id)
                && record.download_state != DownloadState::Ready
            {
                entries.insert(id.clone(), Arc::new(record.with_state(DownloadState::Ready)));
            }
        }

        Self {
            order: Arc::clone(&self.order),
            entries,
        }
    }

    #[must_use]
    pub fn get(&self, id: &VersionIdentifier) -> Option<&VersionRecord> {
        self.entries.get(id).map(Arc::as_ref)
    }

    /// Shared handle to a record, for identity comparisons across snapshots.
    #[must_use]
    pub fn record(&self, id: &VersionIdentifier) -> Option<&Arc<VersionRecord>> {
        self.entries.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &VersionIdentifier) -> bool {
        self.entries.contains_key(id)
    }

    #[must_use]
    pub fn download_state(&self, id: &VersionIdentifier) -> Option<DownloadState> {
        self.entries.get(id).map(|record| record.download_state)
    }

    /// The first seeded version, treated as the most recent release.
    #[must_use]
    pub fn default_version(&self) -> Option<&VersionIdentifier> {
        self.order.first()
    }

    /// Records in the order the known-versions source listed them.
    pub fn iter(&self) -> impl Iterator<Item = &VersionRecord> {
        self.order
            .iter()
            .filter_map(|id| self.entries.get(id).map(Arc::as_ref))
    }

    pub fn versions_in_state(&self, state: DownloadState) -> impl Iterator<Item = &VersionIdentifier> {
        self.iter()
            .filter(move |record| record.download_state == state)
            .map(|record| &record.id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
