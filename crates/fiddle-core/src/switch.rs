//! Version switching.
//!
//! A switch publishes the requested version as active right away, then
//! settles that version's catalog entry, provisioning the binary when it is
//! not ready yet. Concurrent switches run independently: the most recent one
//! owns the active version, and each one still settles its own entry.

use std::sync::Arc;

use log::{debug, error, info, warn};

use fiddle_backend::{
    BinaryProvisioner, DownloadState, TypeDefinitionService, VersionIdentifier, normalize,
};

use crate::catalog::VersionCatalog;
use crate::error::{CatalogError, SwitchError};
use crate::events::{StateEvent, SwitchPhase};
use crate::output::OutputEntry;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// The binary was already present; nothing was provisioned.
    AlreadyReady,
    /// Another switch is provisioning this version and will settle it.
    AlreadyDownloading,
    Provisioned,
}

#[derive(Clone)]
pub struct VersionSwitcher {
    state: AppState,
    provisioner: Arc<dyn BinaryProvisioner>,
    type_definitions: Arc<dyn TypeDefinitionService>,
}

impl std::fmt::Debug for VersionSwitcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionSwitcher")
            .field("state", &self.state)
            .field("provisioner", &self.provisioner.name())
            .finish_non_exhaustive()
    }
}

impl VersionSwitcher {
    pub fn new(
        state: AppState,
        provisioner: Arc<dyn BinaryProvisioner>,
        type_definitions: Arc<dyn TypeDefinitionService>,
    ) -> Self {
        Self {
            state,
            provisioner,
            type_definitions,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Reconcile against the local inventory, then switch to the current
    /// active version so its binary is provisioned.
    ///
    /// An inventory failure is logged; the switch still runs.
    ///
    /// # Errors
    /// See [`VersionSwitcher::switch_to`].
    pub async fn start(&self) -> Result<SwitchOutcome, SwitchError> {
        if let Err(error) = self.update_downloaded_version_state().await {
            warn!("Initial inventory check failed: {error}");
        }
        let active = self.state.active_version();
        self.switch_to(active.as_str()).await
    }

    /// Make `input` the active version and make sure its binary is present.
    ///
    /// # Errors
    /// - [`SwitchError::InvalidVersion`] when `input` does not normalize.
    /// - [`SwitchError::Catalog`] when the version is not a known version.
    ///
    /// Neither of these mutates any state.
    ///
    /// - [`SwitchError::Provisioning`] when the provisioner fails. The entry
    ///   is then [`DownloadState::Failed`] and the version stays active.
    pub async fn switch_to(&self, input: &str) -> Result<SwitchOutcome, SwitchError> {
        debug!("Switch requested for {input:?}");
        let id = normalize(input)?;
        if !self.state.catalog().contains(&id) {
            return Err(CatalogError::unknown_version(&id).into());
        }

        info!("Switching to {id}");
        self.state.set_active_version(&id)?;
        self.refresh_type_definitions(&id);

        self.progress(&id, SwitchPhase::CheckingCache);
        match self.state.catalog().download_state(&id) {
            Some(DownloadState::Ready) => {
                self.progress(&id, SwitchPhase::SkipProvisioning);
                self.progress(&id, SwitchPhase::Published);
                Ok(SwitchOutcome::AlreadyReady)
            }
            Some(DownloadState::Downloading) => {
                debug!("{id} is already downloading, leaving it to the pending switch");
                self.progress(&id, SwitchPhase::AwaitingDownload);
                Ok(SwitchOutcome::AlreadyDownloading)
            }
            _ => self.provision(&id).await,
        }
    }

    /// Try a failed version again. Behaves exactly like a switch.
    ///
    /// # Errors
    /// See [`VersionSwitcher::switch_to`].
    pub async fn retry(&self, input: &str) -> Result<SwitchOutcome, SwitchError> {
        info!("Retrying {input}");
        self.switch_to(input).await
    }

    /// Mark every locally present version as ready.
    ///
    /// # Errors
    /// Returns [`SwitchError::Inventory`] if the provisioner cannot list its
    /// versions; the catalog is left untouched.
    pub async fn update_downloaded_version_state(
        &self,
    ) -> Result<Arc<VersionCatalog>, SwitchError> {
        let downloaded = self
            .provisioner
            .downloaded_versions()
            .await
            .map_err(SwitchError::Inventory)?;

        debug!(
            "Updating version state from {} downloaded versions",
            downloaded.len()
        );
        let catalog = self
            .state
            .update_catalog(|catalog| Ok(Some(catalog.reconcile(&downloaded))))?;
        Ok(catalog)
    }

    async fn provision(&self, id: &VersionIdentifier) -> Result<SwitchOutcome, SwitchError> {
        self.transition(id, DownloadState::Downloading)?;
        self.progress(id, SwitchPhase::Provisioning);
        info!("Instructing {} to fetch {id}", self.provisioner.name());

        if let Err(source) = self.provisioner.setup(id).await {
            error!("Provisioning {id} failed: {source}");
            self.transition(id, DownloadState::Failed)?;
            self.state
                .push_output(OutputEntry::error(format!("Failed to fetch {id}: {source}")));
            self.state.emit(&StateEvent::ProvisioningFailed {
                version: id.clone(),
                error: source.clone(),
            });
            self.progress(id, SwitchPhase::Failed);
            return Err(SwitchError::provisioning(id, source));
        }

        self.progress(id, SwitchPhase::Reconciling);
        if let Err(error) = self.update_downloaded_version_state().await {
            warn!("Inventory check after provisioning {id} failed: {error}");
        }

        if self.state.catalog().download_state(id) == Some(DownloadState::Downloading) {
            debug!("{id} missing from inventory after setup, marking it ready");
            self.transition(id, DownloadState::Ready)?;
        }

        self.progress(id, SwitchPhase::Published);
        Ok(SwitchOutcome::Provisioned)
    }

    /// Move `id` to `next` if that is a legal step from its latest state.
    fn transition(&self, id: &VersionIdentifier, next: DownloadState) -> Result<(), CatalogError> {
        self.state.update_catalog(|catalog| {
            let current = catalog
                .download_state(id)
                .ok_or_else(|| CatalogError::unknown_version(id))?;
            if current == next || !current.can_transition_to(next) {
                debug!("Not moving {id} from {current} to {next}");
                return Ok(None);
            }
            catalog.with_download_state(id, next).map(Some)
        })?;
        Ok(())
    }

    fn progress(&self, id: &VersionIdentifier, phase: SwitchPhase) {
        debug!("Switch to {id}: {phase}");
        self.state.push_output(OutputEntry::info(format!("{id}: {phase}")));
        self.state.emit(&StateEvent::SwitchProgress {
            version: id.clone(),
            phase,
        });
    }

    fn refresh_type_definitions(&self, id: &VersionIdentifier) {
        let service = Arc::clone(&self.type_definitions);
        let version = id.clone();
        tokio::spawn(async move {
            if let Err(error) = service.refresh(&version).await {
                warn!("Type definition refresh for {version} failed: {error}");
            }
        });
    }
}
