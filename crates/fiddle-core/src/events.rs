use std::fmt;
use std::sync::Arc;

use fiddle_backend::{BackendError, VersionIdentifier};

use crate::catalog::VersionCatalog;
use crate::output::OutputEntry;

/// Emitted by [`crate::AppState`] after each atomic change.
#[derive(Debug, Clone)]
pub enum StateEvent {
    ActiveVersionChanged(VersionIdentifier),
    CatalogReplaced(Arc<VersionCatalog>),
    SwitchProgress {
        version: VersionIdentifier,
        phase: SwitchPhase,
    },
    ProvisioningFailed {
        version: VersionIdentifier,
        error: BackendError,
    },
    ConsoleToggled(bool),
    AuthDialogToggled(bool),
    GithubTokenChanged(Option<String>),
    AvatarUrlChanged(Option<String>),
    OutputAppended(OutputEntry),
    OutputCleared,
}

/// Steps a single switch goes through once its input has been normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchPhase {
    CheckingCache,
    Provisioning,
    SkipProvisioning,
    /// Another switch already owns the download; this one ends here.
    AwaitingDownload,
    Reconciling,
    Published,
    Failed,
}

impl fmt::Display for SwitchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CheckingCache => write!(f, "checking cache"),
            Self::Provisioning => write!(f, "provisioning"),
            Self::SkipProvisioning => write!(f, "skipping provisioning"),
            Self::AwaitingDownload => write!(f, "waiting for pending download"),
            Self::Reconciling => write!(f, "reconciling"),
            Self::Published => write!(f, "published"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(&StateEvent) + Send + Sync>;

#[derive(Default)]
pub(crate) struct ListenerRegistry {
    next_id: u64,
    listeners: Vec<(ListenerId, Listener)>,
}

impl ListenerRegistry {
    pub(crate) fn add(&mut self, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.listeners.push((id, listener));
        id
    }

    pub(crate) fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    /// Listeners are cloned out so they can run without the registry lock.
    pub(crate) fn snapshot(&self) -> Vec<Listener> {
        self.listeners
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.len()
    }
}
