use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::debug;

use fiddle_backend::VersionIdentifier;

use crate::catalog::VersionCatalog;
use crate::error::CatalogError;
use crate::events::{ListenerId, ListenerRegistry, StateEvent};
use crate::output::{OutputEntry, append_bounded};
use crate::preferences::Preferences;

/// Everything the UI layer reads, captured at one instant.
#[derive(Debug, Clone)]
pub struct StateSnapshot {
    pub active_version: VersionIdentifier,
    pub catalog: Arc<VersionCatalog>,
    pub is_console_showing: bool,
    pub is_token_dialog_showing: bool,
    pub github_token: Option<String>,
    pub avatar_url: Option<String>,
    /// Console output, oldest first.
    pub output: Vec<OutputEntry>,
}

struct Inner {
    snapshot: Mutex<StateSnapshot>,
    listeners: Mutex<ListenerRegistry>,
    mirrors_armed: AtomicBool,
}

/// Application state shared by handle between the switcher, the preference
/// mirrors, and the UI layer.
///
/// Every write swaps whole values under a short lock that is never held
/// across an `.await`, then notifies listeners with the lock released.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.snapshot();
        f.debug_struct("AppState")
            .field("active_version", &snapshot.active_version)
            .field("catalog_len", &snapshot.catalog.len())
            .field("is_console_showing", &snapshot.is_console_showing)
            .field("is_token_dialog_showing", &snapshot.is_token_dialog_showing)
            .field("output_len", &snapshot.output.len())
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// State whose active version is the catalog's default version.
    ///
    /// # Errors
    /// Returns [`CatalogError::Empty`] for a catalog without versions.
    pub fn new(catalog: VersionCatalog) -> Result<Self, CatalogError> {
        let default = catalog
            .default_version()
            .cloned()
            .ok_or(CatalogError::Empty)?;
        Self::with_active_version(catalog, default)
    }

    /// # Errors
    /// Returns [`CatalogError::UnknownVersion`] if `active_version` is not a
    /// catalog key.
    pub fn with_active_version(
        catalog: VersionCatalog,
        active_version: VersionIdentifier,
    ) -> Result<Self, CatalogError> {
        if !catalog.contains(&active_version) {
            return Err(CatalogError::unknown_version(&active_version));
        }

        Ok(Self {
            inner: Arc::new(Inner {
                snapshot: Mutex::new(StateSnapshot {
                    active_version,
                    catalog: Arc::new(catalog),
                    is_console_showing: false,
                    is_token_dialog_showing: false,
                    github_token: None,
                    avatar_url: None,
                    output: Vec::new(),
                }),
                listeners: Mutex::new(ListenerRegistry::default()),
                mirrors_armed: AtomicBool::new(false),
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, StateSnapshot> {
        self.inner
            .snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn listeners(&self) -> MutexGuard<'_, ListenerRegistry> {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> StateSnapshot {
        self.lock().clone()
    }

    pub fn active_version(&self) -> VersionIdentifier {
        self.lock().active_version.clone()
    }

    /// Current catalog. A changed catalog is always a different `Arc`, so
    /// `Arc::ptr_eq` against an older handle detects updates.
    pub fn catalog(&self) -> Arc<VersionCatalog> {
        Arc::clone(&self.lock().catalog)
    }

    pub fn is_console_showing(&self) -> bool {
        self.lock().is_console_showing
    }

    pub fn is_token_dialog_showing(&self) -> bool {
        self.lock().is_token_dialog_showing
    }

    pub fn github_token(&self) -> Option<String> {
        self.lock().github_token.clone()
    }

    pub fn avatar_url(&self) -> Option<String> {
        self.lock().avatar_url.clone()
    }

    pub fn output(&self) -> Vec<OutputEntry> {
        self.lock().output.clone()
    }

    pub fn push_output(&self, entry: OutputEntry) {
        append_bounded(&mut self.lock().output, entry.clone());
        self.emit(&StateEvent::OutputAppended(entry));
    }

    /// Returns how many entries were removed.
    pub fn clear_output(&self) -> usize {
        let cleared = std::mem::take(&mut self.lock().output).len();
        if cleared > 0 {
            self.emit(&StateEvent::OutputCleared);
        }
        cleared
    }

    pub fn toggle_console(&self) -> bool {
        let showing = {
            let mut snapshot = self.lock();
            snapshot.is_console_showing = !snapshot.is_console_showing;
            snapshot.is_console_showing
        };
        self.emit(&StateEvent::ConsoleToggled(showing));
        showing
    }

    pub fn toggle_auth_dialog(&self) -> bool {
        let showing = {
            let mut snapshot = self.lock();
            snapshot.is_token_dialog_showing = !snapshot.is_token_dialog_showing;
            snapshot.is_token_dialog_showing
        };
        self.emit(&StateEvent::AuthDialogToggled(showing));
        showing
    }

    pub fn set_github_token(&self, token: Option<String>) {
        {
            let mut snapshot = self.lock();
            if snapshot.github_token == token {
                return;
            }
            snapshot.github_token.clone_from(&token);
        }
        self.emit(&StateEvent::GithubTokenChanged(token));
    }

    pub fn set_avatar_url(&self, url: Option<String>) {
        {
            let mut snapshot = self.lock();
            if snapshot.avatar_url == url {
                return;
            }
            snapshot.avatar_url.clone_from(&url);
        }
        self.emit(&StateEvent::AvatarUrlChanged(url));
    }

    pub fn apply_preferences(&self, preferences: Preferences) {
        self.set_github_token(preferences.github_token);
        self.set_avatar_url(preferences.avatar_url);
    }

    /// Register a listener for every subsequent [`StateEvent`].
    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&StateEvent) + Send + Sync + 'static,
    {
        self.listeners().add(Arc::new(listener))
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.listeners().remove(id)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners().len()
    }

    pub(crate) fn emit(&self, event: &StateEvent) {
        let listeners = self.listeners().snapshot();
        for listener in listeners {
            listener(event);
        }
    }

    pub(crate) fn set_active_version(&self, version: &VersionIdentifier) -> Result<(), CatalogError> {
        {
            let mut snapshot = self.lock();
            if !snapshot.catalog.contains(version) {
                return Err(CatalogError::unknown_version(version));
            }
            if snapshot.active_version == *version {
                return Ok(());
            }
            snapshot.active_version = version.clone();
        }
        self.emit(&StateEvent::ActiveVersionChanged(version.clone()));
        Ok(())
    }

    /// Read-modify-write of the catalog against its latest value.
    ///
    /// `update` returns `None` when nothing changes; otherwise the new
    /// catalog is published and listeners are told. Returns the catalog that
    /// is current afterwards.
    pub(crate) fn update_catalog<F>(&self, update: F) -> Result<Arc<VersionCatalog>, CatalogError>
    where
        F: FnOnce(&VersionCatalog) -> Result<Option<VersionCatalog>, CatalogError>,
    {
        let published = {
            let mut snapshot = self.lock();
            match update(snapshot.catalog.as_ref())? {
                Some(next) if next != *snapshot.catalog => {
                    let next = Arc::new(next);
                    snapshot.catalog = Arc::clone(&next);
                    next
                }
                _ => return Ok(Arc::clone(&snapshot.catalog)),
            }
        };

        debug!("Publishing updated version catalog");
        self.emit(&StateEvent::CatalogReplaced(Arc::clone(&published)));
        Ok(published)
    }

    /// Returns `true` only for the first caller.
    pub(crate) fn mark_mirrors_armed(&self) -> bool {
        !self.inner.mirrors_armed.swap(true, Ordering::SeqCst)
    }
}
