use std::sync::Arc;

use log::{debug, warn};

use fiddle_backend::{BackendError, KeyValueStore};

use crate::error::MirrorError;
use crate::events::{ListenerId, StateEvent};
use crate::state::AppState;

pub const GITHUB_TOKEN_KEY: &str = "githubToken";
pub const AVATAR_URL_KEY: &str = "avatarUrl";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preferences {
    pub github_token: Option<String>,
    pub avatar_url: Option<String>,
}

/// Read persisted preferences. An empty stored string means "absent".
///
/// # Errors
/// Returns the store's error if either key cannot be read.
pub fn load_preferences(store: &dyn KeyValueStore) -> Result<Preferences, BackendError> {
    Ok(Preferences {
        github_token: store.get(GITHUB_TOKEN_KEY)?.filter(|value| !value.is_empty()),
        avatar_url: store.get(AVATAR_URL_KEY)?.filter(|value| !value.is_empty()),
    })
}

/// Mirror the token and avatar URL fields into `store` for the rest of the
/// state's lifetime.
///
/// Current values are written immediately, then again on every change.
/// Storage failures are logged and never reach the state.
///
/// # Errors
/// Returns [`MirrorError::AlreadyArmed`] if mirrors were already armed for
/// this state.
pub fn arm_preference_mirrors(
    state: &AppState,
    store: Arc<dyn KeyValueStore>,
) -> Result<ListenerId, MirrorError> {
    if !state.mark_mirrors_armed() {
        return Err(MirrorError::AlreadyArmed);
    }

    let mirror_store = Arc::clone(&store);
    let listener = state.subscribe(move |event| match event {
        StateEvent::GithubTokenChanged(token) => {
            write_mirrored(mirror_store.as_ref(), GITHUB_TOKEN_KEY, token.as_deref());
        }
        StateEvent::AvatarUrlChanged(url) => {
            write_mirrored(mirror_store.as_ref(), AVATAR_URL_KEY, url.as_deref());
        }
        _ => {}
    });

    let snapshot = state.snapshot();
    write_mirrored(store.as_ref(), GITHUB_TOKEN_KEY, snapshot.github_token.as_deref());
    write_mirrored(store.as_ref(), AVATAR_URL_KEY, snapshot.avatar_url.as_deref());

    debug!("Preference mirrors armed");
    Ok(listener)
}

fn write_mirrored(store: &dyn KeyValueStore, key: &str, value: Option<&str>) {
    if let Err(error) = store.set(key, value.unwrap_or_default()) {
        warn!("Failed to persist {key}: {error}");
    }
}
