//! Version state machine for the Fiddle playground.
//!
//! This crate owns the observable version state and the rules for changing
//! it, independent of the UI and of how binaries are actually fetched:
//! - The version catalog and its replace-on-write operations.
//! - The shared application state with explicit change events.
//! - A bounded console output log.
//! - The switch coordinator that drives provisioning.
//! - Preference mirrors into durable key-value storage.

mod catalog;
mod error;
mod events;
mod output;
mod preferences;
mod state;
mod switch;

/// Known versions keyed by identifier, with per-version download state.
pub use catalog::{VersionCatalog, VersionRecord};
pub use error::{CatalogError, MirrorError, SwitchError};
/// Change notifications emitted by [`AppState`].
pub use events::{ListenerId, StateEvent, SwitchPhase};
pub use output::{MAX_OUTPUT_ENTRIES, OutputEntry};
pub use preferences::{
    AVATAR_URL_KEY, GITHUB_TOKEN_KEY, Preferences, arm_preference_mirrors, load_preferences,
};
pub use state::{AppState, StateSnapshot};
pub use switch::{SwitchOutcome, VersionSwitcher};
