use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, info, warn};

use fiddle_backend::{
    BinaryProvisioner, KeyValueStore, KnownVersionsSource, NoTypeDefinitions,
    TypeDefinitionService,
};
use fiddle_command::{CommandProvisioner, CommandTypeDefinitions, HELPER_NAME, detect_provisioner};
use fiddle_core::{AppState, VersionCatalog, VersionSwitcher, arm_preference_mirrors, load_preferences};
use fiddle_platform::AppPaths;

use crate::console;
use crate::error::AppError;
use crate::releases::ReleaseList;
use crate::settings::AppSettings;
use crate::storage::JsonFileStore;

/// Seed the catalog, restore stored preferences, and arm their mirrors.
///
/// A store that cannot be read only costs the saved preferences; the state
/// is still built and mirrored.
pub fn build_state(
    source: &dyn KnownVersionsSource,
    store: Arc<dyn KeyValueStore>,
) -> Result<AppState, AppError> {
    let known = source
        .known_versions()
        .map_err(|error| AppError::startup_failed("known versions", error))?;
    let catalog =
        VersionCatalog::seed(&known).map_err(|error| AppError::startup_failed("seed", error))?;
    info!(
        "Seeded {} versions, default {}",
        catalog.len(),
        catalog
            .default_version()
            .map_or_else(String::new, ToString::to_string)
    );

    let state = AppState::new(catalog).map_err(|error| AppError::startup_failed("state", error))?;

    match load_preferences(store.as_ref()) {
        Ok(preferences) => state.apply_preferences(preferences),
        Err(error) => warn!("Could not restore preferences: {error}"),
    }

    arm_preference_mirrors(&state, store)
        .map_err(|error| AppError::startup_failed("preference mirrors", error.to_string()))?;

    Ok(state)
}

async fn collaborators(
    settings: &AppSettings,
    paths: &AppPaths,
) -> (Arc<dyn BinaryProvisioner>, Arc<dyn TypeDefinitionService>) {
    let detection = detect_provisioner(settings.provisioner_path.as_deref()).await;
    let helper = detection.path.unwrap_or_else(|| {
        warn!("{HELPER_NAME} not found; downloads will fail until it is installed");
        PathBuf::from(HELPER_NAME)
    });
    debug!(
        "Using helper {} (version {})",
        helper.display(),
        detection.version.as_deref().unwrap_or("unknown")
    );

    let provisioner = CommandProvisioner::new(helper.clone())
        .with_binaries_dir(settings.binaries_dir_or(paths))
        .with_timeouts(settings.setup_timeout(), settings.list_timeout());

    let types: Arc<dyn TypeDefinitionService> = if settings.type_definitions {
        Arc::new(CommandTypeDefinitions::new(helper, settings.list_timeout()))
    } else {
        Arc::new(NoTypeDefinitions)
    };

    (Arc::new(provisioner), types)
}

pub async fn run(settings: AppSettings, paths: AppPaths) -> Result<(), AppError> {
    let releases = ReleaseList::load(settings.known_versions_file.as_deref())?;
    debug!("{} known releases available", releases.release_count());
    let store: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::new(paths.preferences_file()));
    let state = build_state(&releases, store)?;

    state.subscribe(|event| {
        if let Some(line) = console::describe_event(event) {
            println!("{line}");
        }
    });

    let (provisioner, types) = collaborators(&settings, &paths).await;
    let switcher = VersionSwitcher::new(state, provisioner, types);

    let startup = switcher.clone();
    tokio::spawn(async move {
        if let Err(error) = startup.start().await {
            warn!("Startup switch did not complete: {error}");
        }
    });

    console::run(switcher).await
}
