mod app;
mod console;
mod error;
mod logging;
mod releases;
mod settings;
mod storage;

use std::process::ExitCode;

use log::error;

use fiddle_platform::AppPaths;

use crate::error::AppError;
use crate::settings::AppSettings;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    match launch().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!("{error}");
            eprintln!("fiddle: {error}");
            ExitCode::FAILURE
        }
    }
}

async fn launch() -> Result<(), AppError> {
    let paths = AppPaths::new().map_err(AppError::environment_unavailable)?;
    paths
        .ensure_dirs()
        .map_err(|error| AppError::startup_failed("create directories", error))?;

    let settings = AppSettings::load();
    logging::init_logging(&paths, &settings);
    if !paths.settings_file().exists()
        && let Err(error) = settings.save()
    {
        log::warn!("Could not write default settings: {error}");
    }

    app::run(settings, paths).await
}
