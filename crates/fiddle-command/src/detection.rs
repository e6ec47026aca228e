use std::path::{Path, PathBuf};

use log::debug;
use tokio::process::Command;
use which::which;

use fiddle_platform::HideWindow;

#[cfg(not(windows))]
pub const HELPER_NAME: &str = "fiddle-binaries";
#[cfg(windows)]
pub const HELPER_NAME: &str = "fiddle-binaries.exe";

#[derive(Debug, Clone, Default)]
pub struct ProvisionerDetection {
    pub path: Option<PathBuf>,
    pub version: Option<String>,
}

/// Locate the binary helper. A configured path wins when it exists; then
/// `PATH`; then the usual install locations.
pub async fn detect_provisioner(configured: Option<&Path>) -> ProvisionerDetection {
    if let Some(path) = configured {
        if path.exists() {
            debug!("Using configured helper at {}", path.display());
            return detected(path.to_path_buf()).await;
        }
        debug!("Configured helper {} does not exist", path.display());
    }

    if let Ok(path) = which(HELPER_NAME) {
        debug!("Found helper on PATH at {}", path.display());
        return detected(path).await;
    }

    match first_existing(common_helper_paths()) {
        Some(path) => detected(path).await,
        None => ProvisionerDetection::default(),
    }
}

async fn detected(path: PathBuf) -> ProvisionerDetection {
    let version = helper_version(&path).await;
    ProvisionerDetection {
        path: Some(path),
        version,
    }
}

fn first_existing(candidates: Vec<PathBuf>) -> Option<PathBuf> {
    candidates.into_iter().find(|path| path.exists())
}

fn common_helper_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".local").join("bin").join(HELPER_NAME));
        paths.push(home.join(".cargo").join("bin").join(HELPER_NAME));
    }

    #[cfg(target_os = "macos")]
    {
        paths.push(PathBuf::from("/opt/homebrew/bin").join(HELPER_NAME));
    }

    #[cfg(unix)]
    {
        paths.push(PathBuf::from("/usr/local/bin").join(HELPER_NAME));
        paths.push(PathBuf::from("/usr/bin").join(HELPER_NAME));
    }

    #[cfg(windows)]
    {
        if let Some(local_app_data) = dirs::data_local_dir() {
            paths.push(local_app_data.join("fiddle").join(HELPER_NAME));
        }
    }

    paths
}

async fn helper_version(path: &Path) -> Option<String> {
    let output = Command::new(path)
        .arg("--version")
        .hide_window()
        .output()
        .await
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let trimmed = stdout.trim();
    Some(
        trimmed
            .strip_prefix("fiddle-binaries ")
            .unwrap_or(trimmed)
            .to_string(),
    )
}
