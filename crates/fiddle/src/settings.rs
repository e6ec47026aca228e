use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use fiddle_platform::AppPaths;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default)]
    pub debug_logging: bool,

    #[serde(default = "default_max_log_size_bytes")]
    pub max_log_size_bytes: u64,

    /// Module prefixes to log in addition to the fiddle crates.
    #[serde(default)]
    pub extra_log_targets: Vec<String>,

    /// Explicit path to the binary helper. Detected when unset.
    #[serde(default)]
    pub provisioner_path: Option<PathBuf>,

    /// Where the helper keeps downloaded binaries. Defaults to the app data
    /// directory.
    #[serde(default)]
    pub binaries_dir: Option<PathBuf>,

    /// JSON release list to use instead of the bundled one.
    #[serde(default)]
    pub known_versions_file: Option<PathBuf>,

    #[serde(default = "default_setup_timeout")]
    pub setup_timeout_secs: u64,

    #[serde(default = "default_list_timeout")]
    pub list_timeout_secs: u64,

    #[serde(default = "default_true")]
    pub type_definitions: bool,
}

fn default_true() -> bool {
    true
}

fn default_max_log_size_bytes() -> u64 {
    5 * 1024 * 1024
}

fn default_setup_timeout() -> u64 {
    600
}

fn default_list_timeout() -> u64 {
    30
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            debug_logging: false,
            max_log_size_bytes: default_max_log_size_bytes(),
            extra_log_targets: Vec::new(),
            provisioner_path: None,
            binaries_dir: None,
            known_versions_file: None,
            setup_timeout_secs: default_setup_timeout(),
            list_timeout_secs: default_list_timeout(),
            type_definitions: true,
        }
    }
}

impl AppSettings {
    pub fn load() -> Self {
        let Ok(paths) = AppPaths::new() else {
            return Self::default();
        };
        Self::load_from_path(&paths.settings_file())
    }

    fn load_from_path(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) -> Result<(), std::io::Error> {
        let paths = AppPaths::new().map_err(std::io::Error::other)?;
        paths.ensure_dirs()?;
        self.save_to_path(&paths.settings_file())
    }

    fn save_to_path(&self, path: &Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
    }

    pub fn binaries_dir_or(&self, paths: &AppPaths) -> PathBuf {
        self.binaries_dir
            .clone()
            .unwrap_or_else(|| paths.binaries_dir())
    }

    pub fn setup_timeout(&self) -> Duration {
        Duration::from_secs(self.setup_timeout_secs)
    }

    pub fn list_timeout(&self) -> Duration {
        Duration::from_secs(self.list_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use serde_json::json;

    use super::AppSettings;

    #[test]
    fn defaults_match_expected_values() {
        let settings = AppSettings::default();

        assert!(!settings.debug_logging);
        assert_eq!(settings.max_log_size_bytes, 5 * 1024 * 1024);
        assert_eq!(settings.setup_timeout(), Duration::from_secs(600));
        assert_eq!(settings.list_timeout(), Duration::from_secs(30));
        assert!(settings.type_definitions);
        assert!(settings.provisioner_path.is_none());
        assert!(settings.extra_log_targets.is_empty());
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let settings: AppSettings = serde_json::from_value(json!({
            "debug_logging": true,
            "binaries_dir": "/srv/fiddle/bins",
            "extra_log_targets": ["which"]
        }))
        .expect("settings JSON should deserialize");

        assert!(settings.debug_logging);
        assert_eq!(settings.binaries_dir, Some(PathBuf::from("/srv/fiddle/bins")));
        assert_eq!(settings.setup_timeout_secs, 600);
        assert!(settings.type_definitions);
        assert_eq!(settings.extra_log_targets, vec!["which".to_string()]);
    }

    #[test]
    fn corrupt_file_loads_defaults() {
        let dir = tempfile::tempdir().expect("temporary directory should be created");
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").expect("settings file should be written");

        let settings = AppSettings::load_from_path(&path);

        assert!(!settings.debug_logging);
        assert_eq!(settings.list_timeout_secs, 30);
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().expect("temporary directory should be created");

        let settings = AppSettings::load_from_path(&dir.path().join("absent.json"));

        assert_eq!(settings.max_log_size_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn save_then_load_preserves_overrides() {
        let dir = tempfile::tempdir().expect("temporary directory should be created");
        let path = dir.path().join("settings.json");
        let settings = AppSettings {
            provisioner_path: Some(PathBuf::from("/opt/fiddle-binaries")),
            type_definitions: false,
            ..AppSettings::default()
        };

        settings.save_to_path(&path).expect("settings should save");
        let loaded = AppSettings::load_from_path(&path);

        assert_eq!(
            loaded.provisioner_path,
            Some(PathBuf::from("/opt/fiddle-binaries"))
        );
        assert!(!loaded.type_definitions);
    }
}
