use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use log::{debug, warn};

use fiddle_backend::{BackendError, KeyValueStore};

/// Flat string map persisted as a JSON object.
///
/// Every `set` rewrites the whole file through a temp file and a rename, so
/// readers never see a half-written document.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    /// Raw file content, or `None` when there is nothing stored yet.
    fn read_content(&self, key: &str) -> Result<Option<String>, BackendError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(None),
            Ok(content) => Ok(Some(content)),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(BackendError::storage_from(key, error)),
        }
    }

    fn read_all(&self, key: &str) -> Result<BTreeMap<String, String>, BackendError> {
        match self.read_content(key)? {
            Some(content) => {
                serde_json::from_str(&content).map_err(|e| BackendError::storage_from(key, e))
            }
            None => Ok(BTreeMap::new()),
        }
    }

    /// Like [`Self::read_all`], but a document that does not parse is
    /// replaced on the next write instead of blocking it.
    fn read_for_write(&self, key: &str) -> Result<BTreeMap<String, String>, BackendError> {
        let Some(content) = self.read_content(key)? else {
            return Ok(BTreeMap::new());
        };
        Ok(serde_json::from_str(&content).unwrap_or_else(|error| {
            warn!(
                "Discarding unreadable store {}: {error}",
                self.path.display()
            );
            BTreeMap::new()
        }))
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        Ok(self.read_all(key)?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), BackendError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut values = self.read_for_write(key)?;
        if values.get(key).is_some_and(|existing| existing == value) {
            return Ok(());
        }
        values.insert(key.to_string(), value.to_string());

        let data =
            serde_json::to_vec_pretty(&values).map_err(|e| BackendError::storage_from(key, e))?;
        write_atomic(&self.path, &data).map_err(|e| BackendError::storage_from(key, e))?;
        debug!("Stored {key} in {}", self.path.display());
        Ok(())
    }
}

fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let parent = path.parent().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "store path has no parent")
    })?;
    std::fs::create_dir_all(parent)?;

    let file_name = path
        .file_name()
        .and_then(std::ffi::OsStr::to_str)
        .unwrap_or("store");
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |duration| duration.as_nanos());
    let pid = std::process::id();

    let mut tmp_path = None;
    for attempt in 0..16_u8 {
        let candidate = parent.join(format!(".{file_name}.{pid}.{timestamp}.{attempt}.tmp"));
        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(mut file) => {
                file.write_all(data)?;
                file.sync_all()?;
                tmp_path = Some(candidate);
                break;
            }
            Err(error) if error.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(error) => return Err(error),
        }
    }

    let Some(tmp_path) = tmp_path else {
        return Err(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            "failed to create unique temp file",
        ));
    };

    if let Err(error) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(error);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use fiddle_backend::{BackendError, KeyValueStore};

    use super::{JsonFileStore, write_atomic};

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().expect("temporary directory should be created");
        let store = JsonFileStore::new(dir.path().join("preferences.json"));

        assert_eq!(store.get("githubToken").expect("read"), None);
    }

    #[test]
    fn set_then_get_round_trips_through_disk() {
        let dir = tempfile::tempdir().expect("temporary directory should be created");
        let path = dir.path().join("nested").join("preferences.json");
        let store = JsonFileStore::new(path.clone());

        store.set("githubToken", "ghp_abc").expect("write");
        store.set("avatarUrl", "").expect("write");

        let reopened = JsonFileStore::new(path);
        assert_eq!(
            reopened.get("githubToken").expect("read").as_deref(),
            Some("ghp_abc")
        );
        assert_eq!(reopened.get("avatarUrl").expect("read").as_deref(), Some(""));
    }

    #[test]
    fn corrupt_file_is_a_storage_error() {
        let dir = tempfile::tempdir().expect("temporary directory should be created");
        let path = dir.path().join("preferences.json");
        std::fs::write(&path, "[1, 2").expect("write corrupt file");
        let store = JsonFileStore::new(path);

        let result = store.get("githubToken");

        assert!(matches!(result, Err(BackendError::Storage { ref key, .. }) if key == "githubToken"));
    }

    #[test]
    fn write_replaces_corrupt_file() {
        let dir = tempfile::tempdir().expect("temporary directory should be created");
        let path = dir.path().join("preferences.json");
        std::fs::write(&path, "{\"githubToken\": ").expect("write corrupt file");
        let store = JsonFileStore::new(path.clone());

        store.set("avatarUrl", "https://example.com/a.png").expect("write recovers");
        store.set("githubToken", "ghp_new").expect("later writes keep working");

        assert_eq!(
            store.get("avatarUrl").expect("read").as_deref(),
            Some("https://example.com/a.png")
        );
        assert_eq!(
            JsonFileStore::new(path).get("githubToken").expect("read").as_deref(),
            Some("ghp_new")
        );
    }

    #[test]
    fn write_atomic_leaves_no_temp_files() {
        let dir = tempfile::tempdir().expect("temporary directory should be created");
        let path = dir.path().join("preferences.json");

        write_atomic(&path, b"{}").expect("first write");
        write_atomic(&path, b"{\"a\":\"b\"}").expect("second write");

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .expect("list dir")
            .filter_map(Result::ok)
            .map(|entry| entry.file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("preferences.json")]);
        assert_eq!(
            std::fs::read_to_string(&path).expect("read back"),
            "{\"a\":\"b\"}"
        );
    }
}
