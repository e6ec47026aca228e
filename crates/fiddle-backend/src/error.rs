use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Command failed: {stderr}")]
    CommandFailed { stderr: String },

    #[error("Setup failed for {version}: {details}")]
    SetupFailed { version: String, details: String },

    #[error("IO error ({kind}): {message}")]
    IoError {
        kind: std::io::ErrorKind,
        message: String,
    },

    #[error("Storage error for key '{key}': {details}")]
    Storage { key: String, details: String },

    #[error("Timeout waiting for {operation} after {seconds}s")]
    Timeout {
        operation: &'static str,
        seconds: u64,
    },
}

impl BackendError {
    pub fn setup_failed(version: impl Into<String>, details: impl Into<String>) -> Self {
        Self::SetupFailed {
            version: version.into(),
            details: details.into(),
        }
    }

    pub fn storage(key: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Storage {
            key: key.into(),
            details: details.into(),
        }
    }

    pub fn storage_from<E>(key: impl Into<String>, error: E) -> Self
    where
        E: std::fmt::Display,
    {
        Self::storage(key, error.to_string())
    }
}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        BackendError::IoError {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}
