#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppErrorDetail {
    Message(String),
    Io {
        kind: std::io::ErrorKind,
        message: String,
    },
    Backend(fiddle_backend::BackendError),
    Catalog(fiddle_core::CatalogError),
}

impl std::fmt::Display for AppErrorDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Message(message) => write!(f, "{message}"),
            Self::Io { kind, message } => write!(f, "{kind}: {message}"),
            Self::Backend(error) => write!(f, "{error}"),
            Self::Catalog(error) => write!(f, "{error}"),
        }
    }
}

impl From<String> for AppErrorDetail {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}

impl From<&str> for AppErrorDetail {
    fn from(value: &str) -> Self {
        Self::Message(value.to_string())
    }
}

impl From<std::io::Error> for AppErrorDetail {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

impl From<fiddle_backend::BackendError> for AppErrorDetail {
    fn from(value: fiddle_backend::BackendError) -> Self {
        Self::Backend(value)
    }
}

impl From<fiddle_core::CatalogError> for AppErrorDetail {
    fn from(value: fiddle_core::CatalogError) -> Self {
        Self::Catalog(value)
    }
}

impl From<fiddle_platform::AppPathsError> for AppErrorDetail {
    fn from(value: fiddle_platform::AppPathsError) -> Self {
        Self::Message(value.to_string())
    }
}

impl From<serde_json::Error> for AppErrorDetail {
    fn from(value: serde_json::Error) -> Self {
        Self::Message(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    Message(String),
    EnvironmentUnavailable {
        reason: AppErrorDetail,
    },
    KnownVersionsLoadFailed {
        source: &'static str,
        details: AppErrorDetail,
    },
    StartupFailed {
        phase: &'static str,
        details: AppErrorDetail,
    },
    UnknownCommand {
        input: String,
    },
}

impl AppError {
    pub fn environment_unavailable(reason: impl Into<AppErrorDetail>) -> Self {
        Self::EnvironmentUnavailable {
            reason: reason.into(),
        }
    }

    pub fn known_versions_load_failed(
        source: &'static str,
        details: impl Into<AppErrorDetail>,
    ) -> Self {
        Self::KnownVersionsLoadFailed {
            source,
            details: details.into(),
        }
    }

    pub fn startup_failed(phase: &'static str, details: impl Into<AppErrorDetail>) -> Self {
        Self::StartupFailed {
            phase,
            details: details.into(),
        }
    }

    pub fn unknown_command(input: impl Into<String>) -> Self {
        Self::UnknownCommand {
            input: input.into(),
        }
    }
}

impl From<String> for AppError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}

impl From<&str> for AppError {
    fn from(value: &str) -> Self {
        Self::Message(value.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Message(message) => write!(f, "{message}"),
            Self::EnvironmentUnavailable { reason } => write!(f, "{reason}"),
            Self::KnownVersionsLoadFailed { source, details } => {
                write!(f, "Failed to load known versions from {source}: {details}")
            }
            Self::StartupFailed { phase, details } => {
                write!(f, "Startup {phase} failed: {details}")
            }
            Self::UnknownCommand { input } => write!(f, "Unknown command: {input}"),
        }
    }
}

impl std::error::Error for AppError {}
