use std::collections::HashSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error, info, trace};
use tokio::process::Command;

use fiddle_backend::{BackendError, BinaryProvisioner, TypeDefinitionService, VersionIdentifier};
use fiddle_platform::HideWindow;

use crate::inventory::parse_downloaded_versions;

const DEFAULT_SETUP_TIMEOUT: Duration = Duration::from_secs(600);
const DEFAULT_LIST_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs the external binary helper to fetch and list runtime versions.
#[derive(Debug, Clone)]
pub struct CommandProvisioner {
    path: PathBuf,
    binaries_dir: Option<PathBuf>,
    setup_timeout: Duration,
    list_timeout: Duration,
}

impl CommandProvisioner {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            binaries_dir: None,
            setup_timeout: DEFAULT_SETUP_TIMEOUT,
            list_timeout: DEFAULT_LIST_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_binaries_dir(mut self, dir: PathBuf) -> Self {
        self.binaries_dir = Some(dir);
        self
    }

    #[must_use]
    pub fn with_timeouts(mut self, setup: Duration, list: Duration) -> Self {
        self.setup_timeout = setup;
        self.list_timeout = list;
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn build_command(&self, args: &[&str]) -> Command {
        debug!(
            "Building helper command: {} {}",
            self.path.display(),
            args.join(" ")
        );

        let mut cmd = Command::new(&self.path);
        cmd.args(args);
        if let Some(dir) = &self.binaries_dir {
            cmd.arg("--dir").arg(dir);
        }
        cmd.kill_on_drop(true);
        cmd.hide_window();
        cmd
    }
}

#[async_trait]
impl BinaryProvisioner for CommandProvisioner {
    fn name(&self) -> &'static str {
        "command"
    }

    async fn setup(&self, version: &VersionIdentifier) -> Result<(), BackendError> {
        let cmd = self.build_command(&["setup", version.as_str()]);
        execute(cmd, "setup", self.setup_timeout)
            .await
            .map_err(|error| match error {
                BackendError::CommandFailed { stderr } => {
                    BackendError::setup_failed(version.as_str(), stderr.trim())
                }
                other => other,
            })?;
        Ok(())
    }

    async fn downloaded_versions(&self) -> Result<HashSet<VersionIdentifier>, BackendError> {
        let cmd = self.build_command(&["list"]);
        let output = execute(cmd, "list", self.list_timeout).await?;
        Ok(parse_downloaded_versions(&output))
    }
}

/// Asks the helper to regenerate editor type definitions for a version.
#[derive(Debug, Clone)]
pub struct CommandTypeDefinitions {
    path: PathBuf,
    timeout: Duration,
}

impl CommandTypeDefinitions {
    #[must_use]
    pub fn new(path: PathBuf, timeout: Duration) -> Self {
        Self { path, timeout }
    }
}

#[async_trait]
impl TypeDefinitionService for CommandTypeDefinitions {
    async fn refresh(&self, version: &VersionIdentifier) -> Result<(), BackendError> {
        let mut cmd = Command::new(&self.path);
        cmd.args(["types", version.as_str()]);
        cmd.kill_on_drop(true);
        cmd.hide_window();
        execute(cmd, "types", self.timeout).await?;
        Ok(())
    }
}

async fn execute(
    mut cmd: Command,
    operation: &'static str,
    timeout: Duration,
) -> Result<String, BackendError> {
    info!("Executing helper command: {operation}");

    let output = run_with_timeout(timeout, operation, cmd.output()).await??;

    debug!("Helper {operation} exit status: {:?}", output.status);
    trace!("Helper stdout: {}", String::from_utf8_lossy(&output.stdout));
    if !output.stderr.is_empty() {
        trace!("Helper stderr: {}", String::from_utf8_lossy(&output.stderr));
    }

    if output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        debug!("Helper {operation} succeeded, output: {} bytes", stdout.len());
        Ok(stdout)
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        error!("Helper {operation} failed: stderr='{stderr}'");
        Err(BackendError::CommandFailed { stderr })
    }
}

async fn run_with_timeout<T, F>(
    timeout: Duration,
    operation: &'static str,
    future: F,
) -> Result<T, BackendError>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(timeout, future)
        .await
        .map_err(|_| BackendError::Timeout {
            operation,
            seconds: timeout.as_secs(),
        })
}
