use std::str::FromStr;

use log::{debug, warn};
use tokio::io::{AsyncBufReadExt, BufReader};

use fiddle_backend::{DownloadState, VersionIdentifier};
use fiddle_core::{OutputEntry, StateEvent, VersionCatalog, VersionSwitcher};

use crate::error::AppError;

const HELP: &str = "\
Commands:
  use <version>     switch to a version, fetching it if needed
  retry <version>   try a failed download again
  refresh           re-read the local binary inventory
  list              show known versions and their download state
  status            show the active version and panel flags
  console           toggle the console panel
  output            show the console output log
  clear             clear the console output log
  auth              toggle the GitHub token dialog
  token [value]     set or clear the GitHub token
  avatar [url]      set or clear the avatar URL
  quit              exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Use(String),
    Retry(String),
    Refresh,
    List,
    Status,
    ToggleConsole,
    Output,
    ClearOutput,
    ToggleAuth,
    Token(Option<String>),
    Avatar(Option<String>),
    Help,
    Quit,
}

impl FromStr for ConsoleCommand {
    type Err = AppError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let command = parts.next().unwrap_or_default();
        let argument = parts.next().map(str::to_string);

        let require = |argument: Option<String>| {
            argument.ok_or_else(|| AppError::Message(format!("Usage: {command} <version>")))
        };

        match command {
            "use" => require(argument).map(Self::Use),
            "retry" => require(argument).map(Self::Retry),
            "refresh" => Ok(Self::Refresh),
            "list" | "ls" => Ok(Self::List),
            "status" => Ok(Self::Status),
            "console" => Ok(Self::ToggleConsole),
            "output" => Ok(Self::Output),
            "clear" => Ok(Self::ClearOutput),
            "auth" => Ok(Self::ToggleAuth),
            "token" => Ok(Self::Token(argument)),
            "avatar" => Ok(Self::Avatar(argument)),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            _ => Err(AppError::unknown_command(line.trim())),
        }
    }
}

/// Read commands from stdin until `quit` or end of input.
///
/// Switches run as their own tasks so a slow download never blocks the
/// prompt; their progress arrives through state events.
pub async fn run(switcher: VersionSwitcher) -> Result<(), AppError> {
    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|error| AppError::Message(format!("Failed to read input: {error}")))?
    {
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<ConsoleCommand>() {
            Ok(ConsoleCommand::Quit) => break,
            Ok(command) => dispatch(&switcher, command).await,
            Err(error) => println!("{error}"),
        }
    }

    debug!("Console closed");
    Ok(())
}

async fn dispatch(switcher: &VersionSwitcher, command: ConsoleCommand) {
    let state = switcher.state();
    match command {
        ConsoleCommand::Use(version) => spawn_switch(switcher.clone(), version, false),
        ConsoleCommand::Retry(version) => spawn_switch(switcher.clone(), version, true),
        ConsoleCommand::Refresh => match switcher.update_downloaded_version_state().await {
            Ok(catalog) => print_catalog(&catalog, &state.active_version()),
            Err(error) => println!("{error}"),
        },
        ConsoleCommand::List => print_catalog(&state.catalog(), &state.active_version()),
        ConsoleCommand::Status => {
            let snapshot = state.snapshot();
            println!(
                "active {}, {} of {} downloaded, console {} ({} lines), token dialog {}",
                snapshot.active_version,
                snapshot
                    .catalog
                    .versions_in_state(DownloadState::Ready)
                    .count(),
                snapshot.catalog.len(),
                on_off(snapshot.is_console_showing),
                snapshot.output.len(),
                on_off(snapshot.is_token_dialog_showing)
            );
        }
        ConsoleCommand::ToggleConsole => {
            if state.toggle_console() {
                print_output(&state.output());
            }
        }
        ConsoleCommand::Output => print_output(&state.output()),
        ConsoleCommand::ClearOutput => {
            state.clear_output();
        }
        ConsoleCommand::ToggleAuth => {
            state.toggle_auth_dialog();
        }
        ConsoleCommand::Token(token) => state.set_github_token(token),
        ConsoleCommand::Avatar(url) => state.set_avatar_url(url),
        ConsoleCommand::Help => println!("{HELP}"),
        ConsoleCommand::Quit => {}
    }
}

fn spawn_switch(switcher: VersionSwitcher, version: String, retry: bool) {
    tokio::spawn(async move {
        let result = if retry {
            switcher.retry(&version).await
        } else {
            switcher.switch_to(&version).await
        };
        if let Err(error) = result {
            warn!("Switch to {version} did not complete: {error}");
            if !error.is_retryable() {
                println!("{error}");
            }
        }
    });
}

fn print_catalog(catalog: &VersionCatalog, active: &VersionIdentifier) {
    for line in catalog_lines(catalog, active) {
        println!("{line}");
    }
}

fn print_output(entries: &[OutputEntry]) {
    if entries.is_empty() {
        println!("(no output)");
    }
    for line in output_lines(entries) {
        println!("{line}");
    }
}

pub fn output_lines(entries: &[OutputEntry]) -> Vec<String> {
    entries.iter().map(ToString::to_string).collect()
}

fn on_off(flag: bool) -> &'static str {
    if flag { "shown" } else { "hidden" }
}

/// One line per known version, in catalog order, with the active one starred.
pub fn catalog_lines(catalog: &VersionCatalog, active: &VersionIdentifier) -> Vec<String> {
    catalog
        .iter()
        .map(|record| {
            let marker = if &record.id == active { '*' } else { ' ' };
            let published = record
                .release
                .published_at
                .map(|at| at.format("%Y-%m-%d").to_string())
                .unwrap_or_default();
            let channel = if record.release.prerelease || record.id.is_prerelease() {
                "prerelease"
            } else {
                ""
            };
            format!(
                "{marker} {:<20} {:<12} {published:<10} {channel}",
                record.id.as_str(),
                record.download_state.to_string()
            )
            .trim_end()
            .to_string()
        })
        .collect()
}

/// User-facing line for a state event, if it is worth showing.
pub fn describe_event(event: &StateEvent) -> Option<String> {
    match event {
        StateEvent::ActiveVersionChanged(version) => Some(format!("Active version: {version}")),
        StateEvent::CatalogReplaced(_) => None,
        StateEvent::SwitchProgress { version, phase } => Some(format!("[{version}] {phase}")),
        StateEvent::ProvisioningFailed { version, error } => Some(format!(
            "Failed to fetch {version}: {error}. Run `retry {version}` to try again."
        )),
        StateEvent::ConsoleToggled(showing) => Some(format!("Console {}", on_off(*showing))),
        StateEvent::AuthDialogToggled(showing) => {
            Some(format!("Token dialog {}", on_off(*showing)))
        }
        StateEvent::GithubTokenChanged(token) => Some(
            if token.is_some() {
                "GitHub token saved"
            } else {
                "GitHub token cleared"
            }
            .to_string(),
        ),
        StateEvent::AvatarUrlChanged(url) => Some(match url {
            Some(url) => format!("Avatar: {url}"),
            None => "Avatar cleared".to_string(),
        }),
        StateEvent::OutputAppended(_) => None,
        StateEvent::OutputCleared => Some("Console output cleared".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use fiddle_backend::{BackendError, DownloadState, ReleaseInfo, normalize};
    use fiddle_core::{OutputEntry, StateEvent, SwitchPhase, VersionCatalog};

    use super::{ConsoleCommand, catalog_lines, describe_event, output_lines};
    use crate::error::AppError;

    #[test]
    fn parses_commands_with_arguments() {
        assert_eq!(
            "use v2.0.0".parse::<ConsoleCommand>(),
            Ok(ConsoleCommand::Use("v2.0.0".to_string()))
        );
        assert_eq!(
            "  retry 1.8.4 ".parse::<ConsoleCommand>(),
            Ok(ConsoleCommand::Retry("1.8.4".to_string()))
        );
        assert_eq!(
            "token ghp_abc".parse::<ConsoleCommand>(),
            Ok(ConsoleCommand::Token(Some("ghp_abc".to_string())))
        );
        assert_eq!(
            "avatar".parse::<ConsoleCommand>(),
            Ok(ConsoleCommand::Avatar(None))
        );
    }

    #[test]
    fn parses_bare_commands_and_aliases() {
        assert_eq!("ls".parse::<ConsoleCommand>(), Ok(ConsoleCommand::List));
        assert_eq!("console".parse::<ConsoleCommand>(), Ok(ConsoleCommand::ToggleConsole));
        assert_eq!("auth".parse::<ConsoleCommand>(), Ok(ConsoleCommand::ToggleAuth));
        assert_eq!("exit".parse::<ConsoleCommand>(), Ok(ConsoleCommand::Quit));
        assert_eq!("output".parse::<ConsoleCommand>(), Ok(ConsoleCommand::Output));
        assert_eq!("clear".parse::<ConsoleCommand>(), Ok(ConsoleCommand::ClearOutput));
    }

    #[test]
    fn use_without_version_prints_usage() {
        assert_eq!(
            "use".parse::<ConsoleCommand>(),
            Err(AppError::Message("Usage: use <version>".to_string()))
        );
    }

    #[test]
    fn unknown_command_is_rejected() {
        assert_eq!(
            "download 2.0.0".parse::<ConsoleCommand>(),
            Err(AppError::unknown_command("download 2.0.0"))
        );
    }

    #[test]
    fn catalog_lines_mark_active_version_and_state() {
        let catalog = VersionCatalog::seed(&[ReleaseInfo::new("v2.0.0"), ReleaseInfo::new("v1.0.0")])
            .expect("catalog should seed");
        let one = normalize("1.0.0").expect("valid version");
        let catalog = catalog
            .with_download_state(&one, DownloadState::Downloading)
            .expect("known version");

        let lines = catalog_lines(&catalog, &one);

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("  2.0.0"));
        assert!(lines[0].contains("unknown"));
        assert!(lines[1].starts_with("* 1.0.0"));
        assert!(lines[1].contains("downloading"));
    }

    #[test]
    fn describe_event_hides_token_and_catalog_noise() {
        let token = describe_event(&StateEvent::GithubTokenChanged(Some("ghp_secret".to_string())))
            .expect("token change is shown");
        assert!(!token.contains("ghp_secret"));

        let catalog = VersionCatalog::seed(&[ReleaseInfo::new("v2.0.0")]).expect("seed");
        assert!(describe_event(&StateEvent::CatalogReplaced(catalog.into())).is_none());
    }

    #[test]
    fn describe_event_suggests_retry_on_failure() {
        let version = normalize("2.0.0").expect("valid version");
        let line = describe_event(&StateEvent::ProvisioningFailed {
            version: version.clone(),
            error: BackendError::setup_failed("2.0.0", "offline"),
        })
        .expect("failure is shown");

        assert!(line.contains("retry 2.0.0"));
        assert_eq!(
            describe_event(&StateEvent::SwitchProgress {
                version,
                phase: SwitchPhase::Provisioning,
            }),
            Some("[2.0.0] provisioning".to_string())
        );
    }

    #[test]
    fn catalog_lines_flag_prerelease_tags() {
        let catalog = VersionCatalog::seed(&[ReleaseInfo::new("v3.0.0-beta.1"), ReleaseInfo::new("v2.0.0")])
            .expect("catalog should seed");
        let active = normalize("2.0.0").expect("valid version");

        let lines = catalog_lines(&catalog, &active);

        assert!(lines[0].ends_with("prerelease"));
        assert!(!lines[1].contains("prerelease"));
    }

    #[test]
    fn output_lines_render_each_entry_and_log_noise_is_hidden() {
        let entries = vec![
            OutputEntry::info("2.0.0: checking cache"),
            OutputEntry::error("Failed to fetch 2.0.0: offline"),
        ];

        let lines = output_lines(&entries);

        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("   2.0.0: checking cache"));
        assert!(lines[1].ends_with(" ! Failed to fetch 2.0.0: offline"));
        assert!(describe_event(&StateEvent::OutputAppended(entries[0].clone())).is_none());
        assert_eq!(
            describe_event(&StateEvent::OutputCleared),
            Some("Console output cleared".to_string())
        );
    }
}
