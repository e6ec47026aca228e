use std::collections::HashSet;

use log::trace;

use fiddle_backend::{VersionIdentifier, normalize};

/// Parse the helper's `list` output: one version per line, optionally
/// followed by whitespace-separated annotations. Lines that are blank,
/// comments, or not versions at all are skipped.
#[must_use]
pub fn parse_downloaded_versions(output: &str) -> HashSet<VersionIdentifier> {
    output
        .lines()
        .filter_map(|line| {
            let token = line.split_whitespace().next()?;
            if token.starts_with('#') {
                return None;
            }
            match normalize(token) {
                Ok(id) => Some(id),
                Err(error) => {
                    trace!("Ignoring inventory line {line:?}: {error}");
                    None
                }
            }
        })
        .collect()
}
