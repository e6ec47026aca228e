use std::fmt;

use chrono::{DateTime, Utc};

/// Oldest entries are dropped once the log grows past this.
pub const MAX_OUTPUT_ENTRIES: usize = 500;

/// One line of console output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputEntry {
    pub timestamp: DateTime<Utc>,
    pub text: String,
    pub is_error: bool,
}

impl OutputEntry {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::info(text)
        }
    }
}

impl fmt::Display for OutputEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = if self.is_error { "!" } else { " " };
        write!(
            f,
            "{} {marker} {}",
            self.timestamp.format("%H:%M:%S"),
            self.text
        )
    }
}

/// Append `entry`, dropping from the front to stay within the cap.
pub(crate) fn append_bounded(log: &mut Vec<OutputEntry>, entry: OutputEntry) {
    log.push(entry);
    if log.len() > MAX_OUTPUT_ENTRIES {
        let excess = log.len() - MAX_OUTPUT_ENTRIES;
        log.drain(..excess);
    }
}
