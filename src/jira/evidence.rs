//! Evidence file discovery for attachment uploads.

use std::time::SystemTime;

use camino::{Utf8Path, Utf8PathBuf};

use crate::config::{ConfigError, LayeredConfig};

/// Subdirectory of the evidence base holding generated report files.
const REPORT_SUBDIR: &str = "PDF";

/// Environment variable marking a CI build agent.
const CI_HOME_VAR: &str = "JENKINS_HOME";

/// Configured evidence directories, resolved once at client construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct EvidenceLocator {
    windows: Utf8PathBuf,
    unix: Utf8PathBuf,
    jenkins: Utf8PathBuf,
}

impl EvidenceLocator {
    pub(super) fn from_config(config: &LayeredConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            windows: Utf8PathBuf::from(config.resolve("evidence.path.windows")?),
            unix: Utf8PathBuf::from(config.resolve("evidence.path.unix")?),
            jenkins: Utf8PathBuf::from(config.resolve("evidence.path.jenkins")?),
        })
    }

    /// The directory to scan for evidence files.
    ///
    /// A CI agent (non-empty `JENKINS_HOME`) uses the jenkins path; otherwise
    /// the per-OS path applies. The environment variable is read at call time
    /// so the check stays testable.
    pub(super) fn directory(&self) -> Utf8PathBuf {
        let base = match std::env::var(CI_HOME_VAR) {
            Ok(value) if !value.trim().is_empty() => &self.jenkins,
            _ => {
                if cfg!(windows) {
                    &self.windows
                } else {
                    &self.unix
                }
            }
        };
        base.join(REPORT_SUBDIR)
    }
}

/// Returns the most-recently-modified regular file in `directory`.
///
/// Subdirectories are ignored; entries whose metadata cannot be read are
/// skipped. An unreadable or empty directory yields `None`.
pub(super) fn latest_file(directory: &Utf8Path) -> Option<Utf8PathBuf> {
    let entries = match directory.read_dir_utf8() {
        Ok(entries) => entries,
        Err(error) => {
            tracing::warn!("failed to read evidence directory '{directory}': {error}");
            return None;
        }
    };

    entries
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let metadata = entry.metadata().ok()?;
            if !metadata.is_file() {
                return None;
            }
            let modified = metadata.modified().ok()?;
            Some((entry.into_path(), modified))
        })
        .max_by_key(|(_, modified): &(Utf8PathBuf, SystemTime)| *modified)
        .map(|(path, _)| path)
}

#[cfg(test)]
#[path = "evidence_tests.rs"]
mod tests;
