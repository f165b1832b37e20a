//! Fatal error carrier for aborting a test run.

use thiserror::Error;

use crate::config::ConfigError;

/// Terminal failure signal for the run in progress.
///
/// Construction logs the message at error level so the failure reaches the
/// run log even when the value is dropped before it propagates. Callers
/// format their message up front (`AutomationError::new(format!(...))`);
/// there is no recovery path, only propagation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct AutomationError {
    message: String,
}

impl AutomationError {
    /// Creates the error and logs its message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        let rendered = message.into();
        tracing::error!("{rendered}");
        Self { message: rendered }
    }

    /// Borrows the carried message.
    #[must_use]
    pub const fn message(&self) -> &str {
        self.message.as_str()
    }
}

impl From<ConfigError> for AutomationError {
    fn from(error: ConfigError) -> Self {
        Self::new(error.to_string())
    }
}
