//! Error types exposed by the test-cycle client.

use thiserror::Error;

/// Errors surfaced while talking to the test-management service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ZephyrError {
    /// The connector is switched off or its configuration was unusable.
    #[error("test-cycle connector is not active")]
    Inactive,

    /// The scenario's tags carry no `@Key_` test-case tag.
    #[error("scenario tags carry no test-case key")]
    MissingTestCaseTag,

    /// The transport failed before a response arrived.
    #[error("network error during {operation}: {message}")]
    Network {
        /// The operation being attempted.
        operation: &'static str,
        /// Transport-level error detail.
        message: String,
    },

    /// The service answered with a status the operation does not accept.
    #[error("{operation} failed with status {status}")]
    UnexpectedStatus {
        /// The operation being attempted.
        operation: &'static str,
        /// The HTTP status code returned.
        status: u16,
    },
}
