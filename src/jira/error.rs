//! Error types exposed by the issue tracker client.

use thiserror::Error;

/// Errors surfaced while talking to the issue tracker.
///
/// Runtime callers can tell a disabled connector apart from a transport
/// failure or an HTTP-level rejection; the batch layer downgrades all of
/// these to logged, non-fatal step outcomes.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JiraError {
    /// The connector is switched off or its configuration was unusable.
    #[error("issue tracker connector is not active")]
    Inactive,

    /// The transport failed before a response arrived.
    #[error("network error during {operation}: {message}")]
    Network {
        /// The operation being attempted.
        operation: &'static str,
        /// Transport-level error detail.
        message: String,
    },

    /// The tracker answered with a status the operation does not accept.
    #[error("{operation} failed with status {status}")]
    UnexpectedStatus {
        /// The operation being attempted.
        operation: &'static str,
        /// The HTTP status code returned.
        status: u16,
    },

    /// A field update carried no fields to send.
    #[error("field update has no fields set")]
    EmptyUpdate,

    /// No evidence file was found to attach.
    #[error("no evidence file found in '{directory}'")]
    NoEvidenceFile {
        /// The directory that was scanned.
        directory: String,
    },

    /// The evidence file could not be read for upload.
    #[error("failed to read evidence file '{path}': {message}")]
    EvidenceUnreadable {
        /// Path of the unreadable file.
        path: String,
        /// Error detail from the I/O operation.
        message: String,
    },

    /// The tracker's response body did not carry the expected data.
    #[error("malformed response from issue tracker: {message}")]
    MalformedResponse {
        /// What was missing or undecodable.
        message: String,
    },
}
