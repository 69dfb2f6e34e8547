use anyhow::Error;
use thiserror::Error;

/// Application-level error types for s3bucket-rs.
///
/// Validation variants are raised before any S3 request is issued. Failures
/// returned by S3 itself are not represented here: they travel as the
/// original SDK error inside `anyhow::Error` and are never rewritten.
///
/// ## Exit Codes
///
/// Each variant maps to an exit code (via `exit_code()`):
/// - 0: Cancelled
/// - 1: Listing or deletion state errors (MalformedVersionEntry, IncompletePageMarker)
/// - 2: Invalid caller input (MissingParameter, InvalidParameterType, EmptyFileList, InvalidFileEntry)
#[derive(Error, Debug, PartialEq)]
pub enum S3BucketError {
    /// A required parameter was not supplied.
    #[error("Unable to {operation} due to missing parameter: {field}")]
    MissingParameter {
        operation: &'static str,
        field: &'static str,
    },

    /// An optional parameter was supplied with an unusable value.
    #[error("Invalid value for parameter {parameter}: {expected} was expected")]
    InvalidParameterType {
        parameter: &'static str,
        expected: &'static str,
    },

    /// A listed version or delete marker cannot be turned into a deletable identifier.
    #[error("Malformed version entry: {0}")]
    MalformedVersionEntry(String),

    /// The file list given to a multi-file operation was empty.
    #[error("Files list should not be empty")]
    EmptyFileList,

    /// One entry of a multi-file operation is unusable.
    #[error("Invalid file entry: {0}")]
    InvalidFileEntry(String),

    /// A truncated listing page did not carry both continuation markers.
    #[error("Truncated version listing without a complete key/version-id marker pair")]
    IncompletePageMarker,

    /// Operation cancelled through the cancellation token.
    #[error("Operation cancelled")]
    Cancelled,
}

impl S3BucketError {
    /// Get the appropriate process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            S3BucketError::Cancelled => 0,
            S3BucketError::MissingParameter { .. }
            | S3BucketError::InvalidParameterType { .. }
            | S3BucketError::EmptyFileList
            | S3BucketError::InvalidFileEntry(_) => 2,
            _ => 1,
        }
    }

    /// Check if this error was raised before any request reached S3.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            S3BucketError::MissingParameter { .. }
                | S3BucketError::InvalidParameterType { .. }
                | S3BucketError::EmptyFileList
                | S3BucketError::InvalidFileEntry(_)
        )
    }
}

/// Check if an anyhow::Error wraps a cancellation error.
pub fn is_cancelled_error(e: &Error) -> bool {
    if let Some(err) = e.downcast_ref::<S3BucketError>() {
        return *err == S3BucketError::Cancelled;
    }
    false
}

/// Check if an anyhow::Error wraps a validation error.
pub fn is_validation_error(e: &Error) -> bool {
    e.downcast_ref::<S3BucketError>()
        .is_some_and(S3BucketError::is_validation_error)
}

/// Extract the exit code from an anyhow::Error, defaulting to 1.
pub fn exit_code_from_error(e: &Error) -> i32 {
    if let Some(err) = e.downcast_ref::<S3BucketError>() {
        return err.exit_code();
    }
    1
}
