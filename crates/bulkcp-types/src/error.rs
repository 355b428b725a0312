//! Error types and handling for bulkcp
//!
//! The error taxonomy distinguishes configuration problems (surfaced before
//! any I/O), transient I/O failures (candidates for retry), checksum
//! mismatches, cancellation, and errors propagated verbatim from a storage
//! endpoint.

/// Main error type for bulkcp operations
#[derive(thiserror::Error, Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Error {
    /// Bad job parameters, detected before any I/O is performed
    #[error("configuration error: {message}")]
    Config {
        /// Description of the invalid configuration
        message: String,
    },

    /// Transient I/O failure, retried according to the job's retry policy
    #[error("transient I/O error: {message}")]
    TransientIo {
        /// Description of the failure
        message: String,
    },

    /// Source and target content digests disagree
    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Digest the target was expected to have
        expected: String,
        /// Digest the target actually produced
        actual: String,
    },

    /// Operation cancelled through the progress gate
    #[error("operation cancelled")]
    Cancelled,

    /// Operation exceeded its configured timeout
    #[error("operation timed out after {seconds} seconds")]
    Timeout {
        /// Number of seconds after which the operation timed out
        seconds: u64,
    },

    /// Error reported by a storage endpoint, propagated verbatim
    #[error("endpoint error: {message}")]
    Endpoint {
        /// Message supplied by the endpoint
        message: String,
        /// Whether the endpoint flagged the failure as retryable
        retryable: bool,
    },

    /// Generic error with custom message
    #[error("{message}")]
    Other {
        /// Custom error message
        message: String,
    },
}

/// Error kind for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Configuration errors
    Config,
    /// Transient I/O errors
    TransientIo,
    /// Checksum mismatches
    ChecksumMismatch,
    /// Cancellation
    Cancelled,
    /// Timeout
    Timeout,
    /// Endpoint errors
    Endpoint,
    /// Other errors
    Other,
}

impl Error {
    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config { .. } => ErrorKind::Config,
            Self::TransientIo { .. } => ErrorKind::TransientIo,
            Self::ChecksumMismatch { .. } => ErrorKind::ChecksumMismatch,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Endpoint { .. } => ErrorKind::Endpoint,
            Self::Other { .. } => ErrorKind::Other,
        }
    }

    /// Check if this error is flagged as retryable
    ///
    /// Transient I/O failures and timeouts are always retry candidates.
    /// Endpoint errors carry their own flag. Configuration errors, checksum
    /// mismatches, and cancellation are never retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::TransientIo { .. } | Self::Timeout { .. } => true,
            Self::Endpoint { retryable, .. } => *retryable,
            Self::Config { .. }
            | Self::ChecksumMismatch { .. }
            | Self::Cancelled
            | Self::Other { .. } => false,
        }
    }

    /// Check if this error belongs to the I/O class that a `force` retry
    /// policy will retry regardless of the endpoint's retryable flag
    pub fn is_io_class(&self) -> bool {
        matches!(
            self,
            Self::TransientIo { .. } | Self::Timeout { .. } | Self::Endpoint { .. }
        )
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new transient I/O error
    pub fn transient<S: Into<String>>(message: S) -> Self {
        Self::TransientIo {
            message: message.into(),
        }
    }

    /// Create a new endpoint error
    pub fn endpoint<S: Into<String>>(message: S, retryable: bool) -> Self {
        Self::Endpoint {
            message: message.into(),
            retryable,
        }
    }

    /// Create a new checksum mismatch error
    pub fn checksum_mismatch<S: Into<String>>(expected: S, actual: S) -> Self {
        Self::ChecksumMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a new generic error
    pub fn other<S: Into<String>>(message: S) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        use std::io::ErrorKind as IoKind;
        let retryable = matches!(
            error.kind(),
            IoKind::Interrupted
                | IoKind::WouldBlock
                | IoKind::TimedOut
                | IoKind::ConnectionReset
                | IoKind::ConnectionAborted
        );
        Self::Endpoint {
            message: error.to_string(),
            retryable,
        }
    }
}
