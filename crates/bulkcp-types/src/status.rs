//! Job outcome status values
//!
//! A [`Status`] records how a copy job ended. It is stored in the job's
//! result bag and serializes to the wire form
//! `"<status>;<code>;<errNo>#<message>"`, which round-trips through
//! [`std::str::FromStr`].

use crate::error::{Error, ErrorKind};
use std::fmt;
use std::str::FromStr;

/// Severity of a status value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Severity {
    /// Operation completed successfully
    Ok,
    /// Operation failed but the process may continue
    Error,
    /// Operation failed and the failure is not recoverable
    Fatal,
}

impl Severity {
    fn as_u16(self) -> u16 {
        match self {
            Self::Ok => 0,
            Self::Error => 1,
            Self::Fatal => 2,
        }
    }

    fn from_u16(value: u16) -> Option<Self> {
        match value {
            0 => Some(Self::Ok),
            1 => Some(Self::Error),
            2 => Some(Self::Fatal),
            _ => None,
        }
    }
}

/// Status codes identifying the failure class
pub mod code {
    /// No failure
    pub const OK: u16 = 0;
    /// Bad job parameters
    pub const CONFIG: u16 = 1;
    /// Transient I/O failure that exhausted its retry budget
    pub const TRANSIENT_IO: u16 = 2;
    /// Content digests disagreed
    pub const CHECKSUM_MISMATCH: u16 = 3;
    /// Cancelled through the progress gate
    pub const CANCELLED: u16 = 4;
    /// Operation timeout
    pub const TIMEOUT: u16 = 5;
    /// Error propagated from a storage endpoint
    pub const ENDPOINT: u16 = 6;
    /// Anything else
    pub const OTHER: u16 = 7;
}

/// Outcome of a copy job
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Status {
    /// Severity of the outcome
    pub severity: Severity,
    /// Failure class, one of the [`code`] constants
    pub code: u16,
    /// OS-level errno when one applies, zero otherwise
    pub errno: i32,
    /// Human-readable description
    pub message: String,
}

impl Status {
    /// Create a successful status
    pub fn ok() -> Self {
        Self {
            severity: Severity::Ok,
            code: code::OK,
            errno: 0,
            message: String::new(),
        }
    }

    /// Create a failed status
    pub fn error<S: Into<String>>(code: u16, errno: i32, message: S) -> Self {
        Self {
            severity: Severity::Error,
            code,
            errno,
            message: message.into(),
        }
    }

    /// Check whether the status reports success
    pub fn is_ok(&self) -> bool {
        self.severity == Severity::Ok
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::ok()
    }
}

impl From<&Error> for Status {
    fn from(error: &Error) -> Self {
        let code = match error.kind() {
            ErrorKind::Config => code::CONFIG,
            ErrorKind::TransientIo => code::TRANSIENT_IO,
            ErrorKind::ChecksumMismatch => code::CHECKSUM_MISMATCH,
            ErrorKind::Cancelled => code::CANCELLED,
            ErrorKind::Timeout => code::TIMEOUT,
            ErrorKind::Endpoint => code::ENDPOINT,
            ErrorKind::Other => code::OTHER,
        };
        Self::error(code, 0, error.to_string())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{};{};{}#{}",
            self.severity.as_u16(),
            self.code,
            self.errno,
            self.message
        )
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (head, message) = s
            .split_once('#')
            .ok_or_else(|| Error::other(format!("malformed status: {s:?}")))?;
        let mut fields = head.split(';');
        let mut next = || {
            fields
                .next()
                .ok_or_else(|| Error::other(format!("malformed status: {s:?}")))
        };
        let severity: u16 = next()?
            .parse()
            .map_err(|_| Error::other(format!("malformed status severity in {s:?}")))?;
        let code: u16 = next()?
            .parse()
            .map_err(|_| Error::other(format!("malformed status code in {s:?}")))?;
        let errno: i32 = next()?
            .parse()
            .map_err(|_| Error::other(format!("malformed status errno in {s:?}")))?;
        let severity = Severity::from_u16(severity)
            .ok_or_else(|| Error::other(format!("unknown status severity in {s:?}")))?;
        Ok(Self {
            severity,
            code,
            errno,
            message: message.to_string(),
        })
    }
}
