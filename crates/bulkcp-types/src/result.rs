//! Result type alias for bulkcp operations

use crate::error::Error;

/// Result type used throughout bulkcp
pub type Result<T> = std::result::Result<T, Error>;
