//! Core type system and error handling for bulkcp
//!
//! This crate provides the foundational types shared across the bulkcp
//! workspace:
//!
//! - **Error handling**: the error taxonomy of the copy engine, with
//!   retryability classification
//! - **Status**: the per-job outcome value and its wire representation
//! - **PropertyBag**: the ordered, typed key/value container used for both
//!   job configuration and job results
//!
//! # Examples
//!
//! ```rust
//! use bulkcp_types::{PropertyBag, Status, Value};
//!
//! let mut bag = PropertyBag::new();
//! bag.set("source", "file:///tmp/a");
//! bag.set("status", Status::ok());
//! assert!(bag.get_status("status").unwrap().is_ok());
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod props;
pub mod result;
pub mod status;

pub use error::{Error, ErrorKind};
pub use props::{PropertyBag, Value};
pub use result::Result;
pub use status::{code, Severity, Status};
