//! Storage endpoint contract and built-in endpoints for bulkcp
//!
//! This crate defines the narrow contract through which the copy engine
//! reaches storage systems: stat, open, positioned read/write, close,
//! remove, checksum, plus the pieces every deployment needs:
//!
//! - **`EndpointUrl`**: the scheme/path split identifying a stored object
//! - **`Endpoint` / `ObjectHandle`**: the async contract itself
//! - **`LocalEndpoint`**: `file://` over the local filesystem
//! - **`MemoryEndpoint`**: a deterministic in-memory endpoint with scripted
//!   failures, used heavily in tests
//! - **`EndpointResolver`**: scheme registry consulted by the engine
//! - **checksums**: the digest algorithms used for transfer verification
//!
//! # Examples
//!
//! ```rust
//! use bulkcp_endpoint::{EndpointResolver, EndpointUrl};
//!
//! let resolver = EndpointResolver::new();
//! let url = EndpointUrl::parse("file:///tmp/data.bin");
//! let endpoint = resolver.resolve(&url).unwrap();
//! assert_eq!(endpoint.scheme(), "file");
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod checksum;
pub mod endpoint;
pub mod local;
pub mod memory;
pub mod resolver;
pub mod url;

pub use checksum::{digest_bytes, ChecksumKind, Digest};
pub use endpoint::{Endpoint, ObjectHandle, OpenOptions, StatInfo};
pub use local::LocalEndpoint;
pub use memory::MemoryEndpoint;
pub use resolver::EndpointResolver;
pub use url::EndpointUrl;
