//! The storage endpoint contract
//!
//! The transfer pipeline sees every storage system through these two traits:
//! an [`Endpoint`] resolves URLs to metadata and open handles, and an
//! [`ObjectHandle`] performs positioned reads and writes on one object.
//! Positioned I/O takes `&self` so a pipeline can keep several reads in
//! flight against a single handle.

use crate::checksum::ChecksumKind;
use crate::url::EndpointUrl;
use async_trait::async_trait;
use bulkcp_types::{Error, Result};

/// Metadata of a stored object
#[derive(Debug, Clone, Copy, Default)]
pub struct StatInfo {
    /// Object size in bytes
    pub size: u64,
    /// Whether the path names a directory
    pub is_dir: bool,
}

/// Options controlling how an object is opened
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenOptions {
    /// Open for reading
    pub read: bool,
    /// Open for writing
    pub write: bool,
    /// Create the object if absent
    pub create: bool,
    /// Replace an existing object; without it, opening an existing target
    /// for write fails
    pub overwrite: bool,
    /// Discard existing content on open; striped segment writers open the
    /// shared target without it
    pub truncate: bool,
    /// Create missing parent directories
    pub make_dirs: bool,
    /// Persist-on-successful-close semantics
    pub posc: bool,
    /// Bypass destination locking rules
    pub coerce: bool,
}

impl OpenOptions {
    /// Options for reading an existing object
    pub fn reading() -> Self {
        Self {
            read: true,
            ..Self::default()
        }
    }

    /// Options for creating and writing an object
    pub fn writing() -> Self {
        Self {
            write: true,
            create: true,
            ..Self::default()
        }
    }

    /// Allow replacing an existing object
    pub fn overwrite(mut self, yes: bool) -> Self {
        self.overwrite = yes;
        self
    }

    /// Discard existing content on open
    pub fn truncate(mut self, yes: bool) -> Self {
        self.truncate = yes;
        self
    }

    /// Create missing parent directories
    pub fn make_dirs(mut self, yes: bool) -> Self {
        self.make_dirs = yes;
        self
    }

    /// Persist the object only on successful close
    pub fn posc(mut self, yes: bool) -> Self {
        self.posc = yes;
        self
    }

    /// Bypass destination locking rules
    pub fn coerce(mut self, yes: bool) -> Self {
        self.coerce = yes;
        self
    }
}

/// Handle to one open object
#[async_trait]
pub trait ObjectHandle: Send + Sync {
    /// Read up to `len` bytes at `offset`
    ///
    /// A short or empty result signals end of object.
    async fn read_at(&self, offset: u64, len: usize) -> Result<Vec<u8>>;

    /// Write all of `data` at `offset`
    async fn write_at(&self, offset: u64, data: &[u8]) -> Result<()>;

    /// Truncate the object to `size` bytes
    async fn truncate(&self, size: u64) -> Result<()>;

    /// Close the handle, flushing as the open options require
    async fn close(&mut self) -> Result<()>;

    /// The physical URL this handle resolved to, which may differ from the
    /// requested logical URL after redirection
    fn resolved_url(&self) -> &EndpointUrl;
}

/// A storage system reachable under one URL scheme
#[async_trait]
pub trait Endpoint: Send + Sync + std::fmt::Debug {
    /// The URL scheme this endpoint serves
    fn scheme(&self) -> &str;

    /// Query object metadata
    async fn stat(&self, url: &EndpointUrl) -> Result<StatInfo>;

    /// Open an object
    async fn open(&self, url: &EndpointUrl, options: OpenOptions) -> Result<Box<dyn ObjectHandle>>;

    /// Remove an object
    async fn remove(&self, url: &EndpointUrl) -> Result<()>;

    /// Compute the checksum of a stored object
    async fn checksum(&self, url: &EndpointUrl, kind: ChecksumKind) -> Result<String>;

    /// Whether this endpoint can copy directly to `other` without routing
    /// bytes through the orchestrating process
    fn supports_third_party(&self, _other: &dyn Endpoint) -> bool {
        false
    }

    /// Perform a direct endpoint-to-endpoint copy, returning the number of
    /// bytes transferred
    async fn copy_direct(&self, _source: &EndpointUrl, _target: &EndpointUrl) -> Result<u64> {
        Err(Error::endpoint("third-party copy not supported", false))
    }
}
