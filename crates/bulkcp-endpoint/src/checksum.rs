//! Content checksum support
//!
//! The digest algorithms a job can select through its `checksumtype` key.
//! All digests render as lowercase hex so they compare as plain strings.

use bulkcp_types::{Error, Result};
use sha2::Digest as _;
use std::fmt;
use std::str::FromStr;

/// Checksum algorithm selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChecksumKind {
    /// CRC-32 (IEEE), cheap and short
    Crc32,
    /// SHA-256
    Sha256,
    /// BLAKE3, the default
    #[default]
    Blake3,
}

impl fmt::Display for ChecksumKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Crc32 => "crc32",
            Self::Sha256 => "sha256",
            Self::Blake3 => "blake3",
        };
        write!(f, "{name}")
    }
}

impl FromStr for ChecksumKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "crc32" => Ok(Self::Crc32),
            "sha256" => Ok(Self::Sha256),
            "blake3" => Ok(Self::Blake3),
            other => Err(Error::config(format!("unknown checksum type '{other}'"))),
        }
    }
}

/// Incremental digest over transferred bytes
#[derive(Debug)]
pub enum Digest {
    /// CRC-32 state
    Crc32(crc32fast::Hasher),
    /// SHA-256 state
    Sha256(sha2::Sha256),
    /// BLAKE3 state
    Blake3(Box<blake3::Hasher>),
}

impl Digest {
    /// Create a fresh digest for the given algorithm
    pub fn new(kind: ChecksumKind) -> Self {
        match kind {
            ChecksumKind::Crc32 => Self::Crc32(crc32fast::Hasher::new()),
            ChecksumKind::Sha256 => Self::Sha256(sha2::Sha256::new()),
            ChecksumKind::Blake3 => Self::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    /// Feed bytes into the digest
    pub fn update(&mut self, data: &[u8]) {
        match self {
            Self::Crc32(h) => h.update(data),
            Self::Sha256(h) => h.update(data),
            Self::Blake3(h) => {
                h.update(data);
            }
        }
    }

    /// Consume the digest and render it as lowercase hex
    pub fn finalize_hex(self) -> String {
        match self {
            Self::Crc32(h) => format!("{:08x}", h.finalize()),
            Self::Sha256(h) => to_hex(&h.finalize()),
            Self::Blake3(h) => h.finalize().to_hex().to_string(),
        }
    }
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().fold(
        String::with_capacity(bytes.len() * 2),
        |mut out, byte| {
            use fmt::Write;
            let _ = write!(out, "{byte:02x}");
            out
        },
    )
}

/// Digest a whole byte slice in one step
pub fn digest_bytes(kind: ChecksumKind, data: &[u8]) -> String {
    let mut digest = Digest::new(kind);
    digest.update(data);
    digest.finalize_hex()
}
