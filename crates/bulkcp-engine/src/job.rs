//! Job descriptors and the queue element type
//!
//! A [`JobDescriptor`] carries everything one copy operation needs. It is
//! built from a [`PropertyBag`] using the public configuration key table,
//! with engine-wide defaults filled in from [`EngineConfig`]. The queue
//! holds [`QueueEntry`] values so the synthetic configuration entry is a
//! distinct variant instead of a sentinel key.

use crate::config::EngineConfig;
use bulkcp_endpoint::{ChecksumKind, EndpointUrl};
use bulkcp_types::{Error, PropertyBag, Result};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Direct endpoint-to-endpoint transfer policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThirdPartyMode {
    /// Never attempt a direct transfer
    #[default]
    None,
    /// Attempt a direct transfer, fall back to chunked copy on failure
    First,
    /// Require a direct transfer; refuse the job if unsupported
    Only,
}

impl FromStr for ThirdPartyMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "first" => Ok(Self::First),
            "only" => Ok(Self::Only),
            other => Err(Error::config(format!("unknown thirdparty mode '{other}'"))),
        }
    }
}

impl fmt::Display for ThirdPartyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::First => "first",
            Self::Only => "only",
        };
        write!(f, "{name}")
    }
}

/// Where a content checksum is computed and compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumMode {
    /// No checksumming
    #[default]
    None,
    /// Compare the source digest (or preset) against the target digest
    End2End,
    /// Record the source digest only
    Source,
    /// Record the target digest only
    Target,
}

impl FromStr for ChecksumMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "end2end" => Ok(Self::End2End),
            "source" => Ok(Self::Source),
            "target" => Ok(Self::Target),
            other => Err(Error::config(format!("unknown checksum mode '{other}'"))),
        }
    }
}

/// How transient failures consume the retry budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetryPolicy {
    /// Retry any I/O-class failure up to the limit
    #[default]
    Force,
    /// Retry only failures the endpoint flags as retryable
    Continue,
}

impl FromStr for RetryPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "force" => Ok(Self::Force),
            "continue" => Ok(Self::Continue),
            other => Err(Error::config(format!("unknown retry policy '{other}'"))),
        }
    }
}

/// Position of a segment job inside a striped transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// Zero-based segment index
    pub index: u32,
    /// Total number of segments the source was split into
    pub count: u32,
}

/// Configuration of one copy operation
#[derive(Debug, Clone)]
pub struct JobDescriptor {
    /// Source URL
    pub source: EndpointUrl,
    /// Target URL
    pub target: EndpointUrl,
    /// Number of striped source segments; values above one enable striping
    pub source_limit: u32,
    /// Overwrite an existing target
    pub force: bool,
    /// Persist-on-successful-close semantics
    pub posc: bool,
    /// Bypass destination locking rules
    pub coerce: bool,
    /// Create missing target directories
    pub make_dir: bool,
    /// Direct transfer policy
    pub third_party: ThirdPartyMode,
    /// Checksum policy
    pub checksum_mode: ChecksumMode,
    /// Checksum algorithm
    pub checksum_type: ChecksumKind,
    /// Precomputed digest to verify against instead of the source digest
    pub checksum_preset: Option<String>,
    /// Bytes per transfer chunk
    pub chunk_size: usize,
    /// Maximum reads in flight within this job
    pub parallel_chunks: usize,
    /// Striping block size; segment boundaries land on multiples of it
    pub block_size: u64,
    /// Timeout for the open phase, zero disables
    pub init_timeout: Duration,
    /// Timeout for a direct third-party transfer, zero disables
    pub tpc_timeout: Duration,
    /// Timeout per chunk operation, zero disables
    pub copy_timeout: Duration,
    /// Source size is unknown or mutable; EOF is detected by a short read
    pub dynamic_source: bool,
    /// Delete the target when checksum verification fails
    pub rm_on_bad_checksum: bool,
    /// Transient-failure retry budget, shared across the whole job
    pub retry_count: u32,
    /// Retry policy
    pub retry_policy: RetryPolicy,
    /// Set on jobs produced by striping expansion
    pub segment: Option<Segment>,
}

impl JobDescriptor {
    /// Create a descriptor with engine defaults for everything but the URLs
    pub fn new(source: EndpointUrl, target: EndpointUrl, config: &EngineConfig) -> Self {
        Self {
            source,
            target,
            source_limit: 1,
            force: false,
            posc: false,
            coerce: false,
            make_dir: false,
            third_party: ThirdPartyMode::default(),
            checksum_mode: ChecksumMode::default(),
            checksum_type: ChecksumKind::default(),
            checksum_preset: None,
            chunk_size: config.chunk_size,
            parallel_chunks: config.parallel_chunks,
            block_size: config.block_size,
            init_timeout: config.init_timeout(),
            tpc_timeout: config.tpc_timeout(),
            copy_timeout: config.copy_timeout(),
            dynamic_source: false,
            rm_on_bad_checksum: false,
            retry_count: config.retry_count,
            retry_policy: config.retry_policy,
            segment: None,
        }
    }

    /// Build a descriptor from a configuration bag
    ///
    /// Every key of the public configuration table is accepted; anything
    /// else is a configuration error, as is a value that does not parse.
    pub fn from_properties(props: &PropertyBag, config: &EngineConfig) -> Result<Self> {
        let source = props
            .get_str("source")
            .ok_or_else(|| Error::config("job is missing 'source'"))?;
        let target = props
            .get_str("target")
            .ok_or_else(|| Error::config("job is missing 'target'"))?;
        let mut job = Self::new(EndpointUrl::parse(&source), EndpointUrl::parse(&target), config);

        for (key, _) in props.iter() {
            match key {
                "source" | "target" => {}
                "sourcelimit" => job.source_limit = get_u32(props, key)?,
                "force" => job.force = get_bool(props, key)?,
                "posc" => job.posc = get_bool(props, key)?,
                "coerce" => job.coerce = get_bool(props, key)?,
                "mkdir" => job.make_dir = get_bool(props, key)?,
                "thirdparty" => job.third_party = get_parsed(props, key)?,
                "checksummode" => job.checksum_mode = get_parsed(props, key)?,
                "checksumtype" => job.checksum_type = get_parsed(props, key)?,
                "checksumpreset" => {
                    job.checksum_preset = Some(get_string(props, key)?);
                }
                "chunksize" => job.chunk_size = get_u32(props, key)? as usize,
                "parallelchunks" => job.parallel_chunks = get_u32(props, key)? as usize,
                "blocksize" => job.block_size = u64::from(get_u32(props, key)?),
                "inittimeout" => job.init_timeout = get_secs(props, key)?,
                "tpctimeout" => job.tpc_timeout = get_secs(props, key)?,
                "cptimeout" => job.copy_timeout = get_secs(props, key)?,
                "dynamicsource" => job.dynamic_source = get_bool(props, key)?,
                "rmbadcksum" => job.rm_on_bad_checksum = get_bool(props, key)?,
                "retry" => job.retry_count = get_u32(props, key)?,
                "rtrplc" => job.retry_policy = get_parsed(props, key)?,
                other => {
                    return Err(Error::config(format!("unknown job property '{other}'")));
                }
            }
        }

        job.validate()?;
        Ok(job)
    }

    /// Check the descriptor's invariants
    pub fn validate(&self) -> Result<()> {
        if self.source.as_str().is_empty() {
            return Err(Error::config("job is missing 'source'"));
        }
        if self.target.as_str().is_empty() {
            return Err(Error::config("job is missing 'target'"));
        }
        if self.chunk_size == 0 {
            return Err(Error::config("chunksize must be greater than zero"));
        }
        if self.parallel_chunks == 0 {
            return Err(Error::config("parallelchunks must be at least one"));
        }
        if self.source_limit == 0 {
            return Err(Error::config("sourcelimit must be at least one"));
        }
        if self.source_limit > 1 && self.block_size == 0 {
            return Err(Error::config(
                "striped transfers require a nonzero blocksize",
            ));
        }
        if self.source_limit > 1 && self.dynamic_source {
            return Err(Error::config(
                "striped transfers require a known source size",
            ));
        }
        Ok(())
    }
}

/// One entry of the prepared job queue
#[derive(Debug, Clone)]
pub enum QueueEntry {
    /// The synthetic configuration entry fixing the scheduler parallelism
    Config {
        /// Number of jobs to run concurrently
        parallel: usize,
    },
    /// A transfer job
    Transfer(JobDescriptor),
}

fn get_string(props: &PropertyBag, key: &str) -> Result<String> {
    props
        .get_str(key)
        .ok_or_else(|| Error::config(format!("property '{key}' is not a string value")))
}

fn get_bool(props: &PropertyBag, key: &str) -> Result<bool> {
    props
        .get_bool(key)
        .ok_or_else(|| Error::config(format!("property '{key}' is not a boolean value")))
}

fn get_u32(props: &PropertyBag, key: &str) -> Result<u32> {
    let value = props
        .get_int(key)
        .ok_or_else(|| Error::config(format!("property '{key}' is not an integer value")))?;
    u32::try_from(value)
        .map_err(|_| Error::config(format!("property '{key}' is out of range: {value}")))
}

fn get_secs(props: &PropertyBag, key: &str) -> Result<Duration> {
    Ok(Duration::from_secs(u64::from(get_u32(props, key)?)))
}

fn get_parsed<T: FromStr<Err = Error>>(props: &PropertyBag, key: &str) -> Result<T> {
    get_string(props, key)?.parse()
}
