//! Job queue preparation
//!
//! The preparer turns the submitted job list into the queue the scheduler
//! consumes: it prepends the configuration entry carrying the desired
//! parallelism, expands striped jobs into per-segment descriptors, and
//! vets third-party requirements against endpoint capabilities. It never
//! performs I/O; segment byte ranges are a pure function of the source
//! size, which the pipeline resolves after its own `stat`.

use crate::config::EngineConfig;
use crate::job::{JobDescriptor, QueueEntry, Segment, ThirdPartyMode};
use bulkcp_endpoint::EndpointResolver;
use bulkcp_types::{Error, Result};
use std::ops::Range;
use tracing::debug;

/// Compute the byte ranges of a striped transfer
///
/// Splits `[0, size)` into `count` contiguous, pairwise disjoint ranges
/// whose union is exactly `[0, size)`. Every boundary except the end of the
/// final segment lands on a multiple of `block`; the final segment absorbs
/// the remainder.
pub fn stripe_segments(size: u64, count: u32, block: u64) -> Vec<Range<u64>> {
    debug_assert!(count >= 1 && block >= 1);
    let count = count.max(1) as u64;
    let step = size / count / block.max(1) * block.max(1);

    let mut ranges = Vec::with_capacity(count as usize);
    let mut offset = 0u64;
    for index in 0..count {
        let len = if index == count - 1 {
            size - offset
        } else {
            step.min(size - offset)
        };
        ranges.push(offset..offset + len);
        offset += len;
    }
    ranges
}

/// Validates and finalizes the job list before execution
#[derive(Debug)]
pub struct Preparer<'a> {
    config: &'a EngineConfig,
    resolver: &'a EndpointResolver,
}

impl<'a> Preparer<'a> {
    /// Create a preparer over the engine configuration and endpoint registry
    pub fn new(config: &'a EngineConfig, resolver: &'a EndpointResolver) -> Self {
        Self { config, resolver }
    }

    /// Produce the prepared queue
    pub fn prepare(&self, jobs: Vec<JobDescriptor>) -> Result<Vec<QueueEntry>> {
        self.config.validate()?;

        let mut entries = vec![QueueEntry::Config {
            parallel: self.config.parallel,
        }];

        for job in jobs {
            job.validate()?;
            self.check_third_party(&job)?;

            if job.source_limit > 1 {
                let count = job.source_limit;
                debug!(source = %job.source, count, "expanding striped job");
                for index in 0..count {
                    let mut segment = job.clone();
                    segment.segment = Some(Segment { index, count });
                    entries.push(QueueEntry::Transfer(segment));
                }
            } else {
                entries.push(QueueEntry::Transfer(job));
            }
        }

        Ok(entries)
    }

    /// A `thirdparty = only` job whose endpoint pair cannot copy directly is
    /// refused before any I/O happens; `first` jobs fall back at run time.
    fn check_third_party(&self, job: &JobDescriptor) -> Result<()> {
        if job.third_party != ThirdPartyMode::Only {
            return Ok(());
        }
        let source = self.resolver.resolve(&job.source)?;
        let target = self.resolver.resolve(&job.target)?;
        if source.supports_third_party(target.as_ref()) {
            Ok(())
        } else {
            Err(Error::config(format!(
                "third-party copy required but not supported between '{}' and '{}'",
                job.source, job.target
            )))
        }
    }
}
