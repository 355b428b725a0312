//! Per-job transfer pipeline
//!
//! Drives one job through `Opening → Transferring → Verifying → Closing`,
//! with up to `parallelchunks` reads in flight and writes applied in offset
//! order. All failures, including exhausted retries, land in the job's
//! result bag as a status value; the pipeline itself never panics a job.

use crate::job::{ChecksumMode, JobDescriptor, RetryPolicy, ThirdPartyMode};
use crate::prepare::stripe_segments;
use crate::progress::ProgressHandler;
use bulkcp_endpoint::{
    Digest, Endpoint, EndpointResolver, EndpointUrl, ObjectHandle, OpenOptions, StatInfo,
};
use bulkcp_types::{Error, PropertyBag, Result, Status};
use futures::future::FutureExt;
use futures::stream::{FuturesOrdered, StreamExt};
use std::collections::HashSet;
use std::future::Future;
use std::ops::Range;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// States a job moves through while the pipeline drives it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Not yet started
    Idle,
    /// Resolving endpoints and opening handles
    Opening,
    /// Moving chunks
    Transferring,
    /// Comparing checksums
    Verifying,
    /// Releasing handles
    Closing,
    /// Finished successfully
    Done,
    /// Finished with a failure recorded in the result bag
    Failed,
}

/// Values accumulated for the job's result bag
#[derive(Debug, Default)]
struct JobOutput {
    size: u64,
    source_checksum: Option<String>,
    target_checksum: Option<String>,
    sources: Vec<String>,
    real_target: Option<String>,
}

/// Executes one transfer job against resolved endpoints
#[derive(Debug, Clone)]
pub struct TransferPipeline {
    resolver: Arc<EndpointResolver>,
}

impl TransferPipeline {
    /// Create a pipeline over an endpoint registry
    pub fn new(resolver: Arc<EndpointResolver>) -> Self {
        Self { resolver }
    }

    /// Run one job to completion and produce its result bag
    ///
    /// The bag always carries `status`, `size`, `sources`, and `retries`;
    /// checksums and `realTarget` appear when the job produced them.
    pub async fn run(
        &self,
        job: &JobDescriptor,
        job_num: usize,
        handler: &dyn ProgressHandler,
    ) -> PropertyBag {
        let attempts = AtomicU32::new(0);
        let mut output = JobOutput::default();
        let outcome = self
            .execute(job, job_num, handler, &attempts, &mut output)
            .await;

        let status = match outcome {
            Ok(()) => Status::ok(),
            Err(ref error) => {
                warn!(job = job_num, source = %job.source, error = %error, "job failed");
                Status::from(error)
            }
        };

        let mut result = PropertyBag::new();
        result.set("status", status);
        result.set("size", output.size as i64);
        if let Some(sum) = output.source_checksum {
            result.set("sourceCheckSum", sum);
        }
        if let Some(sum) = output.target_checksum {
            result.set("targetCheckSum", sum);
        }
        result.set("sources", output.sources);
        if let Some(real_target) = output.real_target {
            result.set("realTarget", real_target);
        }
        result.set("retries", i64::from(attempts.load(Ordering::Relaxed)));
        result
    }

    async fn execute(
        &self,
        job: &JobDescriptor,
        job_num: usize,
        handler: &dyn ProgressHandler,
        attempts: &AtomicU32,
        output: &mut JobOutput,
    ) -> Result<()> {
        let mut state = PipelineState::Opening;
        debug!(job = job_num, ?state, source = %job.source, target = %job.target, "starting job");

        let source_ep = self.resolver.resolve(&job.source)?;
        let target_ep = self.resolver.resolve(&job.target)?;

        if job.third_party != ThirdPartyMode::None {
            match with_timeout(job.tpc_timeout, source_ep.copy_direct(&job.source, &job.target))
                .await
            {
                Ok(bytes) => {
                    debug!(job = job_num, bytes, "direct third-party transfer complete");
                    output.size = bytes;
                    output.sources.push(job.source.to_string());
                    output.real_target = Some(job.target.to_string());
                    state = PipelineState::Verifying;
                    debug!(job = job_num, ?state, "verifying direct transfer");
                    return self
                        .verify(job, source_ep.as_ref(), target_ep.as_ref(), None, output)
                        .await;
                }
                Err(error) if job.third_party == ThirdPartyMode::Only => return Err(error),
                Err(error) => {
                    debug!(job = job_num, error = %error, "direct transfer failed, falling back to chunked copy");
                }
            }
        }

        let range = if job.dynamic_source {
            None
        } else {
            let info = stat_with_retry(source_ep.as_ref(), &job.source, job, attempts).await?;
            Some(self.segment_range(job, &info)?)
        };

        let mut source =
            open_with_retry(source_ep.as_ref(), &job.source, OpenOptions::reading(), job, attempts)
                .await?;
        // Segment jobs share one target object; only a whole-file job may
        // truncate it on open.
        let target_options = OpenOptions::writing()
            .overwrite(job.force || job.segment.is_some())
            .truncate(job.segment.is_none())
            .make_dirs(job.make_dir)
            .posc(job.posc)
            .coerce(job.coerce);
        let mut target =
            open_with_retry(target_ep.as_ref(), &job.target, target_options, job, attempts).await?;

        output.sources.push(source.resolved_url().to_string());
        output.real_target = Some(target.resolved_url().to_string());

        state = PipelineState::Transferring;
        debug!(job = job_num, ?state, ?range, "transferring");

        let transfer_result = match range.clone() {
            Some(range) => {
                self.transfer_range(
                    job,
                    job_num,
                    handler,
                    source.as_ref(),
                    target.as_ref(),
                    range,
                    attempts,
                    output,
                )
                .await
            }
            None => {
                self.transfer_dynamic(
                    job,
                    job_num,
                    handler,
                    source.as_ref(),
                    target.as_ref(),
                    attempts,
                    output,
                )
                .await
            }
        };

        let verify_result = match transfer_result {
            Ok(digest) => {
                state = PipelineState::Verifying;
                debug!(job = job_num, ?state, "verifying");
                self.verify(job, source_ep.as_ref(), target_ep.as_ref(), digest, output)
                    .await
            }
            Err(error) => Err(error),
        };

        state = PipelineState::Closing;
        debug!(job = job_num, ?state, "closing endpoints");
        let target_close = target.close().await;
        let source_close = source.close().await;

        let outcome = verify_result.and(target_close).and(source_close);
        if outcome.is_err() && job.posc {
            // The target only persists after a fully successful close path.
            if let Err(error) = target_ep.remove(&job.target).await {
                debug!(job = job_num, error = %error, "posc cleanup failed");
            }
        }

        state = if outcome.is_ok() {
            PipelineState::Done
        } else {
            PipelineState::Failed
        };
        debug!(job = job_num, ?state, bytes = output.size, "job finished");
        outcome
    }

    /// Existing targets of striped jobs that must not be replaced
    ///
    /// A whole-file job refuses an existing target at open time, but
    /// sibling segment jobs share one target and have to tolerate each
    /// other creating and extending it, so their open allows overwrite.
    /// The existence check therefore runs once per striped job, against
    /// the leading segment, before any segment starts.
    pub(crate) async fn vet_striped_targets(
        &self,
        jobs: &[JobDescriptor],
    ) -> HashSet<String> {
        let mut refused = HashSet::new();
        for job in jobs {
            let leading = job.segment.is_some_and(|s| s.index == 0);
            if !leading || job.force || refused.contains(job.target.as_str()) {
                continue;
            }
            let Ok(endpoint) = self.resolver.resolve(&job.target) else {
                continue;
            };
            if endpoint.stat(&job.target).await.is_ok() {
                debug!(target = %job.target, "striped target already exists");
                refused.insert(job.target.as_str().to_string());
            }
        }
        refused
    }

    fn segment_range(&self, job: &JobDescriptor, info: &StatInfo) -> Result<Range<u64>> {
        match job.segment {
            Some(segment) => stripe_segments(info.size, segment.count, job.block_size)
                .get(segment.index as usize)
                .cloned()
                .ok_or_else(|| {
                    Error::config(format!(
                        "segment {} out of range for {} segments",
                        segment.index, segment.count
                    ))
                }),
            None => Ok(0..info.size),
        }
    }

    /// Copy a known byte range with a bounded window of in-flight reads
    ///
    /// Reads complete in offset order through the ordered window, so writes
    /// and digest updates are applied in non-decreasing offset order even
    /// though up to `parallelchunks` reads overlap.
    #[allow(clippy::too_many_arguments)]
    async fn transfer_range(
        &self,
        job: &JobDescriptor,
        job_num: usize,
        handler: &dyn ProgressHandler,
        source: &dyn ObjectHandle,
        target: &dyn ObjectHandle,
        range: Range<u64>,
        attempts: &AtomicU32,
        output: &mut JobOutput,
    ) -> Result<Option<Digest>> {
        let mut digest = wants_stream_digest(job).then(|| Digest::new(job.checksum_type));
        let total = range.end - range.start;
        let chunk_size = job.chunk_size as u64;

        let mut pending: FuturesOrdered<futures::future::BoxFuture<'_, Result<(u64, Vec<u8>)>>> =
            FuturesOrdered::new();
        let mut next_offset = range.start;
        while pending.len() < job.parallel_chunks && next_offset < range.end {
            let len = chunk_size.min(range.end - next_offset) as usize;
            pending.push_back(read_chunk(source, next_offset, len, job, attempts).boxed());
            next_offset += len as u64;
        }

        let mut processed = 0u64;
        while let Some(chunk) = pending.next().await {
            let (offset, data) = chunk?;
            let expected = chunk_size.min(range.end - offset) as usize;
            if data.len() != expected {
                return Err(Error::endpoint(
                    format!(
                        "short read at offset {offset}: got {} of {expected} bytes",
                        data.len()
                    ),
                    false,
                ));
            }

            write_chunk(target, offset, &data, job, attempts).await?;
            if let Some(digest) = digest.as_mut() {
                digest.update(&data);
            }
            processed += data.len() as u64;
            handler.job_progress(job_num, processed, total);
            if handler.should_cancel(job_num) {
                debug!(job = job_num, processed, "cancelled at chunk boundary");
                return Err(Error::Cancelled);
            }

            while pending.len() < job.parallel_chunks && next_offset < range.end {
                let len = chunk_size.min(range.end - next_offset) as usize;
                pending.push_back(read_chunk(source, next_offset, len, job, attempts).boxed());
                next_offset += len as u64;
            }
        }

        output.size = processed;
        Ok(digest)
    }

    /// Copy a source of unknown size sequentially until a short read
    #[allow(clippy::too_many_arguments)]
    async fn transfer_dynamic(
        &self,
        job: &JobDescriptor,
        job_num: usize,
        handler: &dyn ProgressHandler,
        source: &dyn ObjectHandle,
        target: &dyn ObjectHandle,
        attempts: &AtomicU32,
        output: &mut JobOutput,
    ) -> Result<Option<Digest>> {
        let mut digest = wants_stream_digest(job).then(|| Digest::new(job.checksum_type));
        let mut offset = 0u64;

        loop {
            let (_, data) = read_chunk(source, offset, job.chunk_size, job, attempts).await?;
            if data.is_empty() {
                break;
            }

            write_chunk(target, offset, &data, job, attempts).await?;
            if let Some(digest) = digest.as_mut() {
                digest.update(&data);
            }
            offset += data.len() as u64;
            handler.job_progress(job_num, offset, 0);
            if handler.should_cancel(job_num) {
                debug!(job = job_num, processed = offset, "cancelled at chunk boundary");
                return Err(Error::Cancelled);
            }

            if data.len() < job.chunk_size {
                break;
            }
        }

        output.size = offset;
        Ok(digest)
    }

    async fn verify(
        &self,
        job: &JobDescriptor,
        source_ep: &dyn Endpoint,
        target_ep: &dyn Endpoint,
        digest: Option<Digest>,
        output: &mut JobOutput,
    ) -> Result<()> {
        match job.checksum_mode {
            ChecksumMode::None => Ok(()),
            ChecksumMode::Source => {
                output.source_checksum =
                    Some(source_digest(job, source_ep, digest).await?);
                Ok(())
            }
            ChecksumMode::Target => {
                if job.segment.is_some() {
                    return Ok(());
                }
                let sum = target_ep.checksum(&job.target, job.checksum_type).await?;
                output.target_checksum = Some(sum);
                Ok(())
            }
            ChecksumMode::End2End => {
                let source_sum = source_digest(job, source_ep, digest).await?;
                output.source_checksum = Some(source_sum.clone());
                if job.segment.is_some() {
                    // A segment digest covers its byte range only; the
                    // whole-target comparison cannot apply per segment.
                    return Ok(());
                }
                let target_sum = target_ep.checksum(&job.target, job.checksum_type).await?;
                output.target_checksum = Some(target_sum.clone());

                let expected = job.checksum_preset.clone().unwrap_or(source_sum);
                if expected == target_sum {
                    Ok(())
                } else {
                    if job.rm_on_bad_checksum {
                        debug!(target = %job.target, "removing target after checksum mismatch");
                        if let Err(error) = target_ep.remove(&job.target).await {
                            warn!(target = %job.target, error = %error, "failed to remove bad target");
                        }
                    }
                    Err(Error::checksum_mismatch(expected, target_sum))
                }
            }
        }
    }
}

fn wants_stream_digest(job: &JobDescriptor) -> bool {
    matches!(job.checksum_mode, ChecksumMode::Source | ChecksumMode::End2End)
}

/// Source digest from the in-stream computation, or from the endpoint when
/// the bytes never passed through this process (third-party transfers)
async fn source_digest(
    job: &JobDescriptor,
    source_ep: &dyn Endpoint,
    digest: Option<Digest>,
) -> Result<String> {
    match digest {
        Some(digest) => Ok(digest.finalize_hex()),
        None => source_ep.checksum(&job.source, job.checksum_type).await,
    }
}

async fn with_timeout<T>(limit: Duration, operation: impl Future<Output = Result<T>>) -> Result<T> {
    if limit.is_zero() {
        return operation.await;
    }
    match tokio::time::timeout(limit, operation).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout {
            seconds: limit.as_secs(),
        }),
    }
}

/// Consume one unit of the job's retry budget if the policy admits `error`
fn try_consume_retry(error: &Error, job: &JobDescriptor, attempts: &AtomicU32) -> bool {
    let eligible = match job.retry_policy {
        RetryPolicy::Force => error.is_io_class(),
        RetryPolicy::Continue => error.is_retryable(),
    };
    if !eligible {
        return false;
    }
    let mut used = attempts.load(Ordering::Relaxed);
    loop {
        if used >= job.retry_count {
            return false;
        }
        match attempts.compare_exchange(used, used + 1, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return true,
            Err(current) => used = current,
        }
    }
}

async fn stat_with_retry(
    endpoint: &dyn Endpoint,
    url: &EndpointUrl,
    job: &JobDescriptor,
    attempts: &AtomicU32,
) -> Result<StatInfo> {
    loop {
        match with_timeout(job.init_timeout, endpoint.stat(url)).await {
            Ok(info) => return Ok(info),
            Err(error) => {
                if !try_consume_retry(&error, job, attempts) {
                    return Err(error);
                }
                warn!(url = %url, error = %error, "retrying stat");
            }
        }
    }
}

async fn open_with_retry(
    endpoint: &dyn Endpoint,
    url: &EndpointUrl,
    options: OpenOptions,
    job: &JobDescriptor,
    attempts: &AtomicU32,
) -> Result<Box<dyn ObjectHandle>> {
    loop {
        match with_timeout(job.init_timeout, endpoint.open(url, options)).await {
            Ok(handle) => return Ok(handle),
            Err(error) => {
                if !try_consume_retry(&error, job, attempts) {
                    return Err(error);
                }
                warn!(url = %url, error = %error, "retrying open");
            }
        }
    }
}

async fn read_chunk(
    source: &dyn ObjectHandle,
    offset: u64,
    len: usize,
    job: &JobDescriptor,
    attempts: &AtomicU32,
) -> Result<(u64, Vec<u8>)> {
    loop {
        match with_timeout(job.copy_timeout, source.read_at(offset, len)).await {
            Ok(data) => return Ok((offset, data)),
            Err(error) => {
                if !try_consume_retry(&error, job, attempts) {
                    return Err(error);
                }
                warn!(offset, error = %error, "retrying chunk read");
            }
        }
    }
}

async fn write_chunk(
    target: &dyn ObjectHandle,
    offset: u64,
    data: &[u8],
    job: &JobDescriptor,
    attempts: &AtomicU32,
) -> Result<()> {
    loop {
        match with_timeout(job.copy_timeout, target.write_at(offset, data)).await {
            Ok(()) => return Ok(()),
            Err(error) => {
                if !try_consume_retry(&error, job, attempts) {
                    return Err(error);
                }
                warn!(offset, error = %error, "retrying chunk write");
            }
        }
    }
}
