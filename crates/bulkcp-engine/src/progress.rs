//! The progress gate
//!
//! The caller of [`CopyProcess::run`](crate::process::CopyProcess::run)
//! supplies a [`ProgressHandler`]; the scheduler and the pipelines consult
//! it at job and chunk boundaries. The engine invokes it while holding no
//! internal lock, possibly from several tasks at once, so implementations
//! must be reentrancy-safe and return promptly, since a slow handler stalls the
//! pipeline that called it.

use bulkcp_endpoint::EndpointUrl;
use bulkcp_types::PropertyBag;
use std::sync::Mutex;

/// Point-in-time view of one job's progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    /// Index of the job in submission order
    pub job_num: usize,
    /// Total number of transfer jobs
    pub job_total: usize,
    /// Bytes transferred so far
    pub bytes_processed: u64,
    /// Bytes the job will transfer, zero when unknown
    pub bytes_total: u64,
}

/// Cancellation and progress callback contract
pub trait ProgressHandler: Send + Sync {
    /// A job is about to start
    fn begin_job(&self, job_num: usize, job_total: usize, source: &EndpointUrl, target: &EndpointUrl) {
        let _ = (job_num, job_total, source, target);
    }

    /// A job transferred another chunk
    fn job_progress(&self, job_num: usize, bytes_processed: u64, bytes_total: u64) {
        let _ = (job_num, bytes_processed, bytes_total);
    }

    /// A job finished; `result` is its populated result bag
    fn end_job(&self, job_num: usize, result: &PropertyBag) {
        let _ = (job_num, result);
    }

    /// Polled at job-start and chunk boundaries; returning `true` stops new
    /// jobs from starting and fails in-flight jobs at their next chunk
    fn should_cancel(&self, job_num: usize) -> bool {
        let _ = job_num;
        false
    }
}

/// Handler that ignores everything and never cancels
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgressHandler;

impl ProgressHandler for NullProgressHandler {}

/// Handler that records every callback, for tests and diagnostics
#[derive(Debug, Default)]
pub struct RecordingHandler {
    events: Mutex<Vec<ProgressEvent>>,
}

/// One recorded callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// `begin_job` was invoked
    Begin {
        /// Job index
        job_num: usize,
        /// Total job count
        job_total: usize,
    },
    /// `job_progress` was invoked
    Progress(ProgressSnapshot),
    /// `end_job` was invoked
    End {
        /// Job index
        job_num: usize,
        /// Whether the result status reported success
        ok: bool,
    },
}

impl RecordingHandler {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded events
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().expect("recorder poisoned").clone()
    }
}

impl ProgressHandler for RecordingHandler {
    fn begin_job(&self, job_num: usize, job_total: usize, _source: &EndpointUrl, _target: &EndpointUrl) {
        self.events
            .lock()
            .expect("recorder poisoned")
            .push(ProgressEvent::Begin { job_num, job_total });
    }

    fn job_progress(&self, job_num: usize, bytes_processed: u64, bytes_total: u64) {
        self.events
            .lock()
            .expect("recorder poisoned")
            .push(ProgressEvent::Progress(ProgressSnapshot {
                job_num,
                job_total: 0,
                bytes_processed,
                bytes_total,
            }));
    }

    fn end_job(&self, job_num: usize, result: &PropertyBag) {
        let ok = result.get_status("status").is_some_and(|s| s.is_ok());
        self.events
            .lock()
            .expect("recorder poisoned")
            .push(ProgressEvent::End { job_num, ok });
    }
}
