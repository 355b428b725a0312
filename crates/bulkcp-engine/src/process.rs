//! The copy process facade
//!
//! Ties configuration, preparation, scheduling, and result collection into
//! the lifecycle embedders drive: add jobs, prepare, run, read results.

use crate::config::EngineConfig;
use crate::job::{JobDescriptor, QueueEntry};
use crate::pipeline::TransferPipeline;
use crate::prepare::Preparer;
use crate::progress::ProgressHandler;
use crate::scheduler::Scheduler;
use bulkcp_endpoint::EndpointResolver;
use bulkcp_types::{Error, PropertyBag, Result, Status};
use std::sync::Arc;
use tracing::info;

/// One batch of copy jobs from submission through completion
///
/// ```no_run
/// use bulkcp_engine::{CopyProcess, EngineConfig, NullProgressHandler};
/// use bulkcp_types::PropertyBag;
/// use std::sync::Arc;
///
/// # async fn demo() -> bulkcp_types::Result<()> {
/// let mut process = CopyProcess::new(EngineConfig::default());
/// let mut job = PropertyBag::new();
/// job.set("source", "file:///data/in.bin");
/// job.set("target", "file:///data/out.bin");
/// process.add_job(&job)?;
/// process.prepare()?;
/// let status = process.run(Arc::new(NullProgressHandler)).await?;
/// assert!(status.is_ok());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct CopyProcess {
    config: EngineConfig,
    resolver: Arc<EndpointResolver>,
    jobs: Vec<JobDescriptor>,
    queue: Vec<QueueEntry>,
    results: Vec<PropertyBag>,
}

impl CopyProcess {
    /// Create a process with the default endpoint registry, which serves
    /// `file` URLs
    pub fn new(config: EngineConfig) -> Self {
        Self::with_resolver(config, Arc::new(EndpointResolver::new()))
    }

    /// Create a process over a custom endpoint registry
    pub fn with_resolver(config: EngineConfig, resolver: Arc<EndpointResolver>) -> Self {
        Self {
            config,
            resolver,
            jobs: Vec::new(),
            queue: Vec::new(),
            results: Vec::new(),
        }
    }

    /// The engine configuration this process runs under
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Submit a job described by a configuration bag
    pub fn add_job(&mut self, props: &PropertyBag) -> Result<()> {
        self.jobs
            .push(JobDescriptor::from_properties(props, &self.config)?);
        Ok(())
    }

    /// Submit an already built job descriptor
    pub fn add_descriptor(&mut self, job: JobDescriptor) {
        self.jobs.push(job);
    }

    /// Validate the submitted jobs and build the run queue
    ///
    /// Striped jobs are expanded into their segment jobs here; nothing is
    /// opened or read yet.
    pub fn prepare(&mut self) -> Result<()> {
        let preparer = Preparer::new(&self.config, &self.resolver);
        let jobs = std::mem::take(&mut self.jobs);
        info!(jobs = jobs.len(), "preparing queue");
        self.queue = preparer.prepare(jobs)?;
        Ok(())
    }

    /// Run the prepared queue to completion
    ///
    /// Each job's result is collected in submission order regardless of
    /// completion order. The returned status is the first non-successful
    /// job status, or success.
    pub async fn run(&mut self, handler: Arc<dyn ProgressHandler>) -> Result<Status> {
        if self.queue.is_empty() {
            return Err(Error::config("run called before prepare"));
        }
        let queue = std::mem::take(&mut self.queue);
        let scheduler = Scheduler::new(TransferPipeline::new(Arc::clone(&self.resolver)));
        let (results, status) = scheduler.run(queue, handler).await;
        self.results = results;
        info!(status = %status, "process finished");
        Ok(status)
    }

    /// Results of the last run, in submission order
    pub fn results(&self) -> &[PropertyBag] {
        &self.results
    }

    /// Take ownership of the results of the last run
    pub fn take_results(&mut self) -> Vec<PropertyBag> {
        std::mem::take(&mut self.results)
    }
}
