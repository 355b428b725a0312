//! Bounded concurrent job scheduler
//!
//! Consumes a prepared queue, runs transfer jobs through the pipeline with
//! at most the configured number in flight, and deposits every result into
//! submission-order slots. Cancellation is polled before each job starts;
//! jobs that never start still get a result, without progress callbacks.

use crate::job::QueueEntry;
use crate::pipeline::TransferPipeline;
use crate::progress::ProgressHandler;
use crate::results::ResultCollector;
use bulkcp_endpoint::EndpointUrl;
use bulkcp_types::{Error, PropertyBag, Status};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Runs prepared queues against a transfer pipeline
#[derive(Debug)]
pub struct Scheduler {
    pipeline: TransferPipeline,
}

impl Scheduler {
    /// Create a scheduler over a pipeline
    pub fn new(pipeline: TransferPipeline) -> Self {
        Self { pipeline }
    }

    /// Run every job in the queue and return the results in submission
    /// order, with the aggregate status
    ///
    /// The aggregate is the first non-successful job status in submission
    /// order, or success when every job succeeded.
    pub async fn run(
        &self,
        queue: Vec<QueueEntry>,
        handler: Arc<dyn ProgressHandler>,
    ) -> (Vec<PropertyBag>, Status) {
        let mut parallel = 1usize;
        let mut jobs = Vec::new();
        for entry in queue {
            match entry {
                QueueEntry::Config { parallel: value } => parallel = value.max(1),
                QueueEntry::Transfer(job) => jobs.push(job),
            }
        }

        let total = jobs.len();
        debug!(jobs = total, parallel, "running queue");
        let refused_targets = self.pipeline.vet_striped_targets(&jobs).await;
        let collector = ResultCollector::new(total);
        let semaphore = Arc::new(Semaphore::new(parallel));
        let mut tasks: JoinSet<()> = JoinSet::new();
        let mut cancelled = false;

        for (job_num, job) in jobs.into_iter().enumerate() {
            if job.segment.is_some() && refused_targets.contains(job.target.as_str()) {
                handler.begin_job(job_num, total, &job.source, &job.target);
                let result = refused_result(&job.target);
                handler.end_job(job_num, &result);
                collector.deposit(job_num, result);
                continue;
            }
            if !cancelled {
                // The semaphore is never closed, so acquisition only fails
                // if the runtime is shutting down.
                match Arc::clone(&semaphore).acquire_owned().await {
                    Ok(permit) => {
                        if handler.should_cancel(job_num) {
                            debug!(job = job_num, "cancellation requested, draining queue");
                            cancelled = true;
                        } else {
                            let pipeline = self.pipeline.clone();
                            let handler = Arc::clone(&handler);
                            let collector = collector.clone();
                            tasks.spawn(async move {
                                handler.begin_job(job_num, total, &job.source, &job.target);
                                let result =
                                    pipeline.run(&job, job_num, handler.as_ref()).await;
                                handler.end_job(job_num, &result);
                                collector.deposit(job_num, result);
                                drop(permit);
                            });
                            continue;
                        }
                    }
                    Err(_) => cancelled = true,
                }
            }
            collector.deposit(job_num, cancelled_result());
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(error) = joined {
                warn!(error = %error, "job task aborted");
            }
        }

        let results = collector.into_results();
        let aggregate = results
            .iter()
            .filter_map(|result| result.get_status("status"))
            .find(|status| !status.is_ok())
            .cloned()
            .unwrap_or_else(Status::ok);
        debug!(jobs = total, status = %aggregate, "queue finished");
        (results, aggregate)
    }
}

/// Result bag for a segment job refused because its target already exists
fn refused_result(target: &EndpointUrl) -> PropertyBag {
    let mut result = PropertyBag::new();
    result.set(
        "status",
        Status::from(&Error::endpoint(
            format!("object already exists: {target}"),
            false,
        )),
    );
    result.set("size", 0i64);
    result.set("retries", 0i64);
    result
}

/// Result bag for a job that was never started
fn cancelled_result() -> PropertyBag {
    let mut result = PropertyBag::new();
    result.set("status", Status::from(&Error::Cancelled));
    result.set("size", 0i64);
    result.set("retries", 0i64);
    result
}
