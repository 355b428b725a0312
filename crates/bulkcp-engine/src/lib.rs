//! Copy orchestration engine for bulkcp
//!
//! This crate schedules and executes batches of URL-to-URL copy jobs:
//!
//! - **`EngineConfig`**: engine-wide defaults, loadable from TOML
//! - **`JobDescriptor`**: one copy operation, built from a `PropertyBag`
//! - **`Preparer`**: validation, striping expansion, third-party vetting
//! - **`TransferPipeline`**: chunked parallel reads with ordered writes,
//!   checksums, retries, and timeouts for a single job
//! - **`Scheduler`**: bounded concurrent execution with submission-ordered
//!   results
//! - **`ProgressHandler`**: the embedder's progress and cancellation hook
//! - **`CopyProcess`**: the facade tying the lifecycle together
//!
//! # Examples
//!
//! ```no_run
//! use bulkcp_engine::{CopyProcess, EngineConfig, NullProgressHandler};
//! use bulkcp_types::PropertyBag;
//! use std::sync::Arc;
//!
//! # async fn demo() -> bulkcp_types::Result<()> {
//! let mut process = CopyProcess::new(EngineConfig::default());
//! let mut job = PropertyBag::new();
//! job.set("source", "file:///srv/in.dat");
//! job.set("target", "file:///srv/out.dat");
//! process.add_job(&job)?;
//! process.prepare()?;
//! let status = process.run(Arc::new(NullProgressHandler)).await?;
//! for result in process.results() {
//!     println!("{:?}", result.get_status("status"));
//! }
//! assert!(status.is_ok());
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod job;
pub mod pipeline;
pub mod prepare;
pub mod process;
pub mod progress;
pub mod results;
pub mod scheduler;

pub use config::EngineConfig;
pub use job::{
    ChecksumMode, JobDescriptor, QueueEntry, RetryPolicy, Segment, ThirdPartyMode,
};
pub use pipeline::{PipelineState, TransferPipeline};
pub use prepare::{stripe_segments, Preparer};
pub use process::CopyProcess;
pub use progress::{
    NullProgressHandler, ProgressEvent, ProgressHandler, ProgressSnapshot, RecordingHandler,
};
pub use results::ResultCollector;
pub use scheduler::Scheduler;
