//! Job store trait and error types
//!
//! This module defines the interface the crawl engine and status surfaces use
//! to read and mutate jobs, and the associated error types.

use crate::job::{JobId, JobSnapshot, JobStatus};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during job store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Job not found: {0}")]
    NotFound(JobId),

    #[error("Invalid status transition for job {id}: {from} -> {to}")]
    InvalidTransition {
        id: JobId,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("Job {0} is not running")]
    NotRunning(JobId),
}

/// Result type for job store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Trait for job registry implementations
///
/// Implementations must be safe to share between concurrently running jobs
/// and status readers. Every method is a single atomic update: readers never
/// observe a half-applied write, and one job's writes never touch another
/// job's record.
pub trait JobStore: Send + Sync {
    // ===== Lifecycle =====

    /// Registers a new job in the `queued` state
    ///
    /// # Arguments
    ///
    /// * `seed_url` - The validated seed URL
    ///
    /// # Returns
    ///
    /// The new job's identifier
    fn create(&self, seed_url: &str) -> JobId;

    /// Gets a snapshot of a job
    fn get(&self, id: JobId) -> StoreResult<JobSnapshot>;

    /// Lists snapshots of all jobs in creation order
    fn list(&self) -> Vec<JobSnapshot>;

    /// Removes a job and its archive file
    ///
    /// A running job is cancelled; its output directory is kept.
    fn delete(&self, id: JobId) -> StoreResult<()>;

    // ===== Run State =====

    /// Moves a job from `queued` to `running`
    ///
    /// Fails for any other state, so a job can only ever have one run.
    fn begin_run(&self, id: JobId) -> StoreResult<()>;

    /// Raises progress; lower values than the current one are ignored
    ///
    /// Only valid while running. Values are capped below 100, which is
    /// reserved for `complete`.
    fn set_progress(&self, id: JobId, progress: u8) -> StoreResult<()>;

    /// Appends a log entry to a running job
    fn append_log(&self, id: JobId, message: &str) -> StoreResult<()>;

    /// Records the archive, sets progress to 100 and marks the job `completed`
    fn complete(&self, id: JobId, archive_path: PathBuf) -> StoreResult<()>;

    /// Records the failure reason and marks the job `failed`
    fn fail(&self, id: JobId, reason: &str) -> StoreResult<()>;

    // ===== Cancellation =====

    /// Requests cooperative cancellation of a job
    fn cancel(&self, id: JobId) -> StoreResult<()>;

    /// Returns true if cancellation was requested or the job no longer exists
    fn is_cancelled(&self, id: JobId) -> bool;
}
