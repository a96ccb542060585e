//! Job-scoped log and progress reporting
//!
//! Every message written to a job's log is mirrored to `tracing`, tagged with
//! the job id, so operators see the same stream a status surface does.

use crate::job::JobId;
use crate::store::{JobStore, StoreError};

/// Writes log entries and progress for a single running job
pub struct JobJournal<'a> {
    store: &'a dyn JobStore,
    id: JobId,
}

impl<'a> JobJournal<'a> {
    pub fn new(store: &'a dyn JobStore, id: JobId) -> Self {
        Self { store, id }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn info(&self, message: &str) {
        tracing::info!(job_id = %self.id, "{}", message);
        self.append(message);
    }

    pub fn warn(&self, message: &str) {
        tracing::warn!(job_id = %self.id, "{}", message);
        self.append(message);
    }

    pub fn error(&self, message: &str) {
        tracing::error!(job_id = %self.id, "{}", message);
        self.append(message);
    }

    /// Raises the job's progress; lower values are ignored by the store
    pub fn progress(&self, percent: u8) {
        if let Err(e) = self.store.set_progress(self.id, percent) {
            report_store_error(self.id, &e);
        }
    }

    fn append(&self, message: &str) {
        if let Err(e) = self.store.append_log(self.id, message) {
            report_store_error(self.id, &e);
        }
    }
}

/// A job deleted mid-run is expected; anything else is worth a warning
pub(crate) fn report_store_error(id: JobId, error: &StoreError) {
    match error {
        StoreError::NotFound(_) => tracing::debug!(job_id = %id, "Job no longer in store"),
        other => tracing::warn!(job_id = %id, "Job store rejected update: {}", other),
    }
}
