//! In-process job store
//!
//! Jobs live in a map guarded by a single `RwLock`. Each trait method takes
//! the lock exactly once, which makes every field update atomic with respect
//! to readers.

use crate::job::{Job, JobId, JobSnapshot, JobStatus, LogEntry};
use crate::store::traits::{JobStore, StoreError, StoreResult};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Highest value `set_progress` may store; 100 is written only by `complete`
const MAX_RUNNING_PROGRESS: u8 = 99;

#[derive(Default)]
struct Registry {
    jobs: HashMap<JobId, Job>,
    order: Vec<JobId>,
}

/// Thread-safe in-memory job registry
///
/// Output directories are allocated as `<output_root>/<job-id>`.
pub struct MemoryJobStore {
    output_root: PathBuf,
    registry: RwLock<Registry>,
}

impl MemoryJobStore {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
            registry: RwLock::new(Registry::default()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Registry> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Registry> {
        self.registry.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies `f` to a job that has not reached a terminal state
    fn mutate<T>(
        &self,
        id: JobId,
        target: JobStatus,
        f: impl FnOnce(&mut Job) -> T,
    ) -> StoreResult<T> {
        let mut registry = self.write();
        let job = registry.jobs.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if job.status.is_terminal() {
            return Err(StoreError::InvalidTransition {
                id,
                from: job.status,
                to: target,
            });
        }
        Ok(f(job))
    }
}

impl JobStore for MemoryJobStore {
    fn create(&self, seed_url: &str) -> JobId {
        let id = JobId::new();
        let job = Job::new(id, seed_url, self.output_root.join(id.to_string()));

        let mut registry = self.write();
        registry.jobs.insert(id, job);
        registry.order.push(id);

        tracing::debug!("Created job {} for {}", id, seed_url);
        id
    }

    fn get(&self, id: JobId) -> StoreResult<JobSnapshot> {
        self.read()
            .jobs
            .get(&id)
            .map(Job::snapshot)
            .ok_or(StoreError::NotFound(id))
    }

    fn list(&self) -> Vec<JobSnapshot> {
        let registry = self.read();
        registry
            .order
            .iter()
            .filter_map(|id| registry.jobs.get(id))
            .map(Job::snapshot)
            .collect()
    }

    fn delete(&self, id: JobId) -> StoreResult<()> {
        let removed = {
            let mut registry = self.write();
            let job = registry.jobs.remove(&id).ok_or(StoreError::NotFound(id))?;
            registry.order.retain(|existing| *existing != id);
            job
        };

        if let Some(archive) = removed.archive_path {
            match std::fs::remove_file(&archive) {
                Ok(()) => tracing::debug!("Removed archive {}", archive.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!("Failed to remove archive {}: {}", archive.display(), e),
            }
        }

        tracing::info!("Deleted job {}", id);
        Ok(())
    }

    fn begin_run(&self, id: JobId) -> StoreResult<()> {
        let mut registry = self.write();
        let job = registry.jobs.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if !job.status.can_transition_to(JobStatus::Running) {
            return Err(StoreError::InvalidTransition {
                id,
                from: job.status,
                to: JobStatus::Running,
            });
        }
        job.status = JobStatus::Running;
        Ok(())
    }

    fn set_progress(&self, id: JobId, progress: u8) -> StoreResult<()> {
        let mut registry = self.write();
        let job = registry.jobs.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if job.status != JobStatus::Running {
            return Err(StoreError::NotRunning(id));
        }
        job.progress = job.progress.max(progress.min(MAX_RUNNING_PROGRESS));
        Ok(())
    }

    fn append_log(&self, id: JobId, message: &str) -> StoreResult<()> {
        self.mutate(id, JobStatus::Running, |job| {
            job.logs.push(LogEntry::new(message))
        })
    }

    fn complete(&self, id: JobId, archive_path: PathBuf) -> StoreResult<()> {
        let mut registry = self.write();
        let job = registry.jobs.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if !job.status.can_transition_to(JobStatus::Completed) {
            return Err(StoreError::InvalidTransition {
                id,
                from: job.status,
                to: JobStatus::Completed,
            });
        }
        job.archive_path = Some(archive_path);
        job.progress = 100;
        job.status = JobStatus::Completed;
        Ok(())
    }

    fn fail(&self, id: JobId, reason: &str) -> StoreResult<()> {
        let mut registry = self.write();
        let job = registry.jobs.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if !job.status.can_transition_to(JobStatus::Failed) {
            return Err(StoreError::InvalidTransition {
                id,
                from: job.status,
                to: JobStatus::Failed,
            });
        }
        job.error = Some(reason.to_string());
        job.status = JobStatus::Failed;
        Ok(())
    }

    fn cancel(&self, id: JobId) -> StoreResult<()> {
        let mut registry = self.write();
        let job = registry.jobs.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if !job.status.is_terminal() {
            job.cancel_requested = true;
        }
        Ok(())
    }

    fn is_cancelled(&self, id: JobId) -> bool {
        self.read()
            .jobs
            .get(&id)
            .map_or(true, |job| job.cancel_requested)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn store() -> MemoryJobStore {
        MemoryJobStore::new("/tmp/site-mirror-test")
    }

    #[test]
    fn test_create_and_get() {
        let store = store();
        let id = store.create("https://example.com/");

        let job = store.get(id).unwrap();
        assert_eq!(job.id, id);
        assert_eq!(job.seed_url, "https://example.com/");
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.progress, 0);
        assert_eq!(
            job.output_dir,
            PathBuf::from("/tmp/site-mirror-test").join(id.to_string())
        );
    }

    #[test]
    fn test_get_unknown_job() {
        let store = store();
        assert!(matches!(store.get(JobId::new()), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_list_in_creation_order() {
        let store = store();
        let ids: Vec<JobId> = (0..5)
            .map(|i| store.create(&format!("https://site{}.example/", i)))
            .collect();

        let listed: Vec<JobId> = store.list().iter().map(|job| job.id).collect();
        assert_eq!(listed, ids);
    }

    #[test]
    fn test_begin_run_only_once() {
        let store = store();
        let id = store.create("https://example.com/");

        store.begin_run(id).unwrap();
        assert_eq!(store.get(id).unwrap().status, JobStatus::Running);
        assert!(matches!(
            store.begin_run(id),
            Err(StoreError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_progress_is_monotonic_and_below_100() {
        let store = store();
        let id = store.create("https://example.com/");

        assert!(matches!(store.set_progress(id, 10), Err(StoreError::NotRunning(_))));

        store.begin_run(id).unwrap();
        store.set_progress(id, 40).unwrap();
        store.set_progress(id, 20).unwrap();
        assert_eq!(store.get(id).unwrap().progress, 40);

        store.set_progress(id, 100).unwrap();
        assert_eq!(store.get(id).unwrap().progress, 99);
    }

    #[test]
    fn test_complete_sets_archive_and_progress() {
        let store = store();
        let id = store.create("https://example.com/");
        store.begin_run(id).unwrap();
        store.complete(id, PathBuf::from("/tmp/a.zip")).unwrap();

        let job = store.get(id).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 100);
        assert!(job.archive_available);
    }

    #[test]
    fn test_complete_requires_running() {
        let store = store();
        let id = store.create("https://example.com/");
        assert!(store.complete(id, PathBuf::from("/tmp/a.zip")).is_err());
    }

    #[test]
    fn test_terminal_job_is_immutable() {
        let store = store();
        let id = store.create("https://example.com/");
        store.begin_run(id).unwrap();
        store.append_log(id, "before").unwrap();
        store.fail(id, "boom").unwrap();

        assert!(store.append_log(id, "after").is_err());
        assert!(store.set_progress(id, 50).is_err());
        assert!(store.complete(id, PathBuf::from("/tmp/a.zip")).is_err());
        assert!(store.fail(id, "again").is_err());

        let job = store.get(id).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some("boom"));
        assert_eq!(job.logs.len(), 1);
        assert_eq!(job.logs[0].message, "before");
    }

    #[test]
    fn test_cancel_and_delete() {
        let store = store();
        let id = store.create("https://example.com/");
        assert!(!store.is_cancelled(id));

        store.cancel(id).unwrap();
        assert!(store.is_cancelled(id));

        store.delete(id).unwrap();
        assert!(store.is_cancelled(id));
        assert!(matches!(store.delete(id), Err(StoreError::NotFound(_))));
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_delete_removes_archive_file() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("job.zip");
        std::fs::write(&archive, b"zip").unwrap();

        let store = MemoryJobStore::new(dir.path());
        let id = store.create("https://example.com/");
        store.begin_run(id).unwrap();
        store.complete(id, archive.clone()).unwrap();

        store.delete(id).unwrap();
        assert!(!archive.exists());
    }

    #[test]
    fn test_concurrent_jobs_do_not_interfere() {
        let store = Arc::new(store());
        let ids: Vec<JobId> = (0..8)
            .map(|i| store.create(&format!("https://site{}.example/", i)))
            .collect();

        let handles: Vec<_> = ids
            .iter()
            .copied()
            .map(|id| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store.begin_run(id).unwrap();
                    for step in 0..50u8 {
                        store.append_log(id, &format!("step {}", step)).unwrap();
                        store.set_progress(id, step).unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        for id in ids {
            let job = store.get(id).unwrap();
            assert_eq!(job.logs.len(), 50);
            assert_eq!(job.progress, 49);
            assert_eq!(job.logs[0].message, "step 0");
            assert_eq!(job.logs[49].message, "step 49");
        }
    }
}
