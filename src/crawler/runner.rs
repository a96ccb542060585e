//! Job submission
//!
//! Creates jobs in the store and hands them to the crawl engine, either on a
//! spawned tokio task or in the caller's task.

use crate::archive::Archiver;
use crate::config::Config;
use crate::crawler::engine::CrawlEngine;
use crate::job::{CrawlRequest, JobId, JobStatus};
use crate::renderer::Renderer;
use crate::store::{JobStore, StoreResult};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Accepts crawl requests and runs each as an independent job
pub struct JobRunner {
    engine: Arc<CrawlEngine>,
    store: Arc<dyn JobStore>,
}

impl JobRunner {
    pub fn new(
        config: Arc<Config>,
        store: Arc<dyn JobStore>,
        renderer: Arc<dyn Renderer>,
        archiver: Arc<dyn Archiver>,
    ) -> Self {
        let engine = CrawlEngine::new(config, Arc::clone(&store), renderer, archiver);
        Self {
            engine: Arc::new(engine),
            store,
        }
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// Creates a job for `request` and starts it on the runtime
    ///
    /// # Returns
    ///
    /// The new job's id, available to status readers immediately, and the
    /// handle of the task driving it
    pub fn submit(&self, request: CrawlRequest) -> (JobId, JoinHandle<StoreResult<JobStatus>>) {
        let id = self.store.create(request.seed().as_str());
        tracing::info!("Submitted job {} for {}", id, request.seed());

        let engine = Arc::clone(&self.engine);
        let handle = tokio::spawn(async move { engine.run(id, &request).await });
        (id, handle)
    }

    /// Runs an already created job in the current task
    pub async fn run(&self, id: JobId, request: &CrawlRequest) -> StoreResult<JobStatus> {
        self.engine.run(id, request).await
    }
}
