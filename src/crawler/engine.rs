//! Crawl engine - drives one job from `running` to a terminal state
//!
//! A run has three phases:
//! 1. Setup: open a rendering session, load the seed page, authenticate
//! 2. Traversal: breadth-first over same-origin pages, up to the page cap
//! 3. Packaging: archive the output directory
//!
//! Only setup, packaging and cancellation can fail a job. Errors while
//! processing an individual page are logged into the job and the loop moves
//! on to the next frontier entry.

use crate::archive::{ArchiveError, Archiver};
use crate::config::Config;
use crate::crawler::assets::{build_asset_client, AssetFetcher};
use crate::crawler::auth::{AuthOutcome, Authenticator};
use crate::crawler::frontier::Frontier;
use crate::crawler::journal::{report_store_error, JobJournal};
use crate::job::{CrawlRequest, JobId, JobStatus};
use crate::renderer::{NavigateOptions, RenderError, RenderSession, Renderer};
use crate::store::{JobStore, StoreResult};
use crate::url::{extract_domain, is_same_origin, resolve_path};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use url::Url;

/// Progress once the seed page has loaded
const PROGRESS_SEED_LOADED: u8 = 10;
/// Progress once authentication has run
const PROGRESS_AUTHENTICATED: u8 = 20;
/// Lower bound of the traversal band
const PROGRESS_LOOP_FLOOR: usize = 20;
/// Width of the traversal band
const PROGRESS_LOOP_SPAN: usize = 60;
/// Upper bound of the traversal band
const PROGRESS_LOOP_CEILING: usize = 80;
/// Progress when packaging starts
const PROGRESS_ARCHIVING: u8 = 85;

/// Errors that end a job in `failed`
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("{0}")]
    Setup(String),

    #[error("Archive failed: {0}")]
    Archive(#[from] ArchiveError),

    #[error("Job cancelled")]
    Cancelled,
}

/// Errors confined to a single page
#[derive(Debug, Error)]
pub enum PageError {
    #[error("{0}")]
    Render(#[from] RenderError),

    #[error("failed to save {}: {}", .path.display(), .source)]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Default)]
struct CrawlSummary {
    saved: usize,
    skipped: usize,
}

/// Runs crawl jobs against a shared store, renderer and archiver
pub struct CrawlEngine {
    config: Arc<Config>,
    store: Arc<dyn JobStore>,
    renderer: Arc<dyn Renderer>,
    archiver: Arc<dyn Archiver>,
}

impl CrawlEngine {
    pub fn new(
        config: Arc<Config>,
        store: Arc<dyn JobStore>,
        renderer: Arc<dyn Renderer>,
        archiver: Arc<dyn Archiver>,
    ) -> Self {
        Self {
            config,
            store,
            renderer,
            archiver,
        }
    }

    /// Runs job `id` to completion or failure
    ///
    /// # Arguments
    ///
    /// * `id` - A job in the `queued` state
    /// * `request` - The validated request the job was created from
    ///
    /// # Returns
    ///
    /// * `Ok(JobStatus)` - The terminal status the job reached
    /// * `Err(StoreError)` - The job could not be started, or was deleted mid-run
    pub async fn run(&self, id: JobId, request: &CrawlRequest) -> StoreResult<JobStatus> {
        self.store.begin_run(id)?;
        let output_dir = self.store.get(id)?.output_dir;
        let journal = JobJournal::new(self.store.as_ref(), id);

        let finished = match self.execute(&journal, request, &output_dir).await {
            Ok(archive) => {
                journal.info("Mirror completed, archive ready for download");
                let completed = self.store.complete(id, archive.clone());
                if completed.is_err() {
                    // Deleted or finished elsewhere while packaging
                    discard_archive(id, &archive).await;
                }
                completed
            }
            Err(e) => {
                journal.error(&format!("ERROR: {}", e));
                self.store.fail(id, &e.to_string())
            }
        };
        if let Err(e) = finished {
            report_store_error(id, &e);
        }

        let status = self.store.get(id)?.status;
        tracing::info!(job_id = %id, "Job finished with status {}", status);
        Ok(status)
    }

    /// Setup, traversal and packaging
    ///
    /// The rendering session is closed before this returns on every path.
    async fn execute(
        &self,
        journal: &JobJournal<'_>,
        request: &CrawlRequest,
        output_dir: &Path,
    ) -> Result<PathBuf, FatalError> {
        let seed = request.seed();
        journal.info(&format!("Starting mirror of {}", seed));

        let origin_host = extract_domain(seed)
            .ok_or_else(|| FatalError::Setup(format!("Seed URL {} has no host", seed)))?;

        if let Some(proxy) = request.proxy() {
            journal.info(&format!("Using proxy: {}", proxy.redacted()));
        }

        tokio::fs::create_dir_all(output_dir).await.map_err(|e| {
            FatalError::Setup(format!(
                "Failed to create output directory {}: {}",
                output_dir.display(),
                e
            ))
        })?;

        let client = build_asset_client(&self.config, request.proxy())
            .map_err(|e| FatalError::Setup(format!("Failed to build asset client: {}", e)))?;
        let assets = AssetFetcher::new(client);

        let mut session = self
            .renderer
            .open_session(request.proxy())
            .await
            .map_err(|e| FatalError::Setup(e.to_string()))?;
        journal.info("Browser session opened");

        let crawled = self
            .crawl(
                session.as_mut(),
                journal,
                request,
                &origin_host,
                output_dir,
                assets,
            )
            .await;

        if let Err(e) = session.close().await {
            tracing::warn!(job_id = %journal.id(), "Failed to close session cleanly: {}", e);
        }
        journal.info("Browser closed");

        let summary = crawled?;
        journal.info(&format!(
            "Mirrored {} page(s), skipped {}",
            summary.saved, summary.skipped
        ));

        journal.progress(PROGRESS_ARCHIVING);
        journal.info("Creating archive...");
        let archive = self.archiver.package(output_dir).await?;
        journal.info(&format!("Archive written to {}", archive.display()));

        Ok(archive)
    }

    async fn crawl(
        &self,
        session: &mut dyn RenderSession,
        journal: &JobJournal<'_>,
        request: &CrawlRequest,
        origin_host: &str,
        output_dir: &Path,
        mut assets: AssetFetcher,
    ) -> Result<CrawlSummary, FatalError> {
        let engine = &self.config.engine;
        let seed = request.seed();

        journal.info(&format!("Navigating to {}", seed));
        session
            .navigate(seed, NavigateOptions::network_idle(engine.setup_timeout()))
            .await
            .map_err(|e| FatalError::Setup(format!("Seed page unreachable: {}", e)))?;
        journal.progress(PROGRESS_SEED_LOADED);

        if let Some(auth) = request.auth() {
            let outcome = Authenticator::new(&self.config.auth, journal)
                .authenticate(session, auth)
                .await;
            if outcome == AuthOutcome::Degraded {
                journal.warn("Login incomplete, pages may be mirrored unauthenticated");
            }
            journal.progress(PROGRESS_AUTHENTICATED);
        }

        let cap = request.max_pages().unwrap_or(engine.max_pages);
        let mut frontier = Frontier::new(seed);
        let mut summary = CrawlSummary::default();
        let mut processed = 0;

        while processed < cap {
            if self.store.is_cancelled(journal.id()) {
                return Err(FatalError::Cancelled);
            }

            let Some(url) = frontier.next() else {
                break;
            };
            processed += 1;
            journal.info(&format!("Crawling page {}: {}", processed, url));

            match self
                .process_page(session, journal, &url, origin_host, output_dir, &mut assets)
                .await
            {
                Ok(links) => {
                    summary.saved += 1;
                    let added = links.iter().filter(|link| frontier.enqueue(link)).count();
                    tracing::debug!(
                        job_id = %journal.id(),
                        "{} new link(s) from {}, {} pending",
                        added,
                        url,
                        frontier.pending()
                    );
                }
                Err(e) => {
                    summary.skipped += 1;
                    journal.warn(&format!("Error crawling {}: {}", url, e));
                }
            }

            journal.progress(loop_progress(processed, cap));
        }

        if frontier.pending() > 0 {
            journal.info(&format!(
                "Page cap of {} reached, {} discovered URL(s) not visited",
                cap,
                frontier.pending()
            ));
        }

        Ok(summary)
    }

    /// Loads, saves and mines one page
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<Url>)` - Same-origin links found on the page
    /// * `Err(PageError)` - The page could not be loaded or saved
    async fn process_page(
        &self,
        session: &mut dyn RenderSession,
        journal: &JobJournal<'_>,
        url: &Url,
        origin_host: &str,
        output_dir: &Path,
        assets: &mut AssetFetcher,
    ) -> Result<Vec<Url>, PageError> {
        let timeout = self.config.engine.navigation_timeout();
        session
            .navigate(url, NavigateOptions::network_idle(timeout))
            .await?;

        let html = session.content().await?;
        let path = output_dir.join(resolve_path(url.as_str()));
        save_page(&path, &html)
            .await
            .map_err(|source| PageError::Persist {
                path: path.clone(),
                source,
            })?;
        tracing::debug!(job_id = %journal.id(), "Saved {} to {}", url, path.display());

        match session.extract_asset_refs().await {
            Ok(refs) => {
                let report = assets.fetch_all(&refs, origin_host, output_dir).await;
                if !report.is_empty() {
                    journal.info(&format!(
                        "Assets: {} saved, {} skipped",
                        report.saved, report.skipped
                    ));
                }
            }
            Err(e) => tracing::debug!(job_id = %journal.id(), "No assets from {}: {}", url, e),
        }

        let links = session.extract_links().await?;
        Ok(links
            .iter()
            .filter_map(|link| Url::parse(link).ok())
            .filter(|link| is_same_origin(link, origin_host))
            .collect())
    }
}

async fn save_page(path: &Path, html: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, html).await
}

/// Removes an archive that no job record points at
async fn discard_archive(id: JobId, archive: &Path) {
    match tokio::fs::remove_file(archive).await {
        Ok(()) => tracing::info!(job_id = %id, "Removed orphaned archive {}", archive.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(
            job_id = %id,
            "Failed to remove orphaned archive {}: {}",
            archive.display(),
            e
        ),
    }
}

/// Maps pages processed so far onto the traversal progress band
fn loop_progress(processed: usize, cap: usize) -> u8 {
    let scaled = PROGRESS_LOOP_FLOOR + processed.saturating_mul(PROGRESS_LOOP_SPAN) / cap.max(1);
    // The ceiling is below 100, so the cast cannot truncate
    scaled.min(PROGRESS_LOOP_CEILING) as u8
}
