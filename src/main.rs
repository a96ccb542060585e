//! Site-Mirror main entry point
//!
//! Runs one mirror job from the command line and streams its log until the
//! job reaches a terminal state.

use anyhow::{bail, Context};
use clap::Parser;
use site_mirror::archive::ZipArchiver;
use site_mirror::config::{load_config_with_hash, validate, Config};
use site_mirror::renderer::HttpRenderer;
use site_mirror::store::StoreResult;
use site_mirror::{
    AuthDescriptor, CrawlRequest, JobId, JobRunner, JobSnapshot, JobStatus, JobStore,
    MemoryJobStore, ProxyDescriptor,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

/// How often the job is polled for new log entries
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Site-Mirror: mirror a website into a downloadable archive
///
/// Starting from the seed URL, every same-origin page and its images,
/// stylesheets and scripts are saved under the output directory and
/// packaged into `<output>/<job-id>.zip`.
#[derive(Parser, Debug)]
#[command(name = "site-mirror")]
#[command(version = "1.0.0")]
#[command(about = "Mirror a website into a downloadable archive", long_about = None)]
struct Cli {
    /// Seed URL to start mirroring from
    #[arg(value_name = "URL")]
    url: String,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Login username
    #[arg(long, requires = "password")]
    username: Option<String>,

    /// Login password
    #[arg(long, requires = "username")]
    password: Option<String>,

    /// CSS selector of the username field
    #[arg(long, value_name = "SELECTOR")]
    username_selector: Option<String>,

    /// CSS selector of the password field
    #[arg(long, value_name = "SELECTOR")]
    password_selector: Option<String>,

    /// CSS selector of the login submit control
    #[arg(long, value_name = "SELECTOR")]
    submit_selector: Option<String>,

    /// CSS selector that appears once logged in
    #[arg(long, value_name = "SELECTOR")]
    success_selector: Option<String>,

    /// Upstream proxy for all traffic (http, https, socks5, socks5h)
    #[arg(long, value_name = "URI")]
    proxy: Option<String>,

    /// Maximum number of pages to crawl (overrides the config file)
    #[arg(long, value_name = "N")]
    max_pages: Option<usize>,

    /// Output directory for job folders and archives (overrides the config file)
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Print the final job snapshot as JSON instead of streaming the log
    #[arg(long)]
    json: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => {
            tracing::info!("No configuration file given, using defaults");
            Config::default()
        }
    };
    if let Some(output) = &cli.output {
        config.output.root = output.clone();
    }
    validate(&config)?;

    let request = build_request(&cli)?;
    let root = config.output.root.clone();
    tracing::info!("Writing output under {}", root.display());

    let store: Arc<dyn JobStore> = Arc::new(MemoryJobStore::new(&root));
    let runner = JobRunner::new(
        Arc::new(config.clone()),
        Arc::clone(&store),
        Arc::new(HttpRenderer::new(&config.browser)),
        Arc::new(ZipArchiver::new(&root)),
    );

    let (id, handle) = runner.submit(request);
    let stream = !cli.json && !cli.quiet;
    let job = follow(store.as_ref(), id, handle, stream).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&job)?);
    }

    match job.status {
        JobStatus::Completed => {
            if !cli.json && !cli.quiet {
                if let Some(archive) = &job.archive_path {
                    println!("\n✓ Archive ready: {}", archive.display());
                }
            }
            Ok(())
        }
        _ => bail!(
            "job {} failed: {}",
            id,
            job.error.as_deref().unwrap_or("unknown error")
        ),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Job log entries are printed to stdout by `follow`, so library logging
/// starts at warnings and goes to stderr.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("site_mirror=info,warn"),
            2 => EnvFilter::new("site_mirror=debug,info"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Builds a validated crawl request from the command line
fn build_request(cli: &Cli) -> anyhow::Result<CrawlRequest> {
    let mut request = CrawlRequest::new(&cli.url)?;

    match (&cli.username, &cli.password) {
        (Some(username), Some(password)) => {
            let mut auth = AuthDescriptor::new(username, password)?;
            if let Some(selector) = &cli.username_selector {
                auth = auth.with_username_selector(selector);
            }
            if let Some(selector) = &cli.password_selector {
                auth = auth.with_password_selector(selector);
            }
            if let Some(selector) = &cli.submit_selector {
                auth = auth.with_submit_selector(selector);
            }
            if let Some(selector) = &cli.success_selector {
                auth = auth.with_success_selector(selector);
            }
            request = request.with_auth(auth);
        }
        _ => {
            let selectors = [
                &cli.username_selector,
                &cli.password_selector,
                &cli.submit_selector,
                &cli.success_selector,
            ];
            if selectors.iter().any(|s| s.is_some()) {
                tracing::warn!("Login selectors given without credentials; crawling unauthenticated");
            }
        }
    }

    if let Some(proxy) = &cli.proxy {
        request = request.with_proxy(ProxyDescriptor::parse(proxy)?);
    }

    if let Some(max_pages) = cli.max_pages {
        request = request.with_max_pages(max_pages)?;
    }

    Ok(request)
}

/// Polls job `id` until it is terminal, printing new log entries
///
/// Ctrl-C requests cooperative cancellation; the job then fails at the top of
/// its next loop iteration. A crawl task that dies without finishing the job
/// ends the wait with an error.
async fn follow(
    store: &dyn JobStore,
    id: JobId,
    mut handle: JoinHandle<StoreResult<JobStatus>>,
    stream: bool,
) -> anyhow::Result<JobSnapshot> {
    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    let mut seen = 0;
    let mut cancel_requested = false;
    let mut joined = false;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            signal = tokio::signal::ctrl_c(), if !cancel_requested => {
                signal.context("failed to listen for Ctrl-C")?;
                eprintln!("Cancelling job {}...", id);
                store.cancel(id)?;
                cancel_requested = true;
            }
            finished = &mut handle, if !joined => {
                joined = true;
                finished.context("crawl task aborted")??;
            }
        }

        let job = store.get(id)?;
        if stream {
            for entry in job.logs.iter().skip(seen) {
                println!(
                    "{} [{:>3}%] {}",
                    entry.timestamp.format("%H:%M:%S"),
                    job.progress,
                    entry.message
                );
            }
        }
        seen = job.logs.len();

        if joined || job.status.is_terminal() {
            break;
        }
    }

    if !joined {
        handle.await.context("crawl task aborted")??;
    }
    Ok(store.get(id)?)
}
