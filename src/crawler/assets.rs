//! Same-origin asset retrieval
//!
//! Assets are best-effort: any failure is recorded at debug level and the
//! asset is skipped. Nothing here can fail a page or a job.

use crate::config::Config;
use crate::job::ProxyDescriptor;
use crate::url::{is_same_origin, resolve_path};
use reqwest::{Client, Proxy};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Reasons a single asset was skipped
#[derive(Debug, Error)]
enum AssetError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
}

/// Per-page asset outcome
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssetReport {
    pub saved: usize,
    pub skipped: usize,
}

impl AssetReport {
    pub fn is_empty(&self) -> bool {
        self.saved == 0 && self.skipped == 0
    }
}

/// Builds the HTTP client used for asset downloads
///
/// # Arguments
///
/// * `config` - Engine configuration (user agent and asset timeout)
/// * `proxy` - Optional upstream proxy for all asset traffic
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client or parse the proxy
pub fn build_asset_client(
    config: &Config,
    proxy: Option<&ProxyDescriptor>,
) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(&config.browser.user_agent)
        .timeout(config.engine.asset_timeout())
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = proxy {
        builder = builder.proxy(Proxy::all(proxy.uri())?);
    }

    builder.build()
}

/// Downloads page assets into a job's output directory
///
/// Each asset URL is fetched at most once per job.
pub struct AssetFetcher {
    client: Client,
    fetched: HashSet<String>,
}

impl AssetFetcher {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            fetched: HashSet::new(),
        }
    }

    /// Fetches every same-origin reference in `refs` not fetched before
    ///
    /// # Arguments
    ///
    /// * `refs` - Absolute asset URLs extracted from a page
    /// * `origin_host` - The job's seed host
    /// * `output_dir` - The job's output directory
    pub async fn fetch_all(
        &mut self,
        refs: &[String],
        origin_host: &str,
        output_dir: &Path,
    ) -> AssetReport {
        let mut report = AssetReport::default();

        for raw in refs {
            let Ok(url) = Url::parse(raw) else {
                tracing::debug!("Ignoring unparseable asset reference {}", raw);
                continue;
            };
            if !is_same_origin(&url, origin_host) {
                tracing::debug!("Ignoring cross-origin asset {}", url);
                continue;
            }
            if !self.fetched.insert(url.as_str().to_string()) {
                continue;
            }

            match self.fetch_one(&url, output_dir).await {
                Ok(()) => report.saved += 1,
                Err(e) => {
                    tracing::debug!("Skipped asset {}: {}", url, e);
                    report.skipped += 1;
                }
            }
        }

        report
    }

    async fn fetch_one(&self, url: &Url, output_dir: &Path) -> Result<(), AssetError> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AssetError::Status(status.as_u16()));
        }
        let bytes = response.bytes().await?;

        let path = output_dir.join(resolve_path(url.as_str()));
        let write_error = |source| AssetError::Write {
            path: path.display().to_string(),
            source,
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(write_error)?;
        }
        tokio::fs::write(&path, &bytes).await.map_err(write_error)?;

        tracing::debug!("Saved asset {} ({} bytes)", url, bytes.len());
        Ok(())
    }
}
