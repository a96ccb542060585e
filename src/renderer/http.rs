//! HTTP-backed renderer
//!
//! Loads documents with a cookie-keeping `reqwest` client and answers DOM
//! queries with `scraper`. Scripts are not executed, so a document never
//! changes after it loads, and navigation is idle once the body has been
//! read.

use crate::config::BrowserConfig;
use crate::job::ProxyDescriptor;
use crate::renderer::dom::{self, ClickAction, FormMethod};
use crate::renderer::{NavigateOptions, RenderError, RenderSession, Renderer};
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, Proxy, RequestBuilder};
use std::time::Duration;
use url::Url;

/// Default bound on form submissions before any navigation sets one
const DEFAULT_INTERACTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Opens HTTP browsing sessions with a fixed user agent
#[derive(Debug, Clone)]
pub struct HttpRenderer {
    user_agent: String,
}

impl HttpRenderer {
    pub fn new(config: &BrowserConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
        }
    }
}

#[async_trait]
impl Renderer for HttpRenderer {
    async fn open_session(
        &self,
        proxy: Option<&ProxyDescriptor>,
    ) -> Result<Box<dyn RenderSession>, RenderError> {
        let mut builder = Client::builder()
            .user_agent(&self.user_agent)
            .cookie_store(true)
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true);

        if let Some(proxy) = proxy {
            let proxy = Proxy::all(proxy.uri())
                .map_err(|e| RenderError::Launch(format!("invalid proxy: {}", e)))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| RenderError::Launch(e.to_string()))?;

        tracing::debug!(
            "Opened HTTP session{}",
            proxy
                .map(|p| format!(" via {}", p.redacted()))
                .unwrap_or_default()
        );

        Ok(Box::new(HttpSession::new(client)))
    }
}

struct LoadedPage {
    url: Url,
    html: String,
}

/// One cookie jar and the document currently loaded in it
pub struct HttpSession {
    client: Client,
    current: Option<LoadedPage>,
    filled: Vec<(String, String)>,
    interaction_timeout: Duration,
}

impl HttpSession {
    fn new(client: Client) -> Self {
        Self {
            client,
            current: None,
            filled: Vec::new(),
            interaction_timeout: DEFAULT_INTERACTION_TIMEOUT,
        }
    }

    fn page(&self) -> Result<&LoadedPage, RenderError> {
        self.current.as_ref().ok_or(RenderError::NoDocument)
    }

    /// Sends `request`, replacing the current document with the response
    ///
    /// # Returns
    ///
    /// * `Ok(())` - An HTML document was loaded
    /// * `Err(RenderError)` - Network failure, timeout, HTTP error status or non-HTML body
    async fn load(
        &mut self,
        request: RequestBuilder,
        target: &Url,
        timeout: Duration,
    ) -> Result<(), RenderError> {
        let navigation_error = |reason: String| RenderError::Navigation {
            url: target.to_string(),
            reason,
        };

        let fetch = async {
            let response = request
                .send()
                .await
                .map_err(|e| navigation_error(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(navigation_error(format!("HTTP {}", status.as_u16())));
            }

            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            if let Some(content_type) = content_type {
                if !is_html(&content_type) {
                    return Err(RenderError::ContentMismatch {
                        url: target.to_string(),
                        content_type,
                    });
                }
            }

            let final_url = response.url().clone();
            let html = response
                .text()
                .await
                .map_err(|e| navigation_error(format!("failed to read body: {}", e)))?;

            Ok(LoadedPage {
                url: final_url,
                html,
            })
        };

        let page = tokio::time::timeout(timeout, fetch)
            .await
            .map_err(|_| RenderError::Timeout {
                url: target.to_string(),
                timeout,
            })??;

        tracing::debug!("Loaded {} ({} bytes)", page.url, page.html.len());
        self.current = Some(page);
        self.filled.clear();
        Ok(())
    }
}

fn is_html(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime == "text/html" || mime == "application/xhtml+xml"
}

#[async_trait]
impl RenderSession for HttpSession {
    async fn navigate(&mut self, url: &Url, options: NavigateOptions) -> Result<(), RenderError> {
        self.interaction_timeout = options.timeout;
        let request = self.client.get(url.clone());
        self.load(request, url, options.timeout).await
    }

    fn current_url(&self) -> Option<&Url> {
        self.current.as_ref().map(|page| &page.url)
    }

    async fn content(&self) -> Result<String, RenderError> {
        Ok(self.page()?.html.clone())
    }

    async fn extract_links(&self) -> Result<Vec<String>, RenderError> {
        let page = self.page()?;
        Ok(dom::anchor_hrefs(&page.html, &page.url))
    }

    async fn extract_asset_refs(&self) -> Result<Vec<String>, RenderError> {
        let page = self.page()?;
        Ok(dom::asset_refs(&page.html, &page.url))
    }

    async fn wait_for_selector(
        &mut self,
        selector: &str,
        _timeout: Duration,
    ) -> Result<(), RenderError> {
        let page = self.page()?;
        if dom::matches_selector(&page.html, selector)? {
            Ok(())
        } else {
            Err(RenderError::ElementNotFound(selector.to_string()))
        }
    }

    async fn fill(&mut self, selector: &str, value: &str) -> Result<(), RenderError> {
        let name = dom::control_name(&self.page()?.html, selector)?;
        self.filled.retain(|(existing, _)| *existing != name);
        self.filled.push((name, value.to_string()));
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> Result<(), RenderError> {
        let action = {
            let page = self.page()?;
            dom::click_action(&page.html, selector, &page.url, &self.filled)?
        };

        let (request, target) = match action {
            ClickAction::Follow(url) => (self.client.get(url.clone()), url),
            ClickAction::Submit(form) => {
                tracing::debug!(
                    "Submitting form to {} with {} field(s)",
                    form.action,
                    form.fields.len()
                );
                let request = match form.method {
                    FormMethod::Get => {
                        // The form data replaces any query on the action URL
                        let mut action = form.action.clone();
                        action.set_query(None);
                        self.client.get(action).query(&form.fields)
                    }
                    FormMethod::Post => self.client.post(form.action.clone()).form(&form.fields),
                };
                (request, form.action)
            }
        };

        let timeout = self.interaction_timeout;
        self.load(request, &target, timeout).await
    }

    async fn pause(&mut self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    async fn close(self: Box<Self>) -> Result<(), RenderError> {
        tracing::debug!("Closed HTTP session");
        Ok(())
    }
}
