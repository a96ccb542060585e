//! Renderer abstraction for page rendering during a crawl
//!
//! Defines the `Renderer` and `RenderSession` traits the crawl engine drives.
//! A session is one browsing context per job: cookies set while logging in
//! are still present when the traversal loop runs.
//!
//! The shipped implementation, [`HttpRenderer`], loads documents over HTTP
//! and answers DOM queries with an HTML parser.

mod dom;
mod http;

pub use http::{HttpRenderer, HttpSession};

use crate::job::ProxyDescriptor;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors raised by rendering sessions
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to open rendering session: {0}")]
    Launch(String),

    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Navigation to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("Expected HTML from {url}, got {content_type}")]
    ContentMismatch { url: String, content_type: String },

    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("No element matches selector '{0}'")]
    ElementNotFound(String),

    #[error("Element '{selector}' cannot be {action}")]
    NotInteractive {
        selector: String,
        action: &'static str,
    },

    #[error("No document loaded")]
    NoDocument,
}

impl RenderError {
    /// Returns true for failures to load a page (the NavigationError kind)
    pub fn is_navigation(&self) -> bool {
        matches!(
            self,
            Self::Navigation { .. } | Self::Timeout { .. } | Self::ContentMismatch { .. }
        )
    }
}

/// When a navigation is considered finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum WaitPolicy {
    /// Network activity has settled
    #[default]
    NetworkIdle,
}

/// Options for a single navigation
#[derive(Debug, Clone, Copy)]
pub struct NavigateOptions {
    pub wait_until: WaitPolicy,
    pub timeout: Duration,
}

impl NavigateOptions {
    pub fn network_idle(timeout: Duration) -> Self {
        Self {
            wait_until: WaitPolicy::NetworkIdle,
            timeout,
        }
    }
}

/// A rendering engine that opens per-job browsing sessions
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Opens a new browsing session, routing all traffic through `proxy`
    async fn open_session(
        &self,
        proxy: Option<&ProxyDescriptor>,
    ) -> Result<Box<dyn RenderSession>, RenderError>;
}

/// A single browsing context
#[async_trait]
pub trait RenderSession: Send {
    /// Loads `url`, bounded by `options.timeout`
    async fn navigate(&mut self, url: &Url, options: NavigateOptions) -> Result<(), RenderError>;

    /// URL of the current document after redirects
    fn current_url(&self) -> Option<&Url>;

    /// Serialized markup of the current document
    async fn content(&self) -> Result<String, RenderError>;

    /// All anchor targets, resolved against the current document
    async fn extract_links(&self) -> Result<Vec<String>, RenderError>;

    /// Image, stylesheet and script source URLs, resolved against the current document
    async fn extract_asset_refs(&self) -> Result<Vec<String>, RenderError>;

    /// Waits until `selector` matches, or fails after `timeout`
    async fn wait_for_selector(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), RenderError>;

    /// Types `value` into the form control matched by `selector`
    async fn fill(&mut self, selector: &str, value: &str) -> Result<(), RenderError>;

    /// Clicks the element matched by `selector`
    async fn click(&mut self, selector: &str) -> Result<(), RenderError>;

    /// Idles for a fixed interval
    async fn pause(&mut self, duration: Duration);

    /// Releases the session
    async fn close(self: Box<Self>) -> Result<(), RenderError>;
}
