//! Validated crawl requests
//!
//! Everything a caller supplies is checked here, at the boundary, so the
//! engine never sees a malformed seed, proxy or credential set.

use crate::RequestError;
use url::Url;

/// Proxy schemes the HTTP stack can tunnel through
const PROXY_SCHEMES: &[&str] = &["http", "https", "socks5", "socks5h"];

/// A validated request to mirror one site
#[derive(Debug, Clone)]
pub struct CrawlRequest {
    seed: Url,
    auth: Option<AuthDescriptor>,
    proxy: Option<ProxyDescriptor>,
    max_pages: Option<usize>,
}

impl CrawlRequest {
    /// Validates the seed URL
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlRequest)` - Seed is an absolute http/https URL with a host
    /// * `Err(RequestError)` - Seed is missing, unparseable or out of scope
    pub fn new(seed_url: &str) -> Result<Self, RequestError> {
        let trimmed = seed_url.trim();
        if trimmed.is_empty() {
            return Err(RequestError::MissingUrl);
        }

        let mut seed =
            Url::parse(trimmed).map_err(|_| RequestError::InvalidUrl(trimmed.to_string()))?;

        if seed.scheme() != "http" && seed.scheme() != "https" {
            return Err(RequestError::UnsupportedScheme(seed.scheme().to_string()));
        }

        if seed.host_str().map_or(true, str::is_empty) {
            return Err(RequestError::MissingHost(trimmed.to_string()));
        }

        seed.set_fragment(None);

        Ok(Self {
            seed,
            auth: None,
            proxy: None,
            max_pages: None,
        })
    }

    pub fn with_auth(mut self, auth: AuthDescriptor) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn with_proxy(mut self, proxy: ProxyDescriptor) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Overrides the engine page cap for this job
    pub fn with_max_pages(mut self, max_pages: usize) -> Result<Self, RequestError> {
        if max_pages == 0 {
            return Err(RequestError::InvalidPageCap);
        }
        self.max_pages = Some(max_pages);
        Ok(self)
    }

    pub fn seed(&self) -> &Url {
        &self.seed
    }

    pub fn auth(&self) -> Option<&AuthDescriptor> {
        self.auth.as_ref()
    }

    pub fn proxy(&self) -> Option<&ProxyDescriptor> {
        self.proxy.as_ref()
    }

    pub fn max_pages(&self) -> Option<usize> {
        self.max_pages
    }
}

/// Credentials and the selectors needed to drive a login form
#[derive(Clone)]
pub struct AuthDescriptor {
    username: String,
    password: String,
    username_selector: Option<String>,
    password_selector: Option<String>,
    submit_selector: Option<String>,
    success_selector: Option<String>,
}

impl AuthDescriptor {
    pub fn new(username: &str, password: &str) -> Result<Self, RequestError> {
        if username.is_empty() {
            return Err(RequestError::IncompleteAuth("username is empty".to_string()));
        }
        if password.is_empty() {
            return Err(RequestError::IncompleteAuth("password is empty".to_string()));
        }

        Ok(Self {
            username: username.to_string(),
            password: password.to_string(),
            username_selector: None,
            password_selector: None,
            submit_selector: None,
            success_selector: None,
        })
    }

    pub fn with_username_selector(mut self, selector: &str) -> Self {
        self.username_selector = non_blank(selector);
        self
    }

    pub fn with_password_selector(mut self, selector: &str) -> Self {
        self.password_selector = non_blank(selector);
        self
    }

    pub fn with_submit_selector(mut self, selector: &str) -> Self {
        self.submit_selector = non_blank(selector);
        self
    }

    pub fn with_success_selector(mut self, selector: &str) -> Self {
        self.success_selector = non_blank(selector);
        self
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn username_selector(&self) -> Option<&str> {
        self.username_selector.as_deref()
    }

    pub fn password_selector(&self) -> Option<&str> {
        self.password_selector.as_deref()
    }

    pub fn submit_selector(&self) -> Option<&str> {
        self.submit_selector.as_deref()
    }

    pub fn success_selector(&self) -> Option<&str> {
        self.success_selector.as_deref()
    }
}

// Keep the password out of debug output.
impl std::fmt::Debug for AuthDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthDescriptor")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("username_selector", &self.username_selector)
            .field("password_selector", &self.password_selector)
            .field("submit_selector", &self.submit_selector)
            .field("success_selector", &self.success_selector)
            .finish()
    }
}

/// A single upstream proxy applied to all of a job's traffic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyDescriptor {
    uri: Url,
}

impl ProxyDescriptor {
    pub fn parse(uri: &str) -> Result<Self, RequestError> {
        let parsed = Url::parse(uri.trim())
            .map_err(|e| RequestError::InvalidProxy(format!("{}: {}", uri, e)))?;

        if !PROXY_SCHEMES.contains(&parsed.scheme()) {
            return Err(RequestError::InvalidProxy(format!(
                "unsupported scheme '{}'",
                parsed.scheme()
            )));
        }

        if parsed.host_str().map_or(true, str::is_empty) {
            return Err(RequestError::InvalidProxy(format!("{}: missing host", uri)));
        }

        Ok(Self { uri: parsed })
    }

    pub fn uri(&self) -> &str {
        self.uri.as_str()
    }

    /// The proxy URI with any password masked, for logs
    pub fn redacted(&self) -> String {
        let mut masked = self.uri.clone();
        if masked.password().is_some() {
            // Only fails for cannot-be-a-base URLs, which were rejected above
            let _ = masked.set_password(Some("***"));
        }
        masked.to_string()
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
