use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Default hard cap on pages processed per job
pub const DEFAULT_MAX_PAGES: usize = 500;

/// Desktop browser identity presented by rendering sessions
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Main configuration structure for Site-Mirror
///
/// Every section is optional in the TOML file; missing keys take the
/// engine defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawl engine limits and timeouts
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of pages processed per job
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: usize,

    /// Navigation timeout for pages in the traversal loop (seconds)
    #[serde(rename = "navigation-timeout-secs", default = "default_navigation_timeout")]
    pub navigation_timeout_secs: u64,

    /// Navigation timeout for the initial seed page (seconds)
    #[serde(rename = "setup-timeout-secs", default = "default_setup_timeout")]
    pub setup_timeout_secs: u64,

    /// Timeout for a single asset download (seconds)
    #[serde(rename = "asset-timeout-secs", default = "default_asset_timeout")]
    pub asset_timeout_secs: u64,
}

impl EngineConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn setup_timeout(&self) -> Duration {
        Duration::from_secs(self.setup_timeout_secs)
    }

    pub fn asset_timeout(&self) -> Duration {
        Duration::from_secs(self.asset_timeout_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
            navigation_timeout_secs: default_navigation_timeout(),
            setup_timeout_secs: default_setup_timeout(),
            asset_timeout_secs: default_asset_timeout(),
        }
    }
}

/// Login form interaction timings
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// How long to wait for the username/password fields (seconds)
    #[serde(rename = "selector-timeout-secs", default = "default_selector_timeout")]
    pub selector_timeout_secs: u64,

    /// How long to wait for the success indicator (seconds)
    #[serde(rename = "success-timeout-secs", default = "default_success_timeout")]
    pub success_timeout_secs: u64,

    /// Fixed delay used when no success indicator is given (milliseconds)
    #[serde(rename = "fallback-delay-ms", default = "default_fallback_delay")]
    pub fallback_delay_ms: u64,
}

impl AuthConfig {
    pub fn selector_timeout(&self) -> Duration {
        Duration::from_secs(self.selector_timeout_secs)
    }

    pub fn success_timeout(&self) -> Duration {
        Duration::from_secs(self.success_timeout_secs)
    }

    pub fn fallback_delay(&self) -> Duration {
        Duration::from_millis(self.fallback_delay_ms)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            selector_timeout_secs: default_selector_timeout(),
            success_timeout_secs: default_success_timeout(),
            fallback_delay_ms: default_fallback_delay(),
        }
    }
}

/// Rendering session identity
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserConfig {
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory holding per-job output directories and archives
    #[serde(default = "default_output_root")]
    pub root: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root: default_output_root(),
        }
    }
}

fn default_max_pages() -> usize {
    DEFAULT_MAX_PAGES
}

fn default_navigation_timeout() -> u64 {
    30
}

fn default_setup_timeout() -> u64 {
    60
}

fn default_asset_timeout() -> u64 {
    30
}

fn default_selector_timeout() -> u64 {
    10
}

fn default_success_timeout() -> u64 {
    15
}

fn default_fallback_delay() -> u64 {
    3000
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_output_root() -> PathBuf {
    PathBuf::from("./downloads")
}
