//! Site-Mirror: a same-origin website mirroring engine
//!
//! This crate walks a website breadth-first from a seed URL, saves every
//! rendered page and its same-origin assets to disk, and packages the result
//! into a single archive while exposing live job progress and logs.

pub mod archive;
pub mod config;
pub mod crawler;
pub mod job;
pub mod renderer;
pub mod store;
pub mod url;

use thiserror::Error;

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Crawl request validation errors
///
/// These are raised at the boundary, before any job exists.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Seed URL is required")]
    MissingUrl,

    #[error("Failed to parse seed URL '{0}'")]
    InvalidUrl(String),

    #[error("Unsupported seed URL scheme '{0}' (expected http or https)")]
    UnsupportedScheme(String),

    #[error("Seed URL has no host: {0}")]
    MissingHost(String),

    #[error("Incomplete authentication descriptor: {0}")]
    IncompleteAuth(String),

    #[error("Invalid proxy URI: {0}")]
    InvalidProxy(String),

    #[error("Page cap must be at least 1")]
    InvalidPageCap,
}

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlEngine, JobRunner};
pub use job::{AuthDescriptor, CrawlRequest, JobId, JobSnapshot, JobStatus, ProxyDescriptor};
pub use store::{JobStore, MemoryJobStore};
