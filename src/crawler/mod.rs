//! Crawler module - the crawl engine and the pieces it drives
//!
//! This module contains:
//! - The breadth-first URL frontier
//! - Best-effort same-origin asset downloads
//! - Form-based authentication before traversal
//! - The crawl engine and its job lifecycle
//! - Job submission onto the tokio runtime

mod assets;
mod auth;
mod engine;
mod frontier;
mod journal;
mod runner;

pub use assets::{build_asset_client, AssetFetcher, AssetReport};
pub use auth::{AuthOutcome, Authenticator};
pub use engine::{CrawlEngine, FatalError, PageError};
pub use frontier::Frontier;
pub use journal::JobJournal;
pub use runner::JobRunner;
