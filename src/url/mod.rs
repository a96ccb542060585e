//! URL handling module for Site-Mirror
//!
//! This module provides origin extraction and comparison, link resolution,
//! and the mapping from page/asset URLs to files inside a job directory.
//!
//! # Origin scoping
//!
//! A URL is in scope for a job when its hostname equals the seed URL's
//! hostname. Scheme, port and path are not compared, and subdomains are a
//! different origin (`blog.example.com` is out of scope for `example.com`).

mod domain;
mod links;
mod path;

pub use domain::{extract_domain, is_same_origin};
pub use links::{normalize_page_url, resolve_link};
pub use path::resolve_path;
