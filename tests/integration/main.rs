//! Integration tests for the site mirror
//!
//! These tests run complete jobs against wiremock servers through the real
//! HTTP renderer, asset fetcher and zip archiver.

mod mirror_tests;
