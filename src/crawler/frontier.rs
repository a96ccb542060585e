//! Breadth-first URL frontier
//!
//! A FIFO queue paired with two sets: every URL ever enqueued, and every URL
//! already handed out. Enqueueing is idempotent, so a URL is crawled at most
//! once per job.

use crate::url::normalize_page_url;
use std::collections::{HashSet, VecDeque};
use url::Url;

#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<Url>,
    discovered: HashSet<String>,
    visited: HashSet<String>,
}

impl Frontier {
    /// Creates a frontier holding only `seed`
    pub fn new(seed: &Url) -> Self {
        let mut frontier = Self::default();
        frontier.enqueue(seed);
        frontier
    }

    /// Adds `url` to the back of the queue
    ///
    /// # Returns
    ///
    /// `true` if the URL was new, `false` if it had been seen before
    pub fn enqueue(&mut self, url: &Url) -> bool {
        let url = normalize_page_url(url);
        if !self.discovered.insert(url.as_str().to_string()) {
            return false;
        }
        self.queue.push_back(url);
        true
    }

    /// Takes the next unvisited URL and marks it visited
    pub fn next(&mut self) -> Option<Url> {
        while let Some(url) = self.queue.pop_front() {
            if self.visited.insert(url.as_str().to_string()) {
                return Some(url);
            }
            tracing::debug!("Skipping already visited {}", url);
        }
        None
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_fifo_order() {
        let mut frontier = Frontier::new(&url("https://example.com/"));
        assert!(frontier.enqueue(&url("https://example.com/a")));
        assert!(frontier.enqueue(&url("https://example.com/b")));

        assert_eq!(frontier.next().unwrap().as_str(), "https://example.com/");
        assert_eq!(frontier.next().unwrap().as_str(), "https://example.com/a");
        assert_eq!(frontier.next().unwrap().as_str(), "https://example.com/b");
        assert!(frontier.next().is_none());
    }

    #[test]
    fn test_enqueue_is_idempotent() {
        let mut frontier = Frontier::new(&url("https://example.com/"));
        assert!(!frontier.enqueue(&url("https://example.com/")));
        assert!(frontier.enqueue(&url("https://example.com/a")));
        assert!(!frontier.enqueue(&url("https://example.com/a#section")));
        assert_eq!(frontier.pending(), 2);

        frontier.next();
        frontier.next();
        // Already visited URLs are never re-queued
        assert!(!frontier.enqueue(&url("https://example.com/a")));
        assert_eq!(frontier.pending(), 0);
        assert_eq!(frontier.visited_count(), 2);
    }

    #[test]
    fn test_fragment_stripped() {
        let mut frontier = Frontier::new(&url("https://example.com/page#top"));
        assert_eq!(frontier.next().unwrap().as_str(), "https://example.com/page");
    }
}
