//! Job module: the data a crawl job carries through its lifecycle
//!
//! # Components
//!
//! - `JobStatus`: the `queued → running → completed | failed` state machine
//! - `Job` / `LogEntry`: the record owned by the job store
//! - `JobSnapshot`: the read-only view handed to status surfaces
//! - `CrawlRequest`: validated input, with optional auth and proxy descriptors

mod record;
mod request;
mod status;

pub use record::{Job, JobId, JobSnapshot, LogEntry};
pub use request::{AuthDescriptor, CrawlRequest, ProxyDescriptor};
pub use status::JobStatus;
