//! Job records, log entries and the read-only snapshots handed to observers

use crate::job::JobStatus;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque unique job identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// Generates a fresh random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// A timestamped job log message
///
/// Log entries are append-only; insertion order is significant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

impl LogEntry {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            message: message.into(),
        }
    }
}

/// One end-to-end crawl request and its accumulated state
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub seed_url: String,
    pub status: JobStatus,
    /// Percentage in 0..=100, non-decreasing while running
    pub progress: u8,
    pub logs: Vec<LogEntry>,
    pub output_dir: PathBuf,
    pub archive_path: Option<PathBuf>,
    pub created_at: DateTime<Utc>,
    pub error: Option<String>,
    pub cancel_requested: bool,
}

impl Job {
    /// Creates a job in the `queued` state
    pub fn new(id: JobId, seed_url: impl Into<String>, output_dir: PathBuf) -> Self {
        Self {
            id,
            seed_url: seed_url.into(),
            status: JobStatus::Queued,
            progress: 0,
            logs: Vec::new(),
            output_dir,
            archive_path: None,
            created_at: Utc::now(),
            error: None,
            cancel_requested: false,
        }
    }

    /// Produces a detached copy for observers
    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            id: self.id,
            seed_url: self.seed_url.clone(),
            status: self.status,
            progress: self.progress,
            logs: self.logs.clone(),
            output_dir: self.output_dir.clone(),
            archive_available: self.archive_path.is_some(),
            archive_path: self.archive_path.clone(),
            created_at: self.created_at,
            error: self.error.clone(),
        }
    }
}

/// Point-in-time view of a job as seen by a status surface
#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    pub id: JobId,
    pub seed_url: String,
    pub status: JobStatus,
    pub progress: u8,
    pub logs: Vec<LogEntry>,
    pub output_dir: PathBuf,
    pub archive_available: bool,
    pub archive_path: Option<PathBuf>,
    pub created_at: DateTime<Utc>,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_job_is_queued() {
        let job = Job::new(JobId::new(), "https://example.com/", PathBuf::from("/tmp/x"));
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.progress, 0);
        assert!(job.logs.is_empty());
        assert!(job.archive_path.is_none());
        assert!(job.error.is_none());
    }

    #[test]
    fn test_job_id_parse() {
        let id = JobId::new();
        let parsed: JobId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-a-uuid".parse::<JobId>().is_err());
    }

    #[test]
    fn test_job_ids_are_unique() {
        assert_ne!(JobId::new(), JobId::new());
    }

    #[test]
    fn test_snapshot_archive_flag() {
        let mut job = Job::new(JobId::new(), "https://example.com/", PathBuf::from("/tmp/x"));
        assert!(!job.snapshot().archive_available);

        job.archive_path = Some(PathBuf::from("/tmp/x.zip"));
        let snapshot = job.snapshot();
        assert!(snapshot.archive_available);
        assert_eq!(snapshot.archive_path, Some(PathBuf::from("/tmp/x.zip")));
    }

    #[test]
    fn test_snapshot_serializes() {
        let mut job = Job::new(JobId::new(), "https://example.com/", PathBuf::from("/tmp/x"));
        job.logs.push(LogEntry::new("Starting"));

        let value = serde_json::to_value(job.snapshot()).unwrap();
        assert_eq!(value["status"], "queued");
        assert_eq!(value["progress"], 0);
        assert_eq!(value["logs"][0]["message"], "Starting");
        assert_eq!(value["id"], job.id.to_string());
    }
}
