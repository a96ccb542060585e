//! Job store module
//!
//! The process-wide registry of crawl jobs, injected into the engine and
//! status surfaces as an `Arc<dyn JobStore>`:
//! - Job creation, lookup, listing and deletion
//! - Status transitions guarded by the job state machine
//! - Progress, log and cancellation updates from running jobs

mod memory;
mod traits;

pub use memory::MemoryJobStore;
pub use traits::{JobStore, StoreError, StoreResult};
