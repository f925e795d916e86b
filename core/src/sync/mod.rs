pub mod backoff;
pub mod engine;
pub mod snapshot;

pub use backoff::Backoff;
pub use engine::{JobSyncEngine, SyncSettings};
pub use snapshot::{JobSnapshot, PollOutcome};
