use crate::model::{Job, JobId};

/// Latest job list as last returned by the service.
///
/// Replaced wholesale on every successful poll; revision 0 means nothing has
/// been fetched yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobSnapshot {
    pub jobs: Vec<Job>,
    pub revision: u64,
}

impl JobSnapshot {
    pub fn is_loaded(&self) -> bool {
        self.revision > 0
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn job_by_id(&self, id: &JobId) -> Option<&Job> {
        self.jobs.iter().find(|job| &job.id == id)
    }
}

/// Result of a single refresh attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Refreshed { revision: u64, jobs: usize },
    /// Another fetch was still in flight; nothing was requested.
    Skipped,
}
