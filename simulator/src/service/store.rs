use boltzcore::model::{Job, JobId, JobStatus, Metrics, PredictionRequest};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Server-side record of one submitted prediction.
#[derive(Debug, Clone)]
pub struct StoredJob {
    pub id: u64,
    pub request: PredictionRequest,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub metrics: Option<Metrics>,
    pub logs: Vec<String>,
    pub files: BTreeMap<String, String>,
    /// Ticks spent in the current status.
    pub ticks: u32,
}

impl StoredJob {
    pub fn log(&mut self, line: impl Into<String>) {
        self.logs.push(line.into());
    }

    fn to_job(&self, with_logs: bool) -> Job {
        Job {
            id: JobId::new(self.id.to_string()),
            name: self.request.name.clone(),
            status: self.status,
            created_at: self.created_at,
            metrics: self.metrics.clone(),
            logs: (with_logs && !self.logs.is_empty()).then(|| self.logs.join("\n")),
        }
    }
}

/// In-memory job table with sequential ids.
#[derive(Debug, Default)]
pub struct JobStore {
    jobs: BTreeMap<u64, StoredJob>,
    next_id: u64,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, request: PredictionRequest, now: DateTime<Utc>) -> Job {
        self.next_id += 1;
        let id = self.next_id;
        let mut stored = StoredJob {
            id,
            request,
            status: JobStatus::Queued,
            created_at: now,
            metrics: None,
            logs: Vec::new(),
            files: BTreeMap::new(),
            ticks: 0,
        };
        stored.log(format!(
            "queued '{}' with {} entities",
            stored.request.name,
            stored.request.sequences.len()
        ));
        let job = stored.to_job(true);
        self.jobs.insert(id, stored);
        job
    }

    /// All jobs, newest first, without logs.
    pub fn list(&self) -> Vec<Job> {
        self.jobs
            .values()
            .rev()
            .map(|stored| stored.to_job(false))
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<Job> {
        self.lookup(id).map(|stored| stored.to_job(true))
    }

    pub fn files(&self, id: &str) -> Option<Vec<String>> {
        self.lookup(id)
            .map(|stored| stored.files.keys().cloned().collect())
    }

    pub fn file(&self, id: &str, name: &str) -> Option<&str> {
        self.lookup(id)
            .and_then(|stored| stored.files.get(name))
            .map(String::as_str)
    }

    pub fn jobs_mut(&mut self) -> impl Iterator<Item = &mut StoredJob> {
        self.jobs.values_mut()
    }

    fn lookup(&self, id: &str) -> Option<&StoredJob> {
        id.parse::<u64>().ok().and_then(|id| self.jobs.get(&id))
    }
}
