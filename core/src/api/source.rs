use crate::model::{Job, JobId, PredictionRequest};
use crate::prelude::{ApiResult, SubmissionError};
use async_trait::async_trait;

/// Read side of the job service, polled by the synchronization engine.
#[async_trait]
pub trait JobSource: Send + Sync {
    /// Every job, in the order the service returns them (newest first).
    async fn list_jobs(&self) -> ApiResult<Vec<Job>>;

    /// A single job including its execution logs.
    async fn job_detail(&self, id: &JobId) -> ApiResult<Job>;
}

/// Write side of the job service.
#[async_trait]
pub trait JobSubmitter: Send + Sync {
    async fn submit(&self, request: &PredictionRequest) -> Result<Job, SubmissionError>;
}

/// Fetches structure files as text for the viewer.
#[async_trait]
pub trait StructureSource: Send + Sync {
    async fn fetch_structure(&self, url: &str) -> ApiResult<String>;
}
