use crate::api::endpoints::Endpoints;
use crate::api::source::{JobSource, JobSubmitter, StructureSource};
use crate::model::{Job, JobId, PredictionRequest};
use crate::prelude::{ApiError, ApiResult, SubmissionError};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// reqwest-backed client for the job service.
#[derive(Debug, Clone)]
pub struct HttpJobApi {
    client: reqwest::Client,
    endpoints: Endpoints,
}

impl HttpJobApi {
    pub fn new(endpoints: Endpoints) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoints,
        }
    }

    /// Client whose every request is bounded by `timeout` at the transport level.
    pub fn with_timeout(endpoints: Endpoints, timeout: Duration) -> ApiResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoints })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Names of the result files the service holds for a job.
    pub async fn list_files(&self, id: &JobId) -> ApiResult<Vec<String>> {
        self.get_json(&self.endpoints.files(id)).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> ApiResult<T> {
        let response = self.client.get(url).send().await?;
        let response = ensure_success(response).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

async fn ensure_success(response: reqwest::Response) -> ApiResult<reqwest::Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Status { status, body })
    }
}

#[async_trait]
impl JobSource for HttpJobApi {
    async fn list_jobs(&self) -> ApiResult<Vec<Job>> {
        self.get_json(&self.endpoints.jobs()).await
    }

    async fn job_detail(&self, id: &JobId) -> ApiResult<Job> {
        self.get_json(&self.endpoints.job(id)).await
    }
}

#[async_trait]
impl JobSubmitter for HttpJobApi {
    async fn submit(&self, request: &PredictionRequest) -> Result<Job, SubmissionError> {
        let response = self
            .client
            .post(self.endpoints.jobs())
            .json(request)
            .send()
            .await
            .map_err(ApiError::from)?;
        let response = ensure_success(response).await?;
        let job = response
            .json::<Job>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(job)
    }
}

#[async_trait]
impl StructureSource for HttpJobApi {
    async fn fetch_structure(&self, url: &str) -> ApiResult<String> {
        let response = self.client.get(url).send().await?;
        let response = ensure_success(response).await?;
        Ok(response.text().await?)
    }
}
