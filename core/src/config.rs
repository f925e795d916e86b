use crate::api::Endpoints;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Client-side settings for talking to the job service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfig {
    pub api_base: String,
    pub poll_interval_ms: u64,
    pub request_timeout_ms: u64,
    pub structure_timeout_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:8000/api".into(),
            poll_interval_ms: 5_000,
            request_timeout_ms: 10_000,
            structure_timeout_ms: 30_000,
            max_backoff_ms: 60_000,
        }
    }
}

impl ClientConfig {
    pub fn endpoints(&self) -> Endpoints {
        Endpoints::new(self.api_base.clone())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.max(1))
    }

    pub fn structure_timeout(&self) -> Duration {
        Duration::from_millis(self.structure_timeout_ms.max(1))
    }

    /// Never shorter than the poll interval.
    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms).max(self.poll_interval())
    }
}
