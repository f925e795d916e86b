use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Opaque server-assigned job identifier.
///
/// The service may emit ids as JSON integers; they are kept as text on the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl<'de> Deserialize<'de> for JobId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(u64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(text) => JobId(text),
            RawId::Number(number) => JobId(number.to_string()),
        })
    }
}

/// Server-side lifecycle state of a job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[serde(alias = "pending")]
    Queued,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn label(&self) -> &'static str {
        match self {
            JobStatus::Queued => "Queued",
            JobStatus::Running => "Running",
            JobStatus::Completed => "Completed",
            JobStatus::Failed => "Failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Binding-affinity estimate attached to ligand complexes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Affinity {
    pub affinity_pred_value: f64,
}

/// Confidence metrics reported for a completed job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Metrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complex_plddt: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iptm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affinity: Option<Affinity>,
}

impl Metrics {
    pub fn confidence_label(&self) -> String {
        percent_label(self.confidence_score)
    }

    pub fn plddt_label(&self) -> String {
        percent_label(self.complex_plddt)
    }

    pub fn iptm_label(&self) -> String {
        self.iptm
            .map(|iptm| format!("{iptm:.3}"))
            .unwrap_or_else(|| "N/A".to_string())
    }

    pub fn affinity_label(&self) -> Option<String> {
        self.affinity
            .map(|affinity| format!("{:.2}", affinity.affinity_pred_value))
    }
}

fn percent_label(fraction: Option<f64>) -> String {
    fraction
        .map(|fraction| format!("{:.1}%", fraction * 100.0))
        .unwrap_or_else(|| "N/A".to_string())
}

/// Client view of a server-tracked prediction job. Never mutated locally.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    pub id: JobId,
    pub name: String,
    pub status: JobStatus,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Metrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<String>,
}

impl Job {
    pub fn is_completed(&self) -> bool {
        self.status == JobStatus::Completed
    }

    /// Metrics are only meaningful once the job has completed.
    pub fn completed_metrics(&self) -> Option<&Metrics> {
        if self.is_completed() {
            self.metrics.as_ref()
        } else {
            None
        }
    }
}

/// Parses RFC 3339, falling back to naive ISO-8601 read as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    if let Ok(stamp) = DateTime::parse_from_rfc3339(raw) {
        return Ok(stamp.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn deserialize_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn job_accepts_integer_id_and_pending_status() {
        let job: Job = serde_json::from_str(
            r#"{"id": 42, "name": "T1", "status": "pending", "metrics": null,
                "created_at": "2026-02-11T10:45:54.123456"}"#,
        )
        .unwrap();
        assert_eq!(job.id.as_str(), "42");
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.created_at.hour(), 10);
        assert!(job.metrics.is_none());
        assert!(job.logs.is_none());
    }

    #[test]
    fn job_parses_completed_metrics() {
        let job: Job = serde_json::from_str(
            r#"{"id": "42", "name": "T1", "status": "completed",
                "created_at": "2026-02-11T10:45:54+00:00",
                "metrics": {"confidence_score": 0.91, "complex_plddt": 0.88,
                            "affinity": {"affinity_pred_value": -1.234}}}"#,
        )
        .unwrap();
        let metrics = job.completed_metrics().unwrap();
        assert_eq!(metrics.confidence_label(), "91.0%");
        assert_eq!(metrics.plddt_label(), "88.0%");
        assert_eq!(metrics.iptm_label(), "N/A");
        assert_eq!(metrics.affinity_label().as_deref(), Some("-1.23"));
    }

    #[test]
    fn affinity_only_metrics_keep_the_list_decodable() {
        let jobs: Vec<Job> = serde_json::from_str(
            r#"[{"id": 2, "name": "ok", "status": "completed",
                 "created_at": "2026-02-11T10:45:54",
                 "metrics": {"confidence_score": 0.91, "complex_plddt": 0.88}},
                {"id": 1, "name": "partial", "status": "completed",
                 "created_at": "2026-02-11T10:40:00",
                 "metrics": {"affinity": {"affinity_pred_value": -1.2}}}]"#,
        )
        .unwrap();
        assert_eq!(jobs.len(), 2);
        let partial = jobs[1].completed_metrics().unwrap();
        assert_eq!(partial.confidence_label(), "N/A");
        assert_eq!(partial.plddt_label(), "N/A");
        assert_eq!(partial.affinity_label().as_deref(), Some("-1.20"));
    }

    #[test]
    fn metrics_hidden_until_completed() {
        let job = Job {
            id: "7".into(),
            name: "running".into(),
            status: JobStatus::Running,
            created_at: Utc::now(),
            metrics: Some(Metrics {
                confidence_score: Some(0.5),
                complex_plddt: Some(0.5),
                iptm: Some(0.8123),
                affinity: None,
            }),
            logs: None,
        };
        assert!(job.completed_metrics().is_none());
        assert_eq!(job.metrics.unwrap().iptm_label(), "0.812");
    }

    #[test]
    fn timestamp_rejects_garbage() {
        assert!(parse_timestamp("yesterday").is_err());
        assert!(parse_timestamp("2026-02-11 08:00:00").is_ok());
    }
}
