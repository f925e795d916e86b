use std::time::Duration;

/// Malformed or incomplete entity data caught before anything is sent.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("prediction name must not be empty")]
    EmptyName,
    #[error("at least one entity is required")]
    NoEntities,
    #[error("entity {index}: missing {field}")]
    MissingField { index: usize, field: &'static str },
    #[error("entity {index}: local id {id:?} must be alphanumeric")]
    InvalidId { index: usize, id: String },
    #[error("entity {index}: local id {id:?} is already used by entity {first}")]
    DuplicateId {
        index: usize,
        first: usize,
        id: String,
    },
    #[error("parameter {name}: {reason}")]
    InvalidParameter {
        name: &'static str,
        reason: &'static str,
    },
}

/// Transport-level failure talking to the job service.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            ApiError::Status {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

/// The service refused or never acknowledged a new job.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("job submission failed: {0}")]
pub struct SubmissionError(#[from] pub ApiError);

/// A job-list refresh failed; the cached snapshot is kept.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PollError {
    #[error("job list fetch failed: {0}")]
    Fetch(#[from] ApiError),
    #[error("job list fetch timed out after {0:?}")]
    Timeout(Duration),
}

/// Failure reported by the embedded structure renderer.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct RenderError(pub String);

/// A selected job's structure could not be shown.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StructureLoadError {
    #[error("structure fetch failed: {0}")]
    Fetch(#[from] ApiError),
    #[error("structure fetch timed out after {0:?}")]
    Timeout(Duration),
    #[error("structure parse failed: {0}")]
    Parse(RenderError),
    #[error("renderer failed: {0}")]
    Render(RenderError),
    #[error("viewer has been disposed")]
    Disposed,
}

pub type ApiResult<T> = Result<T, ApiError>;
pub type RenderResult<T> = Result<T, RenderError>;
