//! Client core for the Boltz structure-prediction dashboard.
//!
//! The modules cover building prediction requests, keeping a polled view of
//! the remote job list, and driving an embedded structure renderer so that
//! only the most recently requested structure is ever displayed.

pub mod api;
pub mod builder;
pub mod config;
pub mod model;
pub mod prelude;
pub mod selection;
pub mod sync;
pub mod telemetry;
pub mod viewer;

pub use api::{Endpoints, HttpJobApi, JobSource, JobSubmitter, StructureSource};
pub use builder::{build, next_local_id};
pub use config::ClientConfig;
pub use prelude::{
    ApiError, PollError, RenderError, StructureLoadError, SubmissionError, ValidationError,
};
pub use selection::{SelectionState, ViewerCommand};
pub use sync::{JobSnapshot, JobSyncEngine, PollOutcome, SyncSettings};
pub use viewer::{LoadOutcome, StructureRenderer, StructureViewer, ViewerSettings, ViewerState};
