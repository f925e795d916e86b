use crate::api::{Endpoints, StructureSource};
use crate::model::{Job, JobId};
use crate::prelude::StructureLoadError;
use crate::sync::JobSnapshot;
use crate::viewer::{LoadOutcome, StructureRenderer, StructureViewer};

/// What the viewer should do after the selection changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerCommand {
    Load(String),
    Clear,
}

impl ViewerCommand {
    pub async fn run<R, F>(
        self,
        viewer: &StructureViewer<R, F>,
    ) -> Result<Option<LoadOutcome>, StructureLoadError>
    where
        R: StructureRenderer,
        F: StructureSource,
    {
        match self {
            ViewerCommand::Load(url) => viewer.load_structure(&url).await.map(Some),
            ViewerCommand::Clear => viewer.clear().await.map(|_| None),
        }
    }
}

/// The single job currently selected in the dashboard, held by id only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    selected_job_id: Option<JobId>,
}

impl SelectionState {
    pub fn selected_job_id(&self) -> Option<&JobId> {
        self.selected_job_id.as_ref()
    }

    /// Selects `job`, or clears the selection with `None`.
    ///
    /// Only completed jobs have a structure to load.
    pub fn select(&mut self, job: Option<&Job>, endpoints: &Endpoints) -> ViewerCommand {
        self.selected_job_id = job.map(|job| job.id.clone());
        match job {
            Some(job) if job.is_completed() => ViewerCommand::Load(endpoints.structure_url(&job.id)),
            _ => ViewerCommand::Clear,
        }
    }

    /// The selected job as it appears in `snapshot`.
    pub fn resolve<'a>(&self, snapshot: &'a JobSnapshot) -> Option<&'a Job> {
        self.selected_job_id
            .as_ref()
            .and_then(|id| snapshot.job_by_id(id))
    }

    /// Drops a selection whose job vanished from a freshly loaded snapshot.
    pub fn reconcile(&mut self, snapshot: &JobSnapshot) -> Option<ViewerCommand> {
        if !snapshot.is_loaded() || self.selected_job_id.is_none() {
            return None;
        }
        if self.resolve(snapshot).is_some() {
            return None;
        }
        self.selected_job_id = None;
        Some(ViewerCommand::Clear)
    }
}
