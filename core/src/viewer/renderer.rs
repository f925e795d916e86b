use crate::prelude::RenderResult;
use async_trait::async_trait;
use std::fmt;

/// Monotonic load-request counter; only the latest generation may touch the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(pub u64);

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Structure file formats handed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructureFormat {
    MmCif,
}

/// Display presets understood by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Preset {
    #[default]
    Default,
}

/// Embedded 3D structure renderer driven exclusively by the viewer controller.
#[async_trait]
pub trait StructureRenderer: Send {
    /// Parsed structure prior to any display preset.
    type Trajectory: Send;

    async fn clear(&mut self) -> RenderResult<()>;

    async fn parse_trajectory(
        &mut self,
        data: &str,
        format: StructureFormat,
    ) -> RenderResult<Self::Trajectory>;

    async fn apply_preset(
        &mut self,
        trajectory: Self::Trajectory,
        preset: Preset,
    ) -> RenderResult<()>;

    /// Releases the renderer. Called exactly once by the controller.
    fn dispose(&mut self);
}

/// Observable controller state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ViewerState {
    #[default]
    Idle,
    Loading(Generation),
    Displayed(Generation),
    LoadFailed(Generation, String),
    Disposed,
}

impl ViewerState {
    pub fn generation(&self) -> Option<Generation> {
        match self {
            ViewerState::Loading(generation)
            | ViewerState::Displayed(generation)
            | ViewerState::LoadFailed(generation, _) => Some(*generation),
            ViewerState::Idle | ViewerState::Disposed => None,
        }
    }
}

/// How a load request ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Displayed(Generation),
    /// A newer request (or clear/dispose) arrived; this one left the renderer alone.
    Superseded(Generation),
}
