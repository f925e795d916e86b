pub mod controller;
pub mod renderer;

pub use controller::{StructureViewer, ViewerSettings};
pub use renderer::{
    Generation, LoadOutcome, Preset, StructureFormat, StructureRenderer, ViewerState,
};
