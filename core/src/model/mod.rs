pub mod entity;
pub mod job;
pub mod payload;

pub use entity::{Entity, LigandKind, Molecule};
pub use job::{Affinity, Job, JobId, JobStatus, Metrics};
pub use payload::{
    ChainSpec, LigandSource, LigandSpec, PredictionParameters, PredictionRequest, SequenceEntry,
};
