use crate::generator::structure::{synthesize, GeneratorConfig};
use crate::service::store::{JobStore, StoredJob};
use crate::workflow::config::SimulatorConfig;
use boltzcore::api::{DOWNLOAD_FILE, STRUCTURE_FILE};
use boltzcore::model::{JobStatus, SequenceEntry};
use log::{info, warn};

/// Walks stored jobs through queued, running and a terminal state one tick at a time.
#[derive(Clone, Debug)]
pub struct Runner {
    queue_ticks: u32,
    run_ticks: u32,
    fail_marker: String,
    generator: GeneratorConfig,
}

impl Runner {
    pub fn new(config: &SimulatorConfig) -> Self {
        Self {
            queue_ticks: config.queue_ticks,
            run_ticks: config.run_ticks,
            fail_marker: config.fail_marker.clone(),
            generator: config.generator.clone(),
        }
    }

    /// Advances every non-terminal job and returns how many changed status.
    pub fn tick(&self, store: &mut JobStore) -> usize {
        let mut transitions = 0;
        for job in store.jobs_mut() {
            if job.status.is_terminal() {
                continue;
            }
            job.ticks += 1;
            let current = job.status;
            let next = match current {
                JobStatus::Queued if job.ticks >= self.queue_ticks => Some(JobStatus::Running),
                JobStatus::Running if job.ticks >= self.run_ticks => Some(self.finish(job)),
                _ => None,
            };
            if let Some(status) = next {
                info!("job {} {} -> {}", job.id, job.status.label(), status.label());
                if status == JobStatus::Running {
                    job.log("running structure prediction");
                }
                job.status = status;
                job.ticks = 0;
                transitions += 1;
            }
        }
        transitions
    }

    fn finish(&self, job: &mut StoredJob) -> JobStatus {
        if self.should_fail(job) {
            warn!("job {} hit failure marker", job.id);
            job.log(format!(
                "error: prediction aborted, input contains '{}'",
                self.fail_marker
            ));
            return JobStatus::Failed;
        }

        let prediction = synthesize(job.id, &job.request, &self.generator);
        job.files
            .insert(STRUCTURE_FILE.into(), prediction.structure.clone());
        job.files.insert(DOWNLOAD_FILE.into(), prediction.structure);
        job.files.insert(
            format!("confidence_{}_model_0.json", job.id),
            prediction.confidence_json,
        );
        job.log(format!(
            "prediction finished, confidence {}",
            prediction.metrics.confidence_label()
        ));
        job.metrics = Some(prediction.metrics);
        JobStatus::Completed
    }

    fn should_fail(&self, job: &StoredJob) -> bool {
        !self.fail_marker.is_empty()
            && job.request.sequences.iter().any(|entry| match entry {
                SequenceEntry::Ligand(_) => false,
                other => other.value().contains(&self.fail_marker),
            })
    }
}
