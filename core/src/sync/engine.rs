use crate::api::JobSource;
use crate::config::ClientConfig;
use crate::model::{Job, JobId};
use crate::prelude::PollError;
use crate::sync::backoff::Backoff;
use crate::sync::snapshot::{JobSnapshot, PollOutcome};
use crate::telemetry::{LogManager, MetricsRecorder, MetricsSnapshot};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time;

/// Timing knobs for the polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    pub interval: Duration,
    pub request_timeout: Duration,
    pub max_backoff: Duration,
}

impl From<&ClientConfig> for SyncSettings {
    fn from(config: &ClientConfig) -> Self {
        Self {
            interval: config.poll_interval(),
            request_timeout: config.request_timeout(),
            max_backoff: config.max_backoff(),
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self::from(&ClientConfig::default())
    }
}

/// Owns the cached job list and keeps it in step with the service.
///
/// At most one list fetch is in flight at any time. A failed fetch leaves the
/// previous snapshot in place.
pub struct JobSyncEngine<S> {
    shared: Arc<Shared<S>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

struct Shared<S> {
    source: S,
    settings: SyncSettings,
    snapshot: watch::Sender<Arc<JobSnapshot>>,
    busy: AtomicBool,
    refresh: Notify,
    logger: LogManager,
    metrics: MetricsRecorder,
}

/// Holds the in-flight flag for the duration of one fetch, even if the fetch is aborted.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<S: JobSource + 'static> JobSyncEngine<S> {
    pub fn new(source: S, settings: SyncSettings) -> Self {
        let (snapshot, _) = watch::channel(Arc::new(JobSnapshot::default()));
        Self {
            shared: Arc::new(Shared {
                source,
                settings,
                snapshot,
                busy: AtomicBool::new(false),
                refresh: Notify::new(),
                logger: LogManager::new("sync"),
                metrics: MetricsRecorder::new(),
            }),
            task: Mutex::new(None),
        }
    }

    /// Spawns the polling loop on the current tokio runtime. The first fetch is immediate.
    ///
    /// Calling `start` on a running engine does nothing.
    pub fn start(&self) {
        let Ok(mut task) = self.task.lock() else {
            return;
        };
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }
        let shared = Arc::clone(&self.shared);
        *task = Some(tokio::spawn(shared.run()));
        self.shared.logger.record(&format!(
            "polling every {:?}",
            self.shared.settings.interval
        ));
    }

    /// Stops the polling loop. An in-flight fetch is dropped without touching the cache.
    pub fn stop(&self) {
        let handle = self.task.lock().ok().and_then(|mut task| task.take());
        if let Some(handle) = handle {
            handle.abort();
            self.shared.logger.record("polling stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .map(|task| task.as_ref().is_some_and(|handle| !handle.is_finished()))
            .unwrap_or(false)
    }

    /// Asks the loop for an out-of-cycle refresh after a job was submitted.
    pub fn notify_job_created(&self) {
        self.shared.logger.record("job created; refreshing early");
        self.shared.refresh.notify_one();
    }

    /// One refresh, subject to the same skip-if-busy guard as the loop.
    pub async fn poll_once(&self) -> Result<PollOutcome, PollError> {
        self.shared.poll_once().await
    }

    pub fn snapshot(&self) -> Arc<JobSnapshot> {
        Arc::clone(&self.shared.snapshot.borrow())
    }

    /// Looks the job up in the latest snapshot; callers should not hold jobs across polls.
    pub fn job_by_id(&self, id: &JobId) -> Option<Job> {
        self.shared.snapshot.borrow().job_by_id(id).cloned()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<JobSnapshot>> {
        self.shared.snapshot.subscribe()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    pub fn source(&self) -> &S {
        &self.shared.source
    }
}

impl<S> Drop for JobSyncEngine<S> {
    fn drop(&mut self) {
        if let Ok(mut task) = self.task.lock() {
            if let Some(handle) = task.take() {
                handle.abort();
            }
        }
    }
}

impl<S: JobSource> Shared<S> {
    async fn run(self: Arc<Self>) {
        let mut backoff = Backoff::new(self.settings.interval, self.settings.max_backoff);
        loop {
            match self.poll_once().await {
                Ok(PollOutcome::Refreshed { .. }) => backoff.reset(),
                Ok(PollOutcome::Skipped) => {}
                Err(_) => backoff.record_failure(),
            }

            let delay = backoff.delay();
            if backoff.failures() > 0 {
                self.logger.detail(&format!(
                    "{} consecutive failures; next poll in {:?}",
                    backoff.failures(),
                    delay
                ));
            }

            tokio::select! {
                _ = time::sleep(delay) => {}
                _ = self.refresh.notified() => {
                    self.logger.detail("forced refresh");
                }
            }
        }
    }

    async fn poll_once(&self) -> Result<PollOutcome, PollError> {
        let Some(_guard) = BusyGuard::acquire(&self.busy) else {
            self.metrics.record_poll_skipped();
            self.logger.detail("poll skipped: previous fetch still in flight");
            return Ok(PollOutcome::Skipped);
        };

        let timeout = self.settings.request_timeout;
        let result = match time::timeout(timeout, self.source.list_jobs()).await {
            Ok(Ok(jobs)) => Ok(jobs),
            Ok(Err(err)) => Err(PollError::Fetch(err)),
            Err(_) => Err(PollError::Timeout(timeout)),
        };

        let jobs = match result {
            Ok(jobs) => jobs,
            Err(err) => {
                self.metrics.record_poll_failed();
                self.logger
                    .warning(&format!("poll failed, keeping cached jobs: {err}"));
                return Err(err);
            }
        };

        let count = jobs.len();
        let mut revision = 0;
        self.snapshot.send_modify(|current| {
            revision = current.revision + 1;
            *current = Arc::new(JobSnapshot { jobs, revision });
        });
        self.metrics.record_poll_succeeded();
        self.logger
            .detail(&format!("revision {revision}: {count} jobs"));
        Ok(PollOutcome::Refreshed {
            revision,
            jobs: count,
        })
    }
}
