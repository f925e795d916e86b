use crate::api::StructureSource;
use crate::config::ClientConfig;
use crate::prelude::StructureLoadError;
use crate::telemetry::{LogManager, MetricsRecorder, MetricsSnapshot};
use crate::viewer::renderer::{
    Generation, LoadOutcome, Preset, StructureFormat, StructureRenderer, ViewerState,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::time;

/// Timing knobs for structure loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewerSettings {
    pub fetch_timeout: Duration,
}

impl From<&ClientConfig> for ViewerSettings {
    fn from(config: &ClientConfig) -> Self {
        Self {
            fetch_timeout: config.structure_timeout(),
        }
    }
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self::from(&ClientConfig::default())
    }
}

struct RendererSlot<R: StructureRenderer> {
    renderer: Option<R>,
}

impl<R: StructureRenderer> Drop for RendererSlot<R> {
    fn drop(&mut self) {
        if let Some(mut renderer) = self.renderer.take() {
            renderer.dispose();
        }
    }
}

/// Drives a [`StructureRenderer`] through clear, fetch, parse and preset.
///
/// Every call to [`load_structure`](Self::load_structure) takes a new generation.
/// Each step after the first re-checks it under the renderer lock, so a request
/// that has been superseded returns without touching the renderer. There is no
/// network cancellation; stale fetches complete and are discarded.
pub struct StructureViewer<R: StructureRenderer, F> {
    fetcher: F,
    settings: ViewerSettings,
    generation: AtomicU64,
    slot: Mutex<RendererSlot<R>>,
    state: watch::Sender<ViewerState>,
    logger: LogManager,
    metrics: MetricsRecorder,
}

impl<R, F> StructureViewer<R, F>
where
    R: StructureRenderer,
    F: StructureSource,
{
    pub fn new(renderer: R, fetcher: F, settings: ViewerSettings) -> Self {
        let (state, _) = watch::channel(ViewerState::Idle);
        Self {
            fetcher,
            settings,
            generation: AtomicU64::new(0),
            slot: Mutex::new(RendererSlot {
                renderer: Some(renderer),
            }),
            state,
            logger: LogManager::new("viewer"),
            metrics: MetricsRecorder::new(),
        }
    }

    pub fn state(&self) -> ViewerState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewerState> {
        self.state.subscribe()
    }

    pub fn current_generation(&self) -> Generation {
        Generation(self.generation.load(Ordering::Acquire))
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Loads the mmCIF file at `url`, superseding any load still in flight.
    pub async fn load_structure(&self, url: &str) -> Result<LoadOutcome, StructureLoadError> {
        let generation = self.advance();
        self.logger
            .detail(&format!("load {generation} requested for {url}"));

        {
            let mut slot = self.slot.lock().await;
            if !self.is_current(generation) {
                return Ok(self.discard(generation));
            }
            let renderer = slot
                .renderer
                .as_mut()
                .ok_or(StructureLoadError::Disposed)?;
            self.state.send_replace(ViewerState::Loading(generation));
            if let Err(err) = renderer.clear().await {
                return self.settle_failure(generation, StructureLoadError::Render(err));
            }
        }

        let fetched = time::timeout(self.settings.fetch_timeout, self.fetcher.fetch_structure(url))
            .await
            .map_err(|_| StructureLoadError::Timeout(self.settings.fetch_timeout))
            .and_then(|result| result.map_err(StructureLoadError::Fetch));
        let data = match fetched {
            Ok(data) => data,
            Err(err) => {
                let _slot = self.slot.lock().await;
                return self.settle_failure(generation, err);
            }
        };

        let trajectory = {
            let mut slot = self.slot.lock().await;
            if !self.is_current(generation) {
                return Ok(self.discard(generation));
            }
            let renderer = slot
                .renderer
                .as_mut()
                .ok_or(StructureLoadError::Disposed)?;
            match renderer.parse_trajectory(&data, StructureFormat::MmCif).await {
                Ok(trajectory) => trajectory,
                Err(err) => {
                    return self.settle_failure(generation, StructureLoadError::Parse(err));
                }
            }
        };

        let mut slot = self.slot.lock().await;
        if !self.is_current(generation) {
            return Ok(self.discard(generation));
        }
        let renderer = slot
            .renderer
            .as_mut()
            .ok_or(StructureLoadError::Disposed)?;
        if let Err(err) = renderer.apply_preset(trajectory, Preset::Default).await {
            return self.settle_failure(generation, StructureLoadError::Render(err));
        }
        self.state.send_replace(ViewerState::Displayed(generation));
        self.metrics.record_load_displayed();
        self.logger
            .detail(&format!("load {generation} displayed"));
        Ok(LoadOutcome::Displayed(generation))
    }

    /// Empties the renderer and invalidates any in-flight load. No-op once disposed.
    pub async fn clear(&self) -> Result<(), StructureLoadError> {
        let generation = self.advance();
        let mut slot = self.slot.lock().await;
        let Some(renderer) = slot.renderer.as_mut() else {
            return Ok(());
        };
        renderer.clear().await.map_err(StructureLoadError::Render)?;
        if self.is_current(generation) {
            self.state.send_replace(ViewerState::Idle);
        }
        Ok(())
    }

    /// Releases the renderer. Safe to call any number of times.
    pub async fn dispose(&self) {
        self.advance();
        let mut slot = self.slot.lock().await;
        if let Some(mut renderer) = slot.renderer.take() {
            renderer.dispose();
            self.logger.record("renderer disposed");
        }
        self.state.send_replace(ViewerState::Disposed);
    }

    pub async fn is_disposed(&self) -> bool {
        self.slot.lock().await.renderer.is_none()
    }

    fn advance(&self) -> Generation {
        Generation(self.generation.fetch_add(1, Ordering::AcqRel) + 1)
    }

    fn is_current(&self, generation: Generation) -> bool {
        self.current_generation() == generation
    }

    fn discard(&self, generation: Generation) -> LoadOutcome {
        self.metrics.record_load_superseded();
        self.logger
            .detail(&format!("load {generation} superseded; discarding"));
        LoadOutcome::Superseded(generation)
    }

    /// Caller must hold the renderer lock so the state write cannot race a newer load.
    fn settle_failure(
        &self,
        generation: Generation,
        err: StructureLoadError,
    ) -> Result<LoadOutcome, StructureLoadError> {
        if !self.is_current(generation) {
            return Ok(self.discard(generation));
        }
        self.state
            .send_replace(ViewerState::LoadFailed(generation, err.to_string()));
        self.metrics.record_load_failed();
        self.logger
            .warning(&format!("load {generation} failed: {err}"));
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::{ApiError, ApiResult, RenderError, RenderResult};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Mutex as StdMutex};

    #[derive(Clone, Default)]
    struct RendererProbe {
        ops: Arc<StdMutex<Vec<String>>>,
        displayed: Arc<StdMutex<Option<String>>>,
        disposals: Arc<AtomicUsize>,
    }

    impl RendererProbe {
        fn ops(&self) -> Vec<String> {
            self.ops.lock().unwrap().clone()
        }

        fn displayed(&self) -> Option<String> {
            self.displayed.lock().unwrap().clone()
        }

        fn disposals(&self) -> usize {
            self.disposals.load(Ordering::SeqCst)
        }
    }

    struct MockRenderer {
        probe: RendererProbe,
        parse_delay: Duration,
    }

    #[async_trait]
    impl StructureRenderer for MockRenderer {
        type Trajectory = String;

        async fn clear(&mut self) -> RenderResult<()> {
            self.probe.ops.lock().unwrap().push("clear".into());
            *self.probe.displayed.lock().unwrap() = None;
            Ok(())
        }

        async fn parse_trajectory(
            &mut self,
            data: &str,
            _format: StructureFormat,
        ) -> RenderResult<String> {
            if !self.parse_delay.is_zero() {
                time::sleep(self.parse_delay).await;
            }
            if data.starts_with("garbage") {
                return Err(RenderError("no data block".into()));
            }
            self.probe.ops.lock().unwrap().push(format!("parse:{data}"));
            Ok(data.to_string())
        }

        async fn apply_preset(&mut self, trajectory: String, _preset: Preset) -> RenderResult<()> {
            self.probe
                .ops
                .lock()
                .unwrap()
                .push(format!("preset:{trajectory}"));
            *self.probe.displayed.lock().unwrap() = Some(trajectory);
            Ok(())
        }

        fn dispose(&mut self) {
            self.probe.disposals.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct MockFiles {
        files: HashMap<String, (Duration, ApiResult<String>)>,
    }

    impl MockFiles {
        fn with(mut self, url: &str, delay_ms: u64, body: ApiResult<&str>) -> Self {
            self.files.insert(
                url.to_string(),
                (Duration::from_millis(delay_ms), body.map(str::to_string)),
            );
            self
        }
    }

    #[async_trait]
    impl StructureSource for MockFiles {
        async fn fetch_structure(&self, url: &str) -> ApiResult<String> {
            let Some((delay, body)) = self.files.get(url) else {
                return Err(ApiError::Status {
                    status: 404,
                    body: "File not found".into(),
                });
            };
            time::sleep(*delay).await;
            body.clone()
        }
    }

    fn viewer_with(
        files: MockFiles,
        parse_delay: Duration,
    ) -> (StructureViewer<MockRenderer, MockFiles>, RendererProbe) {
        let probe = RendererProbe::default();
        let renderer = MockRenderer {
            probe: probe.clone(),
            parse_delay,
        };
        let settings = ViewerSettings {
            fetch_timeout: Duration::from_secs(30),
        };
        (StructureViewer::new(renderer, files, settings), probe)
    }

    #[tokio::test(start_paused = true)]
    async fn load_runs_clear_parse_preset_in_order() {
        let files = MockFiles::default().with("/a", 100, Ok("A"));
        let (viewer, probe) = viewer_with(files, Duration::ZERO);

        let outcome = viewer.load_structure("/a").await.unwrap();
        assert_eq!(outcome, LoadOutcome::Displayed(Generation(1)));
        assert_eq!(probe.ops(), vec!["clear", "parse:A", "preset:A"]);
        assert_eq!(viewer.state(), ViewerState::Displayed(Generation(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn reloading_same_url_takes_new_generation() {
        let files = MockFiles::default().with("/a", 0, Ok("A"));
        let (viewer, _probe) = viewer_with(files, Duration::ZERO);
        viewer.load_structure("/a").await.unwrap();
        let outcome = viewer.load_structure("/a").await.unwrap();
        assert_eq!(outcome, LoadOutcome::Displayed(Generation(2)));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_first_fetch_never_overwrites_second() {
        let files = MockFiles::default()
            .with("/jobs/1", 3_000, Ok("job-1"))
            .with("/jobs/2", 1_000, Ok("job-2"));
        let (viewer, probe) = viewer_with(files, Duration::ZERO);

        let (first, second) = tokio::join!(viewer.load_structure("/jobs/1"), async {
            time::sleep(Duration::from_millis(10)).await;
            viewer.load_structure("/jobs/2").await
        });

        assert_eq!(first.unwrap(), LoadOutcome::Superseded(Generation(1)));
        assert_eq!(second.unwrap(), LoadOutcome::Displayed(Generation(2)));
        assert_eq!(probe.displayed().as_deref(), Some("job-2"));
        assert!(!probe.ops().iter().any(|op| op.ends_with("job-1")));
        assert_eq!(viewer.state(), ViewerState::Displayed(Generation(2)));
        assert_eq!(viewer.metrics().loads_superseded, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_preset_is_skipped_when_newer_load_waits_on_parse() {
        let files = MockFiles::default()
            .with("/jobs/1", 100, Ok("job-1"))
            .with("/jobs/2", 100, Ok("job-2"));
        let (viewer, probe) = viewer_with(files, Duration::from_secs(2));

        // the second request arrives while the first is parsing
        let (first, second) = tokio::join!(viewer.load_structure("/jobs/1"), async {
            time::sleep(Duration::from_millis(500)).await;
            viewer.load_structure("/jobs/2").await
        });

        assert_eq!(first.unwrap(), LoadOutcome::Superseded(Generation(1)));
        assert_eq!(second.unwrap(), LoadOutcome::Displayed(Generation(2)));
        assert!(!probe.ops().contains(&"preset:job-1".to_string()));
        assert_eq!(probe.displayed().as_deref(), Some("job-2"));
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_failure_is_recoverable() {
        let files = MockFiles::default().with("/ok", 0, Ok("OK"));
        let (viewer, probe) = viewer_with(files, Duration::ZERO);

        let err = viewer.load_structure("/missing").await.unwrap_err();
        assert!(matches!(
            err,
            StructureLoadError::Fetch(ApiError::Status { status: 404, .. })
        ));
        assert!(matches!(
            viewer.state(),
            ViewerState::LoadFailed(Generation(1), _)
        ));

        viewer.load_structure("/ok").await.unwrap();
        assert_eq!(probe.displayed().as_deref(), Some("OK"));
        assert_eq!(viewer.metrics().loads_failed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_fetch_times_out() {
        let files = MockFiles::default().with("/slow", 45_000, Ok("late"));
        let (viewer, _probe) = viewer_with(files, Duration::ZERO);
        let err = viewer.load_structure("/slow").await.unwrap_err();
        assert_eq!(err, StructureLoadError::Timeout(Duration::from_secs(30)));
    }

    #[tokio::test(start_paused = true)]
    async fn parse_failure_reports_parse_error() {
        let files = MockFiles::default().with("/bad", 0, Ok("garbage"));
        let (viewer, probe) = viewer_with(files, Duration::ZERO);
        let err = viewer.load_structure("/bad").await.unwrap_err();
        assert!(matches!(err, StructureLoadError::Parse(_)));
        assert_eq!(probe.displayed(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_failure_is_discarded() {
        let files = MockFiles::default()
            .with("/broken", 2_000, Err(ApiError::Transport("reset".into())))
            .with("/good", 100, Ok("good"));
        let (viewer, _probe) = viewer_with(files, Duration::ZERO);

        let (first, second) = tokio::join!(viewer.load_structure("/broken"), async {
            time::sleep(Duration::from_millis(10)).await;
            viewer.load_structure("/good").await
        });
        assert_eq!(first.unwrap(), LoadOutcome::Superseded(Generation(1)));
        assert_eq!(second.unwrap(), LoadOutcome::Displayed(Generation(2)));
        assert_eq!(viewer.state(), ViewerState::Displayed(Generation(2)));
    }

    #[tokio::test(start_paused = true)]
    async fn clear_invalidates_in_flight_load() {
        let files = MockFiles::default().with("/a", 1_000, Ok("A"));
        let (viewer, probe) = viewer_with(files, Duration::ZERO);

        let (load, cleared) = tokio::join!(viewer.load_structure("/a"), async {
            time::sleep(Duration::from_millis(10)).await;
            viewer.clear().await
        });
        cleared.unwrap();
        assert_eq!(load.unwrap(), LoadOutcome::Superseded(Generation(1)));
        assert_eq!(probe.displayed(), None);
        assert_eq!(viewer.state(), ViewerState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn dispose_is_idempotent_and_blocks_later_loads() {
        let files = MockFiles::default().with("/a", 0, Ok("A"));
        let (viewer, probe) = viewer_with(files, Duration::ZERO);

        viewer.dispose().await;
        viewer.dispose().await;
        assert_eq!(probe.disposals(), 1);
        assert!(viewer.is_disposed().await);
        assert_eq!(
            viewer.load_structure("/a").await,
            Err(StructureLoadError::Disposed)
        );
        viewer.clear().await.unwrap();
        assert_eq!(viewer.state(), ViewerState::Disposed);
    }

    #[tokio::test(start_paused = true)]
    async fn dispose_during_load_discards_it() {
        let files = MockFiles::default().with("/a", 1_000, Ok("A"));
        let (viewer, probe) = viewer_with(files, Duration::ZERO);

        let (load, ()) = tokio::join!(viewer.load_structure("/a"), async {
            time::sleep(Duration::from_millis(10)).await;
            viewer.dispose().await
        });
        assert_eq!(load.unwrap(), LoadOutcome::Superseded(Generation(1)));
        assert_eq!(probe.disposals(), 1);
        assert!(!probe.ops().contains(&"parse:A".to_string()));
    }

    #[tokio::test]
    async fn dropping_viewer_disposes_renderer_once() {
        let (viewer, probe) = viewer_with(MockFiles::default(), Duration::ZERO);
        drop(viewer);
        assert_eq!(probe.disposals(), 1);

        let (viewer, probe) = viewer_with(MockFiles::default(), Duration::ZERO);
        viewer.dispose().await;
        drop(viewer);
        assert_eq!(probe.disposals(), 1);
    }
}
