use anyhow::Context;
use boltzcore::api::pick_structure_file;
use boltzcore::model::{Job, JobId, Metrics, PredictionRequest};
use boltzcore::{
    ClientConfig, Endpoints, HttpJobApi, JobSnapshot, JobSource, JobSubmitter, JobSyncEngine,
    LoadOutcome, SelectionState, StructureViewer, SyncSettings, ViewerCommand, ViewerSettings,
    ViewerState,
};
use boltzcore::viewer::Generation;
use clap::Parser;
use form::{EntityKind, FormEdit, SubmissionForm};
use iced::{
    time,
    widget::{
        button, canvas::Canvas, column, pick_list, row, scrollable, text, text_input, Column,
        Container,
    },
    Alignment, Element, Length, Subscription, Task, Theme,
};
use log::info;
use scene::{CanvasRenderer, SharedScene, StructureCanvas};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Builder as TokioBuilder;

mod form;
mod scene;
mod settings;

type Engine = JobSyncEngine<HttpJobApi>;
type Viewer = StructureViewer<CanvasRenderer, HttpJobApi>;

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = settings::Args::parse();
    let config = settings::resolve(&args)?;
    info!("using job service at {}", config.api_base);

    let runtime = TokioBuilder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("creating sync runtime")?;
    let services = Services::connect(&config, &runtime)?;
    let engine = Arc::clone(&services.engine);
    let viewer = Arc::clone(&services.viewer);

    let result = iced::application(
        move || Dashboard::boot(services.clone()),
        Dashboard::update,
        Dashboard::view,
    )
    .title(application_title)
    .subscription(application_subscription)
    .theme(application_theme)
    .run();

    engine.stop();
    runtime.block_on(viewer.dispose());
    result.context("running dashboard")
}

fn application_title(_: &Dashboard) -> String {
    "Boltz Structure Prediction".into()
}

fn application_subscription(_: &Dashboard) -> Subscription<Message> {
    time::every(Duration::from_secs(1)).map(|_| Message::Tick)
}

fn application_theme(_: &Dashboard) -> Theme {
    Theme::Dark
}

/// Long-lived handles shared between the dashboard and its background tasks.
#[derive(Clone)]
struct Services {
    api: Arc<HttpJobApi>,
    engine: Arc<Engine>,
    viewer: Arc<Viewer>,
    scene: SharedScene,
    endpoints: Endpoints,
}

impl Services {
    /// Polling runs on `runtime`; dashboard requests use their own clients on iced's executor.
    fn connect(config: &ClientConfig, runtime: &tokio::runtime::Runtime) -> anyhow::Result<Self> {
        let endpoints = config.endpoints();
        let client = |timeout: Duration| {
            HttpJobApi::with_timeout(endpoints.clone(), timeout).context("building HTTP client")
        };

        let engine = Arc::new(JobSyncEngine::new(
            client(config.request_timeout())?,
            SyncSettings::from(config),
        ));
        {
            let _guard = runtime.enter();
            engine.start();
        }

        let scene = SharedScene::default();
        let viewer = Arc::new(StructureViewer::new(
            CanvasRenderer::new(Arc::clone(&scene)),
            client(config.structure_timeout())?,
            ViewerSettings::from(config),
        ));

        Ok(Self {
            api: Arc::new(client(config.request_timeout())?),
            engine,
            viewer,
            scene,
            endpoints,
        })
    }
}

struct Dashboard {
    services: Services,
    form: SubmissionForm,
    submitting: bool,
    form_status: Option<String>,
    snapshot: Arc<JobSnapshot>,
    selection: SelectionState,
    detail: Option<Job>,
    viewer_note: Option<String>,
    /// Load generation currently on screen and the job it was loaded for.
    shown: Option<(Generation, JobId)>,
    history: Vec<String>,
}

#[derive(Debug, Clone)]
enum Message {
    Tick,
    Form(FormEdit),
    Submit,
    Submitted(Result<Job, String>),
    Refresh,
    Select(Option<JobId>),
    DetailFetched(JobId, Result<Job, String>),
    FilesListed(JobId, Result<Vec<String>, String>),
    ViewerDone(Option<JobId>, Result<Option<LoadOutcome>, String>),
}

impl Dashboard {
    fn boot(services: Services) -> (Self, Task<Message>) {
        let snapshot = services.engine.snapshot();
        (
            Dashboard {
                services,
                form: SubmissionForm::default(),
                submitting: false,
                form_status: None,
                snapshot,
                selection: SelectionState::default(),
                detail: None,
                viewer_note: None,
                shown: None,
                history: Vec::new(),
            },
            Task::none(),
        )
    }

    fn update(state: &mut Self, message: Message) -> Task<Message> {
        match message {
            Message::Tick => state.sync_snapshot(),
            Message::Form(edit) => {
                state.form.apply(edit);
                Task::none()
            }
            Message::Submit => match state.form.to_request() {
                Ok(request) => {
                    state.submitting = true;
                    state.form_status = Some("Submitting...".into());
                    Task::perform(
                        submit(Arc::clone(&state.services.api), request),
                        Message::Submitted,
                    )
                }
                Err(err) => {
                    state.form_status = Some(err.to_string());
                    Task::none()
                }
            },
            Message::Submitted(Ok(job)) => {
                state.submitting = false;
                state.form_status = Some(format!("Submitted job {}", job.id));
                state.form.name.clear();
                state.push_history(format!("Submitted '{}' as job {}", job.name, job.id));
                state.services.engine.notify_job_created();
                Task::none()
            }
            Message::Submitted(Err(err)) => {
                state.submitting = false;
                state.form_status = Some(err);
                Task::none()
            }
            Message::Refresh => {
                state.services.engine.notify_job_created();
                Task::none()
            }
            Message::Select(id) => {
                let job = id
                    .as_ref()
                    .and_then(|id| state.snapshot.job_by_id(id))
                    .cloned();
                state.detail = None;
                state.viewer_note = None;
                let previous = state.selection.selected_job_id().cloned();
                let command = state.selection.select(job.as_ref(), &state.services.endpoints);
                match job {
                    Some(job) => {
                        let mut tasks = vec![state.fetch_detail(job.id.clone())];
                        if clears_before_listing(previous.as_ref(), &job, &command) {
                            tasks.push(state.run_viewer(ViewerCommand::Clear, None));
                        }
                        tasks.push(state.prepare_view(&job, command));
                        Task::batch(tasks)
                    }
                    None => state.run_viewer(command, None),
                }
            }
            Message::DetailFetched(id, Ok(job)) => {
                if state.selection.selected_job_id() == Some(&id) {
                    state.detail = Some(job);
                }
                Task::none()
            }
            Message::DetailFetched(id, Err(err)) => {
                if let Some(entry) =
                    detail_failure_entry(state.selection.selected_job_id(), &id, &err)
                {
                    state.push_history(entry);
                }
                Task::none()
            }
            Message::FilesListed(id, files) => {
                if state.selection.selected_job_id() != Some(&id) {
                    return Task::none();
                }
                let endpoints = &state.services.endpoints;
                let url = files
                    .ok()
                    .and_then(|files| {
                        pick_structure_file(&files).map(|name| endpoints.file(&id, name))
                    })
                    .unwrap_or_else(|| endpoints.structure_url(&id));
                state.run_viewer(ViewerCommand::Load(url), Some(id))
            }
            Message::ViewerDone(target, Ok(Some(LoadOutcome::Displayed(generation)))) => {
                if let Some(id) = target {
                    state.push_history(format!(
                        "Structure of job {id} displayed (load {generation})"
                    ));
                    state.shown = Some((generation, id));
                }
                Task::none()
            }
            Message::ViewerDone(_, Ok(_)) => Task::none(),
            Message::ViewerDone(_, Err(err)) => {
                state.viewer_note = Some(format!("Could not load structure: {err}"));
                Task::none()
            }
        }
    }

    /// Adopts a newer engine snapshot and keeps the selection consistent with it.
    fn sync_snapshot(&mut self) -> Task<Message> {
        let latest = self.services.engine.snapshot();
        if latest.revision == self.snapshot.revision {
            return Task::none();
        }
        let previous = std::mem::replace(&mut self.snapshot, latest);

        if let Some(command) = self.selection.reconcile(&self.snapshot) {
            self.detail = None;
            self.push_history("Selected job disappeared from the service".into());
            return self.run_viewer(command, None);
        }

        let before = self.selection.resolve(&previous).map(|job| job.status);
        let Some(job) = self.selection.resolve(&self.snapshot).cloned() else {
            return Task::none();
        };
        if before == Some(job.status) {
            return Task::none();
        }
        self.push_history(format!("Job {} is {}", job.id, job.status.label()));
        let command = self.selection.select(Some(&job), &self.services.endpoints);
        Task::batch([
            self.fetch_detail(job.id.clone()),
            self.prepare_view(&job, command),
        ])
    }

    fn fetch_detail(&self, id: JobId) -> Task<Message> {
        let api = Arc::clone(&self.services.api);
        Task::perform(
            async move {
                let result = api.job_detail(&id).await.map_err(|err| err.to_string());
                (id, result)
            },
            |(id, result)| Message::DetailFetched(id, result),
        )
    }

    /// Completed jobs list their files first so the viewer loads the right model.
    fn prepare_view(&self, job: &Job, command: ViewerCommand) -> Task<Message> {
        match command {
            ViewerCommand::Load(_) => {
                let api = Arc::clone(&self.services.api);
                let id = job.id.clone();
                Task::perform(
                    async move {
                        let files = api.list_files(&id).await.map_err(|err| err.to_string());
                        (id, files)
                    },
                    |(id, files)| Message::FilesListed(id, files),
                )
            }
            ViewerCommand::Clear => self.run_viewer(ViewerCommand::Clear, None),
        }
    }

    /// `target` is the job a load was issued for; clears carry none.
    fn run_viewer(&self, command: ViewerCommand, target: Option<JobId>) -> Task<Message> {
        let viewer = Arc::clone(&self.services.viewer);
        Task::perform(
            async move {
                let result = command.run(&viewer).await.map_err(|err| err.to_string());
                (target, result)
            },
            |(target, result)| Message::ViewerDone(target, result),
        )
    }

    fn view(state: &Self) -> Element<'_, Message> {
        let layout = row![
            state.form_column(),
            state.jobs_column(),
            state.detail_column()
        ]
        .spacing(20)
        .align_y(Alignment::Start)
        .padding(20);

        Container::new(layout)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    fn form_column(&self) -> Element<'_, Message> {
        let entities = self.form.entities.iter().enumerate().fold(
            Column::new().spacing(8),
            |col, (index, entity)| {
                let mut line = row![
                    text_input("ID", &entity.local_id)
                        .on_input(move |value| Message::Form(FormEdit::LocalId(index, value)))
                        .width(Length::Fixed(48.0))
                        .padding(6),
                    pick_list(&EntityKind::ALL[..], Some(entity.kind), move |kind| {
                        Message::Form(FormEdit::Kind(index, kind))
                    }),
                ]
                .spacing(6)
                .align_y(Alignment::Center);
                if entity.kind == EntityKind::Ligand {
                    line = line.push(
                        button(text(format!("{:?}", entity.ligand_kind)).size(12))
                            .on_press(Message::Form(FormEdit::ToggleLigandKind(index))),
                    );
                }
                line = line.push(
                    button(text("Remove").size(12))
                        .on_press(Message::Form(FormEdit::RemoveEntity(index))),
                );
                col.push(line).push(
                    text_input(entity.kind.placeholder(entity.ligand_kind), &entity.value)
                        .on_input(move |value| Message::Form(FormEdit::Value(index, value)))
                        .padding(6),
                )
            },
        );

        let msa_label = if self.form.use_msa_server {
            "MSA server: on"
        } else {
            "MSA server: off"
        };

        column![
            text("New prediction").size(26),
            text_input("Job name", &self.form.name)
                .on_input(|value| Message::Form(FormEdit::Name(value)))
                .padding(6),
            entities,
            button("Add entity").on_press(Message::Form(FormEdit::AddEntity)),
            text("Recycling steps").size(14),
            text_input("3", &self.form.recycling_steps)
                .on_input(|value| Message::Form(FormEdit::RecyclingSteps(value)))
                .padding(6),
            text("Diffusion samples").size(14),
            text_input("1", &self.form.diffusion_samples)
                .on_input(|value| Message::Form(FormEdit::DiffusionSamples(value)))
                .padding(6),
            button(msa_label).on_press(Message::Form(FormEdit::ToggleMsaServer)),
            button("Submit prediction")
                .on_press_maybe((!self.submitting).then_some(Message::Submit))
                .padding(10),
            text(self.form_status.clone().unwrap_or_default()).size(14),
        ]
        .spacing(10)
        .width(Length::Fixed(360.0))
        .into()
    }

    fn jobs_column(&self) -> Element<'_, Message> {
        let jobs: Element<'_, Message> = if !self.snapshot.is_loaded() {
            text("Loading jobs...").size(14).into()
        } else if self.snapshot.is_empty() {
            text("No jobs yet").size(14).into()
        } else {
            self.snapshot
                .jobs
                .iter()
                .fold(Column::new().spacing(6), |col, job| {
                    let selected = self.selection.selected_job_id() == Some(&job.id);
                    let marker = if selected { "> " } else { "" };
                    col.push(
                        button(
                            column![
                                text(format!("{marker}{}", job.name)).size(16),
                                text(format!(
                                    "#{} | {} | {}",
                                    job.id,
                                    job.status.label(),
                                    job.created_at.format("%Y-%m-%d %H:%M")
                                ))
                                .size(12),
                            ]
                            .spacing(2),
                        )
                        .width(Length::Fill)
                        .on_press(Message::Select(Some(job.id.clone()))),
                    )
                })
                .into()
        };

        let history = self
            .history
            .iter()
            .rev()
            .fold(Column::new().spacing(4), |col, entry| {
                col.push(text(entry.clone()).size(12))
            });

        column![
            row![
                text("Jobs").size(26),
                button(text("Refresh").size(12)).on_press(Message::Refresh)
            ]
            .spacing(12)
            .align_y(Alignment::Center),
            scrollable(jobs).height(Length::Fixed(420.0)),
            text("Activity").size(16),
            scrollable(history).height(Length::Fixed(120.0)),
        ]
        .spacing(10)
        .width(Length::Fixed(320.0))
        .into()
    }

    fn detail_column(&self) -> Element<'_, Message> {
        let Some(job) = self.selection.resolve(&self.snapshot) else {
            return column![
                text("Structure").size(26),
                text("Select a job to see its results").size(14)
            ]
            .spacing(10)
            .width(Length::Fill)
            .into();
        };

        let mut details = Column::new()
            .spacing(8)
            .push(
                row![
                    text(job.name.clone()).size(26),
                    button(text("Close").size(12)).on_press(Message::Select(None))
                ]
                .spacing(12)
                .align_y(Alignment::Center),
            )
            .push(text(format!("Status: {}", job.status.label())).size(16));

        if let Some(metrics) = job.completed_metrics() {
            details = metric_rows(metrics)
                .into_iter()
                .fold(details, |col, (label, value)| {
                    col.push(text(format!("{label}: {value}")).size(14))
                })
                .push(
                    text(format!(
                        "Download: {}",
                        self.services.endpoints.download_url(&job.id)
                    ))
                    .size(12),
                );
        }
        if job.status == boltzcore::model::JobStatus::Failed {
            details = details.push(text("Prediction failed. Check logs.").size(14));
        }

        let structure = Canvas::<StructureCanvas, Message>::new(StructureCanvas {
            scene: Arc::clone(&self.services.scene),
        })
        .width(Length::Fill)
        .height(Length::Fixed(360.0));

        let logs = self
            .detail
            .as_ref()
            .filter(|detail| detail.id == job.id)
            .and_then(|detail| detail.logs.clone())
            .unwrap_or_else(|| "No logs yet".into());

        details
            .push(
                text(viewer_caption(
                    &self.services.viewer.state(),
                    job,
                    self.shown.as_ref(),
                ))
                .size(14),
            )
            .push(structure)
            .push(text(self.viewer_note.clone().unwrap_or_default()).size(12))
            .push(text("Execution log").size(16))
            .push(scrollable(text(logs).size(12)).height(Length::Fixed(140.0)))
            .width(Length::Fill)
            .into()
    }

    fn push_history(&mut self, entry: String) {
        self.history.push(entry);
        if self.history.len() > 20 {
            self.history.remove(0);
        }
    }
}

async fn submit(api: Arc<HttpJobApi>, request: PredictionRequest) -> Result<Job, String> {
    api.submit(&request).await.map_err(|err| err.to_string())
}

fn metric_rows(metrics: &Metrics) -> Vec<(&'static str, String)> {
    let mut rows = vec![
        ("Confidence", metrics.confidence_label()),
        ("pLDDT", metrics.plddt_label()),
        ("ipTM", metrics.iptm_label()),
    ];
    if let Some(affinity) = metrics.affinity_label() {
        rows.push(("Affinity (log IC50)", affinity));
    }
    rows
}

/// A different job's structure must leave the screen before this job's files are listed.
fn clears_before_listing(previous: Option<&JobId>, job: &Job, command: &ViewerCommand) -> bool {
    matches!(command, ViewerCommand::Load(_)) && previous != Some(&job.id)
}

fn detail_failure_entry(selected: Option<&JobId>, id: &JobId, err: &str) -> Option<String> {
    (selected == Some(id)).then(|| format!("Could not fetch job {id}: {err}"))
}

fn viewer_caption(state: &ViewerState, job: &Job, shown: Option<&(Generation, JobId)>) -> String {
    match state {
        ViewerState::Loading(_) => "Loading structure...".into(),
        ViewerState::Displayed(generation)
            if shown.is_some_and(|(loaded, id)| loaded == generation && *id == job.id) =>
        {
            format!("Showing structure of job {}", job.id)
        }
        ViewerState::Displayed(_) => "Loading structure...".into(),
        ViewerState::LoadFailed(_, reason) => format!("Structure unavailable: {reason}"),
        ViewerState::Disposed => "Viewer closed".into(),
        ViewerState::Idle if job.is_completed() => "Preparing structure...".into(),
        ViewerState::Idle => "Structure is available once the job completes".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boltzcore::model::{Affinity, JobStatus};

    fn job(status: JobStatus) -> Job {
        serde_json::from_value(serde_json::json!({
            "id": 42,
            "name": "T1",
            "status": status,
            "created_at": "2026-02-11T10:45:54"
        }))
        .unwrap()
    }

    #[test]
    fn metric_rows_include_affinity_only_when_present() {
        let mut metrics = Metrics {
            confidence_score: Some(0.91),
            complex_plddt: Some(0.88),
            iptm: None,
            affinity: None,
        };
        let rows = metric_rows(&metrics);
        assert_eq!(rows[0], ("Confidence", "91.0%".to_string()));
        assert_eq!(rows[1], ("pLDDT", "88.0%".to_string()));
        assert_eq!(rows[2], ("ipTM", "N/A".to_string()));
        assert_eq!(rows.len(), 3);

        metrics.affinity = Some(Affinity {
            affinity_pred_value: -1.234,
        });
        assert_eq!(metric_rows(&metrics)[3].1, "-1.23");
    }

    #[test]
    fn viewer_caption_follows_state() {
        let completed = job(JobStatus::Completed);
        let shown = (Generation(2), JobId::new("42"));
        assert_eq!(
            viewer_caption(&ViewerState::Loading(Generation(2)), &completed, None),
            "Loading structure..."
        );
        assert_eq!(
            viewer_caption(&ViewerState::Displayed(Generation(2)), &completed, Some(&shown)),
            "Showing structure of job 42"
        );
        assert_eq!(
            viewer_caption(&ViewerState::Idle, &job(JobStatus::Running), None),
            "Structure is available once the job completes"
        );
    }

    #[test]
    fn caption_never_names_a_job_whose_structure_is_not_shown() {
        let completed = job(JobStatus::Completed);
        let other_job = (Generation(2), JobId::new("7"));
        assert_eq!(
            viewer_caption(&ViewerState::Displayed(Generation(2)), &completed, Some(&other_job)),
            "Loading structure..."
        );
        let older_load = (Generation(1), JobId::new("42"));
        assert_eq!(
            viewer_caption(&ViewerState::Displayed(Generation(2)), &completed, Some(&older_load)),
            "Loading structure..."
        );
        assert_eq!(
            viewer_caption(&ViewerState::Idle, &completed, None),
            "Preparing structure..."
        );
    }

    #[test]
    fn switching_jobs_clears_before_listing_files() {
        let completed = job(JobStatus::Completed);
        let load = ViewerCommand::Load("http://localhost/structure".into());
        let other = JobId::new("7");
        assert!(clears_before_listing(Some(&other), &completed, &load));
        assert!(clears_before_listing(None, &completed, &load));
        assert!(!clears_before_listing(Some(&completed.id), &completed, &load));
        assert!(!clears_before_listing(Some(&other), &completed, &ViewerCommand::Clear));
    }

    #[test]
    fn detail_failures_for_deselected_jobs_stay_out_of_history() {
        let current = JobId::new("42");
        let stale = JobId::new("7");
        assert_eq!(
            detail_failure_entry(Some(&current), &current, "timed out").as_deref(),
            Some("Could not fetch job 42: timed out")
        );
        assert_eq!(detail_failure_entry(Some(&current), &stale, "timed out"), None);
        assert_eq!(detail_failure_entry(None, &stale, "timed out"), None);
    }
}
