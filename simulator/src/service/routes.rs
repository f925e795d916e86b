use crate::service::store::JobStore;
use crate::workflow::runner::Runner;
use boltzcore::model::PredictionRequest;
use chrono::Utc;
use log::{debug, info};
use serde_json::json;
use std::convert::Infallible;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use warp::http::StatusCode;
use warp::reply::{Reply, Response};
use warp::{Filter, Rejection};

pub type SharedStore = Arc<RwLock<JobStore>>;

const MAX_BODY_BYTES: u64 = 1 << 20;

/// The job service HTTP surface under `/api`.
pub fn routes(store: SharedStore) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let store_filter = warp::any().map(move || store.clone());

    let list = warp::path!("api" / "jobs")
        .and(warp::get())
        .and(store_filter.clone())
        .map(|store: SharedStore| warp::reply::json(&read(&store).list()).into_response());

    let create = warp::path!("api" / "jobs")
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(store_filter.clone())
        .map(create_job);

    let job = warp::path!("api" / "jobs" / String)
        .and(warp::get())
        .and(store_filter.clone())
        .map(|id: String, store: SharedStore| match read(&store).get(&id) {
            Some(job) => warp::reply::json(&job).into_response(),
            None => detail(StatusCode::NOT_FOUND, "Job not found"),
        });

    let files = warp::path!("api" / "jobs" / String / "files")
        .and(warp::get())
        .and(store_filter.clone())
        .map(|id: String, store: SharedStore| match read(&store).files(&id) {
            Some(files) => warp::reply::json(&files).into_response(),
            None => detail(StatusCode::NOT_FOUND, "Job not found"),
        });

    let file = warp::path!("api" / "jobs" / String / "files" / String)
        .and(warp::get())
        .and(store_filter)
        .map(|id: String, name: String, store: SharedStore| {
            match read(&store).file(&id, &name) {
                Some(contents) => warp::reply::with_header(
                    contents.to_string(),
                    "content-type",
                    content_type(&name),
                )
                .into_response(),
                None => detail(StatusCode::NOT_FOUND, "File not found"),
            }
        });

    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["GET", "POST"])
        .allow_header("content-type");

    list.or(create)
        .unify()
        .or(job)
        .unify()
        .or(files)
        .unify()
        .or(file)
        .unify()
        .with(cors)
        .recover(handle_rejection)
}

/// Ticks the lifecycle runner against the shared store until aborted.
pub fn spawn_worker(store: SharedStore, runner: Runner, tick: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tick);
        loop {
            interval.tick().await;
            let changed = runner.tick(&mut write(&store));
            if changed > 0 {
                debug!("{} job(s) changed status", changed);
            }
        }
    })
}

fn create_job(request: PredictionRequest, store: SharedStore) -> Response {
    if request.name.trim().is_empty() || request.sequences.is_empty() {
        return detail(
            StatusCode::UNPROCESSABLE_ENTITY,
            "a job needs a name and at least one sequence",
        );
    }
    let job = write(&store).create(request, Utc::now());
    info!("accepted job {} ({})", job.id, job.name);
    warp::reply::json(&job).into_response()
}

async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not Found".to_string())
    } else if let Some(body) = err.find::<warp::body::BodyDeserializeError>() {
        (StatusCode::UNPROCESSABLE_ENTITY, body.to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed".to_string())
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large".to_string())
    } else {
        debug!("unhandled rejection: {:?}", err);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
    };
    Ok(detail(status, &message))
}

fn detail(status: StatusCode, message: &str) -> Response {
    warp::reply::with_status(warp::reply::json(&json!({ "detail": message })), status)
        .into_response()
}

fn content_type(name: &str) -> &'static str {
    if name.ends_with(".json") {
        "application/json"
    } else {
        "text/plain; charset=utf-8"
    }
}

fn read(store: &SharedStore) -> RwLockReadGuard<'_, JobStore> {
    store.read().unwrap_or_else(PoisonError::into_inner)
}

fn write(store: &SharedStore) -> RwLockWriteGuard<'_, JobStore> {
    store.write().unwrap_or_else(PoisonError::into_inner)
}
