//! HTTP surface of the monitor.
//!
//! Thin warp handlers over [`ProbeManager`]: all lifecycle rules live in the
//! manager, this module only maps them to JSON and status codes.

use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use log::warn;
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use warp::http::StatusCode;
use warp::reply::{Json, WithStatus};
use warp::{Filter, Rejection, Reply};

use crate::config::ProbeConfig;
use crate::manager::ProbeManager;
use crate::targets::expand_hosts;

const MAX_BODY_BYTES: u64 = 1024 * 1024;

type JsonReply = WithStatus<Json>;

/// Shared handles given to every request.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<ProbeManager>,
    pub config: Arc<RwLock<ProbeConfig>>,
    /// Where config changes are persisted, if anywhere.
    pub config_path: Option<PathBuf>,
}

impl AppState {
    pub fn new(
        manager: Arc<ProbeManager>,
        config: ProbeConfig,
        config_path: Option<PathBuf>,
    ) -> Self {
        Self {
            manager,
            config: Arc::new(RwLock::new(config)),
            config_path,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StartRequest {
    pub hosts: Vec<String>,
}

#[derive(Debug, Serialize)]
struct Status {
    running: bool,
    in_flight: usize,
    hosts: usize,
}

fn reply_json<T: Serialize>(value: &T, status: StatusCode) -> JsonReply {
    warp::reply::with_status(warp::reply::json(value), status)
}

fn message(text: &str) -> JsonReply {
    reply_json(&serde_json::json!({ "message": text }), StatusCode::OK)
}

fn error(status: StatusCode, text: impl Into<String>) -> JsonReply {
    reply_json(&serde_json::json!({ "error": text.into() }), status)
}

fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

pub fn routes(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let get_config = warp::path!("api" / "ping" / "config")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(get_config);

    let set_config = warp::path!("api" / "ping" / "config")
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(with_state(state.clone()))
        .and_then(set_config);

    let start = warp::path!("api" / "ping" / "start")
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(with_state(state.clone()))
        .and_then(start);

    let stop = warp::path!("api" / "ping" / "stop")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and_then(stop);

    let clear = warp::path!("api" / "ping" / "clear")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and_then(clear);

    let results = warp::path!("api" / "ping" / "results")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(results);

    let history = warp::path!("api" / "ping" / "history" / String)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(history);

    let status = warp::path!("api" / "ping" / "status")
        .and(warp::get())
        .and(with_state(state))
        .and_then(status);

    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["GET", "POST", "DELETE"])
        .allow_headers(vec!["Origin", "Content-Type"])
        .expose_headers(vec!["Content-Length"])
        .max_age(Duration::from_secs(12 * 60 * 60));

    get_config
        .or(set_config)
        .or(start)
        .or(stop)
        .or(clear)
        .or(results)
        .or(history)
        .or(status)
        .recover(handle_rejection)
        .with(cors)
}

async fn get_config(state: AppState) -> Result<JsonReply, Infallible> {
    let config = state.config.read().await.clone();
    Ok(reply_json(&config, StatusCode::OK))
}

async fn set_config(config: ProbeConfig, state: AppState) -> Result<JsonReply, Infallible> {
    if let Err(e) = config.validate() {
        return Ok(error(StatusCode::BAD_REQUEST, e.to_string()));
    }
    if let Some(path) = &state.config_path {
        if let Err(e) = config.save(path) {
            warn!("could not persist config to {}: {}", path.display(), e);
        }
    }
    *state.config.write().await = config.clone();
    Ok(reply_json(&config, StatusCode::OK))
}

async fn start(request: StartRequest, state: AppState) -> Result<JsonReply, Infallible> {
    let config = state.config.read().await.clone();
    let hosts = match expand_hosts(&request.hosts, &config) {
        Ok(hosts) => hosts,
        Err(e) => return Ok(error(StatusCode::BAD_REQUEST, e.to_string())),
    };
    state.manager.start(hosts, &config).await;
    Ok(message("Ping started"))
}

async fn stop(state: AppState) -> Result<JsonReply, Infallible> {
    state.manager.stop().await;
    Ok(message("Ping stopped"))
}

async fn clear(state: AppState) -> Result<JsonReply, Infallible> {
    state.manager.stop().await;
    state.manager.clear().await;
    Ok(message("Ping stopped and history cleared"))
}

async fn results(state: AppState) -> Result<JsonReply, Infallible> {
    let snapshot = state.manager.snapshot().await;
    Ok(reply_json(&snapshot, StatusCode::OK))
}

async fn history(host: String, state: AppState) -> Result<JsonReply, Infallible> {
    // the segment arrives raw; IPv6 hosts come in as `2001%3Adb8%3A%3A1`
    let host = match percent_decode_str(&host).decode_utf8() {
        Ok(host) => host,
        Err(_) => return Ok(error(StatusCode::BAD_REQUEST, "Host is not valid UTF-8")),
    };
    Ok(match state.manager.history(&host).await {
        Some(result) => reply_json(&result, StatusCode::OK),
        None => error(StatusCode::NOT_FOUND, "Host not found"),
    })
}

async fn status(state: AppState) -> Result<JsonReply, Infallible> {
    let status = Status {
        running: state.manager.is_running().await,
        in_flight: state.manager.in_flight().await,
        hosts: state.manager.host_count().await,
    };
    Ok(reply_json(&status, StatusCode::OK))
}

async fn handle_rejection(err: Rejection) -> Result<JsonReply, Infallible> {
    let reply = if err.is_not_found() {
        error(StatusCode::NOT_FOUND, "Not found")
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        error(StatusCode::BAD_REQUEST, e.to_string())
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        error(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large")
    } else if err.find::<warp::reject::LengthRequired>().is_some() {
        error(StatusCode::LENGTH_REQUIRED, "Content-Length required")
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        error(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
    } else {
        warn!("unhandled rejection: {:?}", err);
        error(StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
    };
    Ok(reply)
}
