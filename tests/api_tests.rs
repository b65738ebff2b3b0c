mod helpers;

use std::sync::Arc;
use std::time::Duration;

use helpers::{ScriptedTransport, fast_config};
use pingx::ProbeManager;
use pingx::api::{AppState, routes};
use serde_json::{Value, json};
use warp::http::StatusCode;

fn state() -> AppState {
    let transport = Arc::new(ScriptedTransport::new(Duration::from_millis(1)));
    let manager = Arc::new(ProbeManager::new(transport));
    AppState::new(manager, fast_config(), None)
}

fn body(response: &warp::http::Response<warp::hyper::body::Bytes>) -> Value {
    serde_json::from_slice(response.body()).unwrap()
}

#[tokio::test]
async fn config_round_trips_through_api() {
    let api = routes(state());

    let response = warp::test::request()
        .method("GET")
        .path("/api/ping/config")
        .reply(&api)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body(&response)["count"], 4);

    let response = warp::test::request()
        .method("POST")
        .path("/api/ping/config")
        .json(&json!({ "count": 6, "wait": 2 }))
        .reply(&api)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = warp::test::request()
        .method("GET")
        .path("/api/ping/config")
        .reply(&api)
        .await;
    let config = body(&response);
    assert_eq!(config["count"], 6);
    assert_eq!(config["wait"], 2);
    assert_eq!(config["max_store_logs"], 100);
}

#[tokio::test]
async fn invalid_config_is_rejected() {
    let state = state();
    let api = routes(state.clone());

    let response = warp::test::request()
        .method("POST")
        .path("/api/ping/config")
        .json(&json!({ "max_concurrent_probes": 0 }))
        .reply(&api)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body(&response)["error"].is_string());
    assert_eq!(state.config.read().await.max_concurrent_probes, 100);
}

#[tokio::test]
async fn start_expands_ranges_and_reports_results() {
    let state = state();
    let api = routes(state.clone());

    let response = warp::test::request()
        .method("POST")
        .path("/api/ping/start")
        .json(&json!({ "hosts": ["10.0.0.0/30", "gateway.local", "  "] }))
        .reply(&api)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body(&response)["message"], "Ping started");

    let response = warp::test::request()
        .method("GET")
        .path("/api/ping/results")
        .reply(&api)
        .await;
    let results = body(&response);
    let hosts: Vec<&str> = results
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["Hostname"].as_str().unwrap())
        .collect();
    assert_eq!(hosts, vec!["10.0.0.1", "10.0.0.2", "gateway.local"]);

    let response = warp::test::request()
        .method("GET")
        .path("/api/ping/status")
        .reply(&api)
        .await;
    let status = body(&response);
    assert_eq!(status["running"], true);
    assert_eq!(status["hosts"], 3);

    state.manager.stop().await;
}

#[tokio::test]
async fn malformed_start_is_bad_request() {
    let api = routes(state());

    let response = warp::test::request()
        .method("POST")
        .path("/api/ping/start")
        .body("{ not json")
        .reply(&api)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = warp::test::request()
        .method("POST")
        .path("/api/ping/start")
        .json(&json!({ "hosts": ["10.0.0.0/8"] }))
        .reply(&api)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn history_of_unknown_host_is_not_found() {
    let api = routes(state());

    let response = warp::test::request()
        .method("GET")
        .path("/api/ping/history/nonexistent-host")
        .reply(&api)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body(&response)["error"], "Host not found");
}

#[tokio::test]
async fn history_returns_logs_for_known_host() {
    let state = state();
    let api = routes(state.clone());

    state.manager.start(["localhost"], &fast_config()).await;
    helpers::wait_for(&state.manager, "localhost", |r| r.total == 4).await;

    let response = warp::test::request()
        .method("GET")
        .path("/api/ping/history/localhost")
        .reply(&api)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let result = body(&response);
    assert_eq!(result["TotalCount"], 4);
    assert_eq!(result["PingLogs"].as_array().unwrap().len(), 4);
    assert_eq!(result["IPAddr"], "127.0.0.1");

    state.manager.stop().await;
}

#[tokio::test]
async fn history_decodes_escaped_ipv6_host() {
    let state = state();
    let api = routes(state.clone());

    state.manager.start(["2001:db8::1"], &fast_config()).await;

    let response = warp::test::request()
        .method("GET")
        .path("/api/ping/history/2001%3Adb8%3A%3A1")
        .reply(&api)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body(&response)["Hostname"], "2001:db8::1");

    let response = warp::test::request()
        .method("GET")
        .path("/api/ping/history/%FF")
        .reply(&api)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    state.manager.stop().await;
}

#[tokio::test]
async fn clear_stops_and_empties() {
    let state = state();
    let api = routes(state.clone());

    state.manager.start(["a", "b"], &fast_config()).await;

    let response = warp::test::request()
        .method("POST")
        .path("/api/ping/clear")
        .reply(&api)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!state.manager.is_running().await);

    let response = warp::test::request()
        .method("GET")
        .path("/api/ping/results")
        .reply(&api)
        .await;
    assert_eq!(body(&response), json!([]));
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let api = routes(state());

    let response = warp::test::request()
        .method("GET")
        .path("/api/ping/nothing-here")
        .reply(&api)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
