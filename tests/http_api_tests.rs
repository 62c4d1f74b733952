// Tests for the HTTP control API
//
// Requests go straight through the router with `tower::ServiceExt::oneshot`;
// no socket is opened.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use safe_alert::audio::{CaptureConfig, SimulatedMicrophone};
use safe_alert::capability::{ChannelAnswers, FixedLocationProvider, LogDialer};
use safe_alert::contacts::{ContactStore, MemoryStore};
use safe_alert::session::{Capabilities, EmergencyController};
use safe_alert::{create_router, AppState, Config};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn app() -> Router {
    let config = Config::default();
    let store = Arc::new(ContactStore::new(Arc::new(MemoryStore::new())));
    let answers = Arc::new(ChannelAnswers::new());
    let caps = Capabilities {
        location: Arc::new(FixedLocationProvider::at(19.5, -99.25, 8.0)),
        audio: Arc::new(SimulatedMicrophone::new(CaptureConfig::default())),
        dialer: Arc::new(LogDialer::new()),
        answers: answers.clone(),
    };
    let controller = EmergencyController::new(&config, store, caps);

    create_router(AppState::new(&config, controller, answers))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_health_check() {
    let app = app();
    let (status, _) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_contact_lifecycle() {
    let app = app();

    let (status, ana) = send(
        &app,
        "POST",
        "/contacts",
        Some(json!({ "name": "Ana", "phone": "5550001" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(ana["name"], "Ana");

    let (status, body) = send(
        &app,
        "POST",
        "/contacts",
        Some(json!({ "name": "  ", "phone": "5550002" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("name is empty"));

    for (name, phone) in [("Luis", "5550002"), ("Marta", "5550003")] {
        let (status, _) = send(
            &app,
            "POST",
            "/contacts",
            Some(json!({ "name": name, "phone": phone })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, _) = send(
        &app,
        "POST",
        "/contacts",
        Some(json!({ "name": "Pedro", "phone": "5550004" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let id = ana["id"].as_str().unwrap();
    let (status, _) = send(&app, "DELETE", &format!("/contacts/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, list) = send(&app, "GET", "/contacts", None).await;
    let names: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Luis", "Marta"]);
}

#[tokio::test]
async fn test_map_link_needs_a_fix() {
    let app = app();

    let (status, _) = send(&app, "GET", "/location/map", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, sample) = send(&app, "POST", "/location/refresh", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sample["latitude"], 19.5);

    let (status, map) = send(&app, "GET", "/location/map", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(map["url"], "https://www.google.com/maps?q=19.5,-99.25");
}

#[tokio::test]
async fn test_services_directory() {
    let app = app();
    let (status, body) = send(&app, "GET", "/services", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["support"], "mailto:support@safealert.com");
    let numbers: Vec<&str> = body["services"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["number"].as_str().unwrap())
        .collect();
    assert_eq!(numbers, vec!["911", "065", "089", "078"]);
    assert_eq!(body["services"][0]["tel"], "tel:911");
}

#[tokio::test]
async fn test_answer_without_question_conflicts() {
    let app = app();
    let (status, _) = send(&app, "POST", "/emergency/answer", Some(json!({ "answered": true }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test(start_paused = true)]
async fn test_emergency_answered_over_api() {
    let app = app();
    send(
        &app,
        "POST",
        "/contacts",
        Some(json!({ "name": "Ana", "phone": "5550001" })),
    )
    .await;
    let (_, permissions) = send(&app, "POST", "/permissions/refresh", None).await;
    assert_eq!(permissions["location"], "granted");
    assert_eq!(permissions["microphone"], "granted");

    let (status, session) = send(&app, "POST", "/emergency/activate", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["active"], true);
    assert_eq!(session["state"]["state"], "escalating");

    tokio::time::sleep(Duration::from_millis(3100)).await;

    let (_, status_body) = send(&app, "GET", "/emergency/status", None).await;
    assert_eq!(status_body["pending_prompt"]["kind"], "contact_answered");
    assert_eq!(status_body["pending_prompt"]["name"], "Ana");

    let (status, _) = send(&app, "POST", "/emergency/answer", Some(json!({ "answered": true }))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    tokio::time::sleep(Duration::from_millis(10)).await;

    let (_, status_body) = send(&app, "GET", "/emergency/status", None).await;
    let log: Vec<&str> = status_body["session"]["log"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["text"].as_str().unwrap())
        .collect();
    assert_eq!(log.last().copied(), Some("Emergency reported successfully"));
    assert!(status_body["pending_prompt"].is_null());

    let (_, session) = send(&app, "POST", "/emergency/deactivate", None).await;
    assert_eq!(session["active"], false);
    assert_eq!(session["log"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_reset_removes_contacts() {
    let app = app();
    send(
        &app,
        "POST",
        "/contacts",
        Some(json!({ "name": "Ana", "phone": "5550001" })),
    )
    .await;

    let (status, _) = send(&app, "POST", "/reset", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, list) = send(&app, "GET", "/contacts", None).await;
    assert_eq!(list, json!([]));
}
