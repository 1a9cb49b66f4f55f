//! Mock installer service and client fixtures

use std::sync::Arc;
use std::time::Duration;

use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use obwizard::filesys::dir::Dir;
use obwizard::flow::controller::{ControllerOptions, WizardController};
use obwizard::flow::fsm::Flow;
use obwizard::flow::resume::{ResumeStore, SystemClock};
use obwizard::http::client::HttpClient;
use obwizard::http::pipeline::RequestPipeline;
use obwizard::workers::poller;

/// Successful envelope around `data`
pub fn ok(data: Value) -> Json<Value> {
    Json(json!({"code": 200, "data": data, "msg": "", "success": true}))
}

/// Failed envelope
pub fn fail(code: i64, msg: &str) -> Json<Value> {
    Json(json!({"code": code, "data": null, "msg": msg, "success": false}))
}

/// Serve `router` on an ephemeral port and return its base URL
pub async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Base URL nothing listens on
pub async fn dead_backend() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

pub fn client(base_url: &str) -> Arc<HttpClient> {
    let pipeline = Arc::new(RequestPipeline::default());
    Arc::new(HttpClient::new(base_url, Duration::from_secs(5), pipeline).unwrap())
}

pub fn fast_options() -> ControllerOptions {
    ControllerOptions {
        poller: poller::Options {
            interval: Duration::from_millis(10),
            initial_delay: Duration::ZERO,
        },
        service_stopped_threshold: 3,
    }
}

/// Controller whose resume record lives in `dir`
pub fn controller(flow: Flow, base_url: &str, dir: &Dir) -> WizardController {
    let resume = ResumeStore::new(
        dir.file("resume.json"),
        Duration::from_secs(600),
        Arc::new(SystemClock),
    );
    WizardController::new(flow, client(base_url), resume, fast_options())
}
