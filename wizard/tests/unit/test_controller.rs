//! Wizard controller tests against a mock installer service

use std::collections::VecDeque;
use std::future::pending;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use openapi_client::models::TaskStatus;
use rsa::pkcs8::{EncodePublicKey, LineEnding};
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey};
use serde_json::{json, Value};
use tokio_test::{assert_err, assert_ok};

use obwizard::filesys::dir::Dir;
use obwizard::flow::controller::{ErrorDisposition, WizardController};
use obwizard::flow::fsm::{Flow, Phase, StepKind, TaskOutcome, WizardEvent};
use obwizard::models::deployment::DeploymentConfig;
use obwizard::workers::poller::PollOutcome;

use crate::common::{controller, dead_backend, fail, ok, serve};

fn keypair() -> (RsaPrivateKey, String) {
    let private = RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap();
    let pem = private
        .to_public_key()
        .to_public_key_pem(LineEnding::LF)
        .unwrap();
    (private, pem)
}

fn decrypt(private: &RsaPrivateKey, value: &Value) -> String {
    let bytes = STANDARD.decode(value.as_str().unwrap()).unwrap();
    String::from_utf8(private.decrypt(Pkcs1v15Encrypt, &bytes).unwrap()).unwrap()
}

fn sample_config() -> DeploymentConfig {
    DeploymentConfig::new(json!({
        "auth": {"user": "root", "password": "s3cret"},
        "components": {
            "oceanbase": {"component": "oceanbase-ce", "root_password": "ob-root", "appname": "demo"}
        }
    }))
}

/// Mock service for the new-metadb install flow
///
/// The precheck fails with a recoverable item until `/recover` is called.
fn install_service(pem: String, submitted: Arc<Mutex<Option<Value>>>) -> Router {
    let recovered = Arc::new(AtomicBool::new(false));
    let recover_flag = recovered.clone();

    Router::new()
        .route(
            "/api/v1/keys/rsa/public",
            get(move || {
                let pem = pem.clone();
                async move { ok(json!({"public_key": pem})) }
            }),
        )
        .route(
            "/api/v1/deployments/{name}",
            put(move |Json(body): Json<Value>| {
                let submitted = submitted.clone();
                async move {
                    *submitted.lock().unwrap() = Some(body);
                    ok(Value::Null)
                }
            }),
        )
        .route(
            "/api/v1/deployments/{name}/precheck",
            post(|| async { ok(Value::Null) }).get(move || {
                let recovered = recovered.load(Ordering::SeqCst);
                async move {
                    if recovered {
                        ok(json!({"total": 1, "finished": 1, "all_passed": true, "status": "SUCCESSFUL"}))
                    } else {
                        ok(json!({
                            "total": 1,
                            "finished": 1,
                            "all_passed": false,
                            "status": "SUCCESSFUL",
                            "info": [{"name": "memory_limit", "result": "FAILED", "recoverable": true}]
                        }))
                    }
                }
            }),
        )
        .route(
            "/api/v1/deployments/{name}/recover",
            post(move || {
                recover_flag.store(true, Ordering::SeqCst);
                async {
                    ok(json!({
                        "total": 1,
                        "items": [{"name": "memory_limit", "old_value": "6GB", "new_value": "4GB"}]
                    }))
                }
            }),
        )
        .route(
            "/api/v1/deployments/{name}/install",
            post(|| async { ok(Value::Null) }).get(|| async {
                ok(json!({"total": 3, "finished": 3, "status": "SUCCESSFUL", "msg": "done"}))
            }),
        )
}

async fn at_cluster_config(controller: &mut WizardController) {
    assert_ok!(controller.select_components(&["oceanbase".to_string()]));
    assert_ok!(controller.apply(WizardEvent::Next));
    assert_ok!(controller.apply(WizardEvent::Next));
    assert_eq!(controller.state().current_step(), StepKind::ClusterConfig);
}

#[tokio::test]
async fn test_submit_encrypts_config() {
    let dir = Dir::create_temp_dir("controller-submit").await.unwrap();
    let (private, pem) = keypair();
    let submitted = Arc::new(Mutex::new(None));
    let base_url = serve(install_service(pem, submitted.clone())).await;

    let mut controller = controller(Flow::InstallWithNewMetadb, &base_url, &dir);
    at_cluster_config(&mut controller).await;

    let config = sample_config();
    let encrypted = assert_ok!(controller.submit_config("demo", &config).await);
    assert!(controller.state().gates.config_validated);

    let body = submitted.lock().unwrap().clone().unwrap();
    assert_eq!(body, *encrypted.as_value());
    assert_eq!(decrypt(&private, &body["auth"]["password"]), "s3cret");
    assert_eq!(
        decrypt(&private, &body["components"]["oceanbase"]["root_password"]),
        "ob-root"
    );
    assert_eq!(body["components"]["oceanbase"]["appname"], "demo");

    // The caller's config keeps its plaintext
    assert_eq!(config.as_value()["auth"]["password"], "s3cret");

    dir.delete().await.unwrap();
}

#[tokio::test]
async fn test_submit_outside_config_steps_is_rejected() {
    let dir = Dir::create_temp_dir("controller-reject").await.unwrap();
    let mut controller = controller(Flow::ComponentRemove, &dead_backend().await, &dir);

    assert_ok!(controller.select_components(&["obagent".to_string()]));
    assert_ok!(controller.apply(WizardEvent::Next));
    assert_err!(controller.submit_config("demo", &sample_config()).await);
    assert_err!(controller.select_components(&[]));

    dir.delete().await.unwrap();
}

#[tokio::test]
async fn test_failed_precheck_blocks_install_until_recovered() {
    let dir = Dir::create_temp_dir("controller-precheck").await.unwrap();
    let (_, pem) = keypair();
    let base_url = serve(install_service(pem, Arc::new(Mutex::new(None)))).await;

    let mut controller = controller(Flow::InstallWithNewMetadb, &base_url, &dir);
    at_cluster_config(&mut controller).await;
    assert_ok!(controller.submit_config("demo", &sample_config()).await);
    assert_ok!(controller.apply(WizardEvent::Next));

    let outcome = assert_ok!(
        controller
            .run_precheck("demo", Box::pin(pending::<()>()))
            .await
    );
    let PollOutcome::Terminal(status) = outcome else {
        panic!("precheck did not finish: {:?}", outcome);
    };
    assert!(!status.all_passed);
    assert!(status.info[0].is_failed());
    assert!(!controller.state().gates.precheck_passed);
    assert_err!(controller.apply(WizardEvent::Next));
    assert_eq!(controller.state().step, 4);

    let changes = assert_ok!(controller.recover("demo").await);
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].new_value, json!("4GB"));
    assert_err!(controller.apply(WizardEvent::Next));

    let outcome = assert_ok!(
        controller
            .run_precheck("demo", Box::pin(pending::<()>()))
            .await
    );
    assert!(outcome.is_success());
    assert_ok!(controller.apply(WizardEvent::Next));
    assert_eq!(controller.state().current_step(), StepKind::Install);

    let outcome = assert_ok!(
        controller
            .run_task("demo", &[], Box::pin(pending::<()>()))
            .await
    );
    assert!(outcome.is_success());
    assert_eq!(
        controller.state().phase,
        Phase::Finished(TaskOutcome::Succeeded)
    );

    dir.delete().await.unwrap();
}

#[tokio::test]
async fn test_service_stopped_after_three_network_failures() {
    let dir = Dir::create_temp_dir("controller-stopped").await.unwrap();
    let mut controller = controller(Flow::InstallWithNewMetadb, &dead_backend().await, &dir);
    let config = DeploymentConfig::new(json!({
        "components": {"oceanbase": {"component": "oceanbase-ce", "version": "4.2.1"}}
    }));

    for _ in 0..2 {
        let err = assert_err!(controller.load_parameters(&config, false).await);
        assert_eq!(controller.classify(&err), ErrorDisposition::Retry);
        assert_eq!(controller.state().phase, Phase::InProgress);
    }

    let err = assert_err!(controller.load_parameters(&config, false).await);
    assert_eq!(controller.classify(&err), ErrorDisposition::ServiceStopped);
    assert!(controller.state().is_service_stopped());
    assert_err!(controller.select_components(&["oceanbase".to_string()]));

    dir.delete().await.unwrap();
}

#[tokio::test]
async fn test_removal_poll_stops_when_service_goes_away() {
    let dir = Dir::create_temp_dir("controller-removal").await.unwrap();
    let router = Router::new()
        .route(
            "/api/v1/component_change/{name}",
            delete(|| async { ok(Value::Null) }),
        )
        .route(
            "/api/v1/component_change/{name}/del",
            get(|| async { (StatusCode::BAD_GATEWAY, "gone") }),
        );
    let base_url = serve(router).await;

    let mut controller = controller(Flow::ComponentRemove, &base_url, &dir);
    assert_ok!(controller.select_components(&["obproxy".to_string()]));
    assert_ok!(controller.apply(WizardEvent::Next));

    let components = vec!["obproxy".to_string()];
    let outcome = assert_ok!(
        controller
            .run_task("demo", &components, Box::pin(pending::<()>()))
            .await
    );

    assert_eq!(outcome, PollOutcome::Stopped);
    assert!(controller.state().gates.task_started);
    assert!(controller.state().is_service_stopped());

    dir.delete().await.unwrap();
}

/// Removal service whose status endpoint plays `replies` in order, repeating
/// the last one
fn scripted_removal(replies: Vec<Json<Value>>) -> Router {
    let replies = Arc::new(Mutex::new(VecDeque::from(replies)));
    Router::new()
        .route(
            "/api/v1/component_change/{name}",
            delete(|| async { ok(Value::Null) }),
        )
        .route(
            "/api/v1/component_change/{name}/del",
            get(move || {
                let replies = replies.clone();
                async move {
                    let mut replies = replies.lock().unwrap();
                    if replies.len() > 1 {
                        replies.pop_front().unwrap()
                    } else {
                        replies.front().cloned().unwrap()
                    }
                }
            }),
        )
}

async fn run_removal(controller: &mut WizardController) -> PollOutcome<TaskStatus> {
    assert_ok!(controller.select_components(&["obproxy".to_string()]));
    assert_ok!(controller.apply(WizardEvent::Next));
    let components = vec!["obproxy".to_string()];
    assert_ok!(
        controller
            .run_task("demo", &components, Box::pin(pending::<()>()))
            .await
    )
}

#[tokio::test]
async fn test_removal_with_null_fields_finishes() {
    let dir = Dir::create_temp_dir("controller-null-fields").await.unwrap();
    let base_url = serve(scripted_removal(vec![
        ok(json!({"total": 2, "finished": 1, "current": null, "status": "RUNNING"})),
        ok(json!({"total": 2, "finished": 1, "current": null, "status": "RUNNING"})),
        ok(json!({"total": 2, "finished": 2, "current": null, "msg": null, "status": "SUCCESSFUL"})),
    ]))
    .await;

    let mut controller = controller(Flow::ComponentRemove, &base_url, &dir);
    let outcome = run_removal(&mut controller).await;

    assert!(outcome.is_success());
    assert_eq!(
        controller.state().phase,
        Phase::Finished(TaskOutcome::Succeeded)
    );
    assert!(controller.client().pipeline().is_empty());

    dir.delete().await.unwrap();
}

#[tokio::test]
async fn test_application_failure_mid_poll_keeps_polling() {
    let dir = Dir::create_temp_dir("controller-mid-poll").await.unwrap();
    let base_url = serve(scripted_removal(vec![
        ok(json!({"total": 2, "finished": 0, "status": "RUNNING"})),
        fail(500, "task record locked"),
        ok(json!({"total": 2, "finished": 2, "status": "SUCCESSFUL"})),
    ]))
    .await;

    let mut controller = controller(Flow::ComponentRemove, &base_url, &dir);
    let outcome = run_removal(&mut controller).await;

    assert!(outcome.is_success());
    assert_eq!(
        controller.state().phase,
        Phase::Finished(TaskOutcome::Succeeded)
    );

    dir.delete().await.unwrap();
}
